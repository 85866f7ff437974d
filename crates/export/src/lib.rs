//! PDF export: flatten annotations into a new document
//!
//! Export loads the source bytes, walks the annotation snapshot page by
//! page, appends translated content-stream operators after the existing
//! page content (wrapped in `q`/`Q` so inherited graphics state cannot
//! leak into the overlay), registers exactly the font/ExtGState/XObject
//! resources those operators reference, embeds the undo/redo log in the
//! Info dictionary, and saves to a fresh byte buffer. The source
//! document is never modified in place.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use lopdf::content::Content;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use redline_core::{Annotations, HistoryState};

pub mod images;
pub mod metadata;
pub mod transform;
pub mod translate;

use images::ImageTable;
use translate::{alpha_name, PageNeeds, FONT_BOLD, FONT_REGULAR};

pub use metadata::{read_annotations, read_history, METADATA_PREFIX};
pub use transform::{parse_hex_color, PageTransform};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Zoom-1 viewer size per page, for mapping into PDF points
///
/// Pages not present fall back to an identity mapping (viewer laid the
/// page out at its point size).
pub type ViewSizes = BTreeMap<u32, (f32, f32)>;

/// Produce annotated PDF bytes from source bytes
///
/// Annotations on pages the document does not have are skipped. The
/// returned buffer always carries the history log in its metadata, even
/// when the annotation set is empty.
pub fn generate_annotated_pdf(
    source: &[u8],
    annotations: &Annotations,
    history: &HistoryState,
    view_sizes: &ViewSizes,
) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::load_mem(source)?;
    let pages = doc.get_pages();

    let mut images = ImageTable::new();
    let mut fonts: HashMap<&str, ObjectId> = HashMap::new();
    let mut alphas: HashMap<u16, ObjectId> = HashMap::new();

    for (page_no, list) in annotations {
        if list.is_empty() {
            continue;
        }
        let Some(&page_id) = pages.get(page_no) else {
            debug!("skipping annotations on nonexistent page {page_no}");
            continue;
        };

        let (page_width, page_height) = page_size(&doc, page_id);
        let (view_width, view_height) =
            view_sizes.get(page_no).copied().unwrap_or((page_width, page_height));
        let t = PageTransform {
            scale_x: page_width / view_width,
            scale_y: page_height / view_height,
            page_height,
        };

        let mut ops = Vec::new();
        let mut needs = PageNeeds::default();
        for annotation in list {
            translate::push_annotation_ops(&mut ops, &mut needs, &mut doc, &mut images, annotation, &t);
        }
        if ops.is_empty() {
            continue;
        }

        let mut content = Vec::from(&b"q\n"[..]);
        content.extend_from_slice(&doc.get_page_content(page_id)?);
        content.extend_from_slice(b"\nQ\n");
        content.extend_from_slice(&Content { operations: ops }.encode()?);
        doc.change_page_content(page_id, content)?;

        register_resources(&mut doc, page_id, &needs, &mut fonts, &mut alphas, &images)?;
    }

    metadata::write_history(&mut doc, history)?;

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

/// Page extent in points, from MediaBox with a US Letter fallback
fn page_size(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    doc.get_dictionary(page_id)
        .ok()
        .and_then(|dict| dict.get(b"MediaBox").ok())
        .and_then(|obj| obj.as_array().ok())
        .and_then(|array| {
            if array.len() != 4 {
                return None;
            }
            let x0 = array[0].as_float().ok()?;
            let y0 = array[1].as_float().ok()?;
            let x1 = array[2].as_float().ok()?;
            let y1 = array[3].as_float().ok()?;
            Some(((x1 - x0).abs(), (y1 - y0).abs()))
        })
        .unwrap_or((612.0, 792.0))
}

fn register_resources(
    doc: &mut Document,
    page_id: ObjectId,
    needs: &PageNeeds,
    fonts: &mut HashMap<&'static str, ObjectId>,
    alphas: &mut HashMap<u16, ObjectId>,
    images: &ImageTable,
) -> Result<(), ExportError> {
    if needs.regular_font {
        let id = *fonts
            .entry(FONT_REGULAR)
            .or_insert_with(|| add_type1_font(doc, "Helvetica"));
        add_resource_entry(doc, page_id, "Font", FONT_REGULAR, id)?;
    }
    if needs.bold_font {
        let id = *fonts
            .entry(FONT_BOLD)
            .or_insert_with(|| add_type1_font(doc, "Helvetica-Bold"));
        add_resource_entry(doc, page_id, "Font", FONT_BOLD, id)?;
    }
    for &percent in &needs.alphas {
        let id = *alphas.entry(percent).or_insert_with(|| {
            let alpha = percent as f32 / 100.0;
            doc.add_object(dictionary! {
                "Type" => "ExtGState",
                "CA" => alpha,
                "ca" => alpha,
            })
        });
        add_resource_entry(doc, page_id, "ExtGState", &alpha_name(percent), id)?;
    }
    for name in &needs.images {
        let Some((_, id)) = images.entries().find(|(n, _)| n == name) else {
            continue;
        };
        add_resource_entry(doc, page_id, "XObject", name, *id)?;
    }
    Ok(())
}

fn add_type1_font(doc: &mut Document, base_font: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
    })
}

/// Insert `name -> target` into a category subdictionary (`Font`,
/// `ExtGState`, `XObject`) of the page's resources
///
/// The subdictionary may be stored inline or behind a reference; both
/// forms are updated in place.
fn add_resource_entry(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    name: &str,
    target: ObjectId,
) -> Result<(), ExportError> {
    let resources = doc.get_or_create_resources(page_id).and_then(Object::as_dict_mut)?;
    let existing = resources.get(category.as_bytes()).ok().cloned();

    match existing {
        Some(Object::Reference(id)) => {
            let dict = doc.get_object_mut(id).and_then(Object::as_dict_mut)?;
            dict.set(name, Object::Reference(target));
        }
        Some(Object::Dictionary(mut dict)) => {
            dict.set(name, Object::Reference(target));
            let resources = doc.get_or_create_resources(page_id).and_then(Object::as_dict_mut)?;
            resources.set(category, dict);
        }
        _ => {
            let mut dict = Dictionary::new();
            dict.set(name, Object::Reference(target));
            let resources = doc.get_or_create_resources(page_id).and_then(Object::as_dict_mut)?;
            resources.set(category, dict);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Stream;
    use redline_core::{Annotation, Shape};

    fn sample_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content = Content { operations: vec![] };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn annotation(id: &str, shape: Shape) -> Annotation {
        Annotation {
            id: id.to_string(),
            page: 1,
            color: "#ef4444".to_string(),
            stroke_width: 2.0,
            shape,
        }
    }

    fn single_snapshot(annotations: Annotations) -> HistoryState {
        HistoryState { history: vec![annotations], index: 0 }
    }

    fn decoded_ops(bytes: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let content = doc.get_page_content(page_id).unwrap();
        Content::decode(&content)
            .unwrap()
            .operations
            .into_iter()
            .map(|op| op.operator)
            .collect()
    }

    #[test]
    fn test_export_wraps_content_and_appends_ops() {
        let mut annotations = Annotations::new();
        annotations.insert(
            1,
            vec![annotation("r", Shape::Rectangle { x: 10.0, y: 10.0, width: 100.0, height: 50.0 })],
        );
        let history = single_snapshot(annotations.clone());

        let bytes =
            generate_annotated_pdf(&sample_pdf(), &annotations, &history, &ViewSizes::new())
                .unwrap();

        let ops = decoded_ops(&bytes);
        assert_eq!(ops[0], "q"); // original content is isolated
        assert!(ops.contains(&"re".to_string()));
        assert!(ops.contains(&"S".to_string()));
    }

    #[test]
    fn test_export_registers_resources_for_stamp() {
        let mut annotations = Annotations::new();
        annotations.insert(
            1,
            vec![annotation(
                "s",
                Shape::Stamp {
                    x: 130.0,
                    y: 125.0,
                    width: 140.0,
                    height: 55.0,
                    text: "APPROVED".to_string(),
                    font_size: 18.0,
                    timestamp: Some("2026-08-29 10:00".to_string()),
                },
            )],
        );
        let history = single_snapshot(annotations.clone());

        let bytes =
            generate_annotated_pdf(&sample_pdf(), &annotations, &history, &ViewSizes::new())
                .unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let (resources, _) = doc.get_page_resources(page_id).unwrap();
        let resources = resources.unwrap();

        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.get(FONT_BOLD.as_bytes()).is_ok());

        let states = resources.get(b"ExtGState").unwrap().as_dict().unwrap();
        assert!(states.get(b"RLGS80").is_ok());
        assert!(states.get(b"RLGS70").is_ok());
    }

    #[test]
    fn test_history_metadata_round_trips_through_export() {
        let mut annotations = Annotations::new();
        annotations.insert(
            1,
            vec![annotation("r", Shape::Rectangle { x: 1.0, y: 2.0, width: 3.0, height: 4.0 })],
        );
        let history = HistoryState {
            history: vec![Annotations::new(), annotations.clone()],
            index: 1,
        };

        let bytes =
            generate_annotated_pdf(&sample_pdf(), &annotations, &history, &ViewSizes::new())
                .unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(read_history(&doc).unwrap(), history);
    }

    #[test]
    fn test_empty_annotations_still_write_metadata() {
        let annotations = Annotations::new();
        let history = single_snapshot(annotations.clone());

        let bytes =
            generate_annotated_pdf(&sample_pdf(), &annotations, &history, &ViewSizes::new())
                .unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert!(read_history(&doc).is_some());

        let ops = decoded_ops(&bytes);
        assert!(!ops.contains(&"re".to_string()));
    }

    #[test]
    fn test_annotations_on_missing_page_are_skipped() {
        let mut annotations = Annotations::new();
        annotations.insert(
            99,
            vec![annotation("r", Shape::Rectangle { x: 0.0, y: 0.0, width: 10.0, height: 10.0 })],
        );
        let history = single_snapshot(annotations.clone());

        let bytes =
            generate_annotated_pdf(&sample_pdf(), &annotations, &history, &ViewSizes::new());
        assert!(bytes.is_ok());
    }

    #[test]
    fn test_view_size_scales_into_points() {
        let mut annotations = Annotations::new();
        annotations.insert(
            1,
            vec![annotation("r", Shape::Rectangle { x: 100.0, y: 0.0, width: 200.0, height: 100.0 })],
        );
        let history = single_snapshot(annotations.clone());

        // Viewer laid the page out at twice its point size.
        let mut view_sizes = ViewSizes::new();
        view_sizes.insert(1, (1224.0, 1584.0));

        let bytes =
            generate_annotated_pdf(&sample_pdf(), &annotations, &history, &view_sizes).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let content = doc.get_page_content(page_id).unwrap();
        let ops = Content::decode(&content).unwrap().operations;
        let re = ops.iter().find(|op| op.operator == "re").unwrap();
        assert_eq!(re.operands[0].as_float().unwrap(), 50.0); // 100 x 0.5
        assert_eq!(re.operands[2].as_float().unwrap(), 100.0); // 200 x 0.5
        assert_eq!(re.operands[1].as_float().unwrap(), 792.0 - 50.0);
    }
}
