//! Page rasterization interface
//!
//! The viewer treats rasterization as a black box: given a page number
//! and a scale, a [`PageRenderer`] yields an RGBA raster of the page.
//! Workers receive a [`CancellationToken`] and are expected to poll it at
//! safe points; a render that observes cancellation returns
//! [`RenderError::Cancelled`], which callers treat as a no-op rather
//! than a failure.
//!
//! [`PlaceholderRenderer`] is the built-in backend: it parses real page
//! geometry with lopdf but rasterizes a blank page with a border. It
//! exists so the viewer and its tests run without a full PDF rasterizer.

use image::{ImageBuffer, Rgba};
use lopdf::Document;
use redline_scheduler::CancellationToken;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Page extent in PDF points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("render cancelled")]
    Cancelled,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Rasterization backend interface
///
/// Pages are 1-based, matching the annotation model's page keys.
pub trait PageRenderer {
    fn page_count(&self) -> u32;
    fn page_size(&self, page: u32) -> Result<PageSize, RenderError>;
    fn render_page(
        &self,
        page: u32,
        scale: f32,
        cancel: &CancellationToken,
    ) -> Result<RgbaImage, RenderError>;
}

/// Blank-page backend backed by lopdf page geometry
#[derive(Debug)]
pub struct PlaceholderRenderer {
    page_sizes: Vec<PageSize>,
}

impl PlaceholderRenderer {
    /// Parse page sizes from raw PDF bytes
    ///
    /// Pages without a usable MediaBox fall back to US Letter.
    pub fn open(bytes: &[u8]) -> Result<Self, RenderError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(RenderError::EncryptedUnsupported);
        }

        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut page_sizes = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            let dict = doc.get_dictionary(object_id)?;
            let size = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = array[0].as_float().ok()?;
                    let y0 = array[1].as_float().ok()?;
                    let x1 = array[2].as_float().ok()?;
                    let y1 = array[3].as_float().ok()?;
                    Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
                })
                .unwrap_or(PageSize { width_pt: 612.0, height_pt: 792.0 });

            page_sizes.push(size);
        }

        if page_sizes.is_empty() {
            return Err(RenderError::Backend("document has no pages".to_owned()));
        }

        Ok(Self { page_sizes })
    }
}

impl PageRenderer for PlaceholderRenderer {
    fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    fn page_size(&self, page: u32) -> Result<PageSize, RenderError> {
        page.checked_sub(1)
            .and_then(|i| self.page_sizes.get(i as usize))
            .copied()
            .ok_or(RenderError::PageOutOfRange { page, page_count: self.page_count() })
    }

    fn render_page(
        &self,
        page: u32,
        scale: f32,
        cancel: &CancellationToken,
    ) -> Result<RgbaImage, RenderError> {
        let page_size = self.page_size(page)?;
        let scale = if scale <= 0.0 { 1.0 } else { scale };

        let width = (page_size.width_pt * scale).round().max(1.0) as u32;
        let height = (page_size.height_pt * scale).round().max(1.0) as u32;

        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        for y in 0..height {
            // Scanline granularity keeps cancellation latency bounded.
            if cancel.is_cancelled() {
                return Err(RenderError::Cancelled);
            }
            if width >= 4 && height >= 4 && (y == 0 || y == height - 1) {
                for x in 0..width {
                    image.put_pixel(x, y, Rgba([220, 220, 220, 255]));
                }
            }
        }
        if width >= 4 && height >= 4 {
            for y in 0..height {
                image.put_pixel(0, y, Rgba([220, 220, 220, 255]));
                image.put_pixel(width - 1, y, Rgba([220, 220, 220, 255]));
            }
        }

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{content::Content, dictionary, Object, Stream};

    fn sample_pdf(width: f32, height: f32) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content = Content { operations: vec![] };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
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

    #[test]
    fn test_open_reads_page_count_and_media_box() {
        let renderer = PlaceholderRenderer::open(&sample_pdf(300.0, 400.0)).unwrap();
        assert_eq!(renderer.page_count(), 1);

        let size = renderer.page_size(1).unwrap();
        assert_eq!(size.width_pt, 300.0);
        assert_eq!(size.height_pt, 400.0);
    }

    #[test]
    fn test_page_out_of_range() {
        let renderer = PlaceholderRenderer::open(&sample_pdf(300.0, 400.0)).unwrap();
        assert!(matches!(
            renderer.page_size(2),
            Err(RenderError::PageOutOfRange { page: 2, page_count: 1 })
        ));
        assert!(matches!(renderer.page_size(0), Err(RenderError::PageOutOfRange { .. })));
    }

    #[test]
    fn test_render_scales_pixel_dimensions() {
        let renderer = PlaceholderRenderer::open(&sample_pdf(300.0, 400.0)).unwrap();
        let image = renderer.render_page(1, 2.0, &CancellationToken::new()).unwrap();
        assert_eq!(image.width(), 600);
        assert_eq!(image.height(), 800);
        assert_eq!(*image.get_pixel(0, 0), Rgba([220, 220, 220, 255]));
        assert_eq!(*image.get_pixel(300, 400), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_cancelled_token_short_circuits() {
        let renderer = PlaceholderRenderer::open(&sample_pdf(300.0, 400.0)).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            renderer.render_page(1, 1.0, &token),
            Err(RenderError::Cancelled)
        ));
    }
}
