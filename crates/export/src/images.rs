//! Embedded image handling for signature and initials annotations
//!
//! Payloads arrive as base64 PNG, usually with a `data:image/png;base64,`
//! prefix. Each distinct payload is decoded once per export and embedded
//! as a DeviceRGB image XObject; alpha goes into a separate SMask. The
//! table is content-addressed so a signature reused across pages shares
//! one object.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::warn;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// Content-addressed registry of embedded images for one export
#[derive(Debug, Default)]
pub struct ImageTable {
    by_payload: HashMap<String, (String, ObjectId)>,
}

impl ImageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resource name and object id for a payload, embedding on first use
    ///
    /// An undecodable payload is logged and yields `None`; the annotation
    /// is skipped rather than failing the whole export.
    pub fn ensure(
        &mut self,
        doc: &mut Document,
        payload: &str,
    ) -> Option<(String, ObjectId)> {
        if let Some(entry) = self.by_payload.get(payload) {
            return Some(entry.clone());
        }

        let decoded = match decode_png(payload) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!("skipping undecodable image payload: {err}");
                return None;
            }
        };

        let id = embed(doc, decoded);
        let name = format!("RLIm{}", self.by_payload.len());
        self.by_payload.insert(payload.to_string(), (name.clone(), id));
        Some((name, id))
    }

    /// All embedded images, for resource registration
    pub fn entries(&self) -> impl Iterator<Item = &(String, ObjectId)> {
        self.by_payload.values()
    }

    pub fn len(&self) -> usize {
        self.by_payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_payload.is_empty()
    }
}

struct DecodedImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    /// Per-pixel alpha, present only when any pixel is not fully opaque
    alpha: Option<Vec<u8>>,
}

#[derive(Debug, thiserror::Error)]
enum ImageDecodeError {
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("PNG decode failed: {0}")]
    Png(#[from] image::ImageError),
}

fn decode_png(payload: &str) -> Result<DecodedImage, ImageDecodeError> {
    let encoded = match payload.split_once("base64,") {
        Some((_, rest)) => rest,
        None => payload,
    };
    let bytes = BASE64.decode(encoded.trim())?;
    let rgba = image::load_from_memory(&bytes)?.to_rgba8();

    let (width, height) = rgba.dimensions();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    let mut translucent = false;
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
        translucent |= pixel.0[3] != 255;
    }

    Ok(DecodedImage { width, height, rgb, alpha: translucent.then_some(alpha) })
}

fn embed(doc: &mut Document, decoded: DecodedImage) -> ObjectId {
    let smask = decoded.alpha.map(|alpha| {
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => decoded.width as i64,
                "Height" => decoded.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ))
    });

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => decoded.width as i64,
        "Height" => decoded.height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    if let Some(smask_id) = smask {
        dict.set("SMask", Object::Reference(smask_id));
    }

    doc.add_object(Stream::new(dict, decoded.rgb))
}
