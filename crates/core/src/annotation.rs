//! Annotation data model
//!
//! A single tagged sum type covers every annotation kind so that geometry
//! and export logic can match exhaustively. Coordinates are stored in
//! unscaled page space: top-left origin, y increasing downward, so a saved
//! document looks identical at any zoom level.
//!
//! The serialized form is the interchange format for both the `onChange`
//! snapshot callbacks and the history state embedded in exported PDFs:
//! an internally tagged `"type"` discriminant in SCREAMING case and
//! camelCase field names, with page numbers as object keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Unique identifier for an annotation
///
/// Opaque string, stable for the lifetime of the annotation across
/// move/resize edits, undo/redo, and export metadata round-trips.
pub type AnnotationId = String;

/// Mint a fresh annotation id (UUID v4)
pub fn mint_id() -> AnnotationId {
    uuid::Uuid::new_v4().to_string()
}

/// A point in unscaled page space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Per-kind annotation geometry and payload
///
/// Stroke-based kinds share a point-list representation; box kinds carry a
/// top-left anchor plus extent. `Text::height` is optional: unset means the
/// box has never been resized and the renderer derives a height from the
/// font size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Shape {
    Pen {
        points: Vec<Point>,
    },
    Highlighter {
        points: Vec<Point>,
    },
    Underline {
        points: Vec<Point>,
    },
    Strikethrough {
        points: Vec<Point>,
    },
    Squiggly {
        points: Vec<Point>,
    },
    Rectangle {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Circle {
        cx: f32,
        cy: f32,
        rx: f32,
        ry: f32,
    },
    #[serde(rename_all = "camelCase")]
    Text {
        x: f32,
        y: f32,
        width: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<f32>,
        content: String,
        font_size: f32,
    },
    #[serde(rename_all = "camelCase")]
    Stamp {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        text: String,
        font_size: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Signature {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        /// Base64 PNG payload, with or without a data-URL prefix
        image_data: String,
    },
    #[serde(rename_all = "camelCase")]
    Initials {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image_data: String,
    },
}

impl Shape {
    /// Point list for stroke-based kinds, `None` otherwise
    pub fn points(&self) -> Option<&[Point]> {
        match self {
            Shape::Pen { points }
            | Shape::Highlighter { points }
            | Shape::Underline { points }
            | Shape::Strikethrough { points }
            | Shape::Squiggly { points } => Some(points),
            _ => None,
        }
    }
}

/// A committed annotation
///
/// The envelope (id, page, color, stroke width) is shared by every kind;
/// the geometry and per-kind payload live in [`Shape`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    pub page: u32,
    pub color: String,
    pub stroke_width: f32,
    #[serde(flatten)]
    pub shape: Shape,
}

/// A not-yet-committed annotation: everything but identity and page
///
/// Produced by the interaction layer and turned into an [`Annotation`]
/// when the history engine assigns it a fresh id.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationData {
    pub color: String,
    pub stroke_width: f32,
    pub shape: Shape,
}

impl AnnotationData {
    pub fn into_annotation(self, page: u32) -> Annotation {
        Annotation {
            id: mint_id(),
            page,
            color: self.color,
            stroke_width: self.stroke_width,
            shape: self.shape,
        }
    }
}

/// All annotations in a document, keyed by 1-based page number
///
/// Vec order within a page is creation order and doubles as z-order:
/// later annotations draw on top and win hit-test ties.
pub type Annotations = BTreeMap<u32, Vec<Annotation>>;

/// Find an annotation by id across all pages
///
/// Scans pages in ascending order; the first match wins.
pub fn find_annotation<'a>(annotations: &'a Annotations, id: &str) -> Option<&'a Annotation> {
    annotations.values().flatten().find(|a| a.id == id)
}
