//! Editing tools and editor defaults

use serde::{Deserialize, Serialize};

/// Default stroke/fill color for new annotations
pub const DEFAULT_COLOR: &str = "#ef4444";

/// Default stroke width in page units
pub const DEFAULT_STROKE_WIDTH: f32 = 2.0;

/// Default font size for text annotations
pub const DEFAULT_FONT_SIZE: f32 = 16.0;

/// Font sizes offered by the toolbar
pub const FONT_SIZES: [f32; 10] = [8.0, 10.0, 12.0, 14.0, 16.0, 20.0, 24.0, 32.0, 48.0, 64.0];

/// Stroke widths offered by the toolbar
pub const STROKE_WIDTHS: [f32; 5] = [1.0, 2.0, 4.0, 8.0, 12.0];

/// Built-in stamp labels
pub const STAMPS: [&str; 8] = [
    "APPROVED",
    "CONFIDENTIAL",
    "DRAFT",
    "FINAL",
    "FOR REVIEW",
    "REVISED",
    "ASAP",
    "VOID",
];

/// Fixed font size for stamp labels
pub const STAMP_FONT_SIZE: f32 = 18.0;

/// Stamp box extent
pub const STAMP_BOX: (f32, f32) = (140.0, 55.0);

/// Offset from the click point to the stamp box's top-left corner
pub const STAMP_OFFSET: (f32, f32) = (70.0, 25.0);

/// Signature box extent, centered on the click point
pub const SIGNATURE_BOX: (f32, f32) = (150.0, 75.0);

/// Initials box extent, centered on the click point
pub const INITIALS_BOX: (f32, f32) = (80.0, 40.0);

/// The active editing tool
///
/// `Eraser` is reserved: it is part of the toolbar surface but has no
/// interaction behavior yet, so pointer input while it is active does
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Select,
    Pan,
    Pen,
    Highlighter,
    Text,
    Rectangle,
    Circle,
    Eraser,
    Underline,
    Strikethrough,
    Squiggly,
    Stamp,
    Signature,
    Initials,
}

impl Tool {
    /// Tools that accumulate a point list while the pointer is down
    pub fn is_freehand(self) -> bool {
        matches!(
            self,
            Tool::Pen | Tool::Highlighter | Tool::Underline | Tool::Strikethrough | Tool::Squiggly
        )
    }

    /// Tools that drag out a two-corner shape
    pub fn is_drag_shape(self) -> bool {
        matches!(self, Tool::Rectangle | Tool::Circle)
    }

    /// Tools that place a fixed-size annotation on click
    pub fn is_click_placed(self) -> bool {
        matches!(self, Tool::Stamp | Tool::Signature | Tool::Initials)
    }
}
