//! Viewer-space to PDF-space coordinate mapping
//!
//! Annotations are stored in viewer page space: top-left origin, y down,
//! at the viewer's zoom-1 page size. PDF content streams use bottom-left
//! origin, y up, in points. Every exported coordinate goes through one of
//! these helpers so the flip happens in exactly one place.

/// Per-page mapping from viewer space into PDF points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTransform {
    pub scale_x: f32,
    pub scale_y: f32,
    /// Page height in points, used for the y flip
    pub page_height: f32,
}

impl PageTransform {
    /// Identity-scale transform for a page rendered at its point size
    pub fn direct(page_height: f32) -> Self {
        Self { scale_x: 1.0, scale_y: 1.0, page_height }
    }

    pub fn x(&self, x: f32) -> f32 {
        x * self.scale_x
    }

    /// Map a viewer y (top-down) to a PDF y (bottom-up)
    pub fn y(&self, y: f32) -> f32 {
        self.page_height - y * self.scale_y
    }

    pub fn len_x(&self, v: f32) -> f32 {
        v * self.scale_x
    }

    pub fn len_y(&self, v: f32) -> f32 {
        v * self.scale_y
    }
}

/// Parse a `#rrggbb` color into normalized RGB components
///
/// Malformed input falls back to black rather than failing the export.
pub fn parse_hex_color(color: &str) -> (f32, f32, f32) {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 {
        return (0.0, 0.0, 0.0);
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map(|v| v as f32 / 255.0)
    };
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Ok(r), Ok(g), Ok(b)) => (r, g, b),
        _ => (0.0, 0.0, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_y_flip() {
        let t = PageTransform::direct(792.0);
        assert_eq!(t.y(0.0), 792.0);
        assert_eq!(t.y(792.0), 0.0);
        assert_eq!(t.x(10.0), 10.0);
    }

    #[test]
    fn test_scaled_transform() {
        // Viewer laid the page out at 2x the point size.
        let t = PageTransform { scale_x: 0.5, scale_y: 0.5, page_height: 400.0 };
        assert_eq!(t.x(100.0), 50.0);
        assert_eq!(t.y(100.0), 350.0);
        assert_eq!(t.len_y(40.0), 20.0);
    }

    #[test]
    fn test_parse_hex_color() {
        let (r, g, b) = parse_hex_color("#ef4444");
        assert!((r - 239.0 / 255.0).abs() < 1e-4);
        assert!((g - 68.0 / 255.0).abs() < 1e-4);
        assert!((b - 68.0 / 255.0).abs() < 1e-4);

        assert_eq!(parse_hex_color("ffffff"), (1.0, 1.0, 1.0));
        assert_eq!(parse_hex_color("#zzzzzz"), (0.0, 0.0, 0.0));
        assert_eq!(parse_hex_color("#fff"), (0.0, 0.0, 0.0));
    }
}
