//! Geometry, hit-testing, and the move/resize transforms
//!
//! All functions here are pure: move and resize take the annotation as it
//! was when the gesture started plus the cumulative pointer delta, and
//! return a new annotation. Screen-space affordances (hit slop, handle
//! size, selection padding) are divided by the zoom factor so they stay a
//! constant apparent size on screen.

use crate::annotation::{Annotation, Point, Shape};

/// Hit-test slop in screen pixels
const HIT_TOLERANCE_PX: f32 = 5.0;

/// Resize handle hit target in screen pixels
const HANDLE_SIZE_PX: f32 = 8.0;

/// Selection outline padding in screen pixels
const SELECTION_PADDING_PX: f32 = 4.0;

/// Axis-aligned bounding box in unscaled page space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    fn expanded(&self, by: f32) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x - by,
            min_y: self.min_y - by,
            max_x: self.max_x + by,
            max_y: self.max_y + by,
        }
    }
}

/// Compute the bounding box of an annotation
///
/// Returns `None` for a stroke with no points. A text annotation that was
/// never resized has no stored height; its box height falls back to
/// line count times 1.2 em.
pub fn bounding_box(annotation: &Annotation) -> Option<BoundingBox> {
    match &annotation.shape {
        Shape::Pen { points }
        | Shape::Highlighter { points }
        | Shape::Underline { points }
        | Shape::Strikethrough { points }
        | Shape::Squiggly { points } => {
            let first = points.first()?;
            let mut bbox = BoundingBox {
                min_x: first.x,
                min_y: first.y,
                max_x: first.x,
                max_y: first.y,
            };
            for p in &points[1..] {
                bbox.min_x = bbox.min_x.min(p.x);
                bbox.min_y = bbox.min_y.min(p.y);
                bbox.max_x = bbox.max_x.max(p.x);
                bbox.max_y = bbox.max_y.max(p.y);
            }
            Some(bbox)
        }
        Shape::Rectangle { x, y, width, height }
        | Shape::Stamp { x, y, width, height, .. }
        | Shape::Signature { x, y, width, height, .. }
        | Shape::Initials { x, y, width, height, .. } => Some(BoundingBox {
            min_x: *x,
            min_y: *y,
            max_x: x + width,
            max_y: y + height,
        }),
        Shape::Circle { cx, cy, rx, ry } => Some(BoundingBox {
            min_x: cx - rx,
            min_y: cy - ry,
            max_x: cx + rx,
            max_y: cy + ry,
        }),
        Shape::Text { x, y, width, height, content, font_size } => {
            let lines = content.lines().count().max(1) as f32;
            let h = height.unwrap_or(lines * font_size * 1.2);
            Some(BoundingBox { min_x: *x, min_y: *y, max_x: x + width, max_y: y + h })
        }
    }
}

/// Test whether a page-space point hits an annotation at the given zoom
///
/// The box is expanded by a 5-screen-pixel slop so small strokes stay
/// selectable when zoomed out.
pub fn hit_test(point: Point, annotation: &Annotation, zoom: f32) -> bool {
    match bounding_box(annotation) {
        Some(bbox) => bbox.expanded(HIT_TOLERANCE_PX / zoom).contains(point),
        None => false,
    }
}

/// The eight resize handles, corners plus edge midpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    TopLeft,
    Top,
    TopRight,
    Left,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::TopLeft,
        ResizeHandle::Top,
        ResizeHandle::TopRight,
        ResizeHandle::Left,
        ResizeHandle::Right,
        ResizeHandle::BottomLeft,
        ResizeHandle::Bottom,
        ResizeHandle::BottomRight,
    ];

    pub fn affects_left(self) -> bool {
        matches!(self, ResizeHandle::TopLeft | ResizeHandle::Left | ResizeHandle::BottomLeft)
    }

    pub fn affects_right(self) -> bool {
        matches!(self, ResizeHandle::TopRight | ResizeHandle::Right | ResizeHandle::BottomRight)
    }

    pub fn affects_top(self) -> bool {
        matches!(self, ResizeHandle::TopLeft | ResizeHandle::Top | ResizeHandle::TopRight)
    }

    pub fn affects_bottom(self) -> bool {
        matches!(self, ResizeHandle::BottomLeft | ResizeHandle::Bottom | ResizeHandle::BottomRight)
    }

    /// Anchor position of this handle on a bounding box
    pub fn position(self, bbox: &BoundingBox) -> Point {
        let mid_x = (bbox.min_x + bbox.max_x) / 2.0;
        let mid_y = (bbox.min_y + bbox.max_y) / 2.0;
        match self {
            ResizeHandle::TopLeft => Point::new(bbox.min_x, bbox.min_y),
            ResizeHandle::Top => Point::new(mid_x, bbox.min_y),
            ResizeHandle::TopRight => Point::new(bbox.max_x, bbox.min_y),
            ResizeHandle::Left => Point::new(bbox.min_x, mid_y),
            ResizeHandle::Right => Point::new(bbox.max_x, mid_y),
            ResizeHandle::BottomLeft => Point::new(bbox.min_x, bbox.max_y),
            ResizeHandle::Bottom => Point::new(mid_x, bbox.max_y),
            ResizeHandle::BottomRight => Point::new(bbox.max_x, bbox.max_y),
        }
    }
}

/// Handle layout for rendering a selection overlay
pub fn resize_handles(bbox: &BoundingBox) -> [(ResizeHandle, Point); 8] {
    let mut out = [(ResizeHandle::TopLeft, Point::new(0.0, 0.0)); 8];
    for (slot, handle) in out.iter_mut().zip(ResizeHandle::ALL) {
        *slot = (handle, handle.position(bbox));
    }
    out
}

/// Find the resize handle under a page-space point, if any
///
/// Handles have an 8-screen-pixel square hit target centered on the
/// anchor, so a point may be at most half that from it on each axis.
pub fn handle_at(point: Point, bbox: &BoundingBox, zoom: f32) -> Option<ResizeHandle> {
    let half = HANDLE_SIZE_PX / zoom / 2.0;
    ResizeHandle::ALL.into_iter().find(|handle| {
        let anchor = handle.position(bbox);
        (point.x - anchor.x).abs() <= half && (point.y - anchor.y).abs() <= half
    })
}

/// Selection outline box: the bounding box padded by 4 screen pixels
pub fn selection_box(bbox: &BoundingBox, zoom: f32) -> BoundingBox {
    bbox.expanded(SELECTION_PADDING_PX / zoom)
}

/// Translate an annotation by a cumulative page-space delta
pub fn translated(annotation: &Annotation, dx: f32, dy: f32) -> Annotation {
    let mut out = annotation.clone();
    match &mut out.shape {
        Shape::Pen { points }
        | Shape::Highlighter { points }
        | Shape::Underline { points }
        | Shape::Strikethrough { points }
        | Shape::Squiggly { points } => {
            for p in points.iter_mut() {
                p.x += dx;
                p.y += dy;
            }
        }
        Shape::Rectangle { x, y, .. }
        | Shape::Text { x, y, .. }
        | Shape::Stamp { x, y, .. }
        | Shape::Signature { x, y, .. }
        | Shape::Initials { x, y, .. } => {
            *x += dx;
            *y += dy;
        }
        Shape::Circle { cx, cy, .. } => {
            *cx += dx;
            *cy += dy;
        }
    }
    out
}

/// Resize an annotation by dragging a handle with a cumulative delta
///
/// Circles move their center by half the delta and grow the dragged
/// radius by the other half, with a 10-unit radius floor. Box kinds that
/// get dragged through themselves flip-normalize so extents stay
/// positive. Text floors instead: width at 50 and height at 1.2 em so
/// the content always has room for one line. Strokes do not resize.
pub fn resized(annotation: &Annotation, handle: ResizeHandle, dx: f32, dy: f32) -> Annotation {
    let mut out = annotation.clone();
    match &mut out.shape {
        Shape::Circle { cx, cy, rx, ry } => {
            if handle.affects_left() {
                *cx += dx / 2.0;
                *rx -= dx / 2.0;
            } else if handle.affects_right() {
                *cx += dx / 2.0;
                *rx += dx / 2.0;
            }
            if handle.affects_top() {
                *cy += dy / 2.0;
                *ry -= dy / 2.0;
            } else if handle.affects_bottom() {
                *cy += dy / 2.0;
                *ry += dy / 2.0;
            }
            *rx = rx.max(10.0);
            *ry = ry.max(10.0);
        }
        Shape::Rectangle { x, y, width, height }
        | Shape::Stamp { x, y, width, height, .. }
        | Shape::Signature { x, y, width, height, .. }
        | Shape::Initials { x, y, width, height, .. } => {
            resize_box(handle, dx, dy, x, y, width, height);
            if *width < 0.0 {
                *x += *width;
                *width = -*width;
            }
            if *height < 0.0 {
                *y += *height;
                *height = -*height;
            }
        }
        Shape::Text { x, y, width, height, font_size, .. } => {
            let mut h = height.unwrap_or(*font_size * 1.5);
            resize_box(handle, dx, dy, x, y, width, &mut h);
            *width = width.max(50.0);
            *height = Some(h.max(*font_size * 1.2));
        }
        Shape::Pen { .. }
        | Shape::Highlighter { .. }
        | Shape::Underline { .. }
        | Shape::Strikethrough { .. }
        | Shape::Squiggly { .. } => {}
    }
    out
}

fn resize_box(handle: ResizeHandle, dx: f32, dy: f32, x: &mut f32, y: &mut f32, width: &mut f32, height: &mut f32) {
    if handle.affects_left() {
        *x += dx;
        *width -= dx;
    } else if handle.affects_right() {
        *width += dx;
    }
    if handle.affects_top() {
        *y += dy;
        *height -= dy;
    } else if handle.affects_bottom() {
        *height += dy;
    }
}
