//! Pointer interaction state machine
//!
//! One interaction is in flight at a time: Idle, Drawing a new shape,
//! Moving a selected annotation, or Resizing it by a handle. The machine
//! freezes the annotation as it was on pointer-down and reapplies the
//! cumulative delta on every move, so intermediate pointer events never
//! accumulate rounding drift and nothing touches the history log until
//! pointer-up commits a single edit.

use crate::annotation::{Annotation, AnnotationData, AnnotationId, Point, Shape};
use crate::geometry::{bounding_box, handle_at, hit_test, resized, translated, ResizeHandle};
use crate::tool::{
    Tool, INITIALS_BOX, SIGNATURE_BOX, STAMP_BOX, STAMP_FONT_SIZE, STAMP_OFFSET,
};

/// Toolbar state an interaction reads but never owns
#[derive(Debug, Clone, Copy)]
pub struct ToolContext<'a> {
    pub tool: Tool,
    pub color: &'a str,
    pub stroke_width: f32,
    pub font_size: f32,
    pub active_stamp: &'a str,
    pub signature_data: Option<&'a str>,
    pub initials_data: Option<&'a str>,
}

/// Edit produced by releasing the pointer
#[derive(Debug, Clone, PartialEq)]
pub enum PointerCommit {
    /// A newly drawn annotation, ready for the history engine to mint an id
    Add(AnnotationData),
    /// A moved or resized annotation, replacing its committed version
    Update(Annotation),
}

/// Edit produced by a click (click-placed tools and text entry)
#[derive(Debug, Clone, PartialEq)]
pub enum ClickAction {
    /// A fixed-size annotation placed at the click point
    Add(AnnotationData),
    /// The host should open a text editor anchored at this point
    BeginTextEntry(Point),
}

/// Pointer cursor the host should display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStyle {
    Default,
    Crosshair,
    Text,
    Move,
    Grab,
    Grabbing,
    NwseResize,
    NeswResize,
    NsResize,
    EwResize,
}

#[derive(Debug, Clone)]
enum Mode {
    Idle,
    Drawing {
        start: Point,
    },
    Moving {
        start: Point,
        original: Annotation,
    },
    Resizing {
        start: Point,
        handle: ResizeHandle,
        original: Annotation,
    },
}

/// Per-document interaction state
///
/// The viewer feeds it page-space pointer events together with the
/// committed annotations of the page under the pointer; it hands back
/// commits and keeps the uncommitted draft for overlay rendering.
#[derive(Debug)]
pub struct InteractionState {
    mode: Mode,
    draft: Option<AnnotationData>,
    preview: Option<Annotation>,
    selected: Option<AnnotationId>,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self { mode: Mode::Idle, draft: None, preview: None, selected: None }
    }
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the selected annotation, if any
    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn set_selected(&mut self, id: Option<AnnotationId>) {
        self.selected = id;
    }

    /// In-progress drawing, for overlay rendering
    pub fn draft(&self) -> Option<&AnnotationData> {
        self.draft.as_ref()
    }

    /// Moved/resized annotation as it would commit right now
    pub fn preview(&self) -> Option<&Annotation> {
        self.preview.as_ref()
    }

    /// Begin an interaction
    ///
    /// With the select tool the hit order is: resize handle of the
    /// current selection, body of the current selection, then the page's
    /// annotations scanned top-most first; a body hit selects and starts
    /// a move in the same gesture. Drawing tools seed a draft shape.
    /// Click-placed tools, pan, and the reserved eraser do nothing here.
    pub fn pointer_down(
        &mut self,
        point: Point,
        ctx: &ToolContext,
        page_annotations: &[Annotation],
        zoom: f32,
    ) {
        match ctx.tool {
            Tool::Select => self.begin_select(point, page_annotations, zoom),
            tool if tool.is_freehand() => {
                self.draft = Some(AnnotationData {
                    color: ctx.color.to_string(),
                    stroke_width: ctx.stroke_width,
                    shape: stroke_shape(tool, vec![point]),
                });
                self.mode = Mode::Drawing { start: point };
            }
            Tool::Rectangle => {
                self.draft = Some(AnnotationData {
                    color: ctx.color.to_string(),
                    stroke_width: ctx.stroke_width,
                    shape: Shape::Rectangle { x: point.x, y: point.y, width: 0.0, height: 0.0 },
                });
                self.mode = Mode::Drawing { start: point };
            }
            Tool::Circle => {
                self.draft = Some(AnnotationData {
                    color: ctx.color.to_string(),
                    stroke_width: ctx.stroke_width,
                    shape: Shape::Circle { cx: point.x, cy: point.y, rx: 0.0, ry: 0.0 },
                });
                self.mode = Mode::Drawing { start: point };
            }
            _ => {}
        }
    }

    fn begin_select(&mut self, point: Point, page_annotations: &[Annotation], zoom: f32) {
        if let Some(current) = self
            .selected
            .as_ref()
            .and_then(|id| page_annotations.iter().find(|a| &a.id == id))
        {
            if let Some(handle) = bounding_box(current).and_then(|b| handle_at(point, &b, zoom)) {
                self.mode = Mode::Resizing { start: point, handle, original: current.clone() };
                return;
            }
            if hit_test(point, current, zoom) {
                self.mode = Mode::Moving { start: point, original: current.clone() };
                return;
            }
        }

        // Later annotations draw on top, so scan back to front.
        if let Some(hit) = page_annotations.iter().rev().find(|a| hit_test(point, a, zoom)) {
            self.selected = Some(hit.id.clone());
            self.mode = Mode::Moving { start: point, original: hit.clone() };
        } else {
            self.selected = None;
        }
    }

    /// Advance the in-flight interaction to a new pointer position
    pub fn pointer_move(&mut self, point: Point) {
        match &self.mode {
            Mode::Idle => {}
            Mode::Drawing { start } => {
                let start = *start;
                if let Some(draft) = self.draft.as_mut() {
                    grow_draft(&mut draft.shape, start, point);
                }
            }
            Mode::Moving { start, original } => {
                self.preview = Some(translated(original, point.x - start.x, point.y - start.y));
            }
            Mode::Resizing { start, handle, original } => {
                self.preview =
                    Some(resized(original, *handle, point.x - start.x, point.y - start.y));
            }
        }
    }

    /// End the interaction, yielding the edit to commit (if any)
    ///
    /// A drawing commits whatever draft exists, including a single-point
    /// tap. A move or resize that never saw a pointer-move yields
    /// nothing.
    pub fn pointer_up(&mut self) -> Option<PointerCommit> {
        let mode = std::mem::replace(&mut self.mode, Mode::Idle);
        let draft = self.draft.take();
        let preview = self.preview.take();

        match mode {
            Mode::Drawing { .. } => draft.map(PointerCommit::Add),
            Mode::Moving { .. } | Mode::Resizing { .. } => preview.map(PointerCommit::Update),
            Mode::Idle => None,
        }
    }

    /// Handle a click for tools that place on click
    ///
    /// The stamp box is placed at a fixed offset from the click and
    /// carries a local timestamp; signature and initials boxes center on
    /// the click and need a captured image (no-op without one). The text
    /// tool asks the host to open an editor.
    pub fn click(&mut self, point: Point, ctx: &ToolContext) -> Option<ClickAction> {
        match ctx.tool {
            Tool::Text => Some(ClickAction::BeginTextEntry(point)),
            Tool::Stamp => {
                let (w, h) = STAMP_BOX;
                Some(ClickAction::Add(AnnotationData {
                    color: ctx.color.to_string(),
                    stroke_width: ctx.stroke_width,
                    shape: Shape::Stamp {
                        x: point.x - STAMP_OFFSET.0,
                        y: point.y - STAMP_OFFSET.1,
                        width: w,
                        height: h,
                        text: ctx.active_stamp.to_string(),
                        font_size: STAMP_FONT_SIZE,
                        timestamp: Some(
                            chrono::Local::now().format("%Y-%m-%d %H:%M").to_string(),
                        ),
                    },
                }))
            }
            Tool::Signature => {
                let image_data = ctx.signature_data?.to_string();
                let (w, h) = SIGNATURE_BOX;
                Some(ClickAction::Add(AnnotationData {
                    color: ctx.color.to_string(),
                    stroke_width: ctx.stroke_width,
                    shape: Shape::Signature {
                        x: point.x - w / 2.0,
                        y: point.y - h / 2.0,
                        width: w,
                        height: h,
                        image_data,
                    },
                }))
            }
            Tool::Initials => {
                let image_data = ctx.initials_data?.to_string();
                let (w, h) = INITIALS_BOX;
                Some(ClickAction::Add(AnnotationData {
                    color: ctx.color.to_string(),
                    stroke_width: ctx.stroke_width,
                    shape: Shape::Initials {
                        x: point.x - w / 2.0,
                        y: point.y - h / 2.0,
                        width: w,
                        height: h,
                        image_data,
                    },
                }))
            }
            _ => None,
        }
    }

    /// Finish text entry started by [`ClickAction::BeginTextEntry`]
    ///
    /// Trims the content and drops the annotation entirely when nothing
    /// is left, so an abandoned editor never commits. Width and height
    /// come from the editor's rendered box; a host that does not measure
    /// its editor may pass `None` and the height stays unset until the
    /// box is first resized.
    pub fn commit_text(
        &mut self,
        origin: Point,
        content: &str,
        width: Option<f32>,
        height: Option<f32>,
        ctx: &ToolContext,
    ) -> Option<AnnotationData> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        Some(AnnotationData {
            color: ctx.color.to_string(),
            stroke_width: ctx.stroke_width,
            shape: Shape::Text {
                x: origin.x,
                y: origin.y,
                width: width.unwrap_or(200.0).max(50.0),
                height,
                content: content.to_string(),
                font_size: ctx.font_size,
            },
        })
    }

    /// Resize handle under the pointer while idle, for the cursor
    pub fn hover_handle(
        &self,
        point: Point,
        page_annotations: &[Annotation],
        zoom: f32,
    ) -> Option<ResizeHandle> {
        if !matches!(self.mode, Mode::Idle) {
            return None;
        }
        let selected = self
            .selected
            .as_ref()
            .and_then(|id| page_annotations.iter().find(|a| &a.id == id))?;
        bounding_box(selected).and_then(|b| handle_at(point, &b, zoom))
    }

    /// Cursor for the current tool, mode, and hover state
    pub fn cursor(&self, ctx: &ToolContext, hover: Option<ResizeHandle>) -> CursorStyle {
        match self.mode {
            Mode::Moving { .. } => return CursorStyle::Grabbing,
            Mode::Resizing { handle, .. } => return handle_cursor(handle),
            _ => {}
        }
        if let Some(handle) = hover {
            return handle_cursor(handle);
        }
        match ctx.tool {
            Tool::Pan => CursorStyle::Grab,
            Tool::Text => CursorStyle::Text,
            Tool::Select => {
                if self.selected.is_some() {
                    CursorStyle::Move
                } else {
                    CursorStyle::Default
                }
            }
            Tool::Eraser => CursorStyle::Default,
            _ => CursorStyle::Crosshair,
        }
    }
}

fn stroke_shape(tool: Tool, points: Vec<Point>) -> Shape {
    match tool {
        Tool::Pen => Shape::Pen { points },
        Tool::Highlighter => Shape::Highlighter { points },
        Tool::Underline => Shape::Underline { points },
        Tool::Strikethrough => Shape::Strikethrough { points },
        Tool::Squiggly => Shape::Squiggly { points },
        _ => unreachable!("not a freehand tool"),
    }
}

fn grow_draft(shape: &mut Shape, start: Point, point: Point) {
    match shape {
        Shape::Pen { points }
        | Shape::Highlighter { points }
        | Shape::Underline { points }
        | Shape::Strikethrough { points }
        | Shape::Squiggly { points } => points.push(point),
        Shape::Rectangle { x, y, width, height } => {
            *x = start.x.min(point.x);
            *y = start.y.min(point.y);
            *width = (point.x - start.x).abs();
            *height = (point.y - start.y).abs();
        }
        Shape::Circle { cx, cy, rx, ry } => {
            *cx = (start.x + point.x) / 2.0;
            *cy = (start.y + point.y) / 2.0;
            *rx = (point.x - start.x).abs() / 2.0;
            *ry = (point.y - start.y).abs() / 2.0;
        }
        _ => {}
    }
}

fn handle_cursor(handle: ResizeHandle) -> CursorStyle {
    match handle {
        ResizeHandle::TopLeft | ResizeHandle::BottomRight => CursorStyle::NwseResize,
        ResizeHandle::TopRight | ResizeHandle::BottomLeft => CursorStyle::NeswResize,
        ResizeHandle::Top | ResizeHandle::Bottom => CursorStyle::NsResize,
        ResizeHandle::Left | ResizeHandle::Right => CursorStyle::EwResize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{DEFAULT_COLOR, DEFAULT_FONT_SIZE, DEFAULT_STROKE_WIDTH};

    fn ctx(tool: Tool) -> ToolContext<'static> {
        ToolContext {
            tool,
            color: DEFAULT_COLOR,
            stroke_width: DEFAULT_STROKE_WIDTH,
            font_size: DEFAULT_FONT_SIZE,
            active_stamp: "APPROVED",
            signature_data: None,
            initials_data: None,
        }
    }

    fn committed(shape: Shape) -> Annotation {
        Annotation {
            id: "fixed".to_string(),
            page: 1,
            color: DEFAULT_COLOR.to_string(),
            stroke_width: DEFAULT_STROKE_WIDTH,
            shape,
        }
    }

    #[test]
    fn test_pen_drag_collects_points() {
        let mut state = InteractionState::new();
        let ctx = ctx(Tool::Pen);
        state.pointer_down(Point::new(0.0, 0.0), &ctx, &[], 1.0);
        state.pointer_move(Point::new(5.0, 5.0));
        state.pointer_move(Point::new(10.0, 0.0));

        match state.pointer_up() {
            Some(PointerCommit::Add(data)) => {
                assert_eq!(
                    data.shape,
                    Shape::Pen {
                        points: vec![
                            Point::new(0.0, 0.0),
                            Point::new(5.0, 5.0),
                            Point::new(10.0, 0.0),
                        ],
                    }
                );
                assert_eq!(data.color, DEFAULT_COLOR);
            }
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn test_pen_tap_commits_single_point_stroke() {
        let mut state = InteractionState::new();
        state.pointer_down(Point::new(3.0, 3.0), &ctx(Tool::Pen), &[], 1.0);

        match state.pointer_up() {
            Some(PointerCommit::Add(data)) => {
                assert_eq!(data.shape, Shape::Pen { points: vec![Point::new(3.0, 3.0)] });
            }
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn test_rectangle_drag_normalizes_up_left() {
        let mut state = InteractionState::new();
        state.pointer_down(Point::new(100.0, 80.0), &ctx(Tool::Rectangle), &[], 1.0);
        state.pointer_move(Point::new(40.0, 30.0));

        match state.pointer_up() {
            Some(PointerCommit::Add(data)) => assert_eq!(
                data.shape,
                Shape::Rectangle { x: 40.0, y: 30.0, width: 60.0, height: 50.0 }
            ),
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn test_circle_drag_uses_midpoint_center() {
        let mut state = InteractionState::new();
        state.pointer_down(Point::new(10.0, 10.0), &ctx(Tool::Circle), &[], 1.0);
        state.pointer_move(Point::new(50.0, 30.0));

        match state.pointer_up() {
            Some(PointerCommit::Add(data)) => assert_eq!(
                data.shape,
                Shape::Circle { cx: 30.0, cy: 20.0, rx: 20.0, ry: 10.0 }
            ),
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn test_undragged_shape_still_commits() {
        let mut state = InteractionState::new();
        state.pointer_down(Point::new(10.0, 10.0), &ctx(Tool::Rectangle), &[], 1.0);

        match state.pointer_up() {
            Some(PointerCommit::Add(data)) => assert_eq!(
                data.shape,
                Shape::Rectangle { x: 10.0, y: 10.0, width: 0.0, height: 0.0 }
            ),
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn test_select_and_move_uses_cumulative_delta() {
        let target = committed(Shape::Pen {
            points: vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0), Point::new(10.0, 0.0)],
        });
        let page = vec![target.clone()];
        let mut state = InteractionState::new();
        let ctx = ctx(Tool::Select);

        state.pointer_down(Point::new(5.0, 2.0), &ctx, &page, 1.0);
        assert_eq!(state.selected_id(), Some("fixed"));

        // Intermediate positions must not accumulate; only the total matters.
        state.pointer_move(Point::new(6.0, 2.5));
        state.pointer_move(Point::new(7.0, 5.0));

        match state.pointer_up() {
            Some(PointerCommit::Update(updated)) => {
                assert_eq!(updated.id, "fixed");
                assert_eq!(
                    updated.shape.points().unwrap(),
                    &[Point::new(2.0, 3.0), Point::new(7.0, 8.0), Point::new(12.0, 3.0)],
                );
            }
            other => panic!("expected Update, got {other:?}"),
        }
    }

    #[test]
    fn test_select_prefers_topmost_annotation() {
        let bottom = Annotation { id: "bottom".to_string(), ..committed(Shape::Rectangle { x: 0.0, y: 0.0, width: 50.0, height: 50.0 }) };
        let top = Annotation { id: "top".to_string(), ..committed(Shape::Rectangle { x: 10.0, y: 10.0, width: 50.0, height: 50.0 }) };
        let page = vec![bottom, top];

        let mut state = InteractionState::new();
        state.pointer_down(Point::new(30.0, 30.0), &ctx(Tool::Select), &page, 1.0);
        assert_eq!(state.selected_id(), Some("top"));
    }

    #[test]
    fn test_click_on_empty_space_clears_selection() {
        let page = vec![committed(Shape::Rectangle { x: 0.0, y: 0.0, width: 20.0, height: 20.0 })];
        let mut state = InteractionState::new();
        let ctx = ctx(Tool::Select);

        state.pointer_down(Point::new(10.0, 10.0), &ctx, &page, 1.0);
        assert!(state.selected_id().is_some());
        state.pointer_up();

        state.pointer_down(Point::new(300.0, 300.0), &ctx, &page, 1.0);
        assert_eq!(state.selected_id(), None);
    }

    #[test]
    fn test_resize_via_handle_on_selection() {
        let target = committed(Shape::Rectangle { x: 10.0, y: 10.0, width: 100.0, height: 50.0 });
        let page = vec![target];
        let mut state = InteractionState::new();
        let ctx = ctx(Tool::Select);

        // Select first, then grab the bottom-right corner.
        state.pointer_down(Point::new(50.0, 30.0), &ctx, &page, 1.0);
        state.pointer_up();
        state.pointer_down(Point::new(110.0, 60.0), &ctx, &page, 1.0);
        state.pointer_move(Point::new(130.0, 70.0));

        match state.pointer_up() {
            Some(PointerCommit::Update(updated)) => assert_eq!(
                updated.shape,
                Shape::Rectangle { x: 10.0, y: 10.0, width: 120.0, height: 60.0 }
            ),
            other => panic!("expected Update, got {other:?}"),
        }
    }

    #[test]
    fn test_move_without_motion_commits_nothing() {
        let page = vec![committed(Shape::Rectangle { x: 0.0, y: 0.0, width: 20.0, height: 20.0 })];
        let mut state = InteractionState::new();
        state.pointer_down(Point::new(10.0, 10.0), &ctx(Tool::Select), &page, 1.0);
        assert_eq!(state.pointer_up(), None);
    }

    #[test]
    fn test_stamp_click_centers_box_and_stamps_time() {
        let mut state = InteractionState::new();
        match state.click(Point::new(200.0, 150.0), &ctx(Tool::Stamp)) {
            Some(ClickAction::Add(data)) => match data.shape {
                Shape::Stamp { x, y, width, height, text, font_size, timestamp } => {
                    assert_eq!((x, y, width, height), (130.0, 125.0, 140.0, 55.0));
                    assert_eq!(text, "APPROVED");
                    assert_eq!(font_size, 18.0);
                    assert!(timestamp.is_some());
                }
                other => panic!("expected Stamp, got {other:?}"),
            },
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn test_signature_click_requires_captured_image() {
        let mut state = InteractionState::new();
        assert_eq!(state.click(Point::new(50.0, 50.0), &ctx(Tool::Signature)), None);

        let mut with_image = ctx(Tool::Signature);
        with_image.signature_data = Some("data:image/png;base64,AAAA");
        match state.click(Point::new(100.0, 100.0), &with_image) {
            Some(ClickAction::Add(data)) => match data.shape {
                Shape::Signature { x, y, width, height, .. } => {
                    assert_eq!((x, y, width, height), (25.0, 62.5, 150.0, 75.0));
                }
                other => panic!("expected Signature, got {other:?}"),
            },
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn test_text_click_begins_entry_and_commit_trims() {
        let mut state = InteractionState::new();
        let ctx = ctx(Tool::Text);
        let origin = match state.click(Point::new(40.0, 60.0), &ctx) {
            Some(ClickAction::BeginTextEntry(p)) => p,
            other => panic!("expected BeginTextEntry, got {other:?}"),
        };

        assert_eq!(state.commit_text(origin, "   ", None, None, &ctx), None);

        let data = state.commit_text(origin, "  note  ", None, None, &ctx).unwrap();
        match data.shape {
            Shape::Text { x, y, content, font_size, height, .. } => {
                assert_eq!((x, y), (40.0, 60.0));
                assert_eq!(content, "note");
                assert_eq!(font_size, DEFAULT_FONT_SIZE);
                assert_eq!(height, None);
            }
            other => panic!("expected Text, got {other:?}"),
        }
    }

    #[test]
    fn test_commit_text_stores_editor_box() {
        let mut state = InteractionState::new();
        let ctx = ctx(Tool::Text);
        let data = state
            .commit_text(Point::new(10.0, 20.0), "note", Some(180.0), Some(48.0), &ctx)
            .unwrap();
        match data.shape {
            Shape::Text { width, height, .. } => {
                assert_eq!(width, 180.0);
                assert_eq!(height, Some(48.0));
            }
            other => panic!("expected Text, got {other:?}"),
        }
    }

    #[test]
    fn test_eraser_and_pan_ignore_pointer_input() {
        let page = vec![committed(Shape::Rectangle { x: 0.0, y: 0.0, width: 20.0, height: 20.0 })];
        for tool in [Tool::Eraser, Tool::Pan] {
            let mut state = InteractionState::new();
            state.pointer_down(Point::new(10.0, 10.0), &ctx(tool), &page, 1.0);
            state.pointer_move(Point::new(15.0, 15.0));
            assert_eq!(state.pointer_up(), None);
            assert_eq!(state.selected_id(), None);
        }
    }

    #[test]
    fn test_cursor_reflects_tool_and_mode() {
        let page = vec![committed(Shape::Rectangle { x: 0.0, y: 0.0, width: 20.0, height: 20.0 })];
        let mut state = InteractionState::new();

        assert_eq!(state.cursor(&ctx(Tool::Pen), None), CursorStyle::Crosshair);
        assert_eq!(state.cursor(&ctx(Tool::Pan), None), CursorStyle::Grab);
        assert_eq!(state.cursor(&ctx(Tool::Text), None), CursorStyle::Text);

        state.pointer_down(Point::new(10.0, 10.0), &ctx(Tool::Select), &page, 1.0);
        assert_eq!(state.cursor(&ctx(Tool::Select), None), CursorStyle::Grabbing);
        state.pointer_up();

        let hover = state.hover_handle(Point::new(20.0, 20.0), &page, 1.0);
        assert_eq!(hover, Some(ResizeHandle::BottomRight));
        assert_eq!(state.cursor(&ctx(Tool::Select), hover), CursorStyle::NwseResize);
    }
}
