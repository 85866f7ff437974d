//! The viewer itself: document state, input routing, and export wiring

use std::collections::HashMap;

use log::{debug, warn};
use lopdf::Document;

use redline_core::{
    find_annotation, Annotations, AnnotationHistory, ClickAction, HistoryState, InteractionState,
    Point, PointerCommit, Tool, ToolContext,
};
use redline_core::tool::{DEFAULT_COLOR, DEFAULT_FONT_SIZE, DEFAULT_STROKE_WIDTH, STAMPS};
use redline_export::{generate_annotated_pdf, ExportError, ViewSizes};
use redline_render::{PageRenderer, RenderError, RgbaImage};
use redline_scheduler::PageRenderTasks;

use crate::keyboard::{Key, KeyInput};
use crate::options::{AnnotationExport, DocumentUrl, ExportPayload, ViewerOptions};

const MIN_ZOOM: f32 = 0.25;
const MAX_ZOOM: f32 = 4.0;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("render error: {0}")]
    Render(#[from] RenderError),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
    #[error("print failed: {0}")]
    Print(String),
}

/// Result of a page render request
///
/// `Cancelled` means the request was superseded before it finished; the
/// previous raster (if any) stays current and nothing is wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered,
    Cancelled,
    Failed,
}

/// Expands to a field-level borrow so `interaction` stays mutably
/// borrowable alongside the context
macro_rules! tool_context {
    ($viewer:expr) => {
        ToolContext {
            tool: $viewer.tool,
            color: &$viewer.color,
            stroke_width: $viewer.stroke_width,
            font_size: $viewer.font_size,
            active_stamp: &$viewer.active_stamp,
            signature_data: $viewer.signature_data.as_deref(),
            initials_data: $viewer.initials_data.as_deref(),
        }
    };
}

type ChangeCallback = Box<dyn FnMut(&Annotations)>;
type ExportCallback = Box<dyn FnMut(&ExportPayload)>;

/// One open document with its annotation state
pub struct Viewer<R: PageRenderer> {
    renderer: R,
    source: Vec<u8>,
    file_name: String,
    readonly: bool,

    history: AnnotationHistory,
    interaction: InteractionState,

    tool: Tool,
    color: String,
    stroke_width: f32,
    font_size: f32,
    active_stamp: String,
    signature_data: Option<String>,
    initials_data: Option<String>,

    zoom: f32,
    current_page: u32,
    page_count: u32,
    active_page: u32,
    pending_text: Option<(u32, Point)>,

    render_tasks: PageRenderTasks,
    rasters: HashMap<u32, RgbaImage>,

    on_change: Option<ChangeCallback>,
    on_save: Option<ExportCallback>,
    on_print: Option<ExportCallback>,
}

impl<R: PageRenderer> Viewer<R> {
    /// Open a document
    ///
    /// The renderer must be bound to the same bytes. The history seed is
    /// chosen by priority: explicit history, explicit annotations, a log
    /// embedded in the document's metadata by a previous export, else
    /// empty.
    pub fn open(source: Vec<u8>, options: ViewerOptions, renderer: R) -> Self {
        let history = if let Some(state) = options.initial_history {
            AnnotationHistory::from_state(state)
        } else if let Some(annotations) = options.initial_annotations {
            AnnotationHistory::from_annotations(annotations)
        } else if let Some(state) = read_embedded_history(&source) {
            debug!("restored embedded annotation history ({} snapshots)", state.history.len());
            AnnotationHistory::from_state(state)
        } else {
            AnnotationHistory::new()
        };

        let page_count = renderer.page_count();
        Self {
            renderer,
            source,
            file_name: options.file_name.unwrap_or_else(|| "document.pdf".to_string()),
            readonly: options.readonly,
            history,
            interaction: InteractionState::new(),
            tool: Tool::Select,
            color: DEFAULT_COLOR.to_string(),
            stroke_width: DEFAULT_STROKE_WIDTH,
            font_size: DEFAULT_FONT_SIZE,
            active_stamp: STAMPS[0].to_string(),
            signature_data: None,
            initials_data: None,
            zoom: 1.0,
            current_page: 1,
            page_count,
            active_page: 1,
            pending_text: None,
            render_tasks: PageRenderTasks::new(),
            rasters: HashMap::new(),
            on_change: None,
            on_save: None,
            on_print: None,
        }
    }

    // --- accessors -------------------------------------------------------

    pub fn annotations(&self) -> &Annotations {
        self.history.annotations()
    }

    pub fn history_state(&self) -> &HistoryState {
        self.history.history_state()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.interaction.selected_id()
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn readonly(&self) -> bool {
        self.readonly
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Where the host should show the text editor, if one is pending
    pub fn pending_text(&self) -> Option<(u32, Point)> {
        self.pending_text
    }

    // --- toolbar ---------------------------------------------------------

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
        if tool != Tool::Select {
            self.interaction.set_selected(None);
        }
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    pub fn set_stroke_width(&mut self, width: f32) {
        self.stroke_width = width.max(0.1);
    }

    pub fn set_font_size(&mut self, size: f32) {
        self.font_size = size.max(1.0);
    }

    pub fn set_active_stamp(&mut self, stamp: impl Into<String>) {
        self.active_stamp = stamp.into();
    }

    pub fn set_signature_data(&mut self, data: Option<String>) {
        self.signature_data = data;
    }

    pub fn set_initials_data(&mut self, data: Option<String>) {
        self.initials_data = data;
    }

    // --- callbacks -------------------------------------------------------

    pub fn on_change(&mut self, callback: impl FnMut(&Annotations) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    pub fn on_save(&mut self, callback: impl FnMut(&ExportPayload) + 'static) {
        self.on_save = Some(Box::new(callback));
    }

    pub fn on_print(&mut self, callback: impl FnMut(&ExportPayload) + 'static) {
        self.on_print = Some(Box::new(callback));
    }

    // --- pointer and keyboard input --------------------------------------

    pub fn pointer_down(&mut self, page: u32, point: Point) {
        if self.readonly {
            return;
        }
        self.active_page = page;
        let page_annotations =
            self.history.annotations().get(&page).cloned().unwrap_or_default();
        let ctx = tool_context!(self);
        self.interaction.pointer_down(point, &ctx, &page_annotations, self.zoom);
    }

    pub fn pointer_move(&mut self, point: Point) {
        if self.readonly {
            return;
        }
        self.interaction.pointer_move(point);
    }

    pub fn pointer_up(&mut self) {
        if self.readonly {
            return;
        }
        let changed = match self.interaction.pointer_up() {
            Some(PointerCommit::Add(data)) => {
                self.history.add_annotation(self.active_page, data);
                true
            }
            Some(PointerCommit::Update(annotation)) => self.history.update_annotation(annotation),
            None => false,
        };
        if changed {
            self.emit_change();
        }
    }

    pub fn click(&mut self, page: u32, point: Point) {
        if self.readonly {
            return;
        }
        let ctx = tool_context!(self);
        match self.interaction.click(point, &ctx) {
            Some(ClickAction::Add(data)) => {
                self.history.add_annotation(page, data);
                self.emit_change();
            }
            Some(ClickAction::BeginTextEntry(origin)) => {
                self.pending_text = Some((page, origin));
            }
            None => {}
        }
    }

    /// Finish the pending text entry
    ///
    /// `width` and `height` are the editor's rendered box in page units.
    /// Empty (after trimming) content abandons the entry without
    /// committing anything.
    pub fn commit_text(&mut self, content: &str, width: Option<f32>, height: Option<f32>) {
        if self.readonly {
            return;
        }
        let Some((page, origin)) = self.pending_text.take() else {
            return;
        };
        let ctx = tool_context!(self);
        if let Some(data) = self.interaction.commit_text(origin, content, width, height, &ctx) {
            self.history.add_annotation(page, data);
            self.emit_change();
        }
    }

    pub fn cancel_text(&mut self) {
        self.pending_text = None;
    }

    /// Delete the selected annotation, wherever it lives
    ///
    /// Pages are scanned in ascending order and the first id match wins.
    pub fn delete_selected(&mut self) {
        if self.readonly {
            return;
        }
        let Some(id) = self.interaction.selected_id().map(str::to_string) else {
            return;
        };
        let Some(page) = find_annotation(self.history.annotations(), &id).map(|a| a.page) else {
            self.interaction.set_selected(None);
            return;
        };
        if self.history.delete_annotation(page, &id) {
            self.interaction.set_selected(None);
            self.emit_change();
        }
    }

    pub fn undo(&mut self) {
        if self.readonly {
            return;
        }
        if self.history.undo() {
            self.normalize_selection();
            self.emit_change();
        }
    }

    pub fn redo(&mut self) {
        if self.readonly {
            return;
        }
        if self.history.redo() {
            self.normalize_selection();
            self.emit_change();
        }
    }

    pub fn clear_annotations(&mut self) {
        if self.readonly {
            return;
        }
        if self.history.clear_annotations() {
            self.interaction.set_selected(None);
            self.emit_change();
        }
    }

    /// Route a keyboard shortcut
    ///
    /// Delete/Backspace removes the selection; Ctrl/Cmd+Z undoes and
    /// Ctrl/Cmd+Y redoes. Everything is suppressed in readonly mode.
    pub fn handle_key(&mut self, input: KeyInput) {
        if self.readonly {
            return;
        }
        match (input.key, input.ctrl_or_meta) {
            (Key::Delete, _) | (Key::Backspace, _) => self.delete_selected(),
            (Key::Z, true) => self.undo(),
            (Key::Y, true) => self.redo(),
            _ => {}
        }
    }

    // --- zoom and navigation ---------------------------------------------

    /// Set the zoom factor, clamped to the supported range
    ///
    /// In-flight renders target the old scale, so they are all cancelled.
    pub fn set_zoom(&mut self, zoom: f32) {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if (zoom - self.zoom).abs() > f32::EPSILON {
            self.zoom = zoom;
            self.render_tasks.cancel_all();
        }
    }

    pub fn go_to_page(&mut self, page: u32) {
        self.current_page = page.clamp(1, self.page_count);
    }

    // --- rendering -------------------------------------------------------

    /// Render a page at the current zoom
    ///
    /// Starting a request supersedes any in-flight request for the same
    /// page. A cancelled render leaves the previous raster in place and
    /// is not an error; real failures are logged and also keep the
    /// previous raster.
    pub fn request_page_render(&mut self, page: u32) -> RenderOutcome {
        let token = self.render_tasks.begin(page);
        match self.renderer.render_page(page, self.zoom, &token) {
            Ok(raster) => {
                self.render_tasks.finish(page, &token);
                self.rasters.insert(page, raster);
                RenderOutcome::Rendered
            }
            Err(RenderError::Cancelled) => {
                debug!("render of page {page} superseded");
                RenderOutcome::Cancelled
            }
            Err(err) => {
                warn!("render of page {page} failed: {err}");
                self.render_tasks.finish(page, &token);
                RenderOutcome::Failed
            }
        }
    }

    /// Most recent successful raster for a page
    pub fn page_raster(&self, page: u32) -> Option<&RgbaImage> {
        self.rasters.get(&page)
    }

    // --- export ----------------------------------------------------------

    /// Annotated document bytes, or `None` when export fails
    pub fn get_annotated_document(&self) -> Option<Vec<u8>> {
        match self.export() {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!("export failed: {err}");
                None
            }
        }
    }

    /// Annotated document behind an ephemeral URL-style handle
    pub fn get_annotated_document_url(&self) -> Option<DocumentUrl> {
        self.get_annotated_document().map(DocumentUrl::new)
    }

    /// Current annotations plus the full undo/redo log
    pub fn get_annotation_data(&self) -> AnnotationExport {
        AnnotationExport {
            annotations: self.history.annotations().clone(),
            history_state: self.history.history_state().clone(),
        }
    }

    /// Export and hand the payload to the save callback
    pub fn save(&mut self) -> Result<(), ViewerError> {
        let bytes = self.export()?;
        let payload = ExportPayload { file_name: self.file_name.clone(), bytes };
        if let Some(mut callback) = self.on_save.take() {
            callback(&payload);
            self.on_save = Some(callback);
        }
        Ok(())
    }

    /// Export and hand the payload to the print callback
    ///
    /// A missing handler is surfaced as an error so the host can show a
    /// notice instead of failing silently.
    pub fn print(&mut self) -> Result<(), ViewerError> {
        let bytes = self.export()?;
        let payload = ExportPayload { file_name: self.file_name.clone(), bytes };
        let Some(mut callback) = self.on_print.take() else {
            return Err(ViewerError::Print("no print handler registered".to_string()));
        };
        callback(&payload);
        self.on_print = Some(callback);
        Ok(())
    }

    fn export(&self) -> Result<Vec<u8>, ExportError> {
        generate_annotated_pdf(
            &self.source,
            self.history.annotations(),
            self.history.history_state(),
            &self.view_sizes(),
        )
    }

    /// Zoom-1 page sizes as the viewer lays pages out
    fn view_sizes(&self) -> ViewSizes {
        let mut sizes = ViewSizes::new();
        for page in 1..=self.page_count {
            if let Ok(size) = self.renderer.page_size(page) {
                sizes.insert(page, (size.width_pt, size.height_pt));
            }
        }
        sizes
    }

    fn emit_change(&mut self) {
        if let Some(mut callback) = self.on_change.take() {
            callback(self.history.annotations());
            self.on_change = Some(callback);
        }
    }

    /// Drop a selection whose annotation no longer exists (undo/redo can
    /// remove it out from under the selection)
    fn normalize_selection(&mut self) {
        if let Some(id) = self.interaction.selected_id() {
            if find_annotation(self.history.annotations(), id).is_none() {
                self.interaction.set_selected(None);
            }
        }
    }
}


fn read_embedded_history(source: &[u8]) -> Option<HistoryState> {
    match Document::load_mem(source) {
        Ok(doc) => redline_export::read_history(&doc),
        Err(err) => {
            warn!("could not inspect document metadata: {err}");
            None
        }
    }
}
