//! Core annotation engine: data model, geometry, history, and interaction.
//!
//! Everything in this crate works in unscaled page space (top-left origin,
//! y increasing downward) and is independent of any rendering backend.
//! The export crate is responsible for translating into PDF space.

pub mod annotation;
pub mod geometry;
pub mod history;
pub mod interaction;
pub mod tool;

pub use annotation::{
    find_annotation, Annotation, AnnotationData, AnnotationId, Annotations, Point, Shape,
};
pub use geometry::{bounding_box, handle_at, hit_test, resized, translated, BoundingBox, ResizeHandle};
pub use history::{AnnotationHistory, HistoryState};
pub use interaction::{ClickAction, CursorStyle, InteractionState, PointerCommit, ToolContext};
pub use tool::Tool;
