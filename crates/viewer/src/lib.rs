//! Viewer orchestrator
//!
//! Ties the annotation engine, interaction state machine, renderer, and
//! export translator together behind one handle. A host embeds a
//! [`Viewer`], forwards pointer and keyboard input in page space, reads
//! back rasters and overlay state, and registers callbacks for change,
//! save, and print events. Dropping the viewer tears everything down,
//! including its keyboard handling; nothing ambient survives it.

pub mod keyboard;
pub mod options;
mod viewer;

pub use keyboard::{Key, KeyInput};
pub use options::{AnnotationExport, DocumentUrl, ExportPayload, ViewerOptions};
pub use viewer::{RenderOutcome, Viewer, ViewerError};
