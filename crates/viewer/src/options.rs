//! Viewer configuration and host-facing payloads

use serde::{Deserialize, Serialize};

use redline_core::{Annotations, HistoryState};

/// Options for opening a document
///
/// When both seeds are present the history state wins: it contains
/// strictly more information than a bare annotation map.
#[derive(Debug, Clone, Default)]
pub struct ViewerOptions {
    /// Display name used for save payloads
    pub file_name: Option<String>,
    /// Suppress every mutating entry point
    pub readonly: bool,
    /// Seed the full undo/redo log
    pub initial_history: Option<HistoryState>,
    /// Seed annotations with no undo past them
    pub initial_annotations: Option<Annotations>,
}

/// Snapshot handed to hosts by `get_annotation_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationExport {
    pub annotations: Annotations,
    pub history_state: HistoryState,
}

/// Export payload passed to save/print callbacks
#[derive(Debug, Clone)]
pub struct ExportPayload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Ephemeral handle to exported document bytes
///
/// Stands in for an object URL: the host hands it to whatever consumes
/// the bytes and calls [`release`](DocumentUrl::release) when done.
#[derive(Debug)]
pub struct DocumentUrl {
    bytes: Vec<u8>,
}

impl DocumentUrl {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn mime(&self) -> &'static str {
        "application/pdf"
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Drop the backing bytes
    pub fn release(self) {}
}
