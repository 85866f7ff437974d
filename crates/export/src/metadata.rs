//! History round-trip through the Info dictionary
//!
//! The full undo/redo log rides along inside the exported PDF as the
//! Keywords entry of the Info dictionary: a fixed prefix followed by the
//! JSON-serialized history state. A Keywords value without the prefix
//! belongs to some other producer and is left untouched on read. When
//! the serialized log would blow past the size ceiling, only the current
//! snapshot is persisted as a single-entry log.

use log::warn;
use lopdf::{Dictionary, Document, Object, ObjectId};
use redline_core::{Annotations, HistoryState};

use crate::ExportError;

/// Marker prefix for history payloads in the Keywords slot
pub const METADATA_PREFIX: &str = "REDLINE_ANNOTATIONS:";

/// Ceiling on the serialized history, in characters
pub const METADATA_MAX_CHARS: usize = 32000;

/// Serialize a history log for embedding, degrading to the current
/// snapshot when the full log is oversized
pub fn encode_history(state: &HistoryState) -> Result<String, ExportError> {
    let full = serde_json::to_string(state)?;
    if full.len() <= METADATA_MAX_CHARS {
        return Ok(full);
    }

    warn!(
        "history metadata is {} chars (ceiling {METADATA_MAX_CHARS}); persisting current snapshot only",
        full.len(),
    );
    // Caller-supplied states may carry an out-of-range index.
    let snapshot = state
        .history
        .get(state.index.min(state.history.len().saturating_sub(1)))
        .cloned()
        .unwrap_or_default();
    let fallback = HistoryState { history: vec![snapshot], index: 0 };
    Ok(serde_json::to_string(&fallback)?)
}

/// Write the history log into the document's Keywords metadata
pub fn write_history(doc: &mut Document, state: &HistoryState) -> Result<(), ExportError> {
    let payload = format!("{METADATA_PREFIX}{}", encode_history(state)?);
    let info_id = info_dict_id(doc);
    let info = doc
        .get_object_mut(info_id)
        .and_then(Object::as_dict_mut)
        .map_err(ExportError::Pdf)?;
    info.set("Keywords", Object::string_literal(payload));
    Ok(())
}

/// Recover an embedded history log, if the document carries one
///
/// Foreign Keywords values (no prefix) and malformed payloads both yield
/// `None`; malformed payloads are logged since they indicate a truncated
/// or hand-edited document.
pub fn read_history(doc: &Document) -> Option<HistoryState> {
    let keywords = read_keywords(doc)?;
    let payload = keywords.strip_prefix(METADATA_PREFIX)?;
    match serde_json::from_str::<HistoryState>(payload) {
        Ok(state) if !state.history.is_empty() => Some(state),
        Ok(_) => None,
        Err(err) => {
            warn!("ignoring malformed annotation metadata: {err}");
            None
        }
    }
}

/// Convenience: the current annotation snapshot of an embedded log
pub fn read_annotations(doc: &Document) -> Option<Annotations> {
    let state = read_history(doc)?;
    state.history.get(state.index.min(state.history.len() - 1)).cloned()
}

fn read_keywords(doc: &Document) -> Option<String> {
    let info = match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };
    match info.get(b"Keywords").ok()? {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Object id of the Info dictionary, creating it when absent
fn info_dict_id(doc: &mut Document) -> ObjectId {
    if let Ok(Object::Reference(id)) = doc.trailer.get(b"Info").map(Object::to_owned) {
        if doc
            .get_object(id)
            .ok()
            .and_then(|obj| obj.as_dict().ok())
            .is_some()
        {
            return id;
        }
    }

    let id = doc.add_object(Dictionary::new());
    doc.trailer.set("Info", id);
    id
}
