//! Keyboard shortcuts
//!
//! The host translates platform key events into [`KeyInput`] and feeds
//! them to the viewer. Shortcuts only exist while the viewer value is
//! alive, so closing a document detaches them automatically.

/// Keys the viewer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Delete,
    Backspace,
    Z,
    Y,
}

/// One key press, with the undo/redo modifier state
///
/// `ctrl_or_meta` covers both Ctrl and Cmd so shortcuts behave the same
/// across platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub ctrl_or_meta: bool,
}

impl KeyInput {
    pub fn plain(key: Key) -> Self {
        Self { key, ctrl_or_meta: false }
    }

    pub fn with_modifier(key: Key) -> Self {
        Self { key, ctrl_or_meta: true }
    }
}
