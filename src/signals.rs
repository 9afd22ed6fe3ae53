//! Browser-level signals and the keyboard shortcut classification table

use serde::{Deserialize, Serialize};

use crate::violation::ViolationKind;

/// One key-down with its modifier state, as delivered by the signal source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPress {
    /// Key value as the browser reports it (`"c"`, `"F12"`, `"Escape"`, ...).
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl KeyPress {
    pub fn plain(key: &str) -> Self {
        KeyPress {
            key: key.to_string(),
            ctrl: false,
            alt: false,
            shift: false,
            meta: false,
        }
    }

    pub fn ctrl(key: &str) -> Self {
        KeyPress {
            ctrl: true,
            ..KeyPress::plain(key)
        }
    }

    pub fn ctrl_shift(key: &str) -> Self {
        KeyPress {
            ctrl: true,
            shift: true,
            ..KeyPress::plain(key)
        }
    }

    pub fn meta(key: &str) -> Self {
        KeyPress {
            meta: true,
            ..KeyPress::plain(key)
        }
    }

    /// Ctrl and Cmd are interchangeable for every tracked shortcut.
    fn has_primary_modifier(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// The signal surface the monitor observes. Everything not listed here is
/// invisible to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BrowserSignal {
    KeyDown(KeyPress),
    KeyUp,
    Copy,
    Cut,
    Paste,
    ContextMenu,
    BeforeUnload,
    VisibilityChange {
        hidden: bool,
        visibility_state: String,
    },
    Blur,
    Focus,
    MouseMove,
    Scroll,
    Click,
    TouchStart,
}

/// A key-down that matched one of the tracked shortcut patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutMatch {
    pub kind: ViolationKind,
    /// Goes into the violation's `key` detail: the formatted combo label for
    /// the letter shortcuts, the raw key value for dev-tools and refresh.
    pub key_label: String,
}

/// Classify a key-down against the tracked shortcut patterns.
///
/// Patterns are checked in a fixed order and the first match wins, so
/// Ctrl+Shift+C lands on the copy rule (which ignores Shift) rather than the
/// dev-tools rule. A key-down matching nothing is an activity signal only.
pub fn classify_shortcut(press: &KeyPress) -> Option<ShortcutMatch> {
    let key = press.key.to_lowercase();
    let primary = press.has_primary_modifier();

    let combo = |kind: ViolationKind, label: &str| {
        Some(ShortcutMatch {
            kind,
            key_label: label.to_string(),
        })
    };

    if primary && key == "c" {
        return combo(ViolationKind::CopyShortcutBlocked, "Ctrl+C");
    }
    if primary && key == "v" {
        return combo(ViolationKind::PasteShortcutBlocked, "Ctrl+V");
    }
    if primary && key == "x" {
        return combo(ViolationKind::CutShortcutBlocked, "Ctrl+X");
    }
    if primary && key == "a" {
        return combo(ViolationKind::SelectAllBlocked, "Ctrl+A");
    }
    if primary && key == "p" {
        return combo(ViolationKind::PrintBlocked, "Ctrl+P");
    }
    if (primary && press.shift && matches!(key.as_str(), "i" | "j" | "c")) || key == "f12" {
        return Some(ShortcutMatch {
            kind: ViolationKind::DevToolsBlocked,
            key_label: press.key.clone(),
        });
    }
    if (primary && key == "r") || key == "f5" {
        return Some(ShortcutMatch {
            kind: ViolationKind::RefreshBlocked,
            key_label: press.key.clone(),
        });
    }

    None
}
