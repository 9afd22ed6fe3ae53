//! Violation records and the fixed violation-kind vocabulary
//!
//! Host dashboards and participation records key on the exact wire strings,
//! so the serialized form of [`ViolationKind`] is part of the contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Every signal the monitor classifies maps to exactly one of these kinds.
///
/// The `*_BLOCKED` names are historical: nothing is ever blocked, the action
/// goes through and only the attempt is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    CopyShortcutBlocked,
    PasteShortcutBlocked,
    CutShortcutBlocked,
    SelectAllBlocked,
    PrintBlocked,
    DevToolsBlocked,
    RefreshBlocked,
    CopyEventBlocked,
    CutEventBlocked,
    PasteEventBlocked,
    ContextMenuBlocked,
    WindowCloseAttempt,
    TabSwitchDetected,
    WindowBlurDetected,
    DevToolsDetected,
    MaxViolationsReached,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::CopyShortcutBlocked => "COPY_SHORTCUT_BLOCKED",
            ViolationKind::PasteShortcutBlocked => "PASTE_SHORTCUT_BLOCKED",
            ViolationKind::CutShortcutBlocked => "CUT_SHORTCUT_BLOCKED",
            ViolationKind::SelectAllBlocked => "SELECT_ALL_BLOCKED",
            ViolationKind::PrintBlocked => "PRINT_BLOCKED",
            ViolationKind::DevToolsBlocked => "DEV_TOOLS_BLOCKED",
            ViolationKind::RefreshBlocked => "REFRESH_BLOCKED",
            ViolationKind::CopyEventBlocked => "COPY_EVENT_BLOCKED",
            ViolationKind::CutEventBlocked => "CUT_EVENT_BLOCKED",
            ViolationKind::PasteEventBlocked => "PASTE_EVENT_BLOCKED",
            ViolationKind::ContextMenuBlocked => "CONTEXT_MENU_BLOCKED",
            ViolationKind::WindowCloseAttempt => "WINDOW_CLOSE_ATTEMPT",
            ViolationKind::TabSwitchDetected => "TAB_SWITCH_DETECTED",
            ViolationKind::WindowBlurDetected => "WINDOW_BLUR_DETECTED",
            ViolationKind::DevToolsDetected => "DEV_TOOLS_DETECTED",
            ViolationKind::MaxViolationsReached => "MAX_VIOLATIONS_REACHED",
        }
    }

    /// The synthetic cutoff marker appended when the configured maximum is
    /// reached. It is the one kind that must never re-trigger itself.
    pub fn is_cutoff_marker(&self) -> bool {
        matches!(self, ViolationKind::MaxViolationsReached)
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown violation kind: {0}")]
pub struct UnknownViolationKind(pub String);

impl FromStr for ViolationKind {
    type Err = UnknownViolationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "COPY_SHORTCUT_BLOCKED" => ViolationKind::CopyShortcutBlocked,
            "PASTE_SHORTCUT_BLOCKED" => ViolationKind::PasteShortcutBlocked,
            "CUT_SHORTCUT_BLOCKED" => ViolationKind::CutShortcutBlocked,
            "SELECT_ALL_BLOCKED" => ViolationKind::SelectAllBlocked,
            "PRINT_BLOCKED" => ViolationKind::PrintBlocked,
            "DEV_TOOLS_BLOCKED" => ViolationKind::DevToolsBlocked,
            "REFRESH_BLOCKED" => ViolationKind::RefreshBlocked,
            "COPY_EVENT_BLOCKED" => ViolationKind::CopyEventBlocked,
            "CUT_EVENT_BLOCKED" => ViolationKind::CutEventBlocked,
            "PASTE_EVENT_BLOCKED" => ViolationKind::PasteEventBlocked,
            "CONTEXT_MENU_BLOCKED" => ViolationKind::ContextMenuBlocked,
            "WINDOW_CLOSE_ATTEMPT" => ViolationKind::WindowCloseAttempt,
            "TAB_SWITCH_DETECTED" => ViolationKind::TabSwitchDetected,
            "WINDOW_BLUR_DETECTED" => ViolationKind::WindowBlurDetected,
            "DEV_TOOLS_DETECTED" => ViolationKind::DevToolsDetected,
            "MAX_VIOLATIONS_REACHED" => ViolationKind::MaxViolationsReached,
            other => return Err(UnknownViolationKind(other.to_string())),
        })
    }
}

/// One detected signal, immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Unique within one monitor instance only.
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Kind-specific auxiliary data; an empty object for most kinds.
    #[serde(default)]
    pub details: serde_json::Value,
}

/// Pure read of the monitor's current bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct ViolationStats {
    pub total: usize,
    pub types: HashMap<ViolationKind, usize>,
    /// Most recent 5 violations, in detection order.
    pub recent: Vec<Violation>,
    pub is_active: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_activity: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [ViolationKind; 16] = [
        ViolationKind::CopyShortcutBlocked,
        ViolationKind::PasteShortcutBlocked,
        ViolationKind::CutShortcutBlocked,
        ViolationKind::SelectAllBlocked,
        ViolationKind::PrintBlocked,
        ViolationKind::DevToolsBlocked,
        ViolationKind::RefreshBlocked,
        ViolationKind::CopyEventBlocked,
        ViolationKind::CutEventBlocked,
        ViolationKind::PasteEventBlocked,
        ViolationKind::ContextMenuBlocked,
        ViolationKind::WindowCloseAttempt,
        ViolationKind::TabSwitchDetected,
        ViolationKind::WindowBlurDetected,
        ViolationKind::DevToolsDetected,
        ViolationKind::MaxViolationsReached,
    ];

    #[test]
    fn test_kind_strings_round_trip() {
        for kind in ALL_KINDS {
            let parsed: ViolationKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_kind_serde_matches_wire_strings() {
        for kind in ALL_KINDS {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.as_str().to_string()));
        }
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        let err = "SCREENSHOT_BLOCKED".parse::<ViolationKind>().unwrap_err();
        assert_eq!(err, UnknownViolationKind("SCREENSHOT_BLOCKED".to_string()));
    }

    #[test]
    fn test_violation_serializes_epoch_millis() {
        let violation = Violation {
            id: 1,
            kind: ViolationKind::TabSwitchDetected,
            timestamp: DateTime::from_timestamp_millis(1_700_000_000_123).unwrap(),
            details: serde_json::json!({ "hidden": true }),
        };
        let json = serde_json::to_value(&violation).unwrap();
        assert_eq!(json["type"], "TAB_SWITCH_DETECTED");
        assert_eq!(json["timestamp"], 1_700_000_000_123i64);
        assert_eq!(json["details"]["hidden"], true);
    }

    #[test]
    fn test_cutoff_marker() {
        assert!(ViolationKind::MaxViolationsReached.is_cutoff_marker());
        assert!(!ViolationKind::CopyEventBlocked.is_cutoff_marker());
    }
}
