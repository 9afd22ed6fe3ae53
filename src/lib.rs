//! Quiz Sentinel - Non-Intrusive Fraud Signal Monitoring
//!
//! Observes browser-level signals during a timed quiz attempt and turns them
//! into a classified violation stream for the host application. Everything is
//! advisory: no default action is ever prevented, and the monitor never stops
//! itself. The host reacts to the `MAX_VIOLATIONS_REACHED` marker (flag the
//! participation record, tear the monitor down).
//!
//! The browser is abstracted behind [`SignalSource`], so the same monitor
//! runs against a real page binding or against [`SimulatedPage`] in tests
//! and the demo binary.

pub mod config;
pub mod lockdown;
pub mod monitor;
pub mod signals;
pub mod source;
pub mod violation;

pub use config::MonitorConfig;
pub use monitor::{
    ActivityMonitor, ActivityCallback, Subscription, ViolationCallback, DEV_TOOLS_GAP_PX,
};
pub use signals::{classify_shortcut, BrowserSignal, KeyPress, ShortcutMatch};
pub use source::{ListenerId, SignalHandler, SignalSource, SimulatedPage, ViewportMetrics};
pub use violation::{UnknownViolationKind, Violation, ViolationKind, ViolationStats};
