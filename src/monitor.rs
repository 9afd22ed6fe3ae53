//! Activity monitor core
//!
//! Observes browser-level signals through an injectable [`SignalSource`] and
//! turns them into a classified violation stream with a configurable cutoff
//! threshold. Strictly observational: nothing is prevented, the default
//! action always goes through, only the attempt is recorded. The monitor is
//! not an enforcement point; the host reacts to `MAX_VIOLATIONS_REACHED`
//! (typically by flagging the participation record and calling [`stop`]).
//!
//! [`stop`]: ActivityMonitor::stop

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::MonitorConfig;
use crate::signals::{classify_shortcut, BrowserSignal};
use crate::source::{ListenerId, SignalSource, ViewportMetrics};
use crate::violation::{Violation, ViolationKind, ViolationStats};

/// Outer/inner window gap past which a docked dev-tools panel is suspected.
/// Best-effort heuristic: narrow and split layouts trip it too, so hosts
/// must never treat `DEV_TOOLS_DETECTED` as ground truth.
pub const DEV_TOOLS_GAP_PX: u32 = 160;

pub type ViolationCallback = Arc<dyn Fn(&Violation, usize) + Send + Sync>;
pub type ActivityCallback = Arc<dyn Fn(DateTime<Utc>) + Send + Sync>;

/// Handle returned by [`ActivityMonitor::on_violation`] and
/// [`ActivityMonitor::on_activity`]; removes exactly the registration it
/// came from. Dropping it without calling [`unsubscribe`] leaves the
/// callback registered.
///
/// [`unsubscribe`]: Subscription::unsubscribe
pub struct Subscription {
    remove: Box<dyn FnOnce() + Send>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        (self.remove)();
    }
}

struct MonitorInner {
    config: MonitorConfig,
    active: AtomicBool,
    violations: Mutex<Vec<Violation>>,
    last_activity: Mutex<DateTime<Utc>>,
    dev_tools_suspected: AtomicBool,
    next_violation: AtomicU64,
    next_subscriber: AtomicU64,
    violation_callbacks: Mutex<Vec<(u64, ViolationCallback)>>,
    activity_callbacks: Mutex<Vec<(u64, ActivityCallback)>>,
}

/// Everything attached by one `start()`, torn down by the matching `stop()`.
struct ActiveSession {
    listener: ListenerId,
    heartbeat: JoinHandle<()>,
    dev_tools_poll: Option<JoinHandle<()>>,
}

pub struct ActivityMonitor {
    inner: Arc<MonitorInner>,
    source: Arc<dyn SignalSource>,
    session: Mutex<Option<ActiveSession>>,
}

impl ActivityMonitor {
    /// Pure object setup: attaches no listeners and starts no timers.
    pub fn new(source: Arc<dyn SignalSource>, config: MonitorConfig) -> Self {
        ActivityMonitor {
            inner: Arc::new(MonitorInner {
                config,
                active: AtomicBool::new(false),
                violations: Mutex::new(Vec::new()),
                last_activity: Mutex::new(Utc::now()),
                dev_tools_suspected: AtomicBool::new(false),
                next_violation: AtomicU64::new(1),
                next_subscriber: AtomicU64::new(1),
                violation_callbacks: Mutex::new(Vec::new()),
                activity_callbacks: Mutex::new(Vec::new()),
            }),
            source,
            session: Mutex::new(None),
        }
    }

    /// Attach the signal listener and spawn the heartbeat and (if enabled)
    /// dev-tools poll timers. No-op while already active, so a re-render
    /// calling `start()` twice cannot double-register listeners.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(&self) {
        if self.inner.active.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.inner.last_activity.lock() = Utc::now();

        let handler_inner = Arc::clone(&self.inner);
        let listener = self
            .source
            .attach(Arc::new(move |signal| handler_inner.handle_signal(signal)));

        let heartbeat_inner = Arc::clone(&self.inner);
        let period = Duration::from_millis(self.inner.config.heartbeat_interval_ms.max(1));
        let heartbeat = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            loop {
                ticker.tick().await;
                heartbeat_inner.heartbeat_tick();
            }
        });

        let dev_tools_poll = if self.inner.config.show_dev_tools_warning {
            let poll_inner = Arc::clone(&self.inner);
            let poll_source = Arc::clone(&self.source);
            let period =
                Duration::from_millis(self.inner.config.dev_tools_poll_interval_ms.max(1));
            Some(tokio::spawn(async move {
                let start = tokio::time::Instant::now() + period;
                let mut ticker = tokio::time::interval_at(start, period);
                loop {
                    ticker.tick().await;
                    poll_inner.poll_dev_tools(poll_source.viewport());
                }
            }))
        } else {
            None
        };

        *self.session.lock() = Some(ActiveSession {
            listener,
            heartbeat,
            dev_tools_poll,
        });

        info!("🛡️ Quiz activity monitoring activated (non-intrusive)");
    }

    /// Detach the listener and cancel both timers. No-op while inactive.
    /// Violations and subscribers are kept; only [`reset_violations`] clears
    /// the former.
    ///
    /// [`reset_violations`]: ActivityMonitor::reset_violations
    pub fn stop(&self) {
        if !self.inner.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(session) = self.session.lock().take() {
            self.source.detach(session.listener);
            session.heartbeat.abort();
            if let Some(poll) = session.dev_tools_poll {
                poll.abort();
            }
        }
        info!("🛡️ Quiz activity monitoring deactivated");
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Record a violation and dispatch it to every violation subscriber.
    /// Also callable while inactive (hosts inject synthetic violations).
    pub fn report_violation(&self, kind: ViolationKind, details: serde_json::Value) -> Violation {
        self.inner.report_violation(kind, details)
    }

    /// Same path as [`report_violation`] with a `test: true` marker merged
    /// into the details. No separate code path: threshold and dispatch
    /// behave exactly as in production.
    ///
    /// [`report_violation`]: ActivityMonitor::report_violation
    pub fn test_violation(&self, kind: ViolationKind, details: serde_json::Value) -> Violation {
        let mut details = match details {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        details.insert("test".to_string(), json!(true));
        self.inner
            .report_violation(kind, serde_json::Value::Object(details))
    }

    pub fn on_violation<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Violation, usize) + Send + Sync + 'static,
    {
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.inner
            .violation_callbacks
            .lock()
            .push((id, Arc::new(callback)));
        let inner = Arc::clone(&self.inner);
        Subscription {
            remove: Box::new(move || {
                inner
                    .violation_callbacks
                    .lock()
                    .retain(|(registered, _)| *registered != id);
            }),
        }
    }

    pub fn on_activity<F>(&self, callback: F) -> Subscription
    where
        F: Fn(DateTime<Utc>) + Send + Sync + 'static,
    {
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.inner
            .activity_callbacks
            .lock()
            .push((id, Arc::new(callback)));
        let inner = Arc::clone(&self.inner);
        Subscription {
            remove: Box::new(move || {
                inner
                    .activity_callbacks
                    .lock()
                    .retain(|(registered, _)| *registered != id);
            }),
        }
    }

    pub fn violations(&self) -> Vec<Violation> {
        self.inner.violations.lock().clone()
    }

    pub fn violation_count(&self) -> usize {
        self.inner.violations.lock().len()
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.inner.last_activity.lock()
    }

    /// Pure read of current state; mutates nothing.
    pub fn get_violation_stats(&self) -> ViolationStats {
        let violations = self.inner.violations.lock();
        let mut types: HashMap<ViolationKind, usize> = HashMap::new();
        for violation in violations.iter() {
            *types.entry(violation.kind).or_insert(0) += 1;
        }
        let recent = violations
            .iter()
            .skip(violations.len().saturating_sub(5))
            .cloned()
            .collect();
        ViolationStats {
            total: violations.len(),
            types,
            recent,
            is_active: self.is_active(),
            last_activity: *self.inner.last_activity.lock(),
        }
    }

    /// Clear the violation list for a session boundary (quiz restart).
    /// Active flag, subscribers and the dev-tools latch are untouched.
    pub fn reset_violations(&self) {
        self.inner.violations.lock().clear();
        info!("🔄 Quiz violations reset");
    }
}

impl Drop for ActivityMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl MonitorInner {
    /// Signal handler; runs synchronously on whatever delivers the signal.
    fn handle_signal(&self, signal: BrowserSignal) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        match signal {
            BrowserSignal::KeyDown(press) => match classify_shortcut(&press) {
                Some(matched) => {
                    self.report_violation(matched.kind, json!({ "key": matched.key_label }));
                }
                None => self.touch_activity(),
            },
            BrowserSignal::Copy => {
                self.report_violation(ViolationKind::CopyEventBlocked, json!({}));
            }
            BrowserSignal::Cut => {
                self.report_violation(ViolationKind::CutEventBlocked, json!({}));
            }
            BrowserSignal::Paste => {
                self.report_violation(ViolationKind::PasteEventBlocked, json!({}));
            }
            BrowserSignal::ContextMenu => {
                self.report_violation(ViolationKind::ContextMenuBlocked, json!({}));
            }
            BrowserSignal::BeforeUnload => {
                self.report_violation(ViolationKind::WindowCloseAttempt, json!({}));
            }
            BrowserSignal::VisibilityChange {
                hidden,
                visibility_state,
            } => {
                if hidden {
                    self.report_violation(
                        ViolationKind::TabSwitchDetected,
                        json!({ "hidden": hidden, "visibilityState": visibility_state }),
                    );
                } else {
                    self.touch_activity();
                }
            }
            BrowserSignal::Blur => {
                self.report_violation(ViolationKind::WindowBlurDetected, json!({}));
            }
            BrowserSignal::KeyUp
            | BrowserSignal::Focus
            | BrowserSignal::MouseMove
            | BrowserSignal::Scroll
            | BrowserSignal::Click
            | BrowserSignal::TouchStart => self.touch_activity(),
        }
    }

    fn report_violation(&self, kind: ViolationKind, details: serde_json::Value) -> Violation {
        let violation = self.append_and_dispatch(kind, details);

        // Threshold check is a separate second step, not recursion: the
        // cutoff marker itself is excluded, every other violation at or past
        // the threshold re-arms it.
        if !kind.is_cutoff_marker() {
            let snapshot = self.violations.lock().clone();
            if snapshot.len() >= self.config.max_violations as usize {
                let count = snapshot.len();
                self.append_and_dispatch(
                    ViolationKind::MaxViolationsReached,
                    json!({ "violations": snapshot, "count": count }),
                );
            }
        }

        violation
    }

    fn append_and_dispatch(&self, kind: ViolationKind, details: serde_json::Value) -> Violation {
        let violation = Violation {
            id: self.next_violation.fetch_add(1, Ordering::Relaxed),
            kind,
            timestamp: Utc::now(),
            details,
        };
        let count = {
            let mut violations = self.violations.lock();
            violations.push(violation.clone());
            violations.len()
        };

        warn!("🚨 Quiz violation: {} {}", kind, violation.details);

        // Snapshot so a callback can subscribe/unsubscribe re-entrantly, and
        // isolate each invocation: one panicking subscriber must not starve
        // the rest or corrupt the log.
        let callbacks: Vec<ViolationCallback> = self
            .violation_callbacks
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&violation, count))).is_err() {
                error!("Violation callback panicked, continuing dispatch");
            }
        }

        violation
    }

    fn touch_activity(&self) {
        let now = Utc::now();
        *self.last_activity.lock() = now;

        let callbacks: Vec<ActivityCallback> = self
            .activity_callbacks
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(now))).is_err() {
                error!("Activity callback panicked, continuing dispatch");
            }
        }
    }

    /// Heartbeat: an open tab with no input events still counts as present.
    fn heartbeat_tick(&self) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        self.touch_activity();
    }

    /// Edge-triggered: one report per crossing, re-armed when the gap
    /// closes again.
    fn poll_dev_tools(&self, viewport: ViewportMetrics) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        let width_gap = viewport.width_gap();
        let height_gap = viewport.height_gap();
        if width_gap > DEV_TOOLS_GAP_PX || height_gap > DEV_TOOLS_GAP_PX {
            if !self.dev_tools_suspected.swap(true, Ordering::SeqCst) {
                self.report_violation(
                    ViolationKind::DevToolsDetected,
                    json!({ "widthDiff": width_gap, "heightDiff": height_gap }),
                );
            }
        } else {
            self.dev_tools_suspected.store(false, Ordering::SeqCst);
        }
    }
}
