//! Injectable signal source
//!
//! The monitor never touches a real document/window. It observes whatever
//! implements [`SignalSource`]: a browser binding in production, a
//! [`SimulatedPage`] in the demo binary and the test suite.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::signals::BrowserSignal;

pub type SignalHandler = Arc<dyn Fn(BrowserSignal) + Send + Sync>;

/// Opaque handle returned by [`SignalSource::attach`]. Detaching with the
/// same handle removes exactly the registration it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Outer/inner window geometry sampled by the dev-tools poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportMetrics {
    pub outer_width: u32,
    pub outer_height: u32,
    pub inner_width: u32,
    pub inner_height: u32,
}

impl ViewportMetrics {
    pub fn width_gap(&self) -> u32 {
        self.outer_width.saturating_sub(self.inner_width)
    }

    pub fn height_gap(&self) -> u32 {
        self.outer_height.saturating_sub(self.inner_height)
    }
}

impl Default for ViewportMetrics {
    fn default() -> Self {
        // Plain maximized window: a toolbar-sized height gap, no side panels.
        ViewportMetrics {
            outer_width: 1440,
            outer_height: 900,
            inner_width: 1440,
            inner_height: 812,
        }
    }
}

/// The listener-registration surface the monitor needs from its host
/// environment. Implementations deliver every [`BrowserSignal`] they observe
/// to each attached handler and answer viewport queries.
///
/// Implementations must be purely observational: listeners report signals
/// and never suppress the default action they describe. Browser bindings
/// should register in the capture phase so no page logic can stop
/// propagation before the monitor sees the event.
pub trait SignalSource: Send + Sync {
    fn attach(&self, handler: SignalHandler) -> ListenerId;
    fn detach(&self, listener: ListenerId);
    fn viewport(&self) -> ViewportMetrics;
}

/// In-process stand-in for the browser page, driven by `emit` calls.
pub struct SimulatedPage {
    listeners: Mutex<Vec<(ListenerId, SignalHandler)>>,
    next_listener: AtomicU64,
    viewport: Mutex<ViewportMetrics>,
}

impl SimulatedPage {
    pub fn new() -> Self {
        SimulatedPage {
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            viewport: Mutex::new(ViewportMetrics::default()),
        }
    }

    /// Deliver a signal to every attached handler, in attach order.
    pub fn emit(&self, signal: BrowserSignal) {
        // Snapshot first: a handler may detach itself (or anything else)
        // while it runs.
        let handlers: Vec<SignalHandler> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(signal.clone());
        }
    }

    pub fn set_viewport(&self, viewport: ViewportMetrics) {
        *self.viewport.lock() = viewport;
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl Default for SimulatedPage {
    fn default() -> Self {
        SimulatedPage::new()
    }
}

impl SignalSource for SimulatedPage {
    fn attach(&self, handler: SignalHandler) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, handler));
        id
    }

    fn detach(&self, listener: ListenerId) {
        self.listeners.lock().retain(|(id, _)| *id != listener);
    }

    fn viewport(&self) -> ViewportMetrics {
        *self.viewport.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_attach_emit_detach() {
        let page = SimulatedPage::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let listener = page.attach(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(page.listener_count(), 1);

        page.emit(BrowserSignal::Click);
        page.emit(BrowserSignal::Scroll);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        page.detach(listener);
        assert_eq!(page.listener_count(), 0);
        page.emit(BrowserSignal::Click);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_detach_removes_only_that_listener() {
        let page = SimulatedPage::new();
        let first_hits = Arc::new(AtomicUsize::new(0));
        let second_hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first_hits);
        let first = page.attach(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = Arc::clone(&second_hits);
        let _second = page.attach(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        page.detach(first);
        page.emit(BrowserSignal::MouseMove);
        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_viewport_gaps() {
        let page = SimulatedPage::new();
        page.set_viewport(ViewportMetrics {
            outer_width: 1440,
            outer_height: 900,
            inner_width: 1100,
            inner_height: 812,
        });
        let viewport = page.viewport();
        assert_eq!(viewport.width_gap(), 340);
        assert_eq!(viewport.height_gap(), 88);
    }

    #[test]
    fn test_handler_may_detach_during_emit() {
        let page = Arc::new(SimulatedPage::new());

        let page_ref = Arc::clone(&page);
        let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));
        let slot_ref = Arc::clone(&slot);
        let listener = page.attach(Arc::new(move |_| {
            if let Some(id) = slot_ref.lock().take() {
                page_ref.detach(id);
            }
        }));
        *slot.lock() = Some(listener);

        // Must not deadlock, and the listener is gone afterwards.
        page.emit(BrowserSignal::Click);
        assert_eq!(page.listener_count(), 0);
    }
}
