//! Host-facing page lockdown helpers
//!
//! Called by the quiz host around question rendering, never by the monitor.
//! Like the monitor these are advisory, not a security boundary: a locked
//! style is trivially undone from a console.

use std::sync::Arc;
use tracing::debug;

/// The standard property plus the vendor-prefixed spellings, all of which
/// must be set/cleared together for the lock to hold across engines.
pub const SELECTION_LOCK_PROPERTIES: [&str; 4] = [
    "user-select",
    "-webkit-user-select",
    "-moz-user-select",
    "-ms-user-select",
];

/// Marker attribute denoting a blocking overlay. No code path in this crate
/// creates overlays (monitoring is strictly non-blocking); the sweep exists
/// so hosts can clean up after an alternate blocking feature.
pub const OVERLAY_MARKER_ATTRIBUTE: &str = "data-security-overlay";

/// A node whose inline style the lock utilities may edit. Browser bindings
/// map this onto the element's style declaration.
pub trait StyleTarget {
    fn set_style_property(&self, name: &str, value: &str);
    /// Restore the property to unset.
    fn clear_style_property(&self, name: &str);
}

/// Disable text selection on every given node. Idempotent and
/// order-independent across repeated calls.
pub fn lock_text_selection<T: StyleTarget + ?Sized>(nodes: &[&T]) {
    for node in nodes {
        for property in SELECTION_LOCK_PROPERTIES {
            node.set_style_property(property, "none");
        }
    }
}

/// Inverse of [`lock_text_selection`]. Safe on nodes that were never
/// locked.
pub fn unlock_text_selection<T: StyleTarget + ?Sized>(nodes: &[&T]) {
    for node in nodes {
        for property in SELECTION_LOCK_PROPERTIES {
            node.clear_style_property(property);
        }
    }
}

/// A detachable overlay element.
pub trait OverlayNode {
    fn is_attached(&self) -> bool;
    fn detach(&self);
}

/// Queries the page for elements carrying a marker attribute.
pub trait OverlayHost {
    fn overlays(&self, marker_attribute: &str) -> Vec<Arc<dyn OverlayNode>>;
}

/// Detach every element marked as a security overlay. A page with none is a
/// no-op, not an error. Returns the number detached.
pub fn remove_all_overlays(host: &dyn OverlayHost) -> usize {
    let mut removed = 0;
    for overlay in host.overlays(OVERLAY_MARKER_ATTRIBUTE) {
        if overlay.is_attached() {
            overlay.detach();
            removed += 1;
        }
    }
    if removed > 0 {
        debug!("Removed {} stray security overlay(s)", removed);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct TestElement {
        styles: Mutex<HashMap<String, String>>,
    }

    impl TestElement {
        fn style(&self, name: &str) -> Option<String> {
            self.styles.lock().get(name).cloned()
        }
    }

    impl StyleTarget for TestElement {
        fn set_style_property(&self, name: &str, value: &str) {
            self.styles.lock().insert(name.to_string(), value.to_string());
        }

        fn clear_style_property(&self, name: &str) {
            self.styles.lock().remove(name);
        }
    }

    struct TestOverlay {
        attached: AtomicBool,
    }

    impl OverlayNode for TestOverlay {
        fn is_attached(&self) -> bool {
            self.attached.load(Ordering::SeqCst)
        }

        fn detach(&self) {
            self.attached.store(false, Ordering::SeqCst);
        }
    }

    struct TestPage {
        marked: Vec<Arc<TestOverlay>>,
    }

    impl OverlayHost for TestPage {
        fn overlays(&self, marker_attribute: &str) -> Vec<Arc<dyn OverlayNode>> {
            assert_eq!(marker_attribute, OVERLAY_MARKER_ATTRIBUTE);
            self.marked
                .iter()
                .map(|overlay| Arc::clone(overlay) as Arc<dyn OverlayNode>)
                .collect()
        }
    }

    #[test]
    fn test_lock_sets_every_property_on_every_node() {
        let first = TestElement::default();
        let second = TestElement::default();

        lock_text_selection(&[&first, &second]);
        for element in [&first, &second] {
            for property in SELECTION_LOCK_PROPERTIES {
                assert_eq!(element.style(property).as_deref(), Some("none"));
            }
        }
    }

    #[test]
    fn test_unlock_restores_unset() {
        let element = TestElement::default();
        lock_text_selection(&[&element]);
        unlock_text_selection(&[&element]);
        for property in SELECTION_LOCK_PROPERTIES {
            assert_eq!(element.style(property), None);
        }
    }

    #[test]
    fn test_lock_and_unlock_are_idempotent() {
        let element = TestElement::default();
        lock_text_selection(&[&element]);
        lock_text_selection(&[&element]);
        assert_eq!(element.style("user-select").as_deref(), Some("none"));

        unlock_text_selection(&[&element]);
        unlock_text_selection(&[&element]);
        assert_eq!(element.style("user-select"), None);
    }

    #[test]
    fn test_unlock_never_locked_is_noop() {
        let element = TestElement::default();
        unlock_text_selection(&[&element]);
        assert!(element.styles.lock().is_empty());
    }

    #[test]
    fn test_overlay_sweep_detaches_marked_elements() {
        let page = TestPage {
            marked: vec![
                Arc::new(TestOverlay {
                    attached: AtomicBool::new(true),
                }),
                Arc::new(TestOverlay {
                    attached: AtomicBool::new(false),
                }),
                Arc::new(TestOverlay {
                    attached: AtomicBool::new(true),
                }),
            ],
        };

        // Already-detached overlays are skipped rather than detached twice.
        assert_eq!(remove_all_overlays(&page), 2);
        assert!(page.marked.iter().all(|overlay| !overlay.is_attached()));
    }

    #[test]
    fn test_overlay_sweep_with_no_overlays_is_noop() {
        let page = TestPage { marked: Vec::new() };
        assert_eq!(remove_all_overlays(&page), 0);
    }
}
