//! Unit tests for queue_family.rs

use crate::device::{QueueAssignment, QueueCapabilities, QueueFamilyInfo, QueueKind, QueueSelector, QueueSlot};
use crate::error::Lumen3dError;

fn family(capabilities: QueueCapabilities, queue_count: u32, supports_present: bool) -> QueueFamilyInfo {
    QueueFamilyInfo { capabilities, queue_count, supports_present }
}

const G: QueueCapabilities = QueueCapabilities::GRAPHICS;
const C: QueueCapabilities = QueueCapabilities::COMPUTE;
const T: QueueCapabilities = QueueCapabilities::TRANSFER;

// ============================================================================
// SELECTOR TESTS
// ============================================================================

#[test]
fn test_selector_prefers_non_exhausted_family() {
    let families = [family(G.union(C), 1, true), family(G.union(C), 2, false)];
    let mut selector = QueueSelector::new(&families);

    assert_eq!(selector.select(C, QueueCapabilities::empty()), Some(QueueSlot { family: 0, index: 0 }));
    // Family 0 is exhausted, family 1 still has queues
    assert_eq!(selector.select(C, QueueCapabilities::empty()), Some(QueueSlot { family: 1, index: 0 }));
    assert_eq!(selector.select(C, QueueCapabilities::empty()), Some(QueueSlot { family: 1, index: 1 }));
    // Everything exhausted: share the last queue of the first matching family
    assert_eq!(selector.select(C, QueueCapabilities::empty()), Some(QueueSlot { family: 0, index: 0 }));
}

#[test]
fn test_selector_respects_excluded_capabilities() {
    let families = [family(G.union(C), 4, true), family(C.union(T), 1, false)];
    let mut selector = QueueSelector::new(&families);

    assert_eq!(selector.select(C, G), Some(QueueSlot { family: 1, index: 0 }));
    assert_eq!(selector.select(G, C), None);
}

// ============================================================================
// ASSIGNMENT TESTS
// ============================================================================

#[test]
fn test_single_universal_family() {
    let families = [family(G.union(C).union(T), 1, true)];
    let a = QueueAssignment::resolve(&families).unwrap();

    assert_eq!(a.graphics, QueueSlot { family: 0, index: 0 });
    assert_eq!(a.compute, QueueSlot { family: 0, index: 0 });
    assert_eq!(a.present, a.graphics);
    assert_eq!(a.unique_families(), vec![0]);
    assert_eq!(a.queue_counts(), vec![(0, 1)]);
}

#[test]
fn test_compute_prefers_graphics_family_over_dedicated() {
    let families = [family(G.union(C), 2, true), family(C, 1, false)];
    let a = QueueAssignment::resolve(&families).unwrap();

    assert_eq!(a.compute.family, 0);
    assert_eq!(a.compute.index, 1);
    assert_eq!(a.queue_counts(), vec![(0, 2)]);
}

#[test]
fn test_compute_falls_back_to_dedicated_family() {
    let families = [family(G, 1, true), family(C.union(T), 1, false)];
    let a = QueueAssignment::resolve(&families).unwrap();

    assert_eq!(a.graphics.family, 0);
    assert_eq!(a.compute.family, 1);
    assert_eq!(a.unique_families(), vec![0, 1]);
    assert_eq!(a.family(QueueKind::Compute), 1);
}

#[test]
fn test_present_falls_back_to_other_family() {
    let families = [family(G.union(C), 1, false), family(T, 1, true)];
    let a = QueueAssignment::resolve(&families).unwrap();

    assert_eq!(a.present.family, 1);
    assert_eq!(a.unique_families(), vec![0, 1]);
}

#[test]
fn test_missing_graphics_is_fatal() {
    let families = [family(C, 1, true)];
    assert_eq!(
        QueueAssignment::resolve(&families),
        Err(Lumen3dError::QueueFamilyNotFound("graphics".to_string()))
    );
}

#[test]
fn test_missing_present_is_fatal() {
    let families = [family(G.union(C), 1, false)];
    assert_eq!(
        QueueAssignment::resolve(&families),
        Err(Lumen3dError::QueueFamilyNotFound("present".to_string()))
    );
}

#[test]
fn test_missing_compute_is_fatal() {
    let families = [family(G, 1, true), family(T, 1, false)];
    assert_eq!(
        QueueAssignment::resolve(&families),
        Err(Lumen3dError::QueueFamilyNotFound("compute".to_string()))
    );
}
