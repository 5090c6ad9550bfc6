//! Rectangle overlap and containment tests for BoundingBox.

use tc_common::BoundingBox;

fn rect(top_left: (f64, f64), bottom_right: (f64, f64)) -> BoundingBox {
    BoundingBox::from_corners(top_left, bottom_right)
}

// ============================================================================
// Constructor tests
// ============================================================================

#[test]
fn test_bbox_around_point() {
    let bbox = BoundingBox::around(280.0, 25.0, 0.5);
    assert_eq!(bbox, BoundingBox::new(279.5, 24.5, 280.5, 25.5));
    assert_eq!(bbox.width(), 1.0);
    assert_eq!(bbox.height(), 1.0);
}

#[test]
fn test_bbox_corner_roundtrip() {
    let bbox = BoundingBox::new(-10.0, -5.0, 10.0, 5.0);
    assert_eq!(rect(bbox.top_left(), bbox.bottom_right()), bbox);
}

// ============================================================================
// Overlap tests
// ============================================================================

#[test]
fn test_overlap_partial() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
    assert!(a.overlaps(&b));
    assert!(b.overlaps(&a));
}

#[test]
fn test_overlap_disjoint() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
    assert!(!a.overlaps(&b));
    assert!(!b.overlaps(&a));
}

#[test]
fn test_overlap_touching_edge() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let right = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
    let above = BoundingBox::new(0.0, 10.0, 10.0, 20.0);
    assert!(a.overlaps(&right));
    assert!(a.overlaps(&above));
}

#[test]
fn test_overlap_touching_corner() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
    assert!(a.overlaps(&b));
}

#[test]
fn test_overlap_contained() {
    let outer = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
    let inner = BoundingBox::new(40.0, 40.0, 60.0, 60.0);
    assert!(outer.overlaps(&inner));
    assert!(inner.overlaps(&outer));
}

#[test]
fn test_overlap_separated_vertically_only() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(2.0, 10.5, 8.0, 12.0);
    assert!(!a.overlaps(&b));
}

#[test]
fn test_overlap_from_corner_pairs() {
    assert!(rect((0.0, 10.0), (10.0, 0.0)).overlaps(&rect((5.0, 15.0), (15.0, 5.0))));
    assert!(!rect((0.0, 10.0), (10.0, 0.0)).overlaps(&rect((20.0, 30.0), (30.0, 20.0))));
}

#[test]
fn test_overlap_wrapped_across_seam() {
    let storm = BoundingBox::around(359.8, 15.0, 0.5);
    let track_extent = BoundingBox::new(0.0, 14.0, 2.0, 16.0);
    assert!(!storm.overlaps(&track_extent));
    assert!(storm.overlaps_wrapped(&track_extent));
}

#[test]
fn test_intersection_none_for_disjoint() {
    let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
    let b = BoundingBox::new(2.0, 2.0, 3.0, 3.0);
    assert!(a.intersection(&b).is_none());
}

#[test]
fn test_intersection_with_self() {
    let a = BoundingBox::new(270.0, 20.0, 275.0, 25.0);
    assert_eq!(a.intersection(&a), Some(a));
}

// ============================================================================
// Point containment tests
// ============================================================================

#[test]
fn test_contains_point_edges_inclusive() {
    let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    assert!(bbox.contains_point(5.0, 5.0));
    assert!(bbox.contains_point(0.0, 5.0));
    assert!(bbox.contains_point(10.0, 10.0));
    assert!(!bbox.contains_point(10.01, 5.0));
    assert!(!bbox.contains_point(5.0, -0.01));
}

#[test]
fn test_contains_point_wrapped() {
    let bbox = BoundingBox::around(0.1, -12.0, 0.25);
    assert!(bbox.contains_point_wrapped(359.95, -12.0));
    assert!(!bbox.contains_point_wrapped(359.5, -12.0));
}
