use super::*;

#[test]
fn rect_edges_and_containment() {
    let canvas = CanvasSize::new(100, 50).rect();
    let r = Rect::new(96, 0, 4, 50);
    assert_eq!(r.right(), 100);
    assert_eq!(r.bottom(), 50);
    assert!(r.is_within(canvas));
    assert!(!Rect::new(97, 0, 4, 50).is_within(canvas));
}

#[test]
fn rect_intersection_clips_and_detects_disjoint() {
    let a = Rect::new(0, 0, 10, 10);
    let b = Rect::new(5, 5, 10, 10);
    assert_eq!(a.intersect(b), Rect::new(5, 5, 5, 5));
    assert!(a.overlaps(b));

    let c = Rect::new(10, 0, 5, 5);
    assert!(a.intersect(c).is_empty());
    assert!(!a.overlaps(c));
}

#[test]
fn canvas_rgba_len_and_display() {
    let c = CanvasSize::new(768, 384);
    assert_eq!(c.rgba_len(), Some(768 * 384 * 4));
    assert_eq!(c.to_string(), "768x384");
    assert!(CanvasSize::new(0, 10).is_empty());
}
