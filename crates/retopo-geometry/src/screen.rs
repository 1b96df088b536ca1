//! Screen-space (pixel) helpers.

use cgmath::{InnerSpace, MetricSpace, Point2};

/// Projects `p` onto the line through `a` and `b`; returns the foot point and
/// its parameter (0 at `a`, 1 at `b`). Degenerate segments yield `None`.
pub fn closest_point_on_segment_2d(
    p: Point2<f64>,
    a: Point2<f64>,
    b: Point2<f64>,
) -> Option<(Point2<f64>, f64)> {
    let ab = b - a;
    let len2 = ab.magnitude2();
    if len2 <= f64::EPSILON {
        return None;
    }
    let t = (p - a).dot(ab) / len2;
    Some((a + ab * t, t))
}

/// Per-axis (Chebyshev) distance, used for the square pick window.
pub fn axis_distance(a: Point2<f64>, b: Point2<f64>) -> f64 {
    (a.x - b.x).abs().max((a.y - b.y).abs())
}

pub fn distance2(a: Point2<f64>, b: Point2<f64>) -> f64 {
    a.distance2(b)
}

/// True when `p` projects strictly inside `a..b` within `radius` pixels.
pub fn segment_hit(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>, radius: f64) -> bool {
    match closest_point_on_segment_2d(p, a, b) {
        Some((foot, t)) => t > 0.0 && t < 1.0 && foot.distance(p) <= radius,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_parameter() {
        let (foot, t) = closest_point_on_segment_2d(
            Point2::new(5.0, 3.0),
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
        )
        .unwrap();
        assert_eq!(foot, Point2::new(5.0, 0.0));
        assert_eq!(t, 0.5);
    }

    #[test]
    fn endpoints_are_outside_the_open_segment() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(10.0, 0.0);
        assert!(segment_hit(Point2::new(5.0, 2.0), a, b, 3.0));
        assert!(!segment_hit(Point2::new(5.0, 4.0), a, b, 3.0));
        assert!(!segment_hit(Point2::new(0.0, 1.0), a, b, 3.0));
        assert!(!segment_hit(Point2::new(-1.0, 0.0), a, b, 3.0));
    }

    #[test]
    fn degenerate_segment_never_hits() {
        let a = Point2::new(2.0, 2.0);
        assert!(!segment_hit(a, a, a, 10.0));
    }

    #[test]
    fn axis_distance_is_max_component() {
        assert_eq!(axis_distance(Point2::new(0.0, 0.0), Point2::new(3.0, -4.0)), 4.0);
    }
}
