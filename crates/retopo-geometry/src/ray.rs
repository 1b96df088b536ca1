use cgmath::{InnerSpace, Matrix4, Point3, SquareMatrix, Vector3};

use crate::{normalize_or_zero, transform_point, transform_vector};

const PARALLEL_EPS: f64 = 1.0e-12;

/// Half-line with a unit (or zero, when degenerate) direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
}

impl Ray {
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self {
            origin,
            direction: normalize_or_zero(direction),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.direction.magnitude2() <= f64::EPSILON
    }

    pub fn at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction * t
    }

    pub fn inverted(&self) -> Self {
        Self {
            origin: self.origin,
            direction: -self.direction,
        }
    }

    pub fn advanced(&self, distance: f64) -> Self {
        Self {
            origin: self.at(distance),
            direction: self.direction,
        }
    }

    pub fn transformed(&self, matrix: &Matrix4<f64>) -> Self {
        Self::new(
            transform_point(matrix, self.origin),
            transform_vector(matrix, self.direction),
        )
    }

    pub fn world_to_object(&self, matrix_world: &Matrix4<f64>) -> Option<Self> {
        let inverse = matrix_world.invert()?;
        Some(self.transformed(&inverse))
    }

    pub fn distance_to(&self, point: Point3<f64>) -> f64 {
        (point - self.origin).magnitude()
    }

    /// Closest points between the infinite lines carrying `self` and `other`,
    /// plus the parameter of the first point along `self`.
    pub fn closest_points(&self, other: &Ray) -> Option<(Point3<f64>, Point3<f64>, f64)> {
        let (s, t) = line_parameters(self.origin, self.direction, other.origin, other.direction)?;
        Some((self.at(s), other.at(t), s))
    }

    /// Point of segment `a..b` closest to this ray's line, and the distance of
    /// its foot along the ray.
    pub fn closest_point_on_segment(
        &self,
        a: Point3<f64>,
        b: Point3<f64>,
    ) -> Option<(Point3<f64>, f64)> {
        if self.is_degenerate() {
            return None;
        }
        let edge = b - a;
        let t = if edge.magnitude2() <= PARALLEL_EPS {
            0.0
        } else {
            match line_parameters(self.origin, self.direction, a, edge) {
                Some((_, t)) => t.clamp(0.0, 1.0),
                None => 0.0,
            }
        };
        let point = a + edge * t;
        let along = (point - self.origin).dot(self.direction);
        Some((point, along))
    }
}

fn line_parameters(
    p1: Point3<f64>,
    d1: Vector3<f64>,
    p2: Point3<f64>,
    d2: Vector3<f64>,
) -> Option<(f64, f64)> {
    let a = d1.dot(d1);
    let b = d1.dot(d2);
    let c = d2.dot(d2);
    let w = p1 - p2;
    let d = d1.dot(w);
    let e = d2.dot(w);
    let denom = a * c - b * b;
    if a <= PARALLEL_EPS || c <= PARALLEL_EPS || denom.abs() <= PARALLEL_EPS * a * c {
        return None;
    }
    let s = (b * e - c * d) / denom;
    let t = (a * e - b * d) / denom;
    Some((s, t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skew_lines_meet_at_common_perpendicular() {
        let a = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        let b = Ray::new(Point3::new(2.0, -1.0, 3.0), Vector3::new(0.0, 1.0, 0.0));
        let (pa, pb, s) = a.closest_points(&b).unwrap();
        assert!((pa - Point3::new(2.0, 0.0, 0.0)).magnitude() < 1.0e-12);
        assert!((pb - Point3::new(2.0, 0.0, 3.0)).magnitude() < 1.0e-12);
        assert!((s - 2.0).abs() < 1.0e-12);
    }

    #[test]
    fn parallel_lines_have_no_closest_pair() {
        let a = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0));
        let b = Ray::new(Point3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, -2.0));
        assert!(a.closest_points(&b).is_none());
    }

    #[test]
    fn segment_point_is_clamped_to_endpoints() {
        let ray = Ray::new(Point3::new(5.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        let (point, along) = ray
            .closest_point_on_segment(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(point, Point3::new(1.0, 0.0, 0.0));
        assert!((along - 10.0).abs() < 1.0e-12);
    }

    #[test]
    fn zero_direction_is_degenerate() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0));
        assert!(ray.is_degenerate());
        assert!(
            ray.closest_point_on_segment(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0))
                .is_none()
        );
    }

    #[test]
    fn object_space_round_trip() {
        let matrix = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0))
            * Matrix4::from_scale(2.0);
        let ray = Ray::new(Point3::new(1.0, 2.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        let local = ray.world_to_object(&matrix).unwrap();
        assert!((local.origin - Point3::new(0.0, 0.0, 3.5)).magnitude() < 1.0e-12);
        let back = local.transformed(&matrix);
        assert!((back.origin - ray.origin).magnitude() < 1.0e-12);
        assert!((back.direction - ray.direction).magnitude() < 1.0e-12);
    }
}
