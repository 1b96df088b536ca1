use cgmath::{InnerSpace, Matrix4, Point3, SquareMatrix, Vector3};
use retopo_base::Axis;

use crate::{Ray, normalize_or_zero, transform_normal, transform_point};

const PARALLEL_EPS: f64 = 1.0e-12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub origin: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Plane {
    pub fn new(origin: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            origin,
            normal: normalize_or_zero(normal),
        }
    }

    /// Plane containing both rays; used to slice a mesh along a screen stroke.
    pub fn from_rays(first: &Ray, second: &Ray) -> Option<Self> {
        let a = first.origin;
        let b = first.at(1.0);
        let far = second.at(1.0);
        let mut normal = (b - a).cross(far - a);
        if normal.magnitude2() <= PARALLEL_EPS {
            normal = (b - a).cross(second.origin - a);
        }
        if normal.magnitude2() <= PARALLEL_EPS {
            return None;
        }
        Some(Self::new(a, normal))
    }

    pub fn is_degenerate(&self) -> bool {
        self.normal.magnitude2() <= f64::EPSILON
    }

    /// Signed distance, positive on the normal side.
    pub fn distance_point(&self, point: Point3<f64>) -> f64 {
        (point - self.origin).dot(self.normal)
    }

    pub fn intersect_ray(&self, ray: &Ray) -> Option<(Point3<f64>, f64)> {
        if self.is_degenerate() || ray.is_degenerate() {
            return None;
        }
        let denom = self.normal.dot(ray.direction);
        if denom.abs() <= PARALLEL_EPS {
            return None;
        }
        let t = (self.origin - ray.origin).dot(self.normal) / denom;
        if t < 0.0 {
            return None;
        }
        Some((ray.at(t), t))
    }

    /// Crossing point of segment `a..b`, endpoints included.
    pub fn intersect_segment(&self, a: Point3<f64>, b: Point3<f64>) -> Option<Point3<f64>> {
        if self.is_degenerate() {
            return None;
        }
        let da = self.distance_point(a);
        let db = self.distance_point(b);
        if da * db > 0.0 {
            return None;
        }
        let span = da - db;
        if span.abs() <= PARALLEL_EPS {
            return None;
        }
        let t = da / span;
        Some(a + (b - a) * t)
    }

    /// Reflection across the plane `axis = 0`.
    pub fn mirrored(&self, axis: Axis) -> Self {
        let mut origin = self.origin;
        let mut normal = self.normal;
        match axis {
            Axis::X => {
                origin.x = -origin.x;
                normal.x = -normal.x;
            }
            Axis::Y => {
                origin.y = -origin.y;
                normal.y = -normal.y;
            }
            Axis::Z => {
                origin.z = -origin.z;
                normal.z = -normal.z;
            }
        }
        Self { origin, normal }
    }

    pub fn transformed(&self, matrix: &Matrix4<f64>) -> Self {
        Self::new(
            transform_point(matrix, self.origin),
            transform_normal(matrix, self.normal),
        )
    }

    pub fn world_to_object(&self, matrix_world: &Matrix4<f64>) -> Option<Self> {
        let inverse = matrix_world.invert()?;
        Some(self.transformed(&inverse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground() -> Plane {
        Plane::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 2.0))
    }

    #[test]
    fn ray_hits_in_front_only() {
        let down = Ray::new(Point3::new(1.0, 1.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let (point, t) = ground().intersect_ray(&down).unwrap();
        assert_eq!(point, Point3::new(1.0, 1.0, 0.0));
        assert_eq!(t, 5.0);
        assert!(ground().intersect_ray(&down.inverted()).is_none());
    }

    #[test]
    fn parallel_ray_misses() {
        let flat = Ray::new(Point3::new(0.0, 0.0, 1.0), Vector3::new(1.0, 0.0, 0.0));
        assert!(ground().intersect_ray(&flat).is_none());
    }

    #[test]
    fn segment_crossing() {
        let plane = ground();
        let hit = plane
            .intersect_segment(Point3::new(0.0, 0.0, -1.0), Point3::new(0.0, 0.0, 3.0))
            .unwrap();
        assert!((hit - Point3::new(0.0, 0.0, 0.0)).magnitude() < 1.0e-12);
        assert!(
            plane
                .intersect_segment(Point3::new(0.0, 0.0, 1.0), Point3::new(0.0, 0.0, 3.0))
                .is_none()
        );
    }

    #[test]
    fn mirror_negates_one_axis() {
        let plane = Plane::new(Point3::new(1.0, 2.0, 3.0), Vector3::new(1.0, 0.0, 0.0));
        let mirrored = plane.mirrored(Axis::X);
        assert_eq!(mirrored.origin, Point3::new(-1.0, 2.0, 3.0));
        assert_eq!(mirrored.normal, Vector3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn plane_through_two_view_rays() {
        let eye = Point3::new(0.0, 0.0, 10.0);
        let a = Ray::new(eye, Vector3::new(-1.0, 0.0, -10.0));
        let b = Ray::new(eye, Vector3::new(1.0, 0.0, -10.0));
        let plane = Plane::from_rays(&a, &b).unwrap();
        assert!(plane.distance_point(Point3::new(3.0, 0.0, -4.0)).abs() < 1.0e-9);
        assert!(plane.distance_point(Point3::new(0.0, 1.0, 0.0)).abs() > 0.5);
    }
}
