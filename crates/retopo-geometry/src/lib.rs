pub use cgmath::{
    Deg, InnerSpace, Matrix4, MetricSpace, Point2, Point3, SquareMatrix, Vector2, Vector3, Vector4,
};

pub mod plane;
pub mod ray;
pub mod screen;
pub mod triangle;

pub use plane::Plane;
pub use ray::Ray;

use cgmath::{Matrix, Matrix3, Transform};
use retopo_base::Axis;

pub fn transform_point(matrix: &Matrix4<f64>, point: Point3<f64>) -> Point3<f64> {
    matrix.transform_point(point)
}

pub fn transform_vector(matrix: &Matrix4<f64>, vector: Vector3<f64>) -> Vector3<f64> {
    matrix.transform_vector(vector)
}

/// Maps a surface normal through `matrix` with the inverse-transpose of its
/// linear part. Singular matrices fall back to the plain linear part.
pub fn transform_normal(matrix: &Matrix4<f64>, normal: Vector3<f64>) -> Vector3<f64> {
    let linear = Matrix3::from_cols(matrix.x.truncate(), matrix.y.truncate(), matrix.z.truncate());
    let mapped = match linear.invert() {
        Some(inverse) => inverse.transpose() * normal,
        None => linear * normal,
    };
    normalize_or_zero(mapped)
}

pub fn normalize_or_zero(vector: Vector3<f64>) -> Vector3<f64> {
    let len = vector.magnitude();
    if len <= f64::EPSILON {
        Vector3::new(0.0, 0.0, 0.0)
    } else {
        vector / len
    }
}

pub fn component(point: Point3<f64>, axis: Axis) -> f64 {
    match axis {
        Axis::X => point.x,
        Axis::Y => point.y,
        Axis::Z => point.z,
    }
}

pub fn with_component(mut point: Point3<f64>, axis: Axis, value: f64) -> Point3<f64> {
    match axis {
        Axis::X => point.x = value,
        Axis::Y => point.y = value,
        Axis::Z => point.z = value,
    }
    point
}

pub fn min_point(a: Point3<f64>, b: Point3<f64>) -> Point3<f64> {
    Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z))
}

pub fn max_point(a: Point3<f64>, b: Point3<f64>) -> Point3<f64> {
    Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_survives_non_uniform_scale() {
        let matrix = Matrix4::from_nonuniform_scale(2.0, 1.0, 1.0);
        let normal = Vector3::new(1.0, 1.0, 0.0).normalize();
        let mapped = transform_normal(&matrix, normal);
        let tangent = transform_vector(&matrix, Vector3::new(1.0, -1.0, 0.0));
        assert!(mapped.dot(tangent).abs() < 1.0e-12);
        assert!((mapped.magnitude() - 1.0).abs() < 1.0e-12);
    }

    #[test]
    fn component_round_trip() {
        let point = with_component(Point3::new(1.0, 2.0, 3.0), Axis::Y, 0.0);
        assert_eq!(component(point, Axis::Y), 0.0);
        assert_eq!(component(point, Axis::Z), 3.0);
    }
}
