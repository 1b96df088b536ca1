use retopo_base::{FACE_INDEX_STRIDE, MeshId};
use retopo_geometry::{
    Matrix4, MetricSpace, Point3, Ray, SquareMatrix, Vector3, transform_normal, transform_point,
};
use retopo_mesh::{Bvh, BvhHit, FaceId};

use crate::scene::MeshObject;

/// One background surface, its BVH in object space and the transform that
/// places it in the world.
#[derive(Clone, Debug)]
pub struct SnapTarget {
    pub id: MeshId,
    pub pass_index: u32,
    matrix_world: Matrix4<f64>,
    inverse: Option<Matrix4<f64>>,
    bvh: Bvh,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceHit {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
    /// `pass_index * FACE_INDEX_STRIDE + face`.
    pub index: u64,
    pub target: MeshId,
    pub face: FaceId,
    /// World-space distance from the query origin.
    pub distance: f64,
}

pub fn encode_face_index(pass_index: u32, face: FaceId) -> u64 {
    u64::from(pass_index) * FACE_INDEX_STRIDE + u64::from(face.0)
}

pub fn decode_face_index(index: u64) -> (u32, FaceId) {
    (
        (index / FACE_INDEX_STRIDE) as u32,
        FaceId((index % FACE_INDEX_STRIDE) as u32),
    )
}

impl SnapTarget {
    pub fn from_object(object: &MeshObject) -> Self {
        Self::new(object.id, object.pass_index, object.matrix_world, Bvh::from_mesh(&object.mesh))
    }

    pub fn new(id: MeshId, pass_index: u32, matrix_world: Matrix4<f64>, bvh: Bvh) -> Self {
        Self {
            id,
            pass_index,
            matrix_world,
            inverse: matrix_world.invert(),
            bvh,
        }
    }

    pub fn matrix_world(&self) -> &Matrix4<f64> {
        &self.matrix_world
    }

    pub fn set_matrix_world(&mut self, matrix_world: Matrix4<f64>) {
        if matrix_world != self.matrix_world {
            self.matrix_world = matrix_world;
            self.inverse = matrix_world.invert();
        }
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Closest hit of a world-space ray. Targets with a singular transform
    /// are never hit.
    pub fn raycast(&self, ray: &Ray) -> Option<SurfaceHit> {
        let inverse = self.inverse.as_ref()?;
        let local = ray.transformed(inverse);
        if local.is_degenerate() {
            return None;
        }
        let hit = self.bvh.ray_cast(local.origin, local.direction)?;
        Some(self.to_world(&hit, ray.origin))
    }

    pub fn find_nearest(&self, point: Point3<f64>) -> Option<SurfaceHit> {
        let inverse = self.inverse.as_ref()?;
        let hit = self.bvh.find_nearest(transform_point(inverse, point))?;
        Some(self.to_world(&hit, point))
    }

    fn to_world(&self, hit: &BvhHit, origin: Point3<f64>) -> SurfaceHit {
        let position = transform_point(&self.matrix_world, hit.position);
        SurfaceHit {
            position,
            normal: transform_normal(&self.matrix_world, hit.normal),
            index: encode_face_index(self.pass_index, hit.face),
            target: self.id,
            face: hit.face,
            distance: origin.distance(position),
        }
    }
}

fn closer(best: Option<SurfaceHit>, candidate: Option<SurfaceHit>) -> Option<SurfaceHit> {
    match (best, candidate) {
        (Some(best), Some(candidate)) if candidate.distance < best.distance => Some(candidate),
        (None, candidate) => candidate,
        (best, _) => best,
    }
}

/// Nearest hit over all targets, or only `only` when given.
pub fn raycast_targets(
    targets: &[SnapTarget],
    ray: &Ray,
    only: Option<MeshId>,
) -> Option<SurfaceHit> {
    targets
        .iter()
        .filter(|target| only.is_none_or(|id| id == target.id))
        .fold(None, |best, target| closer(best, target.raycast(ray)))
}

/// Casts `ray` and its reverse; the hit nearer the origin wins, the forward
/// hit on ties.
pub fn raycast_double(
    targets: &[SnapTarget],
    ray: &Ray,
    only: Option<MeshId>,
) -> Option<SurfaceHit> {
    let forward = raycast_targets(targets, ray, only);
    let backward = raycast_targets(targets, &ray.inverted(), only);
    closer(forward, backward)
}

pub fn find_nearest_targets(targets: &[SnapTarget], point: Point3<f64>) -> Option<SurfaceHit> {
    targets
        .iter()
        .fold(None, |best, target| closer(best, target.find_nearest(point)))
}

/// Double raycast or nearest surface point, whichever lies closer to the ray
/// origin.
pub fn smart_find(targets: &[SnapTarget], ray: &Ray) -> Option<SurfaceHit> {
    let cast = raycast_double(targets, ray, None);
    let nearest = find_nearest_targets(targets, ray.origin);
    match (cast, nearest) {
        (Some(cast), Some(nearest)) if nearest.distance <= cast.distance => Some(nearest),
        (Some(cast), _) => Some(cast),
        (None, nearest) => nearest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retopo_geometry::InnerSpace;
    use retopo_mesh::MeshBuilder;

    fn plane_target(z: f64, pass_index: u32) -> SnapTarget {
        let object = MeshObject::new("plane", MeshBuilder::quad(4.0).unwrap())
            .with_matrix(Matrix4::from_translation(Vector3::new(0.0, 0.0, z)))
            .with_pass_index(pass_index);
        SnapTarget::from_object(&object)
    }

    #[test]
    fn face_index_encoding() {
        let index = encode_face_index(3, FaceId(42));
        assert_eq!(index, 30_000_042);
        assert_eq!(decode_face_index(index), (3, FaceId(42)));
    }

    #[test]
    fn nearest_target_wins() {
        let targets = vec![plane_target(-2.0, 1), plane_target(-1.0, 2)];
        let ray = Ray::new(Point3::new(0.5, 0.5, 3.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = raycast_targets(&targets, &ray, None).unwrap();
        assert_eq!(hit.target, targets[1].id);
        assert_eq!(hit.index, 20_000_000);
        assert!((hit.distance - 4.0).abs() < 1.0e-9);
        assert!((hit.normal - Vector3::new(0.0, 0.0, 1.0)).magnitude() < 1.0e-9);

        let only = raycast_targets(&targets, &ray, Some(targets[0].id)).unwrap();
        assert_eq!(only.target, targets[0].id);
    }

    #[test]
    fn double_cast_prefers_nearer_side() {
        let targets = vec![plane_target(1.0, 0), plane_target(-0.5, 1)];
        let up = Ray::new(Point3::new(0.0, 0.3, 0.0), Vector3::new(0.0, 0.0, 1.0));
        let hit = raycast_double(&targets, &up, None).unwrap();
        assert_eq!(hit.target, targets[1].id);
        assert!((hit.position.z + 0.5).abs() < 1.0e-9);
    }

    #[test]
    fn scaled_target_reports_world_distance() {
        let object = MeshObject::new("plane", MeshBuilder::quad(2.0).unwrap()).with_matrix(
            Matrix4::from_translation(Vector3::new(0.0, 0.0, -1.0)) * Matrix4::from_scale(3.0),
        );
        let targets = vec![SnapTarget::from_object(&object)];
        let ray = Ray::new(Point3::new(2.5, 0.0, 4.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = raycast_targets(&targets, &ray, None).unwrap();
        assert!((hit.distance - 5.0).abs() < 1.0e-9);
        assert!((hit.position - Point3::new(2.5, 0.0, -1.0)).magnitude() < 1.0e-9);
    }

    #[test]
    fn smart_find_falls_back_to_nearest() {
        let targets = vec![plane_target(0.0, 0)];
        // parallel to the plane: no ray hit either way
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.2), Vector3::new(1.0, 0.0, 0.0));
        let hit = smart_find(&targets, &ray).unwrap();
        assert!((hit.position - Point3::new(0.5, 0.5, 0.0)).magnitude() < 1.0e-9);
    }
}
