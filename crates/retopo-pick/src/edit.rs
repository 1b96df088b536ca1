use std::collections::BTreeMap;

use retopo_base::MeshId;
use retopo_geometry::{Matrix4, Point2};
use retopo_mesh::{Bvh, EdgeId, Mesh, VertexId};
use tracing::trace;

use crate::generation::EditGeneration;
use crate::projection::{ProjectionCache, ProjectionSource};
use crate::scene::MeshObject;
use crate::viewport::Viewport;

/// The object being retopologized together with its projection cache and a
/// local-space BVH over its faces.
#[derive(Clone, Debug)]
pub struct EditTarget {
    pub(crate) object: MeshObject,
    pub(crate) projection: ProjectionCache,
    pub(crate) bvh: Option<(u64, Bvh)>,
}

impl EditTarget {
    pub fn new(object: MeshObject, generation: EditGeneration) -> Self {
        Self {
            object,
            projection: ProjectionCache::new(generation),
            bvh: None,
        }
    }

    pub fn id(&self) -> MeshId {
        self.object.id
    }

    pub fn object(&self) -> &MeshObject {
        &self.object
    }

    pub fn mesh(&self) -> &Mesh {
        &self.object.mesh
    }

    pub fn matrix_world(&self) -> &Matrix4<f64> {
        &self.object.matrix_world
    }

    /// Mutable mesh access. Bumps the edit generation, so every cache sharing
    /// it recomputes on its next read.
    pub fn mesh_mut(&mut self) -> &mut Mesh {
        self.projection.invalidate();
        &mut self.object.mesh
    }

    pub fn set_matrix_world(&mut self, matrix_world: Matrix4<f64>) {
        self.object.matrix_world = matrix_world;
    }

    pub fn generation(&self) -> &EditGeneration {
        self.projection.generation()
    }

    pub fn projection(&self) -> &ProjectionCache {
        &self.projection
    }

    pub fn invalidate(&mut self) {
        self.projection.invalidate();
    }

    pub fn refresh_projection(&mut self, viewport: &Viewport, force: bool) {
        let source = source(&self.object, viewport);
        self.projection.refresh(&source, force);
    }

    pub fn vertex_screen_positions(
        &mut self,
        viewport: &Viewport,
    ) -> &BTreeMap<VertexId, Point2<f64>> {
        let source = source(&self.object, viewport);
        self.projection.vertex_positions(&source)
    }

    pub fn edge_screen_positions(
        &mut self,
        viewport: &Viewport,
    ) -> &BTreeMap<EdgeId, [Point2<f64>; 2]> {
        let source = source(&self.object, viewport);
        self.projection.edge_positions(&source)
    }

    pub fn boundary_vertex_positions(&mut self, viewport: &Viewport) -> &[(VertexId, Point2<f64>)] {
        let source = source(&self.object, viewport);
        self.projection.boundary_vertex_positions(&source)
    }

    pub fn boundary_edge_positions(
        &mut self,
        viewport: &Viewport,
    ) -> &BTreeMap<EdgeId, [Point2<f64>; 2]> {
        let source = source(&self.object, viewport);
        self.projection.boundary_edge_positions(&source)
    }

    pub(crate) fn ensure_bvh(&mut self) {
        let generation = self.projection.generation().current();
        let fresh = matches!(&self.bvh, Some((stamp, _)) if *stamp == generation);
        if !fresh {
            let bvh = Bvh::from_mesh(&self.object.mesh);
            trace!(triangles = bvh.triangle_count(), generation, "edit bvh rebuilt");
            self.bvh = Some((generation, bvh));
        }
    }

    pub fn into_object(self) -> MeshObject {
        self.object
    }
}

fn source<'a>(object: &'a MeshObject, viewport: &'a Viewport) -> ProjectionSource<'a> {
    ProjectionSource {
        mesh: &object.mesh,
        matrix_world: &object.matrix_world,
        viewport,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::Projection;
    use retopo_geometry::{Point3, Vector3};
    use retopo_mesh::MeshBuilder;

    fn top_view() -> Viewport {
        Viewport::look_at(
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Projection::default(),
            800.0,
            600.0,
        )
    }

    #[test]
    fn editing_invalidates_sibling_caches() {
        let generation = EditGeneration::new();
        let quad = MeshBuilder::quad(2.0).unwrap();
        let mut first = EditTarget::new(MeshObject::new("a", quad.clone()), generation.clone());
        let mut second = EditTarget::new(MeshObject::new("b", quad), generation);
        let view = top_view();

        first.vertex_screen_positions(&view);
        second.vertex_screen_positions(&view);
        let stamp = second.projection().stamp();

        first.mesh_mut().set_position(VertexId(0), Point3::new(-2.0, -2.0, 0.0));
        second.vertex_screen_positions(&view);
        assert_ne!(second.projection().stamp(), stamp);
        assert_eq!(second.projection().recompute_count(), 2);
    }

    #[test]
    fn bvh_follows_generation() {
        let mut target = EditTarget::new(
            MeshObject::new("quad", MeshBuilder::quad(2.0).unwrap()),
            EditGeneration::new(),
        );
        target.ensure_bvh();
        let stamp = target.bvh.as_ref().map(|(stamp, _)| *stamp);
        target.ensure_bvh();
        assert_eq!(target.bvh.as_ref().map(|(stamp, _)| *stamp), stamp);
        target.mesh_mut();
        target.ensure_bvh();
        assert_ne!(target.bvh.as_ref().map(|(stamp, _)| *stamp), stamp);
    }
}
