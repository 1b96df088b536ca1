use std::collections::BTreeMap;

use retopo_geometry::{Matrix4, Point2};
use retopo_mesh::{EdgeId, Mesh, VertexId};
use tracing::trace;

use crate::generation::EditGeneration;
use crate::viewport::{Viewport, project_with};

/// Inputs a projection is computed from.
#[derive(Clone, Copy, Debug)]
pub struct ProjectionSource<'a> {
    pub mesh: &'a Mesh,
    pub matrix_world: &'a Matrix4<f64>,
    pub viewport: &'a Viewport,
}

#[derive(Clone, Debug, Default)]
struct Projected {
    verts: BTreeMap<VertexId, Point2<f64>>,
    edges: BTreeMap<EdgeId, [Point2<f64>; 2]>,
}

/// Screen positions of the visible vertices and edges of one mesh, reused
/// until the combined screen matrix (region scale, projection, view, model)
/// or the edit generation changes.
#[derive(Clone, Debug)]
pub struct ProjectionCache {
    generation: EditGeneration,
    stamp: u64,
    matrix: Option<Matrix4<f64>>,
    projected: Option<Projected>,
    boundary_verts: Option<Vec<(VertexId, Point2<f64>)>>,
    boundary_edges: Option<BTreeMap<EdgeId, [Point2<f64>; 2]>>,
    recomputes: u64,
}

impl ProjectionCache {
    pub fn new(generation: EditGeneration) -> Self {
        let stamp = generation.current();
        Self {
            generation,
            stamp,
            matrix: None,
            projected: None,
            boundary_verts: None,
            boundary_edges: None,
            recomputes: 0,
        }
    }

    pub fn generation(&self) -> &EditGeneration {
        &self.generation
    }

    /// Generation the cached data was validated against.
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    /// Pixel-scaled projection x model matrix of the cached positions.
    pub fn matrix(&self) -> Option<&Matrix4<f64>> {
        self.matrix.as_ref()
    }

    /// Bumps the shared generation so this and every sibling cache rebuilds
    /// on its next read.
    pub fn invalidate(&mut self) {
        self.generation.bump();
        self.check_dirty();
    }

    pub fn refresh(&mut self, source: &ProjectionSource<'_>, force: bool) {
        self.ensure(source, force);
    }

    pub fn vertex_positions(
        &mut self,
        source: &ProjectionSource<'_>,
    ) -> &BTreeMap<VertexId, Point2<f64>> {
        &self.ensure(source, false).verts
    }

    pub fn edge_positions(
        &mut self,
        source: &ProjectionSource<'_>,
    ) -> &BTreeMap<EdgeId, [Point2<f64>; 2]> {
        &self.ensure(source, false).edges
    }

    /// Projected vertices that are boundary, wire or non-manifold.
    pub fn boundary_vertex_positions(
        &mut self,
        source: &ProjectionSource<'_>,
    ) -> &[(VertexId, Point2<f64>)] {
        self.ensure(source, false);
        if self.boundary_verts.is_none() {
            let verts = self
                .projected
                .as_ref()
                .map(|projected| {
                    projected
                        .verts
                        .iter()
                        .filter(|(id, _)| source.mesh.classify_vertex(**id).is_ring())
                        .map(|(id, coord)| (*id, *coord))
                        .collect()
                })
                .unwrap_or_default();
            self.boundary_verts = Some(verts);
        }
        self.boundary_verts.get_or_insert_with(Vec::new)
    }

    /// Projected edges with at most one linked face.
    pub fn boundary_edge_positions(
        &mut self,
        source: &ProjectionSource<'_>,
    ) -> &BTreeMap<EdgeId, [Point2<f64>; 2]> {
        self.ensure(source, false);
        if self.boundary_edges.is_none() {
            let edges = self
                .projected
                .as_ref()
                .map(|projected| {
                    projected
                        .edges
                        .iter()
                        .filter(|(id, _)| source.mesh.edge(**id).link_faces().len() <= 1)
                        .map(|(id, coords)| (*id, *coords))
                        .collect()
                })
                .unwrap_or_default();
            self.boundary_edges = Some(edges);
        }
        self.boundary_edges.get_or_insert_with(BTreeMap::new)
    }

    fn check_dirty(&mut self) {
        let current = self.generation.current();
        if current != self.stamp {
            self.stamp = current;
            self.clear();
        }
    }

    fn clear(&mut self) {
        self.matrix = None;
        self.projected = None;
        self.boundary_verts = None;
        self.boundary_edges = None;
    }

    fn ensure(&mut self, source: &ProjectionSource<'_>, force: bool) -> &Projected {
        self.check_dirty();
        let matrix = source.viewport.screen_matrix(source.matrix_world);
        let stale = force || self.projected.is_none() || self.matrix != Some(matrix);
        if stale {
            self.clear();
            let projected = project_mesh(source, &matrix);
            self.recomputes += 1;
            trace!(
                verts = projected.verts.len(),
                edges = projected.edges.len(),
                generation = self.stamp,
                "projection recomputed"
            );
            self.matrix = Some(matrix);
            self.projected = Some(projected);
        }
        self.projected.get_or_insert_with(Projected::default)
    }
}

fn project_mesh(source: &ProjectionSource<'_>, matrix: &Matrix4<f64>) -> Projected {
    let half_size = source.viewport.half_size();
    let mesh = source.mesh;

    let verts: BTreeMap<VertexId, Point2<f64>> = mesh
        .vertices()
        .filter(|(_, vertex)| !vertex.hidden)
        .filter_map(|(id, vertex)| {
            project_with(matrix, half_size, vertex.position).map(|coord| (id, coord))
        })
        .collect();

    let edges = mesh
        .edges()
        .filter(|(_, edge)| !edge.hidden)
        .filter_map(|(id, edge)| {
            let a = verts.get(&edge.verts[0])?;
            let b = verts.get(&edge.verts[1])?;
            Some((id, [*a, *b]))
        })
        .collect();

    Projected { verts, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::Projection;
    use retopo_geometry::{Point3, SquareMatrix, Vector3};
    use retopo_mesh::MeshBuilder;

    fn view_from(eye: Point3<f64>, target: Point3<f64>, up: Vector3<f64>) -> Viewport {
        Viewport::look_at(
            eye,
            target,
            up,
            Projection::Perspective {
                fovy_deg: 60.0,
                near: 0.1,
                far: 100.0,
            },
            800.0,
            600.0,
        )
    }

    #[test]
    fn vertices_behind_the_eye_are_dropped() {
        let quad = MeshBuilder::quad(2.0).unwrap();
        let identity = Matrix4::identity();
        let view = view_from(
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, 1.0),
        );
        let source = ProjectionSource {
            mesh: &quad,
            matrix_world: &identity,
            viewport: &view,
        };
        let mut cache = ProjectionCache::new(EditGeneration::new());
        let verts: Vec<VertexId> = cache.vertex_positions(&source).keys().copied().collect();
        assert_eq!(verts, vec![VertexId(1), VertexId(2)]);
        let edges = cache.edge_positions(&source);
        assert_eq!(edges.len(), 1);
        assert_eq!(quad.edge(*edges.keys().next().unwrap()).verts, [VertexId(1), VertexId(2)]);
    }

    #[test]
    fn hidden_elements_are_excluded() {
        let mut quad = MeshBuilder::quad(2.0).unwrap();
        quad.set_vertex_hidden(VertexId(0), true);
        let identity = Matrix4::identity();
        let view = view_from(
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        let source = ProjectionSource {
            mesh: &quad,
            matrix_world: &identity,
            viewport: &view,
        };
        let mut cache = ProjectionCache::new(EditGeneration::new());
        assert_eq!(cache.vertex_positions(&source).len(), 3);
        // both edges touching vertex 0 go with it
        assert_eq!(cache.edge_positions(&source).len(), 2);
        assert_eq!(cache.boundary_vertex_positions(&source).len(), 3);
        assert_eq!(cache.recompute_count(), 1);
    }

    #[test]
    fn forced_refresh_recomputes() {
        let quad = MeshBuilder::quad(2.0).unwrap();
        let identity = Matrix4::identity();
        let view = view_from(
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        let source = ProjectionSource {
            mesh: &quad,
            matrix_world: &identity,
            viewport: &view,
        };
        let mut cache = ProjectionCache::new(EditGeneration::new());
        cache.refresh(&source, false);
        cache.refresh(&source, false);
        assert_eq!(cache.recompute_count(), 1);
        cache.refresh(&source, true);
        assert_eq!(cache.recompute_count(), 2);
    }
}
