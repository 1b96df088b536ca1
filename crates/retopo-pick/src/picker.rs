use std::cmp::Ordering;
use std::collections::HashSet;

use retopo_base::PickSettings;
use retopo_geometry::screen::{axis_distance, distance2, segment_hit};
use retopo_geometry::{InnerSpace, MetricSpace, Point2, Ray, transform_point};
use retopo_mesh::{EdgeId, FaceId, VertexId};
use tracing::trace;

use crate::edit::EditTarget;
use crate::element::{ElementItem, ElementKinds};
use crate::projection::ProjectionSource;
use crate::viewport::{Viewport, project_with};

/// Step past a surface hit before casting again. Consecutive hits closer than
/// this end the walk.
const FACE_WALK_EPS: f64 = 1.0e-5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickOptions {
    /// Pixels; per axis for vertices, perpendicular distance for edges.
    pub radius: f64,
    /// Only boundary, wire and non-manifold elements.
    pub ring_only: bool,
    pub backface_culling: bool,
}

impl PickOptions {
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            ring_only: false,
            backface_culling: true,
        }
    }

    pub fn ring_only(mut self, ring_only: bool) -> Self {
        self.ring_only = ring_only;
        self
    }

    pub fn backface_culling(mut self, backface_culling: bool) -> Self {
        self.backface_culling = backface_culling;
        self
    }
}

impl From<&PickSettings> for PickOptions {
    fn from(settings: &PickSettings) -> Self {
        Self {
            radius: settings.highlight_radius,
            ring_only: false,
            backface_culling: settings.backface_culling,
        }
    }
}

impl EditTarget {
    /// Vertices whose projection lies within `radius` of `coord` on both
    /// axes, nearest first.
    pub fn pick_vertices(
        &mut self,
        viewport: &Viewport,
        coord: Point2<f64>,
        options: &PickOptions,
        ignore: &HashSet<VertexId>,
    ) -> Vec<ElementItem> {
        let matrix_world = self.object.matrix_world;
        let world_ray = viewport.ray_from_screen(coord);
        let local_ray = if options.backface_culling {
            world_ray.and_then(|ray| ray.world_to_object(&matrix_world))
        } else {
            None
        };

        let mesh = &self.object.mesh;
        let source = ProjectionSource {
            mesh,
            matrix_world: &matrix_world,
            viewport,
        };
        let positions = self.projection.vertex_positions(&source);

        let mut hits: Vec<(VertexId, Point2<f64>, f64)> = Vec::new();
        for (id, screen) in positions {
            if ignore.contains(id) || axis_distance(*screen, coord) > options.radius {
                continue;
            }
            let Some(vertex) = mesh.get_vertex(*id) else {
                continue;
            };
            let class = mesh.classify_vertex(*id);
            if options.ring_only && !class.is_ring() {
                continue;
            }
            if let Some(ray) = &local_ray {
                if class.is_cullable() && vertex.normal.dot(ray.direction) >= 0.0 {
                    continue;
                }
            }
            hits.push((*id, *screen, distance2(*screen, coord)));
        }
        hits.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal));

        trace!(count = hits.len(), radius = options.radius, "pick vertices");
        hits.into_iter()
            .map(|(id, screen, _)| {
                let world = transform_point(&matrix_world, mesh.vertex(id).position);
                ElementItem::Vertex {
                    id,
                    coord: screen,
                    world,
                    distance: world_ray.map_or(0.0, |ray| ray.distance_to(world)),
                }
            })
            .collect()
    }

    /// Edges passing within `radius` of `coord`, each tagged with the point of
    /// the edge nearest the view ray, nearest first.
    pub fn pick_edges(
        &mut self,
        viewport: &Viewport,
        coord: Point2<f64>,
        options: &PickOptions,
        ignore: &HashSet<EdgeId>,
    ) -> Vec<ElementItem> {
        let Some(world_ray) = viewport.ray_from_screen(coord) else {
            return Vec::new();
        };
        let matrix_world = self.object.matrix_world;
        let local_ray = if options.backface_culling {
            world_ray.world_to_object(&matrix_world)
        } else {
            None
        };

        let mesh = &self.object.mesh;
        let source = ProjectionSource {
            mesh,
            matrix_world: &matrix_world,
            viewport,
        };
        let positions = self.projection.edge_positions(&source);

        let mut hits: Vec<(ElementItem, f64)> = Vec::new();
        for (id, [p0, p1]) in positions {
            if ignore.contains(id) {
                continue;
            }
            let Some(edge) = mesh.get_edge(*id) else {
                continue;
            };
            if options.ring_only && edge.link_faces().len() > 1 {
                continue;
            }
            if !segment_hit(coord, *p0, *p1, options.radius) {
                continue;
            }
            let v0 = mesh.vertex(edge.verts[0]);
            let v1 = mesh.vertex(edge.verts[1]);
            if let Some(ray) = &local_ray {
                let facing_away = v0.normal.dot(ray.direction) >= 0.0
                    && v1.normal.dot(ray.direction) >= 0.0;
                if mesh.classify_edge(*id).is_cullable() && facing_away {
                    continue;
                }
            }

            let a = transform_point(&matrix_world, v0.position);
            let b = transform_point(&matrix_world, v1.position);
            let Some((world, along)) = world_ray.closest_point_on_segment(a, b) else {
                continue;
            };
            let screen = viewport.project(world).unwrap_or(coord);
            let item = ElementItem::Edge {
                id: *id,
                coord: screen,
                world,
                distance: along,
            };
            hits.push((item, distance2(screen, coord)));
        }
        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        trace!(count = hits.len(), radius = options.radius, "pick edges");
        hits.into_iter().map(|(item, _)| item).collect()
    }

    /// First visible non-ignored face along the view ray. Hidden and ignored
    /// faces are walked through; a back-facing first face yields `Empty`
    /// while culling is on.
    pub fn pick_face(
        &mut self,
        viewport: &Viewport,
        coord: Point2<f64>,
        ignore: &HashSet<FaceId>,
        backface_culling: bool,
    ) -> ElementItem {
        let Some(world_ray) = viewport.ray_from_screen(coord) else {
            return ElementItem::Empty;
        };
        let matrix_world = self.object.matrix_world;
        let Some(mut ray) = world_ray.world_to_object(&matrix_world) else {
            return ElementItem::Empty;
        };
        self.ensure_bvh();
        let Some((_, bvh)) = &self.bvh else {
            return ElementItem::Empty;
        };
        let mesh = &self.object.mesh;

        let mut previous = ray.origin;
        let mut hit = bvh.ray_cast(ray.origin, ray.direction);
        while let Some(current) = hit {
            if current.position.distance(previous) < FACE_WALK_EPS {
                break;
            }
            previous = current.position;
            let shown = mesh.get_face(current.face).filter(|face| !face.hidden);
            if let Some(face) = shown {
                if !ignore.contains(&current.face) {
                    if backface_culling && face.normal.dot(ray.direction) >= 0.0 {
                        return ElementItem::Empty;
                    }
                    let world = transform_point(&matrix_world, current.position);
                    return ElementItem::Face {
                        id: current.face,
                        coord,
                        world,
                        distance: world_ray.distance_to(world),
                    };
                }
            }
            ray = Ray {
                origin: current.position + ray.direction * FACE_WALK_EPS,
                direction: ray.direction,
            };
            hit = bvh.ray_cast(ray.origin, ray.direction);
        }
        ElementItem::Empty
    }

    /// Nearest vertex, else nearest edge, else the face under the cursor,
    /// limited to `kinds`.
    pub fn pick_element(
        &mut self,
        viewport: &Viewport,
        coord: Point2<f64>,
        settings: &PickSettings,
        kinds: ElementKinds,
    ) -> ElementItem {
        let options = PickOptions::from(settings);
        if kinds.vertex {
            let verts = self.pick_vertices(viewport, coord, &options, &HashSet::new());
            if let Some(item) = verts.into_iter().next() {
                return item;
            }
        }
        if kinds.edge {
            let edges = self.pick_edges(viewport, coord, &options, &HashSet::new());
            if let Some(item) = edges.into_iter().next() {
                return item;
            }
        }
        if kinds.face {
            return self.pick_face(viewport, coord, &HashSet::new(), options.backface_culling);
        }
        ElementItem::Empty
    }

    /// Vertex of `element` within `radius` pixels of `mouse`, using a fresh
    /// projection.
    pub fn check_hit_element_vert(
        &self,
        viewport: &Viewport,
        element: &ElementItem,
        mouse: Point2<f64>,
        radius: f64,
    ) -> Option<VertexId> {
        let mesh = &self.object.mesh;
        let matrix = viewport.screen_matrix(&self.object.matrix_world);
        let half_size = viewport.half_size();
        element.vertices(mesh).into_iter().find(|id| {
            project_with(&matrix, half_size, mesh.vertex(*id).position)
                .is_some_and(|screen| screen.distance(mouse) <= radius)
        })
    }

    /// Edge of `element` passing within `radius` pixels of `mouse`, using a
    /// fresh projection.
    pub fn check_hit_element_edge(
        &self,
        viewport: &Viewport,
        element: &ElementItem,
        mouse: Point2<f64>,
        radius: f64,
    ) -> Option<EdgeId> {
        let mesh = &self.object.mesh;
        let matrix = viewport.screen_matrix(&self.object.matrix_world);
        let half_size = viewport.half_size();
        element.edges(mesh).into_iter().find(|id| {
            let [a, b] = mesh.edge(*id).verts;
            let p0 = project_with(&matrix, half_size, mesh.vertex(a).position);
            let p1 = project_with(&matrix, half_size, mesh.vertex(b).position);
            match (p0, p1) {
                (Some(p0), Some(p1)) => segment_hit(mouse, p0, p1, radius),
                _ => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::EditGeneration;
    use crate::scene::MeshObject;
    use crate::viewport::Projection;
    use retopo_geometry::{Point3, Vector3};
    use retopo_mesh::MeshBuilder;

    fn view(eye_z: f64) -> Viewport {
        Viewport::look_at(
            Point3::new(0.0, 0.0, eye_z),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Projection::Perspective {
                fovy_deg: 60.0,
                near: 0.1,
                far: 100.0,
            },
            800.0,
            600.0,
        )
    }

    fn grid_target() -> EditTarget {
        EditTarget::new(
            MeshObject::new("grid", MeshBuilder::grid(2, 2, 2.0).unwrap()),
            EditGeneration::new(),
        )
    }

    #[test]
    fn interior_vertex_is_culled_from_behind() {
        let mut target = grid_target();
        let below = view(-5.0);
        let centre = Point2::new(400.0, 300.0);
        let options = PickOptions::new(500.0);

        let culled = target.pick_vertices(&below, centre, &options, &HashSet::new());
        assert_eq!(culled.len(), 8);
        assert!(culled.iter().all(|item| !matches!(
            item,
            ElementItem::Vertex { id: VertexId(4), .. }
        )));

        let all = target.pick_vertices(
            &below,
            centre,
            &options.backface_culling(false),
            &HashSet::new(),
        );
        assert_eq!(all.len(), 9);
        assert!(matches!(all[0], ElementItem::Vertex { id: VertexId(4), .. }));
    }

    fn edge_ids(items: &[ElementItem]) -> HashSet<EdgeId> {
        items
            .iter()
            .filter_map(|item| match item {
                ElementItem::Edge { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn interior_edges_are_culled_from_behind() {
        let mut target = grid_target();
        let below = view(-5.0);
        let centre = Point2::new(400.0, 300.0);
        let options = PickOptions::new(500.0);

        let culled = target.pick_edges(&below, centre, &options, &HashSet::new());
        assert_eq!(culled.len(), 8);
        let mesh = target.mesh();
        let boundary: HashSet<EdgeId> = mesh
            .edges()
            .filter(|(_, edge)| edge.link_faces().len() == 1)
            .map(|(id, _)| id)
            .collect();
        assert_eq!(edge_ids(&culled), boundary);

        let all = target.pick_edges(
            &below,
            centre,
            &options.backface_culling(false),
            &HashSet::new(),
        );
        assert_eq!(all.len(), 12);
    }

    #[test]
    fn ignored_edge_is_skipped() {
        let mut target = grid_target();
        let above = view(5.0);
        let centre = Point2::new(400.0, 300.0);
        let options = PickOptions::new(500.0);

        let all = target.pick_edges(&above, centre, &options, &HashSet::new());
        assert_eq!(all.len(), 12);
        let ElementItem::Edge { id: skipped, .. } = all[0] else {
            panic!("expected an edge, got {:?}", all[0]);
        };
        let ignore: HashSet<EdgeId> = [skipped].into_iter().collect();
        let rest = target.pick_edges(&above, centre, &options, &ignore);
        assert_eq!(rest.len(), 11);
        assert!(!edge_ids(&rest).contains(&skipped));
    }

    #[test]
    fn ring_only_skips_interior() {
        let mut target = grid_target();
        let above = view(5.0);
        let options = PickOptions::new(500.0).ring_only(true);
        let centre = Point2::new(400.0, 300.0);
        let verts = target.pick_vertices(&above, centre, &options, &HashSet::new());
        assert_eq!(verts.len(), 8);
        let edges = target.pick_edges(&above, centre, &options, &HashSet::new());
        assert_eq!(edges.len(), 8);
        assert!(edges.iter().all(|item| match item {
            ElementItem::Edge { id, .. } => target.mesh().edge(*id).link_faces().len() == 1,
            _ => false,
        }));
    }

    #[test]
    fn back_facing_face_is_empty_with_culling() {
        let mut target = grid_target();
        let below = view(-5.0);
        let coord = Point2::new(420.0, 320.0);
        assert!(target.pick_face(&below, coord, &HashSet::new(), true).is_empty());
        assert!(target.pick_face(&below, coord, &HashSet::new(), false).is_face());
    }
}
