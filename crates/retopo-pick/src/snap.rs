use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use retopo_base::{Axis, MeshId};
use retopo_geometry::{
    Matrix4, MetricSpace, Point3, Ray, SquareMatrix, component, transform_point, with_component,
};
use retopo_mesh::VertexId;
use tracing::debug;

use crate::edit::EditTarget;
use crate::raycast::{
    SnapTarget, SurfaceHit, find_nearest_targets, raycast_double, raycast_targets, smart_find,
};
use crate::scene::Scene;
use crate::viewport::Viewport;

#[derive(Debug, Default)]
struct SnapState {
    refs: usize,
    targets: Option<Vec<SnapTarget>>,
    double_threshold: f64,
    builds: u64,
}

impl SnapState {
    fn refresh(&mut self, scene: &Scene) {
        self.double_threshold = scene.snap.double_threshold;
        if !scene.snap.use_snap {
            self.teardown();
            return;
        }
        let wanted: BTreeSet<MeshId> = scene.snap_candidates().map(|object| object.id).collect();
        if let Some(targets) = &mut self.targets {
            let current: BTreeSet<MeshId> = targets.iter().map(|target| target.id).collect();
            if current == wanted {
                for target in targets.iter_mut() {
                    if let Some(object) = scene.object(target.id) {
                        target.set_matrix_world(object.matrix_world);
                    }
                }
                return;
            }
        }
        self.build(scene);
    }

    fn build(&mut self, scene: &Scene) {
        let targets: Vec<SnapTarget> = scene
            .snap_candidates()
            .map(SnapTarget::from_object)
            .collect();
        self.builds += 1;
        debug!(targets = targets.len(), builds = self.builds, "snap targets built");
        self.targets = Some(targets);
    }

    fn teardown(&mut self) {
        if self.targets.take().is_some() {
            debug!("snap targets released");
        }
    }

    /// Targets when snapping is live and there is something to snap to.
    fn live_targets(&self) -> Option<&[SnapTarget]> {
        self.targets.as_deref().filter(|targets| !targets.is_empty())
    }

    fn zero_axis(&self, point: Point3<f64>, axis: Option<Axis>) -> Option<Axis> {
        axis.filter(|axis| component(point, *axis).abs() <= self.double_threshold)
    }
}

/// Reference-counted owner of the snap target set shared by every active
/// tool. Targets exist while at least one [`SnapHandle`] is alive.
#[derive(Clone, Debug, Default)]
pub struct SnapRegistry {
    state: Rc<RefCell<SnapState>>,
}

impl SnapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a reference; the first one builds the targets from `scene`.
    pub fn acquire(&self, scene: &Scene) -> SnapHandle {
        let mut state = self.state.borrow_mut();
        if state.refs == 0 {
            state.refresh(scene);
        }
        state.refs += 1;
        debug!(refs = state.refs, "snap acquired");
        SnapHandle {
            state: Rc::clone(&self.state),
        }
    }

    /// Rebuilds only when the candidate set changed or snapping was turned
    /// off. No-op while nothing holds a reference.
    pub fn refresh(&self, scene: &Scene) {
        let mut state = self.state.borrow_mut();
        if state.refs > 0 {
            state.refresh(scene);
        }
    }

    pub fn ref_count(&self) -> usize {
        self.state.borrow().refs
    }

    pub fn has_targets(&self) -> bool {
        self.state.borrow().targets.is_some()
    }

    pub fn target_count(&self) -> usize {
        self.state.borrow().targets.as_ref().map_or(0, Vec::len)
    }

    /// Number of target-set builds so far.
    pub fn build_count(&self) -> u64 {
        self.state.borrow().builds
    }
}

/// One tool's reference to the shared snap targets. Dropping the last handle
/// releases them.
#[derive(Debug)]
pub struct SnapHandle {
    state: Rc<RefCell<SnapState>>,
}

impl Drop for SnapHandle {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.refs = state.refs.saturating_sub(1);
        debug!(refs = state.refs, "snap released");
        if state.refs == 0 {
            state.teardown();
        }
    }
}

impl SnapHandle {
    pub fn refresh(&self, scene: &Scene) {
        self.state.borrow_mut().refresh(scene);
    }

    pub fn is_enabled(&self) -> bool {
        self.state.borrow().targets.is_some()
    }

    pub fn double_threshold(&self) -> f64 {
        self.state.borrow().double_threshold
    }

    pub fn find_nearest(&self, point: Point3<f64>) -> Option<SurfaceHit> {
        let state = self.state.borrow();
        find_nearest_targets(state.live_targets()?, point)
    }

    /// Nearest surface point, or `point` itself without targets.
    pub fn nearest_point(&self, point: Point3<f64>) -> Point3<f64> {
        self.find_nearest(point).map_or(point, |hit| hit.position)
    }

    pub fn raycast(&self, ray: &Ray, only: Option<MeshId>) -> Option<SurfaceHit> {
        let state = self.state.borrow();
        raycast_targets(state.live_targets()?, ray, only)
    }

    pub fn raycast_double(&self, ray: &Ray, only: Option<MeshId>) -> Option<SurfaceHit> {
        let state = self.state.borrow();
        raycast_double(state.live_targets()?, ray, only)
    }

    pub fn smart_find(&self, ray: &Ray) -> Option<SurfaceHit> {
        let state = self.state.borrow();
        smart_find(state.live_targets()?, ray)
    }

    /// Snaps a world point. With `zero_axis` set, a snapped point lying
    /// within the merge threshold of that symmetry plane is put on it.
    pub fn adjust_point(&self, world: Point3<f64>, zero_axis: Option<Axis>) -> Point3<f64> {
        let location = self.nearest_point(world);
        match self.state.borrow().zero_axis(location, zero_axis) {
            Some(axis) => with_component(location, axis, 0.0),
            None => location,
        }
    }

    /// Snaps an object-space point of an object placed by `matrix_world`.
    /// The symmetry test uses the input point.
    pub fn adjust_local(
        &self,
        matrix_world: &Matrix4<f64>,
        local: Point3<f64>,
        zero_axis: Option<Axis>,
    ) -> Point3<f64> {
        let world = transform_point(matrix_world, local);
        let snapped = match (self.find_nearest(world), matrix_world.invert()) {
            (Some(hit), Some(inverse)) => transform_point(&inverse, hit.position),
            _ => local,
        };
        match self.state.borrow().zero_axis(local, zero_axis) {
            Some(axis) => with_component(snapped, axis, 0.0),
            None => snapped,
        }
    }

    /// Like [`SnapHandle::adjust_local`] but returns the world position.
    pub fn adjust_local_to_world(
        &self,
        matrix_world: &Matrix4<f64>,
        local: Point3<f64>,
        zero_axis: Option<Axis>,
    ) -> Point3<f64> {
        let location = self.nearest_point(transform_point(matrix_world, local));
        match self.state.borrow().zero_axis(local, zero_axis) {
            Some(axis) => with_component(location, axis, 0.0),
            None => location,
        }
    }

    /// Moves `verts` of `target` onto the nearest target surface, leaving
    /// vertices without a hit in place. Returns how many moved.
    pub fn adjust_verts(
        &self,
        target: &mut EditTarget,
        verts: &[VertexId],
        zero_axis: Option<Axis>,
    ) -> usize {
        let matrix_world = *target.matrix_world();
        let Some(inverse) = matrix_world.invert() else {
            return 0;
        };
        let moves: Vec<(VertexId, Point3<f64>)> = {
            let state = self.state.borrow();
            let Some(targets) = state.live_targets() else {
                return 0;
            };
            verts
                .iter()
                .filter_map(|id| {
                    let local = target.mesh().get_vertex(*id)?.position;
                    let world = transform_point(&matrix_world, local);
                    let hit = find_nearest_targets(targets, world)?;
                    let mut snapped = transform_point(&inverse, hit.position);
                    if let Some(axis) = state.zero_axis(local, zero_axis) {
                        snapped = with_component(snapped, axis, 0.0);
                    }
                    Some((*id, snapped))
                })
                .collect()
        };
        if moves.is_empty() {
            return 0;
        }
        let mesh = target.mesh_mut();
        for (id, position) in &moves {
            mesh.set_position(*id, *position);
        }
        mesh.recalc_normals();
        debug!(moved = moves.len(), "vertices snapped");
        moves.len()
    }

    /// Whether `world` is the surface point actually seen from the camera,
    /// rather than one hidden behind another target surface.
    pub fn is_point_on_visible_surface(
        &self,
        viewport: &Viewport,
        world: Point3<f64>,
        only: Option<MeshId>,
    ) -> bool {
        let state = self.state.borrow();
        let Some(targets) = state.live_targets() else {
            return true;
        };
        let threshold = state.double_threshold;
        let Some(ray) = viewport.ray_from_world(world) else {
            return true;
        };
        let Some(hit) = raycast_targets(targets, &ray, only) else {
            return true;
        };

        let view_to_hit = ray.origin.distance(hit.position);
        let view_to_world = ray.origin.distance(world);
        if (view_to_hit - view_to_world).abs() <= threshold {
            return true;
        }

        let beyond = Ray {
            origin: hit.position + ray.direction * threshold,
            direction: ray.direction,
        };
        let Some(second) = raycast_targets(targets, &beyond, only) else {
            return false;
        };
        let hit_to_hit = beyond.origin.distance(second.position);
        let start_to_world = beyond.origin.distance(world);
        let world_to_second = world.distance(second.position);
        if start_to_world >= hit_to_hit {
            return false;
        }
        if start_to_world >= world_to_second {
            return false;
        }
        true
    }

    /// First target surface along the view ray through `world`, or `world`
    /// when nothing is hit.
    pub fn view_adjust(&self, viewport: &Viewport, world: Point3<f64>) -> Point3<f64> {
        viewport
            .ray_from_world(world)
            .and_then(|ray| self.raycast(&ray, None))
            .map_or(world, |hit| hit.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MeshObject;
    use retopo_base::SnapSettings;
    use retopo_mesh::MeshBuilder;

    fn scene_with_plane() -> Scene {
        let mut scene = Scene::new(SnapSettings::default());
        scene.add(MeshObject::new("floor", MeshBuilder::quad(4.0).unwrap()));
        scene
    }

    #[test]
    fn last_release_tears_targets_down() {
        let scene = scene_with_plane();
        let registry = SnapRegistry::new();
        let first = registry.acquire(&scene);
        let second = registry.acquire(&scene);
        assert_eq!(registry.ref_count(), 2);
        assert_eq!(registry.build_count(), 1);
        drop(first);
        assert!(registry.has_targets());
        drop(second);
        assert_eq!(registry.ref_count(), 0);
        assert!(!registry.has_targets());
    }

    #[test]
    fn refresh_rebuilds_only_on_set_change() {
        let mut scene = scene_with_plane();
        let registry = SnapRegistry::new();
        let handle = registry.acquire(&scene);
        registry.refresh(&scene);
        assert_eq!(registry.build_count(), 1);

        scene.add(MeshObject::new("wall", MeshBuilder::quad(1.0).unwrap()));
        registry.refresh(&scene);
        assert_eq!(registry.build_count(), 2);
        assert_eq!(registry.target_count(), 2);

        scene.snap.use_snap = false;
        handle.refresh(&scene);
        assert!(!handle.is_enabled());
        let p = Point3::new(0.3, 0.1, 0.7);
        assert_eq!(handle.adjust_point(p, None), p);
    }

    #[test]
    fn zero_axis_snaps_near_plane_points() {
        let scene = scene_with_plane();
        let registry = SnapRegistry::new();
        let handle = registry.acquire(&scene);
        let near = handle.adjust_point(Point3::new(0.00005, 0.2, 0.3), Some(Axis::X));
        assert_eq!(near.x, 0.0);
        assert!(near.distance(Point3::new(0.0, 0.2, 0.0)) < 1.0e-9);
        let far = handle.adjust_point(Point3::new(0.5, 0.2, 0.3), Some(Axis::X));
        assert!((far.x - 0.5).abs() < 1.0e-12);
    }
}
