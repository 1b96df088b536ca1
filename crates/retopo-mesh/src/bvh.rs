use std::cmp::Ordering;

use retopo_geometry::triangle::{closest_point_on_triangle, ray_intersect_triangle, triangle_normal};
use retopo_geometry::{InnerSpace, Point3, Vector3, max_point, min_point};

use crate::{FaceId, Mesh};

const BVH_LEAF_SIZE: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BvhHit {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
    pub face: FaceId,
    pub distance: f64,
}

/// Bounding-volume hierarchy over the fan-triangulated faces of a mesh, in
/// the mesh's local space.
#[derive(Clone, Debug, Default)]
pub struct Bvh {
    positions: Vec<Point3<f64>>,
    triangles: Vec<[usize; 3]>,
    tri_faces: Vec<FaceId>,
    nodes: Vec<BvhNode>,
    indices: Vec<usize>,
}

#[derive(Clone, Copy, Debug)]
struct BvhNode {
    bounds: (Point3<f64>, Point3<f64>),
    left: Option<usize>,
    right: Option<usize>,
    start: usize,
    count: usize,
}

impl Bvh {
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let positions: Vec<Point3<f64>> = mesh.vertices().map(|(_, v)| v.position).collect();
        let mut triangles = Vec::new();
        let mut tri_faces = Vec::new();
        for (id, face) in mesh.faces() {
            let verts = face.verts();
            for idx in 1..(verts.len() - 1) {
                triangles.push([
                    verts[0].index(),
                    verts[idx].index(),
                    verts[idx + 1].index(),
                ]);
                tri_faces.push(id);
            }
        }
        Self::build(positions, triangles, tri_faces)
    }

    /// Each triangle becomes its own face.
    pub fn from_triangles(positions: Vec<Point3<f64>>, triangles: Vec<[usize; 3]>) -> Self {
        let tri_faces = (0..triangles.len()).map(|idx| FaceId(idx as u32)).collect();
        Self::build(positions, triangles, tri_faces)
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Closest hit with a strictly positive ray parameter.
    pub fn ray_cast(&self, origin: Point3<f64>, dir: Vector3<f64>) -> Option<BvhHit> {
        if self.nodes.is_empty() {
            return None;
        }
        let len = dir.magnitude();
        if len <= f64::EPSILON {
            return None;
        }
        let dir = dir / len;

        let mut best_t = f64::INFINITY;
        let mut best_tri = None;
        let mut stack = vec![0usize];

        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            if ray_aabb_interval(origin, dir, node.bounds, best_t).is_none() {
                continue;
            }

            if node.count > 0 {
                for &tri_idx in &self.indices[node.start..node.start + node.count] {
                    let [a, b, c] = self.corners(tri_idx);
                    if let Some(t) = ray_intersect_triangle(origin, dir, a, b, c) {
                        if t < best_t {
                            best_t = t;
                            best_tri = Some(tri_idx);
                        }
                    }
                }
                continue;
            }

            let left_hit = node.left.and_then(|idx| {
                ray_aabb_interval(origin, dir, self.nodes[idx].bounds, best_t)
                    .map(|(tmin, _)| (idx, tmin))
            });
            let right_hit = node.right.and_then(|idx| {
                ray_aabb_interval(origin, dir, self.nodes[idx].bounds, best_t)
                    .map(|(tmin, _)| (idx, tmin))
            });

            match (left_hit, right_hit) {
                (Some((left_idx, left_t)), Some((right_idx, right_t))) => {
                    if left_t <= right_t {
                        stack.push(right_idx);
                        stack.push(left_idx);
                    } else {
                        stack.push(left_idx);
                        stack.push(right_idx);
                    }
                }
                (Some((left_idx, _)), None) => stack.push(left_idx),
                (None, Some((right_idx, _))) => stack.push(right_idx),
                (None, None) => {}
            }
        }

        best_tri.map(|tri_idx| self.hit(tri_idx, origin + dir * best_t, best_t))
    }

    pub fn find_nearest(&self, point: Point3<f64>) -> Option<BvhHit> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut best_d2 = f64::INFINITY;
        let mut best: Option<(usize, Point3<f64>)> = None;
        let mut stack = vec![0usize];

        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            if aabb_distance2(point, node.bounds) > best_d2 {
                continue;
            }

            if node.count > 0 {
                for &tri_idx in &self.indices[node.start..node.start + node.count] {
                    let [a, b, c] = self.corners(tri_idx);
                    let candidate = closest_point_on_triangle(point, a, b, c);
                    let d2 = (candidate - point).magnitude2();
                    if d2 < best_d2 {
                        best_d2 = d2;
                        best = Some((tri_idx, candidate));
                    }
                }
                continue;
            }

            let mut children: Vec<(usize, f64)> = [node.left, node.right]
                .into_iter()
                .flatten()
                .map(|idx| (idx, aabb_distance2(point, self.nodes[idx].bounds)))
                .filter(|(_, d2)| *d2 <= best_d2)
                .collect();
            // Nearer child is popped first.
            children.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
            stack.extend(children.into_iter().map(|(idx, _)| idx));
        }

        best.map(|(tri_idx, position)| self.hit(tri_idx, position, best_d2.sqrt()))
    }

    fn build(
        positions: Vec<Point3<f64>>,
        triangles: Vec<[usize; 3]>,
        tri_faces: Vec<FaceId>,
    ) -> Self {
        let (nodes, indices) = build_bvh(&positions, &triangles);
        Self {
            positions,
            triangles,
            tri_faces,
            nodes,
            indices,
        }
    }

    fn corners(&self, tri_idx: usize) -> [Point3<f64>; 3] {
        let tri = self.triangles[tri_idx];
        [
            self.positions[tri[0]],
            self.positions[tri[1]],
            self.positions[tri[2]],
        ]
    }

    fn hit(&self, tri_idx: usize, position: Point3<f64>, distance: f64) -> BvhHit {
        let [a, b, c] = self.corners(tri_idx);
        BvhHit {
            position,
            normal: triangle_normal(a, b, c),
            face: self.tri_faces[tri_idx],
            distance,
        }
    }
}

fn build_bvh(positions: &[Point3<f64>], triangles: &[[usize; 3]]) -> (Vec<BvhNode>, Vec<usize>) {
    if triangles.is_empty() || positions.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let mut tri_bounds = Vec::with_capacity(triangles.len());
    let mut centroids = Vec::with_capacity(triangles.len());
    for tri in triangles {
        let p0 = positions[tri[0]];
        let p1 = positions[tri[1]];
        let p2 = positions[tri[2]];
        tri_bounds.push((min_point(min_point(p0, p1), p2), max_point(max_point(p0, p1), p2)));
        centroids.push(Point3::new(
            (p0.x + p1.x + p2.x) / 3.0,
            (p0.y + p1.y + p2.y) / 3.0,
            (p0.z + p1.z + p2.z) / 3.0,
        ));
    }

    let mut indices: Vec<usize> = (0..triangles.len()).collect();
    let mut nodes = Vec::new();
    let mut out_indices = Vec::with_capacity(triangles.len());
    build_bvh_node(&mut indices, &tri_bounds, &centroids, &mut nodes, &mut out_indices);
    (nodes, out_indices)
}

fn build_bvh_node(
    indices: &mut [usize],
    tri_bounds: &[(Point3<f64>, Point3<f64>)],
    centroids: &[Point3<f64>],
    nodes: &mut Vec<BvhNode>,
    out_indices: &mut Vec<usize>,
) -> usize {
    let node_index = nodes.len();
    let bounds = bounds_for_indices(indices, tri_bounds);
    nodes.push(BvhNode {
        bounds,
        left: None,
        right: None,
        start: 0,
        count: 0,
    });

    if indices.len() <= BVH_LEAF_SIZE {
        let start = out_indices.len();
        out_indices.extend_from_slice(indices);
        nodes[node_index].start = start;
        nodes[node_index].count = indices.len();
        return node_index;
    }

    let (cmin, cmax) = centroid_bounds(indices, centroids);
    let extent = cmax - cmin;
    let axis = if extent.x >= extent.y && extent.x >= extent.z {
        0
    } else if extent.y >= extent.z {
        1
    } else {
        2
    };
    indices.sort_unstable_by(|a, b| {
        centroids[*a][axis]
            .partial_cmp(&centroids[*b][axis])
            .unwrap_or(Ordering::Equal)
    });
    let mid = indices.len() / 2;
    let (left, right) = indices.split_at_mut(mid);
    let left_idx = build_bvh_node(left, tri_bounds, centroids, nodes, out_indices);
    let right_idx = build_bvh_node(right, tri_bounds, centroids, nodes, out_indices);
    nodes[node_index].left = Some(left_idx);
    nodes[node_index].right = Some(right_idx);
    node_index
}

fn bounds_for_indices(
    indices: &[usize],
    tri_bounds: &[(Point3<f64>, Point3<f64>)],
) -> (Point3<f64>, Point3<f64>) {
    let (mut min, mut max) = tri_bounds[indices[0]];
    for &idx in &indices[1..] {
        let (bmin, bmax) = tri_bounds[idx];
        min = min_point(min, bmin);
        max = max_point(max, bmax);
    }
    (min, max)
}

fn centroid_bounds(indices: &[usize], centroids: &[Point3<f64>]) -> (Point3<f64>, Point3<f64>) {
    let mut min = centroids[indices[0]];
    let mut max = min;
    for &idx in &indices[1..] {
        min = min_point(min, centroids[idx]);
        max = max_point(max, centroids[idx]);
    }
    (min, max)
}

fn ray_aabb_interval(
    origin: Point3<f64>,
    dir: Vector3<f64>,
    bounds: (Point3<f64>, Point3<f64>),
    max_t: f64,
) -> Option<(f64, f64)> {
    let (min, max) = bounds;
    let mut tmin: f64 = 0.0;
    let mut tmax: f64 = max_t;

    for axis in 0..3 {
        let (o, d, lo, hi) = (origin[axis], dir[axis], min[axis], max[axis]);
        if d.abs() <= 1.0e-12 {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let t1 = (lo - o) * inv;
        let t2 = (hi - o) * inv;
        tmin = tmin.max(t1.min(t2));
        tmax = tmax.min(t1.max(t2));
        if tmax < tmin {
            return None;
        }
    }
    if tmax < 0.0 {
        return None;
    }
    Some((tmin, tmax))
}

fn aabb_distance2(point: Point3<f64>, bounds: (Point3<f64>, Point3<f64>)) -> f64 {
    let (min, max) = bounds;
    let mut d2 = 0.0;
    for axis in 0..3 {
        let v = point[axis];
        let excess = if v < min[axis] {
            min[axis] - v
        } else if v > max[axis] {
            v - max[axis]
        } else {
            0.0
        };
        d2 += excess * excess;
    }
    d2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MeshBuilder;

    #[test]
    fn ray_cast_reports_first_face() {
        let cube = MeshBuilder::cube(2.0).unwrap();
        let bvh = Bvh::from_mesh(&cube);
        assert_eq!(bvh.triangle_count(), 12);
        let hit = bvh
            .ray_cast(Point3::new(0.2, 0.1, 5.0), Vector3::new(0.0, 0.0, -2.0))
            .unwrap();
        assert!((hit.position - Point3::new(0.2, 0.1, 1.0)).magnitude() < 1.0e-9);
        assert!((hit.distance - 4.0).abs() < 1.0e-9);
        assert_eq!(hit.face, FaceId(1));
    }

    #[test]
    fn nearest_point_on_large_grid_matches_brute_force() {
        let grid = MeshBuilder::grid(12, 12, 6.0).unwrap();
        let bvh = Bvh::from_mesh(&grid);
        let query = Point3::new(1.3, -2.2, 0.7);
        let hit = bvh.find_nearest(query).unwrap();
        assert!((hit.position - Point3::new(1.3, -2.2, 0.0)).magnitude() < 1.0e-9);
        assert!((hit.distance - 0.7).abs() < 1.0e-9);

        let outside = bvh.find_nearest(Point3::new(10.0, 0.5, 0.0)).unwrap();
        assert!((outside.position - Point3::new(3.0, 0.5, 0.0)).magnitude() < 1.0e-9);
    }

    #[test]
    fn empty_tree_finds_nothing() {
        let bvh = Bvh::default();
        assert!(bvh.is_empty());
        assert!(bvh.find_nearest(Point3::new(0.0, 0.0, 0.0)).is_none());
        assert!(
            bvh.ray_cast(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0))
                .is_none()
        );
    }
}
