use std::collections::HashMap;

use retopo_geometry::{InnerSpace, Point3, Vector3, normalize_or_zero};

use crate::{Error, Result};

macro_rules! element_id {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

element_id!(VertexId);
element_id!(EdgeId);
element_id!(FaceId);

/// Topological role of a vertex or edge, shared by ring filtering and
/// backface culling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementClass {
    Interior,
    Boundary,
    NonManifold,
    Wire,
}

impl ElementClass {
    /// Boundary, non-manifold and wire elements form the open "ring" of a mesh.
    pub fn is_ring(self) -> bool {
        self != Self::Interior
    }

    /// Only closed manifold elements may be rejected as back-facing.
    pub fn is_cullable(self) -> bool {
        self == Self::Interior
    }
}

#[derive(Clone, Debug)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
    pub hidden: bool,
    pub selected: bool,
    link_edges: Vec<EdgeId>,
    link_faces: Vec<FaceId>,
}

impl Vertex {
    pub fn link_edges(&self) -> &[EdgeId] {
        &self.link_edges
    }

    pub fn link_faces(&self) -> &[FaceId] {
        &self.link_faces
    }
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub verts: [VertexId; 2],
    pub hidden: bool,
    pub selected: bool,
    link_faces: Vec<FaceId>,
}

impl Edge {
    pub fn link_faces(&self) -> &[FaceId] {
        &self.link_faces
    }

    pub fn other_vert(&self, vert: VertexId) -> Option<VertexId> {
        match self.verts {
            [a, b] if a == vert => Some(b),
            [a, b] if b == vert => Some(a),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Face {
    pub normal: Vector3<f64>,
    pub hidden: bool,
    pub selected: bool,
    verts: Vec<VertexId>,
    edges: Vec<EdgeId>,
}

impl Face {
    /// Loop vertices in winding order.
    pub fn verts(&self) -> &[VertexId] {
        &self.verts
    }

    /// Loop edges; `edges()[i]` joins `verts()[i]` and `verts()[i + 1]`.
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }
}

#[derive(Clone, Debug, Default)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    faces: Vec<Face>,
    edge_lookup: HashMap<(VertexId, VertexId), EdgeId>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_polygons<P: AsRef<[usize]>>(
        positions: Vec<Point3<f64>>,
        polygons: &[P],
    ) -> Result<Self> {
        let mut mesh = Self::new();
        for position in positions {
            mesh.add_vertex(position);
        }
        for polygon in polygons {
            let verts: Vec<VertexId> = polygon
                .as_ref()
                .iter()
                .map(|&idx| mesh.vertex_id(idx))
                .collect::<Result<_>>()?;
            mesh.add_face(&verts)?;
        }
        mesh.recalc_normals();
        Ok(mesh)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn face(&self, id: FaceId) -> &Face {
        &self.faces[id.index()]
    }

    pub fn get_vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.index())
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index())
    }

    pub fn get_face(&self, id: FaceId) -> Option<&Face> {
        self.faces.get(id.index())
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(idx, vert)| (VertexId(idx as u32), vert))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .map(|(idx, edge)| (EdgeId(idx as u32), edge))
    }

    pub fn faces(&self) -> impl Iterator<Item = (FaceId, &Face)> {
        self.faces
            .iter()
            .enumerate()
            .map(|(idx, face)| (FaceId(idx as u32), face))
    }

    pub fn find_edge(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.edge_lookup.get(&edge_key(a, b)).copied()
    }

    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex {
            position,
            normal: Vector3::new(0.0, 0.0, 0.0),
            hidden: false,
            selected: false,
            link_edges: Vec::new(),
            link_faces: Vec::new(),
        });
        id
    }

    /// Adds a face over an ordered vertex loop, creating missing edges.
    /// Normals are not refreshed; call [`Mesh::recalc_normals`] afterwards.
    pub fn add_face(&mut self, verts: &[VertexId]) -> Result<FaceId> {
        if verts.len() < 3 {
            return Err(Error::InvalidTopology(format!(
                "face needs at least 3 vertices, got {}",
                verts.len()
            )));
        }
        for (idx, vert) in verts.iter().enumerate() {
            self.check_vertex(*vert)?;
            if verts[idx + 1..].contains(vert) {
                return Err(Error::InvalidTopology(format!(
                    "face repeats vertex {}",
                    vert.0
                )));
            }
        }

        let face_id = FaceId(self.faces.len() as u32);
        let mut edges = Vec::with_capacity(verts.len());
        for idx in 0..verts.len() {
            let a = verts[idx];
            let b = verts[(idx + 1) % verts.len()];
            let edge = self.ensure_edge(a, b);
            self.edges[edge.index()].link_faces.push(face_id);
            edges.push(edge);
        }
        for vert in verts {
            self.vertices[vert.index()].link_faces.push(face_id);
        }
        self.faces.push(Face {
            normal: Vector3::new(0.0, 0.0, 0.0),
            hidden: false,
            selected: false,
            verts: verts.to_vec(),
            edges,
        });
        Ok(face_id)
    }

    /// Adds an edge with no faces. Returns the existing edge if the pair is
    /// already connected.
    pub fn add_wire_edge(&mut self, a: VertexId, b: VertexId) -> Result<EdgeId> {
        self.check_vertex(a)?;
        self.check_vertex(b)?;
        if a == b {
            return Err(Error::InvalidTopology(format!(
                "edge endpoints coincide at vertex {}",
                a.0
            )));
        }
        Ok(self.ensure_edge(a, b))
    }

    pub fn set_position(&mut self, id: VertexId, position: Point3<f64>) {
        self.vertices[id.index()].position = position;
    }

    pub fn set_vertex_hidden(&mut self, id: VertexId, hidden: bool) {
        self.vertices[id.index()].hidden = hidden;
    }

    pub fn set_edge_hidden(&mut self, id: EdgeId, hidden: bool) {
        self.edges[id.index()].hidden = hidden;
    }

    pub fn set_face_hidden(&mut self, id: FaceId, hidden: bool) {
        self.faces[id.index()].hidden = hidden;
    }

    pub fn set_vertex_selected(&mut self, id: VertexId, selected: bool) {
        self.vertices[id.index()].selected = selected;
    }

    pub fn face_center(&self, id: FaceId) -> Point3<f64> {
        let face = self.face(id);
        let mut sum = Vector3::new(0.0, 0.0, 0.0);
        for vert in &face.verts {
            sum += self.vertex(*vert).position - Point3::new(0.0, 0.0, 0.0);
        }
        Point3::new(0.0, 0.0, 0.0) + sum / face.verts.len() as f64
    }

    /// Recomputes face normals (Newell) and vertex normals (sum of adjoining
    /// face normals). Vertices without faces get a zero normal.
    pub fn recalc_normals(&mut self) {
        for idx in 0..self.faces.len() {
            let normal = {
                let face = &self.faces[idx];
                newell_normal(face.verts.iter().map(|v| self.vertices[v.index()].position))
            };
            self.faces[idx].normal = normal;
        }
        for idx in 0..self.vertices.len() {
            let mut sum = Vector3::new(0.0, 0.0, 0.0);
            for face in &self.vertices[idx].link_faces {
                sum += self.faces[face.index()].normal;
            }
            self.vertices[idx].normal = normalize_or_zero(sum);
        }
    }

    pub fn classify_edge(&self, id: EdgeId) -> ElementClass {
        match self.edge(id).link_faces.len() {
            0 => ElementClass::Wire,
            1 => ElementClass::Boundary,
            2 => ElementClass::Interior,
            _ => ElementClass::NonManifold,
        }
    }

    pub fn classify_vertex(&self, id: VertexId) -> ElementClass {
        let vert = self.vertex(id);
        if vert.link_edges.is_empty() {
            return ElementClass::NonManifold;
        }
        if vert.link_faces.is_empty() {
            return ElementClass::Wire;
        }

        let mut boundary = false;
        for edge in &vert.link_edges {
            match self.classify_edge(*edge) {
                ElementClass::NonManifold | ElementClass::Wire => {
                    return ElementClass::NonManifold;
                }
                ElementClass::Boundary => boundary = true,
                ElementClass::Interior => {}
            }
        }

        if self.face_fan_count(id) > 1 {
            return ElementClass::NonManifold;
        }
        if boundary {
            ElementClass::Boundary
        } else {
            ElementClass::Interior
        }
    }

    /// Number of face groups around `id` connected through shared edges.
    fn face_fan_count(&self, id: VertexId) -> usize {
        let vert = self.vertex(id);
        let faces = &vert.link_faces;
        let mut group: Vec<usize> = (0..faces.len()).collect();

        fn root(group: &mut [usize], mut idx: usize) -> usize {
            while group[idx] != idx {
                group[idx] = group[group[idx]];
                idx = group[idx];
            }
            idx
        }

        for edge in &vert.link_edges {
            let linked = &self.edges[edge.index()].link_faces;
            if linked.len() != 2 {
                continue;
            }
            let a = faces.iter().position(|f| *f == linked[0]);
            let b = faces.iter().position(|f| *f == linked[1]);
            if let (Some(a), Some(b)) = (a, b) {
                let ra = root(&mut group, a);
                let rb = root(&mut group, b);
                if ra != rb {
                    group[ra] = rb;
                }
            }
        }

        (0..faces.len()).filter(|&idx| root(&mut group, idx) == idx).count()
    }

    fn vertex_id(&self, idx: usize) -> Result<VertexId> {
        let id = VertexId(idx as u32);
        self.check_vertex(id)?;
        Ok(id)
    }

    fn check_vertex(&self, id: VertexId) -> Result<()> {
        if id.index() >= self.vertices.len() {
            return Err(Error::InvalidTopology(format!(
                "vertex index {} out of range ({} vertices)",
                id.0,
                self.vertices.len()
            )));
        }
        Ok(())
    }

    fn ensure_edge(&mut self, a: VertexId, b: VertexId) -> EdgeId {
        let key = edge_key(a, b);
        if let Some(edge) = self.edge_lookup.get(&key) {
            return *edge;
        }
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            verts: [a, b],
            hidden: false,
            selected: false,
            link_faces: Vec::new(),
        });
        self.vertices[a.index()].link_edges.push(id);
        self.vertices[b.index()].link_edges.push(id);
        self.edge_lookup.insert(key, id);
        id
    }
}

fn edge_key(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a <= b { (a, b) } else { (b, a) }
}

fn newell_normal(points: impl Iterator<Item = Point3<f64>>) -> Vector3<f64> {
    let points: Vec<Point3<f64>> = points.collect();
    let mut normal = Vector3::new(0.0, 0.0, 0.0);
    for idx in 0..points.len() {
        let current = points[idx];
        let next = points[(idx + 1) % points.len()];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    if normal.magnitude2() <= f64::EPSILON * f64::EPSILON {
        return Vector3::new(0.0, 0.0, 0.0);
    }
    normal.normalize()
}
