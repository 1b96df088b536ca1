use std::str::FromStr;

use retopo_base::Error;
use retopo_geometry::{Point2, Point3};
use retopo_mesh::{EdgeId, FaceId, Mesh, VertexId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Vertex,
    Edge,
    Face,
}

/// Result of a pick. `coord` is the screen position the hit was ranked by,
/// `world` the matching world-space point, `distance` its distance from the
/// view-ray origin.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum ElementItem {
    Vertex {
        id: VertexId,
        coord: Point2<f64>,
        world: Point3<f64>,
        distance: f64,
    },
    Edge {
        id: EdgeId,
        coord: Point2<f64>,
        world: Point3<f64>,
        distance: f64,
    },
    Face {
        id: FaceId,
        coord: Point2<f64>,
        world: Point3<f64>,
        distance: f64,
    },
    #[default]
    Empty,
}

impl ElementItem {
    pub fn kind(&self) -> Option<ElementKind> {
        match self {
            Self::Vertex { .. } => Some(ElementKind::Vertex),
            Self::Edge { .. } => Some(ElementKind::Edge),
            Self::Face { .. } => Some(ElementKind::Face),
            Self::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_vertex(&self) -> bool {
        matches!(self, Self::Vertex { .. })
    }

    pub fn is_edge(&self) -> bool {
        matches!(self, Self::Edge { .. })
    }

    pub fn is_face(&self) -> bool {
        matches!(self, Self::Face { .. })
    }

    pub fn coord(&self) -> Option<Point2<f64>> {
        match *self {
            Self::Vertex { coord, .. } | Self::Edge { coord, .. } | Self::Face { coord, .. } => {
                Some(coord)
            }
            Self::Empty => None,
        }
    }

    pub fn world(&self) -> Option<Point3<f64>> {
        match *self {
            Self::Vertex { world, .. } | Self::Edge { world, .. } | Self::Face { world, .. } => {
                Some(world)
            }
            Self::Empty => None,
        }
    }

    pub fn distance(&self) -> Option<f64> {
        match *self {
            Self::Vertex { distance, .. }
            | Self::Edge { distance, .. }
            | Self::Face { distance, .. } => Some(distance),
            Self::Empty => None,
        }
    }

    /// Vertices of the element; ids missing from `mesh` yield nothing.
    pub fn vertices(&self, mesh: &Mesh) -> Vec<VertexId> {
        match *self {
            Self::Vertex { id, .. } => mesh.get_vertex(id).map(|_| vec![id]).unwrap_or_default(),
            Self::Edge { id, .. } => mesh
                .get_edge(id)
                .map(|edge| edge.verts.to_vec())
                .unwrap_or_default(),
            Self::Face { id, .. } => mesh
                .get_face(id)
                .map(|face| face.verts().to_vec())
                .unwrap_or_default(),
            Self::Empty => Vec::new(),
        }
    }

    pub fn edges(&self, mesh: &Mesh) -> Vec<EdgeId> {
        match *self {
            Self::Vertex { id, .. } => mesh
                .get_vertex(id)
                .map(|vertex| vertex.link_edges().to_vec())
                .unwrap_or_default(),
            Self::Edge { id, .. } => mesh.get_edge(id).map(|_| vec![id]).unwrap_or_default(),
            Self::Face { id, .. } => mesh
                .get_face(id)
                .map(|face| face.edges().to_vec())
                .unwrap_or_default(),
            Self::Empty => Vec::new(),
        }
    }
}

/// Element kinds a combined pick may return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementKinds {
    pub vertex: bool,
    pub edge: bool,
    pub face: bool,
}

impl ElementKinds {
    pub const ALL: Self = Self {
        vertex: true,
        edge: true,
        face: true,
    };

    pub fn contains(&self, kind: ElementKind) -> bool {
        match kind {
            ElementKind::Vertex => self.vertex,
            ElementKind::Edge => self.edge,
            ElementKind::Face => self.face,
        }
    }
}

impl Default for ElementKinds {
    fn default() -> Self {
        Self::ALL
    }
}

impl FromStr for ElementKinds {
    type Err = Error;

    /// Comma separated list of `vert`, `edge` and `face`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut kinds = Self {
            vertex: false,
            edge: false,
            face: false,
        };
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.to_ascii_lowercase().as_str() {
                "vert" | "vertex" => kinds.vertex = true,
                "edge" => kinds.edge = true,
                "face" => kinds.face = true,
                other => {
                    return Err(Error::InvalidParameter(format!(
                        "unknown element kind '{other}'"
                    )));
                }
            }
        }
        if kinds == (Self { vertex: false, edge: false, face: false }) {
            return Err(Error::InvalidParameter("no element kind given".to_string()));
        }
        Ok(kinds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retopo_mesh::MeshBuilder;

    #[test]
    fn face_item_lists_its_loop() {
        let quad = MeshBuilder::quad(1.0).unwrap();
        let item = ElementItem::Face {
            id: FaceId(0),
            coord: Point2::new(0.0, 0.0),
            world: Point3::new(0.0, 0.0, 0.0),
            distance: 1.0,
        };
        assert_eq!(item.vertices(&quad).len(), 4);
        assert_eq!(item.edges(&quad).len(), 4);
        assert_eq!(item.kind(), Some(ElementKind::Face));
        assert!(ElementItem::Empty.vertices(&quad).is_empty());
        assert!(ElementItem::default().is_empty());
    }

    #[test]
    fn kinds_parse() {
        let kinds: ElementKinds = "edge, vert".parse().unwrap();
        assert!(kinds.vertex && kinds.edge && !kinds.face);
        assert!("".parse::<ElementKinds>().is_err());
        assert!("loop".parse::<ElementKinds>().is_err());
    }
}
