use anyhow::{Context, Result, bail};
use retopo_mesh::Mesh;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use truck_polymesh::{Faces, PolygonMesh, StandardAttributes, obj};

pub fn load_obj(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open OBJ file {}", path.display()))?;
    let polygon = obj::read(BufReader::new(file))
        .with_context(|| format!("read OBJ file {}", path.display()))?;
    mesh_from_polygon(&polygon).with_context(|| format!("build mesh from {}", path.display()))
}

/// Converts triangles, quads and n-gons into mesh faces. Faces with fewer
/// than three corners are dropped.
pub fn mesh_from_polygon(polygon: &PolygonMesh) -> Result<Mesh> {
    let positions = polygon.positions().to_vec();
    if positions.is_empty() {
        bail!("polygon mesh has no vertices");
    }

    let mut faces: Vec<Vec<usize>> = Vec::new();
    faces.extend(
        polygon
            .tri_faces()
            .iter()
            .map(|tri| vec![tri[0].pos, tri[1].pos, tri[2].pos]),
    );
    faces.extend(
        polygon
            .quad_faces()
            .iter()
            .map(|quad| vec![quad[0].pos, quad[1].pos, quad[2].pos, quad[3].pos]),
    );
    for face in polygon.faces().other_faces() {
        if face.len() < 3 {
            continue;
        }
        faces.push(face.iter().map(|vertex| vertex.pos).collect());
    }

    Ok(Mesh::from_polygons(positions, &faces)?)
}

/// Positions and face loops only; wire edges have no OBJ face to live in.
pub fn polygon_from_mesh(mesh: &Mesh) -> PolygonMesh {
    let positions = mesh.vertices().map(|(_, vertex)| vertex.position).collect();
    let faces: Vec<Vec<usize>> = mesh
        .faces()
        .map(|(_, face)| face.verts().iter().map(|id| id.index()).collect())
        .collect();
    PolygonMesh::new(
        StandardAttributes {
            positions,
            ..Default::default()
        },
        Faces::from_iter(faces.iter()),
    )
}

pub fn save_obj(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if mesh.face_count() == 0 {
        bail!("mesh has no faces to write");
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output directory {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("create OBJ file {}", path.display()))?;
    obj::write(&polygon_from_mesh(mesh), file)
        .with_context(|| format!("write OBJ file {}", path.display()))?;
    Ok(())
}
