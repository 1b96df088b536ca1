use retopo_geometry::Point3;

use crate::{Error, Mesh, Result};

pub struct MeshBuilder;

impl MeshBuilder {
    /// Single quad of edge length `size` centred on the origin, facing +Z.
    pub fn quad(size: f64) -> Result<Mesh> {
        Self::plane_at_z(size, 0.0)
    }

    pub fn plane_at_z(size: f64, z: f64) -> Result<Mesh> {
        ensure_positive("size", size)?;
        let h = size * 0.5;
        let positions = vec![
            Point3::new(-h, -h, z),
            Point3::new(h, -h, z),
            Point3::new(h, h, z),
            Point3::new(-h, h, z),
        ];
        Mesh::from_polygons(positions, &[[0usize, 1, 2, 3]])
    }

    /// `cols` x `rows` quads spanning `size` x `size`, centred on the origin,
    /// facing +Z. Vertices are numbered row by row from -Y.
    pub fn grid(cols: usize, rows: usize, size: f64) -> Result<Mesh> {
        ensure_positive("size", size)?;
        if cols == 0 || rows == 0 {
            return Err(Error::InvalidParameter(
                "grid needs at least one row and column".to_string(),
            ));
        }
        let h = size * 0.5;
        let mut positions = Vec::with_capacity((cols + 1) * (rows + 1));
        for row in 0..=rows {
            for col in 0..=cols {
                positions.push(Point3::new(
                    -h + size * col as f64 / cols as f64,
                    -h + size * row as f64 / rows as f64,
                    0.0,
                ));
            }
        }
        let stride = cols + 1;
        let mut polygons = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            for col in 0..cols {
                let a = row * stride + col;
                polygons.push([a, a + 1, a + 1 + stride, a + stride]);
            }
        }
        Mesh::from_polygons(positions, &polygons)
    }

    /// Closed axis-aligned cube centred on the origin with outward normals.
    pub fn cube(size: f64) -> Result<Mesh> {
        ensure_positive("size", size)?;
        let h = size * 0.5;
        let positions = vec![
            Point3::new(-h, -h, -h),
            Point3::new(h, -h, -h),
            Point3::new(h, h, -h),
            Point3::new(-h, h, -h),
            Point3::new(-h, -h, h),
            Point3::new(h, -h, h),
            Point3::new(h, h, h),
            Point3::new(-h, h, h),
        ];
        let polygons = [
            [0usize, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 4, 7],
        ];
        Mesh::from_polygons(positions, &polygons)
    }
}

fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if !(value > 0.0) {
        return Err(Error::InvalidParameter(format!("{name} must be > 0")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ElementClass, FaceId, VertexId};
    use retopo_geometry::{InnerSpace, Vector3};

    #[test]
    fn cube_is_closed_and_outward() -> Result<()> {
        let cube = MeshBuilder::cube(2.0)?;
        assert_eq!(cube.edge_count(), 12);
        for (id, _) in cube.edges() {
            assert_eq!(cube.classify_edge(id), ElementClass::Interior);
        }
        for (id, face) in cube.faces() {
            let outward = cube.face_center(id) - Point3::new(0.0, 0.0, 0.0);
            assert!(face.normal.dot(outward) > 0.0, "face {id:?} points inward");
        }
        Ok(())
    }

    #[test]
    fn grid_layout() -> Result<()> {
        let grid = MeshBuilder::grid(2, 2, 2.0)?;
        assert_eq!(grid.vertex_count(), 9);
        assert_eq!(grid.face_count(), 4);
        assert_eq!(grid.classify_vertex(VertexId(4)), ElementClass::Interior);
        assert_eq!(grid.classify_vertex(VertexId(1)), ElementClass::Boundary);
        let normal = grid.face(FaceId(0)).normal;
        assert!((normal - Vector3::new(0.0, 0.0, 1.0)).magnitude() < 1.0e-12);
        Ok(())
    }

    #[test]
    fn non_positive_size_is_rejected() {
        assert!(MeshBuilder::quad(0.0).is_err());
        assert!(MeshBuilder::grid(0, 1, 1.0).is_err());
    }
}
