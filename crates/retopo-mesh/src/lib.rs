use thiserror::Error;

pub mod builder;
pub mod bvh;
pub mod mesh;

pub use builder::MeshBuilder;
pub use bvh::{Bvh, BvhHit};
pub use mesh::{Edge, EdgeId, ElementClass, Face, FaceId, Mesh, Vertex, VertexId};

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("invalid topology: {0}")]
    InvalidTopology(String),
    #[error(transparent)]
    Base(#[from] retopo_base::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
