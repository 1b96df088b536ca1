pub mod mesh;
pub mod settings;

pub use mesh::{load_obj, mesh_from_polygon, polygon_from_mesh, save_obj};
pub use settings::{load_settings, save_settings};
