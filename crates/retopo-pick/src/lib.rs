//! Screen-space element picking and surface snapping for interactive
//! retopology tools.

pub mod edit;
pub mod element;
pub mod generation;
pub mod picker;
pub mod projection;
pub mod raycast;
pub mod scene;
pub mod snap;
pub mod viewport;

pub use edit::EditTarget;
pub use element::{ElementItem, ElementKind, ElementKinds};
pub use generation::EditGeneration;
pub use picker::PickOptions;
pub use projection::{ProjectionCache, ProjectionSource};
pub use raycast::{SnapTarget, SurfaceHit};
pub use scene::{MeshObject, ObjectKind, Scene};
pub use snap::{SnapHandle, SnapRegistry};
pub use viewport::{Projection, Viewport};
