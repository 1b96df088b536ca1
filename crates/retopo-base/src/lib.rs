use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identity of a mesh object in the host scene.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct MeshId(Uuid);

impl MeshId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MeshId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MeshId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

impl std::str::FromStr for Axis {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            "z" => Ok(Self::Z),
            other => Err(Error::InvalidParameter(format!("unknown axis '{other}'"))),
        }
    }
}

/// Multiplier separating the owning object's pass index from the local face
/// index in a combined surface-hit index.
pub const FACE_INDEX_STRIDE: u64 = 10_000_000;

pub const DEFAULT_DOUBLE_THRESHOLD: f64 = 1.0e-4;
pub const DEFAULT_HIGHLIGHT_RADIUS: f64 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapSettings {
    pub use_snap: bool,
    /// Merge distance; also the thickness below which two surfaces count as one.
    pub double_threshold: f64,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            use_snap: true,
            double_threshold: DEFAULT_DOUBLE_THRESHOLD,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickSettings {
    pub highlight_radius: f64,
    pub backface_culling: bool,
    pub mirror_axis: Option<Axis>,
}

impl Default for PickSettings {
    fn default() -> Self {
        Self {
            highlight_radius: DEFAULT_HIGHLIGHT_RADIUS,
            backface_culling: true,
            mirror_axis: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub snap: SnapSettings,
    pub pick: PickSettings,
}

impl ToolSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.snap.double_threshold >= 0.0) {
            return Err(Error::InvalidParameter(
                "double_threshold must be >= 0".to_string(),
            ));
        }
        if !(self.pick.highlight_radius > 0.0) {
            return Err(Error::InvalidParameter(
                "highlight_radius must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
