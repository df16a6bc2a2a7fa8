//! Configuration system
//!
//! Collider settings load from `.toml` or `.ron` files, picked by extension.

use std::path::Path;

pub use serde::{Deserialize, Serialize};

use crate::foundation::math::{Vec3, AABB};
use crate::physics::collision_layers::CollisionFilter;
use crate::physics::collision_system::CollisionError;
use crate::spatial::{BroadPhase, GridBroadPhase, OctreeBroadPhase, OctreeConfig};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML
    Toml,
    /// Rusty Object Notation
    Ron,
}

impl ConfigFormat {
    /// Format implied by the file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Parse configuration text in the given format
    fn from_str_as(contents: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Serialize configuration text in the given format
    fn to_string_as(&self, format: ConfigFormat) -> Result<String, ConfigError> {
        match format {
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string())),
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string())),
        }
    }

    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path)?;
        Self::from_str_as(&contents, format)
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = self.to_string_as(ConfigFormat::from_path(path)?)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Broad-phase implementation and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BroadPhaseKind {
    /// Uniform grid over 2 or 3 axes
    Grid {
        /// Number of axes
        dimension: usize,
        /// Cell size per axis
        cell: [f32; 3],
    },
    /// Octree over fixed world bounds
    Octree {
        /// Minimum world corner
        min: [f32; 3],
        /// Maximum world corner
        max: [f32; 3],
        /// Subdivision settings
        #[serde(default)]
        config: OctreeConfig,
    },
}

impl BroadPhaseKind {
    /// Instantiate the broad phase
    pub fn build(&self) -> Result<Box<dyn BroadPhase>, CollisionError> {
        match self {
            Self::Grid { dimension, cell } => Ok(Box::new(GridBroadPhase::new(*dimension, Vec3::from(*cell))?)),
            Self::Octree { min, max, config } => {
                let bounds = AABB::new(Vec3::from(*min), Vec3::from(*max));
                if bounds.min.iter().zip(bounds.max.iter()).any(|(low, high)| low >= high) {
                    return Err(CollisionError::InvalidBroadPhase(format!(
                        "octree bounds are empty: {min:?} .. {max:?}"
                    )));
                }
                Ok(Box::new(OctreeBroadPhase::new(bounds, config.clone())))
            }
        }
    }
}

/// One broad phase with its optional gating filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadPhaseConfig {
    /// Implementation
    pub kind: BroadPhaseKind,
    /// Bodies and queries rejected by this filter skip the broad phase
    #[serde(default)]
    pub collision_filter: Option<CollisionFilter>,
}

/// Fixed shape data for a shape type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShapeManifest {
    /// Sphere
    Ball {
        /// Radius
        radius: f32,
    },
    /// Box
    Box {
        /// Half size per axis
        half_extents: [f32; 3],
    },
}

/// Manifest entry keyed by shape type hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyManifest {
    /// Shape type hash
    pub shape_id: u32,
    /// Shape data
    pub shape: ShapeManifest,
}

/// Collision engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColliderConfig {
    /// Broad phases, at least one
    pub broad_phases: Vec<BroadPhaseConfig>,
    /// Body manifests
    #[serde(default)]
    pub manifests: Vec<BodyManifest>,
}

impl Default for ColliderConfig {
    fn default() -> Self {
        Self {
            broad_phases: vec![BroadPhaseConfig {
                kind: BroadPhaseKind::Grid {
                    dimension: 3,
                    cell: [16.0, 16.0, 16.0],
                },
                collision_filter: None,
            }],
            manifests: Vec::new(),
        }
    }
}

impl Config for ColliderConfig {}
