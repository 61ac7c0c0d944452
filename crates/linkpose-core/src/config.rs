use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::types::{CoordinateMode, FrameType, TargetLinkType};

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_max_iterations() -> u32 {
    100
}
const fn default_position_tolerance() -> f32 {
    1e-4
}
const fn default_angle_tolerance() -> f32 {
    1e-3
}
const fn default_damping() -> f32 {
    0.01
}
const fn default_preferred_coordinate_mode() -> CoordinateMode {
    CoordinateMode::Body
}
fn default_world_frame_name() -> String {
    "World Origin".into()
}
fn default_frame_name() -> String {
    "Origin".into()
}

// ---------------------------------------------------------------------------
// SolverSettings
// ---------------------------------------------------------------------------

/// Numerical IK settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Maximum solver iterations (default: 100).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Position error tolerance in meters (default: 1e-4).
    #[serde(default = "default_position_tolerance")]
    pub position_tolerance: f32,

    /// Orientation error tolerance in radians (default: 1e-3).
    #[serde(default = "default_angle_tolerance")]
    pub angle_tolerance: f32,

    /// Damping factor of the least-squares step (default: 0.01).
    #[serde(default = "default_damping")]
    pub damping: f32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            position_tolerance: default_position_tolerance(),
            angle_tolerance: default_angle_tolerance(),
            damping: default_damping(),
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(invalid("solver.max_iterations", "must be > 0"));
        }
        if !(self.position_tolerance > 0.0) {
            return Err(invalid("solver.position_tolerance", "must be > 0"));
        }
        if !(self.angle_tolerance > 0.0) {
            return Err(invalid("solver.angle_tolerance", "must be > 0"));
        }
        if !(self.damping > 0.0) {
            return Err(invalid("solver.damping", "must be > 0"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DefaultFrameNames
// ---------------------------------------------------------------------------

/// Labels of the synthesized origin entry, per frame type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultFrameNames {
    #[serde(default = "default_world_frame_name")]
    pub world: String,
    #[serde(default = "default_frame_name")]
    pub body: String,
    #[serde(default = "default_frame_name")]
    pub link: String,
}

impl Default for DefaultFrameNames {
    fn default() -> Self {
        Self {
            world: default_world_frame_name(),
            body: default_frame_name(),
            link: default_frame_name(),
        }
    }
}

impl DefaultFrameNames {
    pub fn get(&self, frame_type: FrameType) -> &str {
        match frame_type {
            FrameType::World => &self.world,
            FrameType::Body => &self.body,
            FrameType::Link => &self.link,
        }
    }

    /// Replace empty names with the built-in defaults.
    pub fn fill_empty(&mut self) {
        if self.world.is_empty() {
            self.world = default_world_frame_name();
        }
        if self.body.is_empty() {
            self.body = default_frame_name();
        }
        if self.link.is_empty() {
            self.link = default_frame_name();
        }
    }
}

// ---------------------------------------------------------------------------
// LinkPositionConfig
// ---------------------------------------------------------------------------

/// Settings of a link positioning session.
///
/// ```toml
/// target_link_type = "root_or_ik_link"
/// coordinate_mode = "world"
/// preferred_coordinate_mode = "body"
///
/// [default_frame_names]
/// world = "World Origin"
///
/// [solver]
/// max_iterations = 200
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPositionConfig {
    /// Which picked links may become the target (default: `root_or_ik_link`).
    #[serde(default)]
    pub target_link_type: TargetLinkType,

    /// Mode in effect (default: `world`).
    #[serde(default)]
    pub coordinate_mode: CoordinateMode,

    /// Mode re-applied whenever the target changes (default: `body`).
    #[serde(default = "default_preferred_coordinate_mode")]
    pub preferred_coordinate_mode: CoordinateMode,

    #[serde(default)]
    pub default_frame_names: DefaultFrameNames,

    #[serde(default)]
    pub solver: SolverSettings,
}

impl Default for LinkPositionConfig {
    fn default() -> Self {
        Self {
            target_link_type: TargetLinkType::default(),
            coordinate_mode: CoordinateMode::default(),
            preferred_coordinate_mode: default_preferred_coordinate_mode(),
            default_frame_names: DefaultFrameNames::default(),
            solver: SolverSettings::default(),
        }
    }
}

impl LinkPositionConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.solver.validate()
    }

    /// Parse from a TOML string and validate.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .inspect_err(|err| warn!(%err, "link position config does not parse"))?;
        if let Err(err) = config.validate() {
            warn!(%err, "link position config rejected");
            return Err(err);
        }
        debug!(
            target_link_type = ?config.target_link_type,
            coordinate_mode = ?config.coordinate_mode,
            "link position config loaded"
        );
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Serialize to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| invalid("config", &e.to_string()))
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
