use thiserror::Error;

use crate::id::GeneralId;

/// Top-level error type for linkpose.
#[derive(Debug, Error)]
pub enum LinkPoseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Kinematics error: {0}")]
    Kinematics(#[from] KinematicsError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Rejected frame mutations.
///
/// The frame API itself reports rejections as `false`; these values are
/// used where a reason has to travel, e.g. the archive reader and logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Frame id {0} is already used in the owning list")]
    DuplicateId(GeneralId),

    #[error("Invalid frame mode: {0}")]
    InvalidMode(i64),

    #[error("Invalid frame id")]
    InvalidId,
}

/// Structured-map read errors. A failing field does not abort the rest of
/// the record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArchiveError {
    #[error("Invalid value for {field}: {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("{0}")]
    Frame(#[from] FrameError),
}

/// Kinematics provider errors.
///
/// Unsolved poses and infeasible configurations are ordinary results,
/// not errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KinematicsError {
    #[error("No inverse kinematics solver is available for this link")]
    NoSolver,

    #[error("No configuration handler is available for this link")]
    NoConfigurationHandler,

    #[error("Solver is busy with an exclusive operation")]
    Busy,

    #[error("Unknown link: {0}")]
    UnknownLink(String),

    #[error("Joint vector has {got} values, chain has {expected} joints")]
    DofMismatch { expected: usize, got: usize },

    #[error("Invalid chain: {0}")]
    InvalidChain(String),
}
