// linkpose-core: ids, kind registry, signals, errors and config for linkpose.

pub mod config;
pub mod error;
pub mod id;
pub mod registry;
pub mod signal;
pub mod types;

pub use config::{DefaultFrameNames, LinkPositionConfig, SolverSettings};
pub use error::{ArchiveError, ConfigError, FrameError, KinematicsError, LinkPoseError};
pub use id::GeneralId;
pub use registry::{TypeHierarchyRegistry, UNKNOWN_KIND_ID};
pub use signal::{ScopedConnections, Signal, Subscription};
pub use types::{CoordinateMode, FrameType, TargetLinkType};
