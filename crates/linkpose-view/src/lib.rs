//! Link positioning for linkpose: which link an operator edits, in which
//! coordinate frame its pose is shown and entered, and which IK
//! configuration the body takes.
//!
//! # Architecture
//!
//! ```text
//! operator ──► LinkPositionCore ──► LinkKinematicsKit ──► InverseKinematics
//!                 │       │                 │
//!                 │       └─► TransformResolver (display ⇄ solver pose)
//!                 └─► ConfigurationResolver (trials under ExclusiveSession)
//! ```
//!
//! The core is single-threaded. Body, kit and edit-target notifications
//! land in a queue that the core drains at the start of every operation
//! and in [`LinkPositionCore::process_pending_updates`].

pub mod candidates;
pub mod configuration;
pub mod edit;
pub mod event;
pub mod transform;
pub mod view;

pub use candidates::{FrameCandidate, FrameCandidates};
pub use configuration::{
    configuration_label, ConfigurationCandidate, ConfigurationResolver, SessionState, SortOrder,
    UNAVAILABLE_LABEL,
};
pub use edit::solve_in_edit;
pub use event::{LinkPositionEvent, ResultStatus};
pub use transform::{KinematicsTarget, TransformResolver};
pub use view::{DisplayPose, FrameCombo, InterfaceState, LinkPositionCore};
