//! Kinematics for linkpose: serial chains, bodies, the damped
//! least-squares solver and the per-link kits the positioning core drives.
//!
//! # Architecture
//!
//! ```text
//! ChainConfig ──► KinematicChain ──► Body ──► LinkKinematicsKit
//!                       │                         │
//!                       └──► DlsSolver ◄── JointPathIk (+ ConfigurationHandler)
//! ```
//!
//! A [`Body`] owns the joint state of one chain; a [`KinematicBody`]
//! hands out one cached kit per link. A [`LinkKinematicsKit`]
//! binds a target link to its frame sets and to an [`InverseKinematics`]
//! provider; providers advertise what they can do through
//! [`ProviderKind`] and the kind registry.

pub mod body;
pub mod chain;
pub mod configuration;
pub mod kinematic_body;
pub mod kit;
pub mod provider;
pub mod solver;

pub use body::{Body, BodyPtr, BodyStateSnapshot, Link};
pub use chain::{ChainConfig, ConfigurationConfig, JointConfig, JointType, KinematicChain};
pub use configuration::{ConfigurationHandler, JointSignConfiguration};
pub use kinematic_body::{KinematicBody, KinematicBodyPtr};
pub use kit::{ExclusiveSession, LinkKinematicsKit, LinkKinematicsKitPtr};
pub use provider::{
    kind_id, kind_registry, supports, Capability, InverseKinematics, JointPathIk,
    KinematicsProvider, PositionEditTarget, ProviderKind, RootLinkIk,
};
pub use solver::{DlsConfig, DlsSolver, IkResult, IkTarget, JointBounds};
