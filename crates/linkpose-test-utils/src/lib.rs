//! Shared test fixtures and utilities for linkpose crates.
//!
//! Provides a small planar arm with a configurable elbow, prepared frame
//! set suites, and scripted providers for exercising the positioning core
//! without a real solver.

pub mod fixtures;
pub mod mocks;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use fixtures::{
    planar_arm, planar_arm_config, root_kit, sample_frame_suite, tool_kit, PLANAR_ARM_TOML, TOOL_LINK,
};
pub use mocks::{MockConfigurationHandler, MockEditTarget, ScriptedIk};
