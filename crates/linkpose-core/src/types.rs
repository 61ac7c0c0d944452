//! Enumerations shared by the frame, kinematics and view crates.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FrameType
// ---------------------------------------------------------------------------

/// Which frame set a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    /// Frames expressed in the world (chain root) space.
    World,
    /// Frames expressed relative to the body's base link.
    Body,
    /// Frames attached to the target link (end side).
    Link,
}

impl FrameType {
    pub const ALL: [Self; 3] = [Self::World, Self::Body, Self::Link];

    /// Index into per-frame-type arrays.
    pub const fn index(self) -> usize {
        match self {
            Self::World => 0,
            Self::Body => 1,
            Self::Link => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// CoordinateMode
// ---------------------------------------------------------------------------

/// How the target pose is presented to and entered by the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateMode {
    /// Base frame taken from the world frame set.
    #[default]
    World,
    /// Base frame taken from the body frame set, compensated by the base
    /// link's attitude.
    Body,
    /// Whatever base frame is currently selected, without switching frame
    /// type.
    Local,
}

impl CoordinateMode {
    /// Human-readable label for UI display.
    pub const fn label(self) -> &'static str {
        match self {
            Self::World => "World",
            Self::Body => "Body",
            Self::Local => "Local",
        }
    }

    /// Archive symbol.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::World => "world",
            Self::Body => "body",
            Self::Local => "local",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "world" => Some(Self::World),
            "body" => Some(Self::Body),
            "local" => Some(Self::Local),
            _ => None,
        }
    }

    /// Frame type the base frame combo draws from in this mode.
    pub const fn base_frame_type(self) -> FrameType {
        match self {
            Self::World => FrameType::World,
            Self::Body | Self::Local => FrameType::Body,
        }
    }
}

// ---------------------------------------------------------------------------
// TargetLinkType
// ---------------------------------------------------------------------------

/// Which links may become the positioning target when a link is picked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetLinkType {
    /// Any picked link.
    AnyLink,
    /// The body root link, or a link with preset IK.
    #[default]
    RootOrIkLink,
    /// Only links with preset IK.
    IkLink,
}

impl TargetLinkType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::AnyLink => "Any links",
            Self::RootOrIkLink => "IK priority link and root link",
            Self::IkLink => "IK priority link",
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::AnyLink => "any_link",
            Self::RootOrIkLink => "root_or_ik_link",
            Self::IkLink => "ik_link",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "any_link" => Some(Self::AnyLink),
            "root_or_ik_link" => Some(Self::RootOrIkLink),
            "ik_link" => Some(Self::IkLink),
            _ => None,
        }
    }
}
