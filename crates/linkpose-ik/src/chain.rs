//! Serial kinematic chain described by a [`ChainConfig`].
//!
//! A [`KinematicChain`] is an ordered list of joints from the base link to
//! an optional end-effector link. Every joint moves one child link. The
//! chain stores the static transforms (origins), joint axes and limits
//! needed for forward kinematics and Jacobian computation, plus a fixed
//! attitude offset per link used when presenting link orientations.
//!
//! ```toml
//! name = "planar_arm"
//! base_link = "base"
//!
//! [[joints]]
//! name = "shoulder"
//! child = "upper_arm"
//! origin = { xyz = [0.0, 0.0, 0.1] }
//! axis = [0.0, 0.0, 1.0]
//! lower = -2.6
//! upper = 2.6
//!
//! [end_effector]
//! link = "tool"
//! origin = { xyz = [0.1, 0.0, 0.0] }
//! ```

use std::collections::HashSet;

use nalgebra::{Isometry3, Matrix3, Translation3, UnitQuaternion, UnitVector3, Vector3};
use serde::{Deserialize, Serialize};

use linkpose_core::{ConfigError, KinematicsError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn default_chain_name() -> String {
    "body".into()
}
fn default_base_link() -> String {
    "base".into()
}
const fn default_axis() -> [f32; 3] {
    [0.0, 0.0, 1.0]
}

/// Static transform given as translation plus roll-pitch-yaw (radians).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    #[serde(default)]
    pub xyz: [f32; 3],
    #[serde(default)]
    pub rpy: [f32; 3],
}

impl Origin {
    pub const fn translation(x: f32, y: f32, z: f32) -> Self {
        Self {
            xyz: [x, y, z],
            rpy: [0.0; 3],
        }
    }

    pub fn to_isometry(&self) -> Isometry3<f32> {
        let translation = Translation3::new(self.xyz[0], self.xyz[1], self.xyz[2]);
        Isometry3::from_parts(translation, rotation_from_rpy(self.rpy))
    }
}

/// Joint motion type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointType {
    #[default]
    Revolute,
    /// Revolute without limits; treated as `[-pi, pi]`.
    Continuous,
    Prismatic,
}

/// One joint and the link it moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointConfig {
    pub name: String,
    /// Name of the link moved by this joint.
    pub child: String,
    #[serde(default, rename = "type")]
    pub joint_type: JointType,
    #[serde(default)]
    pub origin: Origin,
    #[serde(default = "default_axis")]
    pub axis: [f32; 3],
    #[serde(default)]
    pub lower: Option<f32>,
    #[serde(default)]
    pub upper: Option<f32>,
    /// Attitude offset of the child link (roll-pitch-yaw).
    #[serde(default)]
    pub attitude: [f32; 3],
}

/// Fixed end-effector link after the last joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndEffectorConfig {
    pub link: String,
    #[serde(default)]
    pub origin: Origin,
    #[serde(default)]
    pub attitude: [f32; 3],
}

/// One joint whose sign selects a configuration branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationTargetConfig {
    pub joint: String,
    /// Column label; the joint name when absent.
    #[serde(default)]
    pub label: Option<String>,
    /// State label for non-negative joint values.
    pub positive: String,
    /// State label for negative joint values.
    pub negative: String,
}

/// Configuration branches offered by links at the end of the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationConfig {
    /// Joint path name shown in the configuration session title.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub targets: Vec<ConfigurationTargetConfig>,
}

/// Description of a body: its serial chain, preset IK links and
/// configuration branches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_chain_name")]
    pub name: String,
    #[serde(default = "default_base_link")]
    pub base_link: String,
    #[serde(default)]
    pub base_attitude: [f32; 3],
    #[serde(default)]
    pub joints: Vec<JointConfig>,
    #[serde(default)]
    pub end_effector: Option<EndEffectorConfig>,
    /// Links that carry preset IK.
    #[serde(default)]
    pub ik_links: Vec<String>,
    #[serde(default)]
    pub configuration: Option<ConfigurationConfig>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            name: default_chain_name(),
            base_link: default_base_link(),
            base_attitude: [0.0; 3],
            joints: Vec::new(),
            end_effector: None,
            ik_links: Vec::new(),
            configuration: None,
        }
    }
}

impl ChainConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

// ---------------------------------------------------------------------------
// KinematicChain
// ---------------------------------------------------------------------------

/// A single joint in the kinematic chain.
#[derive(Debug, Clone)]
pub struct ChainJoint {
    pub name: String,
    /// Link moved by this joint.
    pub child_link: String,
    /// Static transform from parent link frame to this joint frame.
    pub origin: Isometry3<f32>,
    /// Joint axis in the joint's local frame.
    pub axis: UnitVector3<f32>,
    /// Whether this is a prismatic joint (false = revolute).
    pub is_prismatic: bool,
    /// Lower position limit (rad or m).
    pub lower_limit: f32,
    /// Upper position limit (rad or m).
    pub upper_limit: f32,
    /// Attitude offset of the child link.
    pub child_attitude: UnitQuaternion<f32>,
}

/// An ordered kinematic chain from base to end-effector.
#[derive(Debug, Clone)]
pub struct KinematicChain {
    base_link: String,
    base_attitude: UnitQuaternion<f32>,
    /// Ordered joints from base to end-effector.
    joints: Vec<ChainJoint>,
    /// Named end-effector link and its attitude offset, if any.
    ee_link: Option<(String, UnitQuaternion<f32>)>,
    /// Transform from the last joint's child link to the end-effector frame.
    ee_offset: Isometry3<f32>,
}

impl KinematicChain {
    /// Build a chain from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`KinematicsError::InvalidChain`] on duplicate link or joint
    /// names, zero-length axes or inverted limits.
    pub fn from_config(config: &ChainConfig) -> Result<Self, KinematicsError> {
        let mut link_names = HashSet::new();
        let mut joint_names = HashSet::new();
        link_names.insert(config.base_link.as_str());

        let mut joints = Vec::with_capacity(config.joints.len());
        for joint in &config.joints {
            if !joint_names.insert(joint.name.as_str()) {
                return Err(invalid(format!("duplicate joint \"{}\"", joint.name)));
            }
            if !link_names.insert(joint.child.as_str()) {
                return Err(invalid(format!("duplicate link \"{}\"", joint.child)));
            }

            let axis = Vector3::new(joint.axis[0], joint.axis[1], joint.axis[2]);
            let axis = UnitVector3::try_new(axis, 1.0e-6)
                .ok_or_else(|| invalid(format!("joint \"{}\" has a zero axis", joint.name)))?;

            let (lower, upper) = match joint.joint_type {
                JointType::Continuous => (-std::f32::consts::PI, std::f32::consts::PI),
                _ => (
                    joint.lower.unwrap_or(-std::f32::consts::PI),
                    joint.upper.unwrap_or(std::f32::consts::PI),
                ),
            };
            if lower > upper {
                return Err(invalid(format!(
                    "joint \"{}\" has lower limit {lower} above upper limit {upper}",
                    joint.name
                )));
            }

            joints.push(ChainJoint {
                name: joint.name.clone(),
                child_link: joint.child.clone(),
                origin: joint.origin.to_isometry(),
                axis,
                is_prismatic: joint.joint_type == JointType::Prismatic,
                lower_limit: lower,
                upper_limit: upper,
                child_attitude: rotation_from_rpy(joint.attitude),
            });
        }

        let (ee_link, ee_offset) = match &config.end_effector {
            Some(ee) => {
                if !link_names.insert(ee.link.as_str()) {
                    return Err(invalid(format!("duplicate link \"{}\"", ee.link)));
                }
                (
                    Some((ee.link.clone(), rotation_from_rpy(ee.attitude))),
                    ee.origin.to_isometry(),
                )
            }
            None => (None, Isometry3::identity()),
        };

        Ok(Self {
            base_link: config.base_link.clone(),
            base_attitude: rotation_from_rpy(config.base_attitude),
            joints,
            ee_link,
            ee_offset,
        })
    }

    /// Number of actuated degrees of freedom.
    pub fn dof(&self) -> usize {
        self.joints.len()
    }

    /// Joint names in chain order.
    pub fn joint_names(&self) -> Vec<&str> {
        self.joints.iter().map(|j| j.name.as_str()).collect()
    }

    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// Access the joint definitions.
    pub fn joints(&self) -> &[ChainJoint] {
        &self.joints
    }

    /// End-effector offset after the last joint.
    pub fn ee_offset(&self) -> &Isometry3<f32> {
        &self.ee_offset
    }

    pub fn base_link(&self) -> &str {
        &self.base_link
    }

    /// Link names in chain order: base, one per joint, then the
    /// end-effector link if there is one.
    pub fn link_names(&self) -> Vec<&str> {
        std::iter::once(self.base_link.as_str())
            .chain(self.joints.iter().map(|j| j.child_link.as_str()))
            .chain(self.ee_link.iter().map(|(name, _)| name.as_str()))
            .collect()
    }

    /// Attitude offsets in the same order as [`link_names`](Self::link_names).
    pub fn link_attitudes(&self) -> Vec<UnitQuaternion<f32>> {
        std::iter::once(self.base_attitude)
            .chain(self.joints.iter().map(|j| j.child_attitude))
            .chain(self.ee_link.iter().map(|(_, attitude)| *attitude))
            .collect()
    }

    pub fn num_links(&self) -> usize {
        1 + self.joints.len() + usize::from(self.ee_link.is_some())
    }

    /// Chain from the base to the link at `link_index` (as numbered by
    /// [`link_names`](Self::link_names)). The base link has no joint path.
    pub fn sub_chain(&self, link_index: usize) -> Option<Self> {
        if link_index == 0 || link_index >= self.num_links() {
            return None;
        }
        if link_index > self.joints.len() {
            return Some(self.clone());
        }
        Some(Self {
            base_link: self.base_link.clone(),
            base_attitude: self.base_attitude,
            joints: self.joints[..link_index].to_vec(),
            ee_link: None,
            ee_offset: Isometry3::identity(),
        })
    }

    /// Compute forward kinematics: joint positions -> end-effector pose.
    ///
    /// Returns the end-effector pose in the base frame.
    ///
    /// # Panics
    ///
    /// Panics if `q.len() != self.dof()`.
    pub fn forward_kinematics(&self, q: &[f32]) -> Isometry3<f32> {
        assert_eq!(q.len(), self.dof(), "q.len() must equal chain DOF");

        let mut transform = Isometry3::identity();
        for (joint, &angle) in self.joints.iter().zip(q.iter()) {
            transform *= joint.origin;
            transform *= joint_transform(&joint.axis, joint.is_prismatic, angle);
        }
        transform * self.ee_offset
    }

    /// Pose of every link in the base frame, ordered like
    /// [`link_names`](Self::link_names).
    ///
    /// # Panics
    ///
    /// Panics if `q.len() != self.dof()`.
    pub fn link_poses(&self, q: &[f32]) -> Vec<Isometry3<f32>> {
        assert_eq!(q.len(), self.dof(), "q.len() must equal chain DOF");

        let mut poses = Vec::with_capacity(self.num_links());
        let mut transform = Isometry3::identity();
        poses.push(transform);
        for (joint, &angle) in self.joints.iter().zip(q.iter()) {
            transform *= joint.origin;
            transform *= joint_transform(&joint.axis, joint.is_prismatic, angle);
            poses.push(transform);
        }
        if self.ee_link.is_some() {
            poses.push(transform * self.ee_offset);
        }
        poses
    }

    /// Compute per-joint transforms for Jacobian computation.
    ///
    /// Returns (joint_origins_in_base, joint_axes_in_base, ee_position).
    pub fn joint_frames(&self, q: &[f32]) -> (Vec<Vector3<f32>>, Vec<Vector3<f32>>, Vector3<f32>) {
        assert_eq!(q.len(), self.dof());

        let mut transform = Isometry3::identity();
        let mut origins = Vec::with_capacity(self.dof());
        let mut axes = Vec::with_capacity(self.dof());

        for (joint, &angle) in self.joints.iter().zip(q.iter()) {
            transform *= joint.origin;

            // Joint origin and axis in base frame, before the joint's own motion.
            origins.push(transform.translation.vector);
            axes.push(transform.rotation * joint.axis.into_inner());

            transform *= joint_transform(&joint.axis, joint.is_prismatic, angle);
        }

        let ee_pos = (transform * self.ee_offset).translation.vector;
        (origins, axes, ee_pos)
    }

    /// Clamp joint positions to their limits.
    pub fn clamp_joints(&self, q: &mut [f32]) {
        for (value, joint) in q.iter_mut().zip(&self.joints) {
            *value = value.clamp(joint.lower_limit, joint.upper_limit);
        }
    }

    /// Whether every joint value lies within `[lower - tol, upper + tol]`.
    pub fn within_limits(&self, q: &[f32], tolerance: f32) -> bool {
        q.len() == self.dof()
            && q.iter().zip(&self.joints).all(|(&value, joint)| {
                value >= joint.lower_limit - tolerance && value <= joint.upper_limit + tolerance
            })
    }

    /// Like [`within_limits`](Self::within_limits) for the first `q.len()`
    /// joints only.
    pub fn leading_joints_within_limits(&self, q: &[f32], tolerance: f32) -> bool {
        q.len() <= self.dof()
            && q.iter().zip(&self.joints).all(|(&value, joint)| {
                value >= joint.lower_limit - tolerance && value <= joint.upper_limit + tolerance
            })
    }
}

fn invalid(message: String) -> KinematicsError {
    KinematicsError::InvalidChain(message)
}

/// Rotation from roll-pitch-yaw (intrinsic XYZ / extrinsic ZYX).
pub fn rotation_from_rpy(rpy: [f32; 3]) -> UnitQuaternion<f32> {
    UnitQuaternion::from_matrix(&rotation_matrix_from_rpy(rpy[0], rpy[1], rpy[2]))
}

/// Build a rotation matrix from roll-pitch-yaw (intrinsic XYZ / extrinsic ZYX).
fn rotation_matrix_from_rpy(roll: f32, pitch: f32, yaw: f32) -> Matrix3<f32> {
    let (sr, cr) = roll.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let (sy, cy) = yaw.sin_cos();

    // Extrinsic ZYX = Intrinsic XYZ
    Matrix3::new(
        cy * cp,
        cy * sp * sr - sy * cr,
        cy * sp * cr + sy * sr,
        sy * cp,
        sy * sp * sr + cy * cr,
        sy * sp * cr - cy * sr,
        -sp,
        cp * sr,
        cp * cr,
    )
}

/// Compute the transform for a single joint at a given position.
fn joint_transform(
    axis: &UnitVector3<f32>,
    is_prismatic: bool,
    position: f32,
) -> Isometry3<f32> {
    if is_prismatic {
        Isometry3::from_parts(
            Translation3::from(axis.into_inner() * position),
            UnitQuaternion::identity(),
        )
    } else {
        Isometry3::from_parts(
            Translation3::identity(),
            UnitQuaternion::from_axis_angle(axis, position),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
