//! Discrete IK configurations (branches).
//!
//! A [`ConfigurationHandler`] names the alternative joint-space branches
//! that reach the same Cartesian pose and carries the single
//! "preferred configuration" field a solver consults. The field is shared
//! mutable state: set it, solve, and reset it, without interleaving other
//! solves on the same chain.

use std::cell::Cell;

use tracing::debug;

use linkpose_core::KinematicsError;

use crate::body::BodyPtr;
use crate::chain::ConfigurationConfig;
use crate::solver::JointBounds;

/// Provider of configuration types for one joint path.
pub trait ConfigurationHandler {
    fn num_configuration_types(&self) -> usize;

    /// Type id of the `index`-th configuration, in declaration order.
    fn configuration_type_id(&self, index: usize) -> Option<i32>;

    /// Column labels, one per configuration target.
    fn configuration_target_names(&self) -> Vec<String>;

    /// Per-target state labels of a type. Empty for unknown ids.
    fn configuration_state_names(&self, type_id: i32) -> Vec<String>;

    /// Bias the next solves towards `type_id`. Unknown ids are rejected.
    fn set_preferred_configuration_type(&self, type_id: i32) -> bool;

    fn reset_preferred_configuration_type(&self);

    fn preferred_configuration_type(&self) -> Option<i32>;

    /// Types matching the current joint state. More than one when the
    /// state sits on a branch boundary.
    fn current_configuration_types(&self) -> Vec<i32>;

    /// Title of the joint path the configurations belong to.
    fn joint_path_name(&self) -> String {
        String::new()
    }
}

/// Joints closer to zero than this belong to both branches.
const AMBIGUITY_THRESHOLD: f32 = 1.0e-4;

/// Distance kept from zero while solving for a branch.
const SIGN_MARGIN: f32 = 1.0e-3;

/// Value a flipped joint starts from when it sits at zero.
const SEED_MAGNITUDE: f32 = 0.1;

#[derive(Debug, Clone)]
struct SignTarget {
    joint: usize,
    label: String,
    positive: String,
    negative: String,
}

/// Configurations selected by the signs of a few joints, e.g. an elbow
/// being bent up or down.
///
/// With `k` targets there are `2^k` types. Type id `1 + mask` has bit `i`
/// of `mask` set when target `i` is negative, so type `1` is "all
/// non-negative".
#[derive(Debug)]
pub struct JointSignConfiguration {
    name: String,
    body: BodyPtr,
    targets: Vec<SignTarget>,
    preferred: Cell<Option<i32>>,
}

impl JointSignConfiguration {
    /// Handler for the targets listed in `config`.
    ///
    /// # Errors
    ///
    /// [`KinematicsError::InvalidChain`] if a target names an unknown joint
    /// or there are more targets than type ids can encode.
    pub fn from_config(body: BodyPtr, config: &ConfigurationConfig) -> Result<Self, KinematicsError> {
        if config.targets.len() > 16 {
            return Err(KinematicsError::InvalidChain(
                "too many configuration targets".into(),
            ));
        }
        let targets = config
            .targets
            .iter()
            .map(|target| {
                let joint = body.chain().joint_index(&target.joint).ok_or_else(|| {
                    KinematicsError::InvalidChain(format!(
                        "configuration target \"{}\" is not a joint",
                        target.joint
                    ))
                })?;
                Ok(SignTarget {
                    joint,
                    label: target.label.clone().unwrap_or_else(|| target.joint.clone()),
                    positive: target.positive.clone(),
                    negative: target.negative.clone(),
                })
            })
            .collect::<Result<Vec<_>, KinematicsError>>()?;

        Ok(Self {
            name: config.name.clone(),
            body,
            targets,
            preferred: Cell::new(None),
        })
    }

    /// Highest joint index any target refers to.
    pub fn max_target_joint(&self) -> Option<usize> {
        self.targets.iter().map(|t| t.joint).max()
    }

    fn mask_of(&self, type_id: i32) -> Option<u32> {
        let mask = u32::try_from(type_id.checked_sub(1)?).ok()?;
        (mask < (1_u32 << self.targets.len())).then_some(mask)
    }

    fn is_negative(mask: u32, target: usize) -> bool {
        mask & (1 << target) != 0
    }

    /// Flip the target joints of `q` onto the branch of `type_id`.
    pub fn seed(&self, type_id: i32, q: &mut [f32]) {
        let Some(mask) = self.mask_of(type_id) else {
            return;
        };
        for (i, target) in self.targets.iter().enumerate() {
            let Some(value) = q.get_mut(target.joint) else {
                continue;
            };
            let sign = if Self::is_negative(mask, i) { -1.0 } else { 1.0 };
            if *value * sign <= SIGN_MARGIN {
                *value = sign * value.abs().max(SEED_MAGNITUDE);
            }
        }
    }

    /// Per-joint bounds confining the target joints to the branch of
    /// `type_id`. Other joints are unbounded.
    pub fn bounds(&self, type_id: i32, dof: usize) -> JointBounds {
        let mut bounds = vec![(f32::NEG_INFINITY, f32::INFINITY); dof];
        if let Some(mask) = self.mask_of(type_id) {
            for (i, target) in self.targets.iter().enumerate() {
                if let Some(bound) = bounds.get_mut(target.joint) {
                    *bound = if Self::is_negative(mask, i) {
                        (f32::NEG_INFINITY, -SIGN_MARGIN)
                    } else {
                        (SIGN_MARGIN, f32::INFINITY)
                    };
                }
            }
        }
        bounds
    }

    /// Whether `q` lies on the branch of `type_id`.
    pub fn matches(&self, type_id: i32, q: &[f32]) -> bool {
        self.types_of(q).contains(&type_id)
    }

    /// Types `q` belongs to, ascending.
    pub fn types_of(&self, q: &[f32]) -> Vec<i32> {
        let mut masks = vec![0_u32];
        for (i, target) in self.targets.iter().enumerate() {
            let value = q.get(target.joint).copied().unwrap_or(0.0);
            let bit = 1_u32 << i;
            if value.abs() < AMBIGUITY_THRESHOLD {
                let flipped: Vec<u32> = masks.iter().map(|m| m | bit).collect();
                masks.extend(flipped);
            } else if value < 0.0 {
                for mask in &mut masks {
                    *mask |= bit;
                }
            }
        }
        let mut types: Vec<i32> = masks.into_iter().filter_map(|m| i32::try_from(m + 1).ok()).collect();
        types.sort_unstable();
        types
    }
}

impl ConfigurationHandler for JointSignConfiguration {
    fn num_configuration_types(&self) -> usize {
        1 << self.targets.len()
    }

    fn configuration_type_id(&self, index: usize) -> Option<i32> {
        if index < self.num_configuration_types() {
            i32::try_from(index + 1).ok()
        } else {
            None
        }
    }

    fn configuration_target_names(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.label.clone()).collect()
    }

    fn configuration_state_names(&self, type_id: i32) -> Vec<String> {
        let Some(mask) = self.mask_of(type_id) else {
            return Vec::new();
        };
        self.targets
            .iter()
            .enumerate()
            .map(|(i, t)| {
                if Self::is_negative(mask, i) {
                    t.negative.clone()
                } else {
                    t.positive.clone()
                }
            })
            .collect()
    }

    fn set_preferred_configuration_type(&self, type_id: i32) -> bool {
        if self.mask_of(type_id).is_none() {
            debug!(type_id, "unknown configuration type");
            return false;
        }
        self.preferred.set(Some(type_id));
        true
    }

    fn reset_preferred_configuration_type(&self) {
        self.preferred.set(None);
    }

    fn preferred_configuration_type(&self) -> Option<i32> {
        self.preferred.get()
    }

    fn current_configuration_types(&self) -> Vec<i32> {
        self.types_of(&self.body.joint_positions())
    }

    fn joint_path_name(&self) -> String {
        self.name.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
