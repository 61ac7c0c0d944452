//! A body: one serial chain placed in the world, its joint state and the
//! resulting link poses.
//!
//! Bodies are shared through [`BodyPtr`] and mutated through `&self`; the
//! kinematic state sits behind a `RefCell` that is never borrowed while
//! the state-change signal is emitted.

use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::{Isometry3, UnitQuaternion};
use tracing::debug;

use linkpose_core::{KinematicsError, Signal, Subscription};

use crate::chain::{ChainConfig, KinematicChain};

/// Shared handle to a body.
pub type BodyPtr = Rc<Body>;

/// Static description of one link.
#[derive(Debug, Clone)]
pub struct Link {
    pub name: String,
    /// Parent link index. `None` for the root link.
    pub parent: Option<usize>,
    /// Index of the joint that moves this link.
    pub joint: Option<usize>,
    /// Fixed rotation between the link frame and the frame its attitude is
    /// presented in.
    pub attitude: UnitQuaternion<f32>,
}

/// Captured joint positions and root link pose.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyStateSnapshot {
    q: Vec<f32>,
    root_pose: Isometry3<f32>,
}

impl BodyStateSnapshot {
    pub fn joint_positions(&self) -> &[f32] {
        &self.q
    }

    pub fn root_pose(&self) -> &Isometry3<f32> {
        &self.root_pose
    }
}

#[derive(Debug)]
struct KinematicState {
    q: Vec<f32>,
    root_pose: Isometry3<f32>,
    /// World poses, one per link.
    link_poses: Vec<Isometry3<f32>>,
    edit_snapshot: Option<BodyStateSnapshot>,
}

/// Kinematic body built from a [`ChainConfig`].
#[derive(Debug)]
pub struct Body {
    name: String,
    chain: KinematicChain,
    links: Vec<Link>,
    ik_links: Vec<bool>,
    config: ChainConfig,
    state: RefCell<KinematicState>,
    sig_kinematic_state_changed: Signal<()>,
}

impl Body {
    /// Build a body with all joints at zero and the root at the origin.
    pub fn from_config(config: &ChainConfig) -> Result<BodyPtr, KinematicsError> {
        let chain = KinematicChain::from_config(config)?;

        let links: Vec<Link> = chain
            .link_names()
            .into_iter()
            .zip(chain.link_attitudes())
            .enumerate()
            .map(|(index, (name, attitude))| Link {
                name: name.to_owned(),
                parent: index.checked_sub(1),
                joint: (1..=chain.dof()).contains(&index).then(|| index - 1),
                attitude,
            })
            .collect();

        let mut ik_links = vec![false; links.len()];
        for name in &config.ik_links {
            let index = links
                .iter()
                .position(|l| &l.name == name)
                .ok_or_else(|| KinematicsError::UnknownLink(name.clone()))?;
            ik_links[index] = true;
        }

        let q = vec![0.0; chain.dof()];
        let link_poses = chain.link_poses(&q);
        let body = Self {
            name: config.name.clone(),
            chain,
            links,
            ik_links,
            config: config.clone(),
            state: RefCell::new(KinematicState {
                q,
                root_pose: Isometry3::identity(),
                link_poses,
                edit_snapshot: None,
            }),
            sig_kinematic_state_changed: Signal::new(),
        };
        Ok(Rc::new(body))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chain(&self) -> &KinematicChain {
        &self.chain
    }

    /// The description the body was built from.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    // -- links --------------------------------------------------------------

    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link(&self, index: usize) -> Option<&Link> {
        self.links.get(index)
    }

    pub fn find_link(&self, name: &str) -> Option<usize> {
        self.links.iter().position(|l| l.name == name)
    }

    pub const fn root_link(&self) -> usize {
        0
    }

    pub const fn is_root_link(&self, index: usize) -> bool {
        index == 0
    }

    /// Whether the link carries preset IK.
    pub fn has_preset_ik(&self, index: usize) -> bool {
        self.ik_links.get(index).copied().unwrap_or(false)
    }

    /// Links in search order from `start`: the link itself, its
    /// descendants nearest first, then its ancestors nearest first.
    pub fn traverse_from(&self, start: usize) -> Vec<usize> {
        if start >= self.links.len() {
            return Vec::new();
        }
        std::iter::once(start)
            .chain(start + 1..self.links.len())
            .chain((0..start).rev())
            .collect()
    }

    /// First link with preset IK in [`traverse_from`](Self::traverse_from)
    /// order.
    pub fn find_preset_ik_link_from(&self, start: usize) -> Option<usize> {
        self.traverse_from(start)
            .into_iter()
            .find(|&index| self.has_preset_ik(index))
    }

    // -- joint state --------------------------------------------------------

    pub fn num_joints(&self) -> usize {
        self.chain.dof()
    }

    pub fn joint_positions(&self) -> Vec<f32> {
        self.state.borrow().q.clone()
    }

    pub fn joint_position(&self, index: usize) -> Option<f32> {
        self.state.borrow().q.get(index).copied()
    }

    /// Overwrite all joint positions. Link poses are not updated until
    /// [`calc_forward_kinematics`](Self::calc_forward_kinematics).
    pub fn set_joint_positions(&self, q: &[f32]) -> Result<(), KinematicsError> {
        let mut state = self.state.borrow_mut();
        if q.len() != state.q.len() {
            return Err(KinematicsError::DofMismatch {
                expected: state.q.len(),
                got: q.len(),
            });
        }
        state.q.copy_from_slice(q);
        Ok(())
    }

    /// Overwrite the leading joint positions (a joint path from the root).
    pub(crate) fn set_leading_joint_positions(&self, q: &[f32]) {
        let mut state = self.state.borrow_mut();
        let n = q.len().min(state.q.len());
        state.q[..n].copy_from_slice(&q[..n]);
    }

    pub fn root_pose(&self) -> Isometry3<f32> {
        self.state.borrow().root_pose
    }

    pub fn set_root_pose(&self, pose: Isometry3<f32>) {
        self.state.borrow_mut().root_pose = pose;
    }

    /// Recompute every link pose from the root pose and joint positions.
    pub fn calc_forward_kinematics(&self) {
        let mut state = self.state.borrow_mut();
        let root_pose = state.root_pose;
        let poses = self
            .chain
            .link_poses(&state.q)
            .into_iter()
            .map(|pose| root_pose * pose)
            .collect();
        state.link_poses = poses;
    }

    /// World pose of a link as of the last forward kinematics.
    pub fn link_pose(&self, index: usize) -> Option<Isometry3<f32>> {
        self.state.borrow().link_poses.get(index).copied()
    }

    /// Link pose with the rotation expressed in the link's attitude frame.
    pub fn link_attitude_pose(&self, index: usize) -> Option<Isometry3<f32>> {
        let link = self.links.get(index)?;
        let mut pose = self.link_pose(index)?;
        pose.rotation *= link.attitude;
        Some(pose)
    }

    /// Link rotation that presents as `attitude`.
    pub fn rotation_from_attitude(&self, index: usize, attitude: &UnitQuaternion<f32>) -> UnitQuaternion<f32> {
        match self.links.get(index) {
            Some(link) => attitude * link.attitude.inverse(),
            None => *attitude,
        }
    }

    // -- snapshots and edits ------------------------------------------------

    pub fn store_state(&self) -> BodyStateSnapshot {
        let state = self.state.borrow();
        BodyStateSnapshot {
            q: state.q.clone(),
            root_pose: state.root_pose,
        }
    }

    /// Restore joint positions and the root pose, then recompute link
    /// poses. No notification is emitted.
    pub fn restore_state(&self, snapshot: &BodyStateSnapshot) {
        {
            let mut state = self.state.borrow_mut();
            if state.q.len() == snapshot.q.len() {
                state.q.copy_from_slice(&snapshot.q);
            } else {
                debug!(body = %self.name, "snapshot does not match the body, joints left unchanged");
            }
            state.root_pose = snapshot.root_pose;
        }
        self.calc_forward_kinematics();
    }

    /// Start an edit. The current state is kept until the edit is accepted
    /// or cancelled; a nested begin keeps the outer snapshot.
    pub fn begin_kinematic_state_edit(&self) {
        let snapshot = self.store_state();
        let mut state = self.state.borrow_mut();
        if state.edit_snapshot.is_none() {
            state.edit_snapshot = Some(snapshot);
        }
    }

    pub fn is_editing(&self) -> bool {
        self.state.borrow().edit_snapshot.is_some()
    }

    /// Commit the current edit.
    pub fn accept_kinematic_state_edit(&self) {
        self.state.borrow_mut().edit_snapshot = None;
    }

    /// Roll back to the state at [`begin_kinematic_state_edit`](Self::begin_kinematic_state_edit).
    pub fn cancel_kinematic_state_edit(&self) {
        let snapshot = self.state.borrow_mut().edit_snapshot.take();
        if let Some(snapshot) = snapshot {
            self.restore_state(&snapshot);
        }
    }

    pub fn connect_kinematic_state_changed(&self, handler: impl Fn(&()) + 'static) -> Subscription {
        self.sig_kinematic_state_changed.connect(handler)
    }

    pub fn notify_kinematic_state_change(&self) {
        self.sig_kinematic_state_changed.emit(&());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
