//! Provider traits consumed by the link positioning core, and capability
//! dispatch over a static kind hierarchy.
//!
//! Every provider reports a [`ProviderKind`]. Kinds are registered once in
//! a process-wide [`TypeHierarchyRegistry`]; asking whether a provider
//! supports a [`Capability`] walks the kind's ancestor chain up to the kind
//! that introduced the capability.
//!
//! ```text
//! Base
//!  ├── LinkKinematics                 frame access
//!  │    └── InverseKinematics         solving
//!  │         └── ConfigurableIk       configuration
//!  └── PositionEdit
//! ```

use std::rc::Rc;
use std::sync::LazyLock;

use nalgebra::Isometry3;
use tracing::debug;

use linkpose_core::{Subscription, TypeHierarchyRegistry, UNKNOWN_KIND_ID};
use linkpose_frames::{CoordinateFrame, UpdateFlags};

use crate::body::BodyPtr;
use crate::chain::KinematicChain;
use crate::configuration::{ConfigurationHandler, JointSignConfiguration};
use crate::solver::{DlsConfig, DlsSolver, IkTarget};

// ---------------------------------------------------------------------------
// Kinds and capabilities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Base,
    LinkKinematics,
    InverseKinematics,
    ConfigurableIk,
    PositionEdit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    FrameAccess,
    Solving,
    Configuration,
}

impl Capability {
    /// Kind whose descendants all provide this capability.
    pub const fn introduced_by(self) -> ProviderKind {
        match self {
            Self::FrameAccess => ProviderKind::LinkKinematics,
            Self::Solving => ProviderKind::InverseKinematics,
            Self::Configuration => ProviderKind::ConfigurableIk,
        }
    }
}

static KIND_REGISTRY: LazyLock<TypeHierarchyRegistry<ProviderKind>> = LazyLock::new(|| {
    let mut registry = TypeHierarchyRegistry::new(ProviderKind::Base);
    registry.register(ProviderKind::LinkKinematics, ProviderKind::Base);
    registry.register(ProviderKind::InverseKinematics, ProviderKind::LinkKinematics);
    registry.register(ProviderKind::ConfigurableIk, ProviderKind::InverseKinematics);
    registry.register(ProviderKind::PositionEdit, ProviderKind::Base);
    registry
});

/// The process-wide kind table.
pub fn kind_registry() -> &'static TypeHierarchyRegistry<ProviderKind> {
    &KIND_REGISTRY
}

pub fn kind_id(kind: ProviderKind) -> i32 {
    KIND_REGISTRY.id_of(&kind, UNKNOWN_KIND_ID)
}

/// Whether providers of `kind` offer `capability`.
pub fn supports(kind: ProviderKind, capability: Capability) -> bool {
    let required = kind_id(capability.introduced_by());
    KIND_REGISTRY.is_a(kind_id(kind), required)
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Anything that reports its kind.
pub trait KinematicsProvider {
    fn provider_kind(&self) -> ProviderKind;

    fn supports(&self, capability: Capability) -> bool {
        supports(self.provider_kind(), capability)
    }
}

/// Solver for one target link.
pub trait InverseKinematics: KinematicsProvider {
    /// Move the body so the target link reaches `target` (world frame).
    /// On failure the body's joint state is left untouched.
    fn calc_inverse_kinematics(&self, target: &Isometry3<f32>) -> bool;

    /// Update link poses after a successful solve.
    fn calc_remaining_part_forward_kinematics(&self);

    fn configuration_handler(&self) -> Option<Rc<dyn ConfigurationHandler>> {
        None
    }

    /// Number of leading body joints a solve may move. `None` when the
    /// solver can touch any joint.
    fn joint_path_dof(&self) -> Option<usize> {
        None
    }
}

/// A pose-carrying object edited directly, instead of a link.
pub trait PositionEditTarget: KinematicsProvider {
    fn name(&self) -> String;

    fn is_editable(&self) -> bool;

    fn position(&self) -> Isometry3<f32>;

    /// Apply a new pose. Returns `false` when the target refuses it.
    fn set_position(&self, position: &Isometry3<f32>) -> bool;

    fn connect_position_changed(&self, handler: Box<dyn Fn()>) -> Subscription;
}

// ---------------------------------------------------------------------------
// Solvers
// ---------------------------------------------------------------------------

/// Numerical solver along the joint path from the root to one link.
#[derive(Debug)]
pub struct JointPathIk {
    body: BodyPtr,
    link: usize,
    chain: KinematicChain,
    solver: DlsSolver,
    configuration: Option<Rc<JointSignConfiguration>>,
}

impl JointPathIk {
    /// Solver for `link`. `None` for the root link or an unknown link.
    pub fn new(body: BodyPtr, link: usize, config: DlsConfig) -> Option<Self> {
        let chain = body.chain().sub_chain(link)?;
        Some(Self {
            body,
            link,
            chain,
            solver: DlsSolver::new(config),
            configuration: None,
        })
    }

    /// Attach a configuration handler. It is ignored unless every target
    /// joint lies on this joint path.
    #[must_use]
    pub fn with_configuration(mut self, configuration: Option<Rc<JointSignConfiguration>>) -> Self {
        self.configuration = configuration.filter(|c| {
            c.max_target_joint()
                .is_some_and(|joint| joint < self.chain.dof())
        });
        self
    }

    pub fn link(&self) -> usize {
        self.link
    }

    pub fn chain(&self) -> &KinematicChain {
        &self.chain
    }

    fn solve_for(&self, target: &IkTarget, q_init: &[f32]) -> Option<Vec<f32>> {
        let preferred = self
            .configuration
            .as_ref()
            .and_then(|c| c.preferred_configuration_type().map(|id| (c, id)));

        match preferred {
            Some((configuration, type_id)) => {
                let mut seed = q_init.to_vec();
                configuration.seed(type_id, &mut seed);
                let bounds = configuration.bounds(type_id, self.chain.dof());
                // Branch bounds replace the joint limits; limits are checked
                // by whoever asked for the branch.
                let result = self.solver.solve_within(&self.chain, target, &seed, &bounds);
                let on_branch = configuration.matches(type_id, &result.joint_positions);
                debug!(
                    type_id,
                    converged = result.converged,
                    on_branch,
                    iterations = result.iterations,
                    "configuration solve"
                );
                (result.converged && on_branch).then_some(result.joint_positions)
            }
            None => {
                let result = self.solver.solve(&self.chain, target, q_init);
                debug!(
                    converged = result.converged,
                    iterations = result.iterations,
                    position_error = result.position_error,
                    "joint path solve"
                );
                result.converged.then_some(result.joint_positions)
            }
        }
    }
}

impl KinematicsProvider for JointPathIk {
    fn provider_kind(&self) -> ProviderKind {
        if self.configuration.is_some() {
            ProviderKind::ConfigurableIk
        } else {
            ProviderKind::InverseKinematics
        }
    }
}

impl InverseKinematics for JointPathIk {
    fn calc_inverse_kinematics(&self, target: &Isometry3<f32>) -> bool {
        let local = self.body.root_pose().inverse() * target;
        let q = self.body.joint_positions();
        let q_init = &q[..self.chain.dof()];
        match self.solve_for(&IkTarget::Pose(local), q_init) {
            Some(solution) => {
                self.body.set_leading_joint_positions(&solution);
                true
            }
            None => false,
        }
    }

    fn calc_remaining_part_forward_kinematics(&self) {
        self.body.calc_forward_kinematics();
    }

    fn configuration_handler(&self) -> Option<Rc<dyn ConfigurationHandler>> {
        self.configuration
            .clone()
            .map(|c| c as Rc<dyn ConfigurationHandler>)
    }

    fn joint_path_dof(&self) -> Option<usize> {
        Some(self.chain.dof())
    }
}

/// "Solver" for the root link: places the body.
#[derive(Debug)]
pub struct RootLinkIk {
    body: BodyPtr,
}

impl RootLinkIk {
    pub fn new(body: BodyPtr) -> Self {
        Self { body }
    }
}

impl KinematicsProvider for RootLinkIk {
    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::InverseKinematics
    }
}

impl InverseKinematics for RootLinkIk {
    fn calc_inverse_kinematics(&self, target: &Isometry3<f32>) -> bool {
        self.body.set_root_pose(*target);
        true
    }

    fn calc_remaining_part_forward_kinematics(&self) {
        self.body.calc_forward_kinematics();
    }

    fn joint_path_dof(&self) -> Option<usize> {
        Some(0)
    }
}

// ---------------------------------------------------------------------------
// Frames as edit targets
// ---------------------------------------------------------------------------

impl KinematicsProvider for CoordinateFrame {
    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::PositionEdit
    }
}

impl PositionEditTarget for CoordinateFrame {
    fn name(&self) -> String {
        let note = self.note();
        if note.is_empty() {
            self.id().label()
        } else {
            format!("{}: {}", self.id(), &*note)
        }
    }

    fn is_editable(&self) -> bool {
        true
    }

    fn position(&self) -> Isometry3<f32> {
        CoordinateFrame::position(self)
    }

    fn set_position(&self, position: &Isometry3<f32>) -> bool {
        CoordinateFrame::set_position(self, *position);
        true
    }

    fn connect_position_changed(&self, handler: Box<dyn Fn()>) -> Subscription {
        self.connect_updated(move |flags| {
            if flags.contains(UpdateFlags::POSITION) {
                handler();
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
