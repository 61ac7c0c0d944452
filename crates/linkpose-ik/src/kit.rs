//! Per-link kinematics kit.
//!
//! A [`LinkKinematicsKit`] bundles what the positioning core needs for one
//! target link: the body, the link's base link, the attached frame sets and
//! the current frame selection per frame type, and the link's IK solver.
//!
//! The solver and its preferred-configuration field are shared mutable
//! state. Trials that set the field, solve and read back joint state run
//! inside an [`ExclusiveSession`]; while one is open, every other solve
//! through the kit is refused.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use nalgebra::{Isometry3, Vector3};
use tracing::debug;

use linkpose_core::{FrameType, GeneralId, KinematicsError, Signal, SolverSettings, Subscription};
use linkpose_frames::{CoordinateFrame, CoordinateFrameList, CoordinateFramePtr, FrameSetSuite};

use crate::body::BodyPtr;
use crate::configuration::{ConfigurationHandler, JointSignConfiguration};
use crate::provider::{InverseKinematics, JointPathIk, KinematicsProvider, ProviderKind, RootLinkIk};
use crate::solver::DlsConfig;

/// Shared handle to a kit.
pub type LinkKinematicsKitPtr = Rc<LinkKinematicsKit>;

/// Joint values may exceed a limit by this much and still count as inside.
const LIMIT_TOLERANCE: f32 = 1.0e-6;

#[derive(Debug)]
struct KitState {
    current_ids: [GeneralId; 3],
    base_frame_type: FrameType,
    reference_rpy: Vector3<f32>,
    custom_ik_disabled: bool,
}

pub struct LinkKinematicsKit {
    body: BodyPtr,
    link: usize,
    base_link: Cell<Option<usize>>,
    frames: RefCell<Option<FrameSetSuite>>,
    /// Configuration-aware solver.
    custom_ik: RefCell<Option<Rc<dyn InverseKinematics>>>,
    /// Solver used while custom IK is disabled.
    plain_ik: RefCell<Option<Rc<dyn InverseKinematics>>>,
    state: RefCell<KitState>,
    identity_frame: CoordinateFramePtr,
    busy: Cell<bool>,
    sig_frame_update: Signal<()>,
}

impl LinkKinematicsKit {
    /// Kit for `link` with default solver settings.
    pub fn new(body: BodyPtr, link: usize) -> Result<LinkKinematicsKitPtr, KinematicsError> {
        Self::with_settings(body, link, &SolverSettings::default())
    }

    /// Kit for `link`. The root link gets a solver that places the body;
    /// other links get a joint-path solver, configuration-aware when the
    /// body declares configuration targets on the path.
    pub fn with_settings(
        body: BodyPtr,
        link: usize,
        settings: &SolverSettings,
    ) -> Result<LinkKinematicsKitPtr, KinematicsError> {
        if link >= body.num_links() {
            return Err(KinematicsError::UnknownLink(format!("#{link}")));
        }

        let (custom_ik, plain_ik): (Rc<dyn InverseKinematics>, Rc<dyn InverseKinematics>) =
            if body.is_root_link(link) {
                let ik: Rc<dyn InverseKinematics> = Rc::new(RootLinkIk::new(Rc::clone(&body)));
                (Rc::clone(&ik), ik)
            } else {
                let config = DlsConfig::from(settings);
                let configuration = body
                    .config()
                    .configuration
                    .as_ref()
                    .map(|c| JointSignConfiguration::from_config(Rc::clone(&body), c))
                    .transpose()?
                    .map(Rc::new);
                let custom = JointPathIk::new(Rc::clone(&body), link, config.clone())
                    .ok_or(KinematicsError::NoSolver)?
                    .with_configuration(configuration);
                let plain = JointPathIk::new(Rc::clone(&body), link, config)
                    .ok_or(KinematicsError::NoSolver)?;
                (Rc::new(custom), Rc::new(plain))
            };

        let kit = Self::bare(body, link);
        *kit.custom_ik.borrow_mut() = Some(custom_ik);
        *kit.plain_ik.borrow_mut() = Some(plain_ik);
        Ok(Rc::new(kit))
    }

    /// Kit with frame access but no solver.
    pub fn without_solver(body: BodyPtr, link: usize) -> Result<LinkKinematicsKitPtr, KinematicsError> {
        if link >= body.num_links() {
            return Err(KinematicsError::UnknownLink(format!("#{link}")));
        }
        Ok(Rc::new(Self::bare(body, link)))
    }

    fn bare(body: BodyPtr, link: usize) -> Self {
        let base_link = (!body.is_root_link(link)).then(|| body.root_link());
        Self {
            body,
            link,
            base_link: Cell::new(base_link),
            frames: RefCell::new(None),
            custom_ik: RefCell::new(None),
            plain_ik: RefCell::new(None),
            state: RefCell::new(KitState {
                current_ids: [
                    GeneralId::default_id(),
                    GeneralId::default_id(),
                    GeneralId::default_id(),
                ],
                base_frame_type: FrameType::World,
                reference_rpy: Vector3::zeros(),
                custom_ik_disabled: false,
            }),
            identity_frame: CoordinateFrame::identity(),
            busy: Cell::new(false),
            sig_frame_update: Signal::new(),
        }
    }

    // -- body and links -----------------------------------------------------

    pub fn body(&self) -> &BodyPtr {
        &self.body
    }

    pub fn link(&self) -> usize {
        self.link
    }

    pub fn link_name(&self) -> &str {
        self.body.link(self.link).map_or("", |l| l.name.as_str())
    }

    pub fn base_link(&self) -> Option<usize> {
        self.base_link.get()
    }

    pub fn set_base_link(&self, link: Option<usize>) {
        self.base_link.set(link.filter(|&l| l < self.body.num_links()));
    }

    // -- frames -------------------------------------------------------------

    pub fn has_frame_sets(&self) -> bool {
        self.frames.borrow().is_some()
    }

    pub fn frame_sets(&self) -> Option<FrameSetSuite> {
        self.frames.borrow().clone()
    }

    pub fn set_frame_sets(&self, frames: Option<FrameSetSuite>) {
        *self.frames.borrow_mut() = frames;
    }

    pub fn frame_set(&self, frame_type: FrameType) -> Option<Rc<CoordinateFrameList>> {
        self.frames
            .borrow()
            .as_ref()
            .map(|suite| Rc::clone(suite.frame_set(frame_type)))
    }

    pub fn current_frame_id(&self, frame_type: FrameType) -> GeneralId {
        self.state.borrow().current_ids[frame_type.index()].clone()
    }

    /// Select the current frame of a type. Observers are told through
    /// [`notify_frame_update`](Self::notify_frame_update).
    pub fn set_current_frame(&self, frame_type: FrameType, id: GeneralId) {
        self.state.borrow_mut().current_ids[frame_type.index()] = id;
    }

    /// The selected frame of a type. Falls back to an identity frame when
    /// no frame set is attached or the id is not in the set.
    pub fn current_frame(&self, frame_type: FrameType) -> CoordinateFramePtr {
        let id = self.current_frame_id(frame_type);
        self.frame_set(frame_type)
            .and_then(|list| list.find(&id))
            .unwrap_or_else(|| Rc::clone(&self.identity_frame))
    }

    pub fn current_base_frame_type(&self) -> FrameType {
        self.state.borrow().base_frame_type
    }

    /// Select which frame type supplies the base frame. Only World and Body
    /// are base frame types.
    pub fn set_current_base_frame_type(&self, frame_type: FrameType) -> bool {
        if frame_type == FrameType::Link {
            debug!("link frames cannot serve as base frames");
            return false;
        }
        self.state.borrow_mut().base_frame_type = frame_type;
        true
    }

    pub fn connect_frame_update(&self, handler: impl Fn(&()) + 'static) -> Subscription {
        self.sig_frame_update.connect(handler)
    }

    pub fn notify_frame_update(&self) {
        self.sig_frame_update.emit(&());
    }

    // -- reference attitude -------------------------------------------------

    /// Roll-pitch-yaw the operator last entered (radians).
    pub fn reference_rpy(&self) -> Vector3<f32> {
        self.state.borrow().reference_rpy
    }

    pub fn set_reference_rpy(&self, rpy: Vector3<f32>) {
        self.state.borrow_mut().reference_rpy = rpy;
    }

    // -- solving ------------------------------------------------------------

    pub fn is_custom_ik_disabled(&self) -> bool {
        self.state.borrow().custom_ik_disabled
    }

    pub fn set_custom_ik_disabled(&self, on: bool) {
        self.state.borrow_mut().custom_ik_disabled = on;
    }

    /// Replace both solvers, e.g. with a scripted one.
    pub fn set_inverse_kinematics(&self, ik: Option<Rc<dyn InverseKinematics>>) {
        *self.plain_ik.borrow_mut() = ik.clone();
        *self.custom_ik.borrow_mut() = ik;
    }

    /// The solver in effect.
    pub fn inverse_kinematics(&self) -> Option<Rc<dyn InverseKinematics>> {
        if self.is_custom_ik_disabled() {
            self.plain_ik.borrow().clone()
        } else {
            self.custom_ik.borrow().clone()
        }
    }

    pub fn configuration_handler(&self) -> Option<Rc<dyn ConfigurationHandler>> {
        self.inverse_kinematics()?.configuration_handler()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Solve for `target`. Refused while an exclusive session is open.
    pub fn calc_inverse_kinematics(&self, target: &Isometry3<f32>) -> bool {
        if self.busy.get() {
            debug!(link = self.link_name(), "solve refused: exclusive session open");
            return false;
        }
        self.inverse_kinematics()
            .is_some_and(|ik| ik.calc_inverse_kinematics(target))
    }

    pub fn calc_remaining_part_forward_kinematics(&self) {
        match self.inverse_kinematics() {
            Some(ik) => ik.calc_remaining_part_forward_kinematics(),
            None => self.body.calc_forward_kinematics(),
        }
    }

    /// Open an exclusive session on the solver.
    ///
    /// # Errors
    ///
    /// [`KinematicsError::Busy`] if a session is already open,
    /// [`KinematicsError::NoSolver`] if the kit has no solver.
    pub fn begin_exclusive(&self) -> Result<ExclusiveSession<'_>, KinematicsError> {
        if self.busy.get() {
            return Err(KinematicsError::Busy);
        }
        let ik = self.inverse_kinematics().ok_or(KinematicsError::NoSolver)?;
        let handler = ik.configuration_handler();
        self.busy.set(true);
        Ok(ExclusiveSession {
            kit: self,
            ik,
            handler,
        })
    }
}

impl KinematicsProvider for LinkKinematicsKit {
    fn provider_kind(&self) -> ProviderKind {
        self.inverse_kinematics()
            .map_or(ProviderKind::LinkKinematics, |ik| ik.provider_kind())
    }
}

impl fmt::Debug for LinkKinematicsKit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkKinematicsKit")
            .field("body", &self.body.name())
            .field("link", &self.link)
            .field("base_link", &self.base_link.get())
            .field("state", &self.state)
            .field("busy", &self.busy.get())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ExclusiveSession
// ---------------------------------------------------------------------------

/// Exclusive use of a kit's solver and its preferred-configuration field.
///
/// Dropping the session resets the preferred configuration and releases
/// the kit.
pub struct ExclusiveSession<'a> {
    kit: &'a LinkKinematicsKit,
    ik: Rc<dyn InverseKinematics>,
    handler: Option<Rc<dyn ConfigurationHandler>>,
}

impl ExclusiveSession<'_> {
    pub fn kit(&self) -> &LinkKinematicsKit {
        self.kit
    }

    pub fn configuration_handler(&self) -> Option<&Rc<dyn ConfigurationHandler>> {
        self.handler.as_ref()
    }

    /// Returns `false` without a handler or for an unknown type id.
    pub fn set_preferred_configuration_type(&self, type_id: i32) -> bool {
        self.handler
            .as_ref()
            .is_some_and(|h| h.set_preferred_configuration_type(type_id))
    }

    pub fn reset_preferred_configuration_type(&self) {
        if let Some(handler) = &self.handler {
            handler.reset_preferred_configuration_type();
        }
    }

    pub fn solve(&self, target: &Isometry3<f32>) -> bool {
        self.ik.calc_inverse_kinematics(target)
    }

    pub fn calc_remaining_part_forward_kinematics(&self) {
        self.ik.calc_remaining_part_forward_kinematics();
    }

    /// Whether every joint the solver moves is within its limits. Joints
    /// off the solved path are not checked.
    pub fn joints_within_limits(&self) -> bool {
        let body = self.kit.body();
        let q = body.joint_positions();
        let dof = self.ik.joint_path_dof().map_or(q.len(), |n| n.min(q.len()));
        body.chain()
            .leading_joints_within_limits(&q[..dof], LIMIT_TOLERANCE)
    }
}

impl Drop for ExclusiveSession<'_> {
    fn drop(&mut self) {
        self.reset_preferred_configuration_type();
        self.kit.busy.set(false);
    }
}

impl fmt::Debug for ExclusiveSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusiveSession")
            .field("link", &self.kit.link)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
