//! Mock providers for testing.
//!
//! Scripted stand-ins for the solver, the configuration handler and edit
//! targets. Each records what the code under test asked of it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use nalgebra::Isometry3;

use linkpose_core::{Signal, Subscription};
use linkpose_ik::{BodyPtr, ConfigurationHandler, InverseKinematics, KinematicsProvider, PositionEditTarget, ProviderKind};

// ---------------------------------------------------------------------------
// ScriptedIk
// ---------------------------------------------------------------------------

/// A solver that succeeds or fails as told.
///
/// On success it writes the configured joint vector into the body (if
/// any) and records the target.
pub struct ScriptedIk {
    body: Option<BodyPtr>,
    succeed: Cell<bool>,
    solution: RefCell<Option<Vec<f32>>>,
    handler: Option<Rc<dyn ConfigurationHandler>>,
    targets: RefCell<Vec<Isometry3<f32>>>,
    fk_calls: Cell<usize>,
}

impl ScriptedIk {
    /// A solver that always succeeds without touching any body.
    pub fn succeeding() -> Self {
        Self {
            body: None,
            succeed: Cell::new(true),
            solution: RefCell::new(None),
            handler: None,
            targets: RefCell::new(Vec::new()),
            fk_calls: Cell::new(0),
        }
    }

    /// A solver that always fails.
    pub fn failing() -> Self {
        let ik = Self::succeeding();
        ik.succeed.set(false);
        ik
    }

    /// Write `solution` into `body` on each successful solve.
    pub fn with_body(mut self, body: BodyPtr, solution: Vec<f32>) -> Self {
        self.body = Some(body);
        *self.solution.borrow_mut() = Some(solution);
        self
    }

    pub fn with_handler(mut self, handler: Rc<dyn ConfigurationHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn set_succeed(&self, on: bool) {
        self.succeed.set(on);
    }

    /// Targets passed to every solve so far.
    pub fn targets(&self) -> Vec<Isometry3<f32>> {
        self.targets.borrow().clone()
    }

    pub fn fk_calls(&self) -> usize {
        self.fk_calls.get()
    }
}

impl KinematicsProvider for ScriptedIk {
    fn provider_kind(&self) -> ProviderKind {
        if self.handler.is_some() {
            ProviderKind::ConfigurableIk
        } else {
            ProviderKind::InverseKinematics
        }
    }
}

impl InverseKinematics for ScriptedIk {
    fn calc_inverse_kinematics(&self, target: &Isometry3<f32>) -> bool {
        self.targets.borrow_mut().push(*target);
        if !self.succeed.get() {
            return false;
        }
        if let (Some(body), Some(q)) = (&self.body, self.solution.borrow().as_ref()) {
            body.set_joint_positions(q).is_ok()
        } else {
            true
        }
    }

    fn calc_remaining_part_forward_kinematics(&self) {
        self.fk_calls.set(self.fk_calls.get() + 1);
        if let Some(body) = &self.body {
            body.calc_forward_kinematics();
        }
    }

    fn configuration_handler(&self) -> Option<Rc<dyn ConfigurationHandler>> {
        self.handler.clone()
    }
}

// ---------------------------------------------------------------------------
// MockConfigurationHandler
// ---------------------------------------------------------------------------

/// A configuration handler with fixed types and labels.
pub struct MockConfigurationHandler {
    name: String,
    targets: Vec<String>,
    /// `(type id, state labels)` in declaration order.
    types: Vec<(i32, Vec<String>)>,
    current: RefCell<Vec<i32>>,
    preferred: Cell<Option<i32>>,
    preferred_history: RefCell<Vec<i32>>,
}

impl MockConfigurationHandler {
    pub fn new(name: &str, targets: &[&str], types: &[(i32, &[&str])]) -> Self {
        Self {
            name: name.to_owned(),
            targets: targets.iter().map(|&t| t.to_owned()).collect(),
            types: types
                .iter()
                .map(|&(id, states)| (id, states.iter().map(|&s| s.to_owned()).collect()))
                .collect(),
            current: RefCell::new(Vec::new()),
            preferred: Cell::new(None),
            preferred_history: RefCell::new(Vec::new()),
        }
    }

    pub fn set_current_types(&self, types: Vec<i32>) {
        *self.current.borrow_mut() = types;
    }

    /// Every type id accepted by `set_preferred_configuration_type`.
    pub fn preferred_history(&self) -> Vec<i32> {
        self.preferred_history.borrow().clone()
    }
}

impl ConfigurationHandler for MockConfigurationHandler {
    fn num_configuration_types(&self) -> usize {
        self.types.len()
    }

    fn configuration_type_id(&self, index: usize) -> Option<i32> {
        self.types.get(index).map(|(id, _)| *id)
    }

    fn configuration_target_names(&self) -> Vec<String> {
        self.targets.clone()
    }

    fn configuration_state_names(&self, type_id: i32) -> Vec<String> {
        self.types
            .iter()
            .find(|(id, _)| *id == type_id)
            .map(|(_, states)| states.clone())
            .unwrap_or_default()
    }

    fn set_preferred_configuration_type(&self, type_id: i32) -> bool {
        if !self.types.iter().any(|(id, _)| *id == type_id) {
            return false;
        }
        self.preferred.set(Some(type_id));
        self.preferred_history.borrow_mut().push(type_id);
        true
    }

    fn reset_preferred_configuration_type(&self) {
        self.preferred.set(None);
    }

    fn preferred_configuration_type(&self) -> Option<i32> {
        self.preferred.get()
    }

    fn current_configuration_types(&self) -> Vec<i32> {
        self.current.borrow().clone()
    }

    fn joint_path_name(&self) -> String {
        self.name.clone()
    }
}

// ---------------------------------------------------------------------------
// MockEditTarget
// ---------------------------------------------------------------------------

/// An edit target holding a pose in memory.
pub struct MockEditTarget {
    name: String,
    editable: Cell<bool>,
    position: Cell<Isometry3<f32>>,
    sig_position_changed: Signal<()>,
}

impl MockEditTarget {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            editable: Cell::new(true),
            position: Cell::new(Isometry3::identity()),
            sig_position_changed: Signal::new(),
        }
    }

    pub fn set_editable(&self, on: bool) {
        self.editable.set(on);
    }

    /// Move the target from outside, as another editor would.
    pub fn move_to(&self, position: Isometry3<f32>) {
        self.position.set(position);
        self.sig_position_changed.emit(&());
    }
}

impl KinematicsProvider for MockEditTarget {
    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::PositionEdit
    }
}

impl PositionEditTarget for MockEditTarget {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_editable(&self) -> bool {
        self.editable.get()
    }

    fn position(&self) -> Isometry3<f32> {
        self.position.get()
    }

    fn set_position(&self, position: &Isometry3<f32>) -> bool {
        if !self.editable.get() {
            return false;
        }
        self.move_to(*position);
        true
    }

    fn connect_position_changed(&self, handler: Box<dyn Fn()>) -> Subscription {
        self.sig_position_changed.connect(move |_| handler())
    }
}
