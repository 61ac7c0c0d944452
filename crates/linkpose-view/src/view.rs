//! The link positioning core.
//!
//! [`LinkPositionCore`] turns operator events (a link picked, a coordinate
//! mode or frame chosen, a pose entered, a configuration row clicked) into
//! kit and body operations, and keeps the derived state a front end shows:
//! the display pose, frame candidates, result status, configuration label
//! and which parts of the interface are enabled.
//!
//! Notifications from bodies, kits and edit targets are queued and
//! consumed by [`LinkPositionCore::process_pending_updates`]. Every
//! operation drains the queue before it reads frame or body state.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use nalgebra::{Isometry3, Vector3};
use tracing::{debug, info};

use linkpose_core::{
    CoordinateMode, FrameType, GeneralId, LinkPositionConfig, ScopedConnections, Signal, Subscription,
    TargetLinkType,
};
use linkpose_frames::{CoordinateFrame, CoordinateFramePtr};
use linkpose_ik::{Body, KinematicBodyPtr, LinkKinematicsKitPtr, PositionEditTarget};

use crate::candidates::FrameCandidates;
use crate::configuration::{configuration_label, ConfigurationResolver, SortOrder, UNAVAILABLE_LABEL};
use crate::edit::solve_in_edit;
use crate::event::{LinkPositionEvent, ResultStatus};
use crate::transform::KinematicsTarget;

const NO_TARGET_LABEL: &str = "------";

/// The two frame selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameCombo {
    Base,
    Link,
}

impl FrameCombo {
    const fn index(self) -> usize {
        match self {
            Self::Base => 0,
            Self::Link => 1,
        }
    }
}

/// Pose shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayPose {
    pub position: Isometry3<f32>,
    /// Roll-pitch-yaw the operator last entered for this target.
    pub reference_rpy: Vector3<f32>,
}

/// Which parts of the interface accept input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceState {
    /// The whole panel.
    pub enabled: bool,
    /// The coordinate mode selector.
    pub coordinate_mode: bool,
    /// The Body choice of the coordinate mode selector.
    pub body_mode: bool,
    /// Base and link frame selectors.
    pub frame_selection: bool,
    /// Configuration label and session.
    pub configuration: bool,
}

impl InterfaceState {
    /// Whether the operator may pick `mode`. Local is never offered.
    pub fn is_mode_selectable(&self, mode: CoordinateMode) -> bool {
        self.coordinate_mode
            && match mode {
                CoordinateMode::World => true,
                CoordinateMode::Body => self.body_mode,
                CoordinateMode::Local => false,
            }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingUpdate {
    Frames,
    KinematicState,
    EditTarget,
}

type PendingQueue = Rc<RefCell<VecDeque<PendingUpdate>>>;

fn enqueue(queue: &PendingQueue, update: PendingUpdate) {
    let mut queue = queue.borrow_mut();
    if !queue.contains(&update) {
        queue.push_back(update);
    }
}

enum Target {
    None,
    Link {
        item: KinematicBodyPtr,
        link: Option<usize>,
    },
    Edit(Rc<dyn PositionEditTarget>),
}

// ---------------------------------------------------------------------------
// LinkPositionCore
// ---------------------------------------------------------------------------

pub struct LinkPositionCore {
    config: LinkPositionConfig,
    target_link_type: TargetLinkType,
    coordinate_mode: CoordinateMode,
    preferred_coordinate_mode: CoordinateMode,

    target: Target,
    kit: Option<LinkKinematicsKitPtr>,
    identity_frame: CoordinateFramePtr,
    base_frame: CoordinateFramePtr,
    link_frame: CoordinateFramePtr,
    candidates: [FrameCandidates; 2],

    interface: InterfaceState,
    display: Option<DisplayPose>,
    result: Option<ResultStatus>,
    configuration_label: String,
    current_configuration_types: Vec<i32>,
    configuration: ConfigurationResolver,
    configuration_open: bool,

    pending: PendingQueue,
    target_connections: ScopedConnections,
    kit_connection: Option<Subscription>,
    sig_event: Signal<LinkPositionEvent>,
}

impl Default for LinkPositionCore {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkPositionCore {
    pub fn new() -> Self {
        Self::with_config(LinkPositionConfig::default())
    }

    pub fn with_config(mut config: LinkPositionConfig) -> Self {
        config.default_frame_names.fill_empty();
        let identity_frame = CoordinateFrame::identity();
        Self {
            target_link_type: config.target_link_type,
            coordinate_mode: config.coordinate_mode,
            preferred_coordinate_mode: config.preferred_coordinate_mode,
            config,
            target: Target::None,
            kit: None,
            base_frame: Rc::clone(&identity_frame),
            link_frame: Rc::clone(&identity_frame),
            identity_frame,
            candidates: [FrameCandidates::default(), FrameCandidates::default()],
            interface: InterfaceState::default(),
            display: None,
            result: None,
            configuration_label: UNAVAILABLE_LABEL.to_owned(),
            current_configuration_types: Vec::new(),
            configuration: ConfigurationResolver::new(),
            configuration_open: false,
            pending: Rc::new(RefCell::new(VecDeque::new())),
            target_connections: ScopedConnections::new(),
            kit_connection: None,
            sig_event: Signal::new(),
        }
    }

    pub fn connect_event(&self, handler: impl Fn(&LinkPositionEvent) + 'static) -> Subscription {
        self.sig_event.connect(handler)
    }

    fn emit(&self, event: LinkPositionEvent) {
        self.sig_event.emit(&event);
    }

    // -- queries ------------------------------------------------------------

    pub fn config(&self) -> &LinkPositionConfig {
        &self.config
    }

    pub fn target_link_type(&self) -> TargetLinkType {
        self.target_link_type
    }

    pub fn coordinate_mode(&self) -> CoordinateMode {
        self.coordinate_mode
    }

    pub fn preferred_coordinate_mode(&self) -> CoordinateMode {
        self.preferred_coordinate_mode
    }

    pub fn interface(&self) -> InterfaceState {
        self.interface
    }

    pub fn kinematics_kit(&self) -> Option<&LinkKinematicsKitPtr> {
        self.kit.as_ref()
    }

    pub fn target_body(&self) -> Option<&KinematicBodyPtr> {
        match &self.target {
            Target::Link { item, .. } => Some(item),
            Target::None | Target::Edit(_) => None,
        }
    }

    pub fn target_link(&self) -> Option<usize> {
        match &self.target {
            Target::Link { link, .. } => *link,
            Target::None | Target::Edit(_) => None,
        }
    }

    pub fn position_edit_target(&self) -> Option<&Rc<dyn PositionEditTarget>> {
        match &self.target {
            Target::Edit(target) => Some(target),
            Target::None | Target::Link { .. } => None,
        }
    }

    /// "<body> / <link>", the edit target's name, or "------".
    pub fn target_label(&self) -> String {
        match &self.target {
            Target::Link { item, link: Some(link) } => {
                let link_name = item.body().link(*link).map_or("", |l| l.name.as_str());
                format!("{} / {}", item.name(), link_name)
            }
            Target::Edit(target) => target.name(),
            Target::None | Target::Link { link: None, .. } => NO_TARGET_LABEL.to_owned(),
        }
    }

    pub fn base_frame(&self) -> &CoordinateFramePtr {
        &self.base_frame
    }

    pub fn link_frame(&self) -> &CoordinateFramePtr {
        &self.link_frame
    }

    pub fn frame_candidates(&self, combo: FrameCombo) -> &FrameCandidates {
        &self.candidates[combo.index()]
    }

    pub fn display(&self) -> Option<&DisplayPose> {
        self.display.as_ref()
    }

    pub fn result_status(&self) -> Option<ResultStatus> {
        self.result
    }

    /// Label of the live configuration, or "-----" when unavailable.
    pub fn configuration_label(&self) -> &str {
        &self.configuration_label
    }

    pub fn configuration(&self) -> &ConfigurationResolver {
        &self.configuration
    }

    pub fn is_configuration_open(&self) -> bool {
        self.configuration_open
    }

    /// The link target as the transform resolver sees it.
    pub fn kinematics_target(&self) -> Option<KinematicsTarget> {
        let Target::Link { item, link: Some(link) } = &self.target else {
            return None;
        };
        Some(KinematicsTarget {
            body: Rc::clone(item.body()),
            link: *link,
            base_frame: Rc::clone(&self.base_frame),
            link_frame: Rc::clone(&self.link_frame),
            coordinate_mode: self.coordinate_mode,
            base_link: self.kit.as_ref().and_then(|kit| kit.base_link()),
        })
    }

    // -- pending updates ----------------------------------------------------

    /// Consume queued notifications from the target body, its kit and the
    /// edit target.
    pub fn process_pending_updates(&mut self) {
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(update) = next else {
                break;
            };
            match update {
                PendingUpdate::Frames => self.on_frame_update(),
                PendingUpdate::KinematicState => self.update_display_with_current_link_position(),
                PendingUpdate::EditTarget => self.update_display_with_position_edit_target(),
            }
        }
    }

    // -- target selection ---------------------------------------------------

    pub fn set_target_link_type(&mut self, link_type: TargetLinkType) {
        self.target_link_type = link_type;
        if let Target::Link { item, link: Some(link) } = &self.target {
            let (item, link) = (Rc::clone(item), *link);
            self.set_target_body_and_link(&item, link);
        }
    }

    /// Link that becomes the target when `link` is picked, or `None` when
    /// the target link type rules out every candidate.
    fn resolve_target_link(&self, body: &Body, link: usize) -> Option<usize> {
        let ik_required = match self.target_link_type {
            TargetLinkType::AnyLink => false,
            TargetLinkType::RootOrIkLink => !body.is_root_link(link),
            TargetLinkType::IkLink => true,
        };
        if !ik_required || body.has_preset_ik(link) {
            return Some(link);
        }
        body.traverse_from(link)
            .into_iter()
            .skip(1)
            .find(|&candidate| body.has_preset_ik(candidate))
    }

    /// Target `link` of `item`, subject to the target link type.
    ///
    /// Returns `false` when the pick is rejected and the previous target
    /// is kept.
    pub fn set_target_body_and_link(&mut self, item: &KinematicBodyPtr, link: usize) -> bool {
        self.process_pending_updates();
        if link >= item.body().num_links() {
            debug!(body = item.name(), link, "picked link does not exist");
            return false;
        }

        let (body_changed, current_link) = match &self.target {
            Target::Link { item: current, link: current_link } => (!Rc::ptr_eq(current, item), *current_link),
            Target::None | Target::Edit(_) => (true, None),
        };

        let resolved = self.resolve_target_link(item.body(), link);
        if resolved.is_none() && (body_changed || current_link != Some(link)) {
            debug!(body = item.name(), link, "no link with preset IK, target kept");
            return false;
        }
        let link_changed = resolved != current_link;
        if !body_changed && !link_changed {
            return true;
        }

        if body_changed {
            self.display = None;
            self.target_connections.disconnect();
            let pending = Rc::clone(&self.pending);
            self.target_connections.add(
                item.body()
                    .connect_kinematic_state_changed(move |_| enqueue(&pending, PendingUpdate::KinematicState)),
            );
        }

        self.target = Target::Link {
            item: Rc::clone(item),
            link: resolved,
        };
        self.update_target_link();
        self.emit(LinkPositionEvent::TargetChanged);
        self.update_display_with_current_link_position();
        true
    }

    fn update_target_link(&mut self) {
        self.interface.coordinate_mode = true;
        self.kit = None;
        self.kit_connection = None;

        let Target::Link { item, link } = &self.target else {
            return;
        };
        let link = *link;
        let kit = link.and_then(|link| item.link_kinematics_kit(link));
        if link.is_none() {
            self.display = None;
        }

        let mut has_frames = false;
        match &kit {
            Some(kit) => {
                let pending = Rc::clone(&self.pending);
                self.kit_connection =
                    Some(kit.connect_frame_update(move |_| enqueue(&pending, PendingUpdate::Frames)));
                has_frames = kit.has_frame_sets();
                let base_type = match self.coordinate_mode {
                    CoordinateMode::World => FrameType::World,
                    CoordinateMode::Body | CoordinateMode::Local => FrameType::Body,
                };
                kit.set_current_base_frame_type(base_type);
                self.base_frame = kit.current_frame(base_type);
                self.link_frame = kit.current_frame(FrameType::Link);
            }
            None => {
                self.base_frame = Rc::clone(&self.identity_frame);
                self.link_frame = Rc::clone(&self.identity_frame);
            }
        }
        self.kit = kit;

        self.interface.enabled = self.kit.is_some();
        self.set_frame_selection_enabled(has_frames);
        self.result = None;

        self.update_coordinate_frame_candidates();
        self.set_coordinate_mode(self.preferred_coordinate_mode, false);

        let body_mode = self.kit.as_ref().is_some_and(|kit| {
            kit.base_link().is_some_and(|base| Some(base) != link) && has_frames
        });
        self.set_body_coordinate_mode_enabled(body_mode);

        self.initialize_configuration_interface();
        self.emit(LinkPositionEvent::InterfaceChanged);
    }

    /// Edit `target`'s pose directly instead of a link.
    pub fn set_position_edit_target(&mut self, target: Rc<dyn PositionEditTarget>) {
        self.process_pending_updates();
        self.display = None;
        self.target_connections.disconnect();
        self.kit = None;
        self.kit_connection = None;
        self.base_frame = Rc::clone(&self.identity_frame);
        self.link_frame = Rc::clone(&self.identity_frame);

        let pending = Rc::clone(&self.pending);
        self.target_connections.add(
            target.connect_position_changed(Box::new(move || enqueue(&pending, PendingUpdate::EditTarget))),
        );

        self.interface.enabled = target.is_editable();
        self.target = Target::Edit(target);
        self.result = None;
        self.set_frame_selection_enabled(false);
        self.set_configuration_interface_enabled(false);
        self.set_body_coordinate_mode_enabled(false);
        self.interface.coordinate_mode = false;
        self.close_configuration_session();

        self.emit(LinkPositionEvent::TargetChanged);
        self.emit(LinkPositionEvent::InterfaceChanged);
        self.update_display_with_position_edit_target();
    }

    /// Drop the current target.
    pub fn clear_target(&mut self) {
        self.pending.borrow_mut().clear();
        self.target_connections.disconnect();
        self.target = Target::None;
        self.kit = None;
        self.kit_connection = None;
        self.base_frame = Rc::clone(&self.identity_frame);
        self.link_frame = Rc::clone(&self.identity_frame);
        self.display = None;
        self.result = None;
        self.interface = InterfaceState::default();
        for candidates in &mut self.candidates {
            candidates.clear();
        }
        self.set_configuration_interface_enabled(false);
        self.close_configuration_session();
        self.emit(LinkPositionEvent::TargetChanged);
        self.emit(LinkPositionEvent::InterfaceChanged);
    }

    // -- coordinate modes ---------------------------------------------------

    fn set_coordinate_mode(&mut self, mode: CoordinateMode, do_update_display: bool) {
        if let Some(kit) = &self.kit {
            let base_type = match mode {
                CoordinateMode::World => Some(FrameType::World),
                CoordinateMode::Body => Some(FrameType::Body),
                CoordinateMode::Local => None,
            };
            if let Some(base_type) = base_type {
                kit.set_current_base_frame_type(base_type);
                self.base_frame = kit.current_frame(base_type);
            }
        }

        if mode != self.coordinate_mode {
            self.coordinate_mode = mode;
            self.update_coordinate_frame_candidates();
            self.emit(LinkPositionEvent::CoordinateModeChanged);
        }

        if do_update_display {
            self.update_display();
        }
    }

    fn set_body_coordinate_mode_enabled(&mut self, on: bool) {
        self.interface.body_mode = on;
        if !on && self.coordinate_mode == CoordinateMode::Body {
            self.set_coordinate_mode(CoordinateMode::World, false);
        }
    }

    /// Operator picked a coordinate mode. It also becomes the preferred
    /// mode re-applied on later target changes.
    pub fn select_coordinate_mode(&mut self, mode: CoordinateMode) -> bool {
        self.process_pending_updates();
        if !self.interface.is_mode_selectable(mode) {
            debug!(mode = mode.label(), "coordinate mode not available");
            return false;
        }
        self.set_coordinate_mode(mode, true);
        self.preferred_coordinate_mode = mode;
        true
    }

    // -- frames -------------------------------------------------------------

    fn combo_frame_type(&self, combo: FrameCombo) -> FrameType {
        match combo {
            FrameCombo::Base => self.coordinate_mode.base_frame_type(),
            FrameCombo::Link => FrameType::Link,
        }
    }

    fn set_frame_selection_enabled(&mut self, on: bool) {
        self.interface.frame_selection = on;
        if !on {
            for candidates in &mut self.candidates {
                candidates.clear();
            }
        }
    }

    fn update_coordinate_frame_candidates(&mut self) {
        for combo in [FrameCombo::Base, FrameCombo::Link] {
            let frame_type = self.combo_frame_type(combo);
            let (frames, current) = match &self.kit {
                Some(kit) => (kit.frame_set(frame_type), kit.current_frame_id(frame_type)),
                None => (None, GeneralId::default_id()),
            };
            self.candidates[combo.index()] = FrameCandidates::build(
                frames.as_deref(),
                &current,
                self.config.default_frame_names.get(frame_type),
            );
        }
        self.emit(LinkPositionEvent::FrameCandidatesChanged);
    }

    /// Operator picked entry `index` of a frame selector.
    pub fn select_frame(&mut self, combo: FrameCombo, index: usize) -> bool {
        self.process_pending_updates();
        let Some(id) = self.candidates[combo.index()].id_at(index).cloned() else {
            return false;
        };
        if !id.is_valid() {
            return false;
        }
        self.candidates[combo.index()].select(index);

        if let Some(kit) = self.kit.clone() {
            let frame_type = self.combo_frame_type(combo);
            kit.set_current_frame(frame_type, id);
            match combo {
                FrameCombo::Base => self.base_frame = kit.current_frame(frame_type),
                FrameCombo::Link => self.link_frame = kit.current_frame(FrameType::Link),
            }
            kit.notify_frame_update();
        }
        self.update_display();
        true
    }

    fn on_frame_update(&mut self) {
        let Some(kit) = self.kit.clone() else {
            return;
        };

        match kit.current_base_frame_type() {
            FrameType::World if self.coordinate_mode != CoordinateMode::World => {
                self.set_coordinate_mode(CoordinateMode::World, false);
                self.preferred_coordinate_mode = CoordinateMode::World;
            }
            FrameType::Body if self.coordinate_mode != CoordinateMode::Body && self.interface.body_mode => {
                self.set_coordinate_mode(CoordinateMode::Body, false);
                self.preferred_coordinate_mode = CoordinateMode::Body;
            }
            _ => self.update_coordinate_frame_candidates(),
        }

        for combo in [FrameCombo::Base, FrameCombo::Link] {
            let id = kit.current_frame_id(self.combo_frame_type(combo));
            let candidates = &mut self.candidates[combo.index()];
            if let Some(index) = candidates.index_of(&id) {
                candidates.select(index);
            }
        }

        self.base_frame = kit.current_frame(self.combo_frame_type(FrameCombo::Base));
        self.link_frame = kit.current_frame(FrameType::Link);
        self.emit(LinkPositionEvent::FrameCandidatesChanged);
        self.update_display();
    }

    // -- display ------------------------------------------------------------

    /// Recompute the display pose and show "Actual State".
    pub fn update_display(&mut self) {
        self.process_pending_updates();
        match &self.target {
            Target::Link { .. } => self.update_display_with_current_link_position(),
            Target::Edit(_) => self.update_display_with_position_edit_target(),
            Target::None => {}
        }
        self.set_result(ResultStatus::ActualState);
    }

    fn update_display_with_current_link_position(&mut self) {
        let Some(target) = self.kinematics_target() else {
            return;
        };
        let Some(position) = target.display_pose() else {
            return;
        };
        let reference_rpy = self.kit.as_ref().map_or_else(Vector3::zeros, |kit| kit.reference_rpy());
        self.display = Some(DisplayPose {
            position,
            reference_rpy,
        });
        self.emit(LinkPositionEvent::DisplayChanged);
        self.update_configuration_display();
    }

    fn update_display_with_position_edit_target(&mut self) {
        let Target::Edit(target) = &self.target else {
            return;
        };
        self.display = Some(DisplayPose {
            position: target.position(),
            reference_rpy: Vector3::zeros(),
        });
        self.emit(LinkPositionEvent::DisplayChanged);
    }

    fn set_result(&mut self, status: ResultStatus) {
        self.result = Some(status);
        self.emit(LinkPositionEvent::ResultChanged(status));
    }

    // -- pose input ---------------------------------------------------------

    /// Apply an entered pose. Link targets are solved as one body edit;
    /// edit targets take the pose directly.
    pub fn apply_position_input(&mut self, input: &Isometry3<f32>, reference_rpy: Vector3<f32>) -> bool {
        self.process_pending_updates();
        match &self.target {
            Target::Link { .. } => self.find_body_ik_solution(input, reference_rpy),
            Target::Edit(target) => {
                let target = Rc::clone(target);
                self.apply_input_to_position_edit_target(target.as_ref(), input)
            }
            Target::None => false,
        }
    }

    fn find_body_ik_solution(&mut self, input: &Isometry3<f32>, reference_rpy: Vector3<f32>) -> bool {
        let Some(kit) = self.kit.clone() else {
            return false;
        };
        if kit.inverse_kinematics().is_none() {
            debug!(link = kit.link_name(), "no solver for target link");
            return false;
        }
        let Some(target) = self.kinematics_target() else {
            return false;
        };

        kit.set_reference_rpy(reference_rpy);
        let pose = target.solver_target(input);
        let solved = solve_in_edit(
            kit.body(),
            || kit.calc_inverse_kinematics(&pose),
            || kit.calc_remaining_part_forward_kinematics(),
        );
        info!(link = kit.link_name(), solved, "pose input");

        self.process_pending_updates();
        self.set_result(ResultStatus::from_solved(solved));
        solved
    }

    fn apply_input_to_position_edit_target(&mut self, target: &dyn PositionEditTarget, input: &Isometry3<f32>) -> bool {
        self.target_connections.block();
        let accepted = target.set_position(input);
        self.target_connections.unblock();

        if accepted {
            self.update_display_with_position_edit_target();
        }
        self.set_result(ResultStatus::from_accepted(accepted));
        accepted
    }

    // -- configuration ------------------------------------------------------

    fn set_configuration_interface_enabled(&mut self, on: bool) {
        self.interface.configuration = on;
        if !on && self.configuration_label != UNAVAILABLE_LABEL {
            UNAVAILABLE_LABEL.clone_into(&mut self.configuration_label);
            self.emit(LinkPositionEvent::ConfigurationLabelChanged);
        }
    }

    fn initialize_configuration_interface(&mut self) {
        self.current_configuration_types.clear();

        let valid = self
            .kit
            .as_ref()
            .is_some_and(|kit| !kit.is_custom_ik_disabled() && kit.configuration_handler().is_some());
        self.set_configuration_interface_enabled(valid);

        if self.configuration_open {
            match (&self.kit, valid) {
                (Some(kit), true) => {
                    let kit = Rc::clone(kit);
                    self.configuration.update_configuration_types(&kit);
                }
                _ => self.configuration.reset(),
            }
            self.emit(LinkPositionEvent::ConfigurationTableChanged);
        }
    }

    fn update_configuration_display(&mut self) {
        let Some(handler) = self.kit.as_ref().and_then(|kit| kit.configuration_handler()) else {
            return;
        };
        let types = handler.current_configuration_types();
        if types != self.current_configuration_types {
            self.configuration_label = configuration_label(handler.as_ref(), &types);
            self.current_configuration_types = types;
            self.emit(LinkPositionEvent::ConfigurationLabelChanged);
        }
    }

    /// Turn the target kit's configuration-aware solver off or on.
    pub fn set_custom_ik_disabled(&mut self, on: bool) {
        self.process_pending_updates();
        let Some(kit) = &self.kit else {
            return;
        };
        kit.set_custom_ik_disabled(on);
        self.initialize_configuration_interface();
        self.emit(LinkPositionEvent::InterfaceChanged);
        self.update_display();
    }

    /// Start a configuration session for the target and run its trials.
    pub fn open_configuration_session(&mut self) -> bool {
        self.process_pending_updates();
        if !self.interface.configuration {
            return false;
        }
        let Some(kit) = self.kit.clone() else {
            return false;
        };
        self.configuration_open = self.configuration.update_configuration_types(&kit);
        self.emit(LinkPositionEvent::ConfigurationTableChanged);
        self.configuration_open
    }

    pub fn close_configuration_session(&mut self) {
        if self.configuration_open {
            self.configuration_open = false;
            self.configuration.reset();
            self.emit(LinkPositionEvent::ConfigurationTableChanged);
        }
    }

    /// Rerun the trials against the link's current pose.
    pub fn update_configuration_states(&mut self) -> bool {
        self.process_pending_updates();
        let updated = self.configuration.update_configuration_states();
        if updated {
            self.emit(LinkPositionEvent::ConfigurationTableChanged);
        }
        updated
    }

    /// Move the body onto configuration `type_id` at the link's live pose.
    pub fn apply_configuration(&mut self, type_id: i32) -> bool {
        self.process_pending_updates();
        if !self.configuration_open {
            return false;
        }
        let solved = self.configuration.apply_configuration(type_id);
        self.process_pending_updates();
        self.set_result(ResultStatus::from_solved(solved));
        solved
    }

    pub fn sort_configurations(&mut self, column: usize) -> Option<SortOrder> {
        let order = self.configuration.sort_by_column(column);
        if order.is_some() {
            self.emit(LinkPositionEvent::ConfigurationTableChanged);
        }
        order
    }

    pub fn set_feasible_configurations_only(&mut self, on: bool) {
        if self.configuration.is_feasible_only() != on {
            self.configuration.set_feasible_only(on);
            self.emit(LinkPositionEvent::ConfigurationTableChanged);
        }
    }

    /// Restore the body captured by the session and close it.
    pub fn cancel_configuration(&mut self) -> bool {
        let restored = self.configuration.cancel();
        self.close_configuration_session();
        self.process_pending_updates();
        restored
    }

    // -- settings -----------------------------------------------------------

    /// Current session settings.
    pub fn store_settings(&self) -> LinkPositionConfig {
        LinkPositionConfig {
            target_link_type: self.target_link_type,
            coordinate_mode: self.coordinate_mode,
            preferred_coordinate_mode: self.preferred_coordinate_mode,
            ..self.config.clone()
        }
    }

    /// Apply stored settings. The target link type takes effect on the next
    /// pick.
    pub fn restore_settings(&mut self, settings: &LinkPositionConfig) {
        self.process_pending_updates();
        let mut config = settings.clone();
        config.default_frame_names.fill_empty();
        self.target_link_type = config.target_link_type;
        self.preferred_coordinate_mode = config.preferred_coordinate_mode;
        let mode = config.coordinate_mode;
        self.config = config;
        self.set_coordinate_mode(mode, true);
    }
}

impl fmt::Debug for LinkPositionCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkPositionCore")
            .field("target", &self.target_label())
            .field("target_link_type", &self.target_link_type)
            .field("coordinate_mode", &self.coordinate_mode)
            .field("preferred_coordinate_mode", &self.preferred_coordinate_mode)
            .field("interface", &self.interface)
            .field("result", &self.result)
            .field("configuration_label", &self.configuration_label)
            .finish_non_exhaustive()
    }
}
