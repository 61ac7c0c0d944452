//! Integration test: drive `LinkPositionCore` against the planar arm.
//!
//! Covers target picking per target link type, coordinate mode and frame
//! selection, pose input with the joint-path solver, edit targets, the
//! notification queue and configuration sessions.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use nalgebra::{Isometry3, Vector3};

use linkpose_core::{CoordinateMode, FrameType, GeneralId, LinkPositionConfig, Subscription, TargetLinkType};
use linkpose_ik::{Body, ChainConfig, InverseKinematics, KinematicBody, KinematicBodyPtr, PositionEditTarget};
use linkpose_test_utils::{
    planar_arm, sample_frame_suite, MockEditTarget, ScriptedIk, PLANAR_ARM_TOML, TOOL_LINK,
};
use linkpose_view::{
    FrameCombo, LinkPositionCore, LinkPositionEvent, ResultStatus, SessionState, UNAVAILABLE_LABEL,
};

const ELBOW_UP: [f32; 3] = [0.3, 0.8, -0.4];

fn arm_item() -> KinematicBodyPtr {
    let body = planar_arm();
    body.set_joint_positions(&ELBOW_UP).unwrap();
    body.calc_forward_kinematics();
    let item = KinematicBody::new(body);
    item.set_frame_sets(Some(sample_frame_suite()));
    item
}

fn targeted(link: usize) -> (LinkPositionCore, KinematicBodyPtr) {
    let item = arm_item();
    let mut core = LinkPositionCore::new();
    assert!(core.set_target_body_and_link(&item, link));
    (core, item)
}

fn record_events(core: &LinkPositionCore) -> (Rc<RefCell<Vec<LinkPositionEvent>>>, Subscription) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let subscription = core.connect_event(move |event| sink.borrow_mut().push(*event));
    (log, subscription)
}

fn assert_iso_eq(a: &Isometry3<f32>, b: &Isometry3<f32>, epsilon: f32) {
    assert_relative_eq!(a.translation.vector, b.translation.vector, epsilon = epsilon);
    assert_relative_eq!(a.rotation.angle_to(&b.rotation), 0.0, epsilon = epsilon * 10.0);
}

// ---------------------------------------------------------------------------
// Target selection
// ---------------------------------------------------------------------------

#[test]
fn picking_an_intermediate_link_targets_the_ik_link() {
    let (core, item) = targeted(2);
    assert_eq!(core.target_link(), Some(TOOL_LINK));
    assert_eq!(core.target_label(), "planar / tool");
    assert!(Rc::ptr_eq(core.target_body().unwrap(), &item));
    assert!(core.interface().enabled);
    assert!(core.kinematics_kit().is_some());
}

#[test]
fn root_link_is_exempt_under_root_or_ik_link() {
    let (core, _item) = targeted(0);
    assert_eq!(core.target_link(), Some(0));

    let item = arm_item();
    let mut strict = LinkPositionCore::new();
    strict.set_target_link_type(TargetLinkType::IkLink);
    assert!(strict.set_target_body_and_link(&item, 0));
    assert_eq!(strict.target_link(), Some(TOOL_LINK));
}

#[test]
fn any_link_takes_the_pick_as_is() {
    let item = arm_item();
    let mut core = LinkPositionCore::new();
    core.set_target_link_type(TargetLinkType::AnyLink);
    assert!(core.set_target_body_and_link(&item, 2));
    assert_eq!(core.target_link(), Some(2));
}

#[test]
fn pick_without_ik_link_is_rejected() {
    let toml = PLANAR_ARM_TOML.replace("ik_links = [\"tool\"]\n", "");
    let body = Body::from_config(&ChainConfig::from_toml_str(&toml).unwrap()).unwrap();
    let item = KinematicBody::new(body);
    let mut core = LinkPositionCore::new();
    assert!(!core.set_target_body_and_link(&item, 2));
    assert_eq!(core.target_link(), None);
    assert_eq!(core.target_label(), "------");
    assert!(!core.set_target_body_and_link(&item, 99));
}

#[test]
fn repeated_pick_emits_nothing() {
    let (mut core, item) = targeted(TOOL_LINK);
    let (log, _sub) = record_events(&core);
    assert!(core.set_target_body_and_link(&item, TOOL_LINK));
    assert!(log.borrow().is_empty());
}

#[test]
fn clear_target_disables_the_interface() {
    let (mut core, _item) = targeted(TOOL_LINK);
    core.clear_target();
    assert_eq!(core.target_link(), None);
    assert!(core.display().is_none());
    assert!(!core.interface().enabled);
    assert!(core.frame_candidates(FrameCombo::Base).is_empty());
    assert_eq!(core.configuration_label(), UNAVAILABLE_LABEL);
}

// ---------------------------------------------------------------------------
// Coordinate modes
// ---------------------------------------------------------------------------

#[test]
fn body_mode_is_offered_for_links_below_the_root() {
    let (core, _item) = targeted(TOOL_LINK);
    assert!(core.interface().body_mode);
    assert_eq!(core.coordinate_mode(), CoordinateMode::Body);
    assert!(core.interface().is_mode_selectable(CoordinateMode::Body));
    assert!(!core.interface().is_mode_selectable(CoordinateMode::Local));
}

#[test]
fn root_target_falls_back_to_world() {
    let (mut core, _item) = targeted(0);
    assert!(!core.interface().body_mode);
    assert_eq!(core.coordinate_mode(), CoordinateMode::World);
    assert_eq!(core.preferred_coordinate_mode(), CoordinateMode::Body);
    assert!(!core.select_coordinate_mode(CoordinateMode::Body));
}

#[test]
fn selected_mode_becomes_preferred() {
    let (mut core, item) = targeted(TOOL_LINK);
    assert!(core.select_coordinate_mode(CoordinateMode::World));
    assert_eq!(core.preferred_coordinate_mode(), CoordinateMode::World);
    let kit = core.kinematics_kit().unwrap();
    assert_eq!(kit.current_base_frame_type(), FrameType::World);

    // Retargeting re-applies the preferred mode.
    assert!(core.set_target_body_and_link(&item, 0));
    assert!(core.set_target_body_and_link(&item, TOOL_LINK));
    assert_eq!(core.coordinate_mode(), CoordinateMode::World);
}

#[test]
fn body_mode_display_is_the_attitude_pose_for_a_fixed_root() {
    let (core, item) = targeted(TOOL_LINK);
    let shown = core.display().unwrap().position;
    assert_iso_eq(&shown, &item.body().link_attitude_pose(TOOL_LINK).unwrap(), 1e-5);
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

#[test]
fn candidates_follow_the_mode() {
    let (mut core, _item) = targeted(TOOL_LINK);
    assert_eq!(core.frame_candidates(FrameCombo::Base).labels(), vec!["0: Origin", "1: mount"]);
    assert_eq!(core.frame_candidates(FrameCombo::Link).labels(), vec!["0: Origin", "1: tcp"]);

    assert!(core.select_coordinate_mode(CoordinateMode::World));
    assert_eq!(
        core.frame_candidates(FrameCombo::Base).labels(),
        vec!["0: World Origin", "1: table", "station"]
    );
}

#[test]
fn custom_origin_labels_are_used() {
    let mut config = LinkPositionConfig::default();
    config.default_frame_names.world = "Floor".into();
    config.default_frame_names.link = String::new();
    let mut core = LinkPositionCore::with_config(config);
    assert!(core.set_target_body_and_link(&arm_item(), TOOL_LINK));
    assert!(core.select_coordinate_mode(CoordinateMode::World));
    assert_eq!(core.frame_candidates(FrameCombo::Base).labels()[0], "0: Floor");
    assert_eq!(core.frame_candidates(FrameCombo::Link).labels()[0], "0: Origin");
}

#[test]
fn selecting_a_world_frame_reexpresses_the_display() {
    let (mut core, item) = targeted(TOOL_LINK);
    assert!(core.select_coordinate_mode(CoordinateMode::World));
    assert!(core.select_frame(FrameCombo::Base, 1));

    assert_eq!(core.base_frame().id(), GeneralId::Int(1));
    assert_eq!(core.frame_candidates(FrameCombo::Base).selected_index(), 1);
    assert_eq!(core.result_status(), Some(ResultStatus::ActualState));

    let expected = core.base_frame().position().inverse() * item.body().link_attitude_pose(TOOL_LINK).unwrap();
    assert_iso_eq(&core.display().unwrap().position, &expected, 1e-5);
}

#[test]
fn link_frame_offsets_the_display() {
    let (mut core, item) = targeted(TOOL_LINK);
    assert!(core.select_frame(FrameCombo::Link, 1));
    let expected = item.body().link_attitude_pose(TOOL_LINK).unwrap() * Isometry3::translation(0.0, 0.0, 0.05);
    assert_iso_eq(&core.display().unwrap().position, &expected, 1e-5);
}

#[test]
fn out_of_range_frame_index_is_refused() {
    let (mut core, _item) = targeted(TOOL_LINK);
    assert!(!core.select_frame(FrameCombo::Base, 7));
    assert_eq!(core.frame_candidates(FrameCombo::Base).selected_index(), 0);
}

#[test]
fn kit_frame_updates_are_picked_up() {
    let (mut core, _item) = targeted(TOOL_LINK);
    let kit = Rc::clone(core.kinematics_kit().unwrap());

    kit.set_current_base_frame_type(FrameType::World);
    kit.set_current_frame(FrameType::World, GeneralId::from("station"));
    kit.notify_frame_update();
    core.process_pending_updates();

    assert_eq!(core.coordinate_mode(), CoordinateMode::World);
    assert_eq!(core.preferred_coordinate_mode(), CoordinateMode::World);
    assert_eq!(core.base_frame().id(), GeneralId::from("station"));
    assert_eq!(core.frame_candidates(FrameCombo::Base).selected_index(), 2);
}

#[test]
fn frame_updates_do_not_force_body_mode_on_the_root() {
    let (mut core, _item) = targeted(0);
    let kit = Rc::clone(core.kinematics_kit().unwrap());
    kit.set_current_base_frame_type(FrameType::Body);
    kit.notify_frame_update();
    core.process_pending_updates();
    assert_eq!(core.coordinate_mode(), CoordinateMode::World);
}

// ---------------------------------------------------------------------------
// Pose input
// ---------------------------------------------------------------------------

#[test]
fn reachable_input_is_solved_and_shown() {
    let (mut core, item) = targeted(TOOL_LINK);
    let mut input = core.display().unwrap().position;
    input.translation.vector += Vector3::new(-0.02, 0.01, 0.0);
    let rpy = Vector3::new(0.0, 0.0, 0.7);

    assert!(core.apply_position_input(&input, rpy));
    assert_eq!(core.result_status(), Some(ResultStatus::Solved));
    assert_iso_eq(&item.body().link_pose(TOOL_LINK).unwrap(), &input, 1e-3);
    assert_iso_eq(&core.display().unwrap().position, &input, 1e-3);
    assert_relative_eq!(core.display().unwrap().reference_rpy, rpy);
    assert!(!item.body().is_editing());
}

#[test]
fn unreachable_input_rolls_back() {
    let (mut core, item) = targeted(TOOL_LINK);
    let before = item.body().joint_positions();
    assert!(!core.apply_position_input(&Isometry3::translation(5.0, 0.0, 0.1), Vector3::zeros()));
    assert_eq!(core.result_status(), Some(ResultStatus::NotSolved));
    assert!(ResultStatus::NotSolved.is_error());
    assert_eq!(item.body().joint_positions(), before);
    assert!(!item.body().is_editing());
}

#[test]
fn input_without_target_is_ignored() {
    let mut core = LinkPositionCore::new();
    assert!(!core.apply_position_input(&Isometry3::identity(), Vector3::zeros()));
    assert_eq!(core.result_status(), None);
}

#[test]
fn solver_sees_the_world_pose_for_a_frame_relative_input() {
    let (mut core, _item) = targeted(TOOL_LINK);
    let scripted = Rc::new(ScriptedIk::succeeding());
    let kit = Rc::clone(core.kinematics_kit().unwrap());
    kit.set_inverse_kinematics(Some(Rc::clone(&scripted) as Rc<dyn InverseKinematics>));

    assert!(core.select_coordinate_mode(CoordinateMode::World));
    assert!(core.select_frame(FrameCombo::Base, 1));
    let input = Isometry3::translation(0.1, 0.0, 0.0);
    assert!(core.apply_position_input(&input, Vector3::zeros()));

    let targets = scripted.targets();
    assert_eq!(targets.len(), 1);
    assert_iso_eq(&targets[0], &(core.base_frame().position() * input), 1e-5);
    assert_eq!(scripted.fk_calls(), 1);
}

#[test]
fn body_changes_elsewhere_refresh_the_display() {
    let (mut core, item) = targeted(TOOL_LINK);
    item.body().set_joint_positions(&[0.0, 0.5, -0.2]).unwrap();
    item.body().calc_forward_kinematics();
    item.body().notify_kinematic_state_change();
    core.process_pending_updates();
    assert_iso_eq(
        &core.display().unwrap().position,
        &item.body().link_attitude_pose(TOOL_LINK).unwrap(),
        1e-5,
    );
}

// ---------------------------------------------------------------------------
// Edit targets
// ---------------------------------------------------------------------------

#[test]
fn edit_target_takes_the_pose() {
    let target = Rc::new(MockEditTarget::new("marker"));
    let mut core = LinkPositionCore::new();
    core.set_position_edit_target(Rc::clone(&target) as Rc<dyn PositionEditTarget>);

    assert_eq!(core.target_label(), "marker");
    assert!(core.interface().enabled);
    assert!(!core.interface().frame_selection);
    assert!(!core.interface().configuration);
    assert!(core.frame_candidates(FrameCombo::Base).is_empty());

    let pose = Isometry3::translation(0.2, 0.3, 0.4);
    assert!(core.apply_position_input(&pose, Vector3::zeros()));
    assert_eq!(core.result_status(), Some(ResultStatus::Accepted));
    assert_iso_eq(&target.position(), &pose, 1e-6);
    assert_iso_eq(&core.display().unwrap().position, &pose, 1e-6);
}

#[test]
fn read_only_edit_target_refuses() {
    let target = Rc::new(MockEditTarget::new("fixed"));
    target.set_editable(false);
    let mut core = LinkPositionCore::new();
    core.set_position_edit_target(Rc::clone(&target) as Rc<dyn PositionEditTarget>);
    assert!(!core.interface().enabled);
    assert!(!core.apply_position_input(&Isometry3::translation(1.0, 0.0, 0.0), Vector3::zeros()));
    assert_eq!(core.result_status(), Some(ResultStatus::NotAccepted));
}

#[test]
fn edit_target_moves_are_queued() {
    let target = Rc::new(MockEditTarget::new("marker"));
    let mut core = LinkPositionCore::new();
    core.set_position_edit_target(Rc::clone(&target) as Rc<dyn PositionEditTarget>);

    let pose = Isometry3::translation(-0.5, 0.0, 0.0);
    target.move_to(pose);
    assert_iso_eq(&core.display().unwrap().position, &Isometry3::identity(), 1e-6);
    core.process_pending_updates();
    assert_iso_eq(&core.display().unwrap().position, &pose, 1e-6);
}

#[test]
fn retargeting_drops_the_edit_target_connection() {
    let target = Rc::new(MockEditTarget::new("marker"));
    let mut core = LinkPositionCore::new();
    core.set_position_edit_target(Rc::clone(&target) as Rc<dyn PositionEditTarget>);
    let item = arm_item();
    assert!(core.set_target_body_and_link(&item, TOOL_LINK));

    target.move_to(Isometry3::translation(3.0, 0.0, 0.0));
    core.process_pending_updates();
    assert_iso_eq(
        &core.display().unwrap().position,
        &item.body().link_attitude_pose(TOOL_LINK).unwrap(),
        1e-5,
    );
}

// ---------------------------------------------------------------------------
// Configurations
// ---------------------------------------------------------------------------

#[test]
fn live_configuration_label_tracks_the_elbow() {
    let (mut core, item) = targeted(TOOL_LINK);
    assert!(core.interface().configuration);
    assert_eq!(core.configuration_label(), "Up");

    item.body().set_joint_positions(&[0.3, -0.8, 0.4]).unwrap();
    item.body().calc_forward_kinematics();
    item.body().notify_kinematic_state_change();
    core.process_pending_updates();
    assert_eq!(core.configuration_label(), "Down");
}

#[test]
fn disabling_custom_ik_hides_configurations() {
    let (mut core, _item) = targeted(TOOL_LINK);
    core.set_custom_ik_disabled(true);
    assert!(!core.interface().configuration);
    assert_eq!(core.configuration_label(), UNAVAILABLE_LABEL);
    assert!(!core.open_configuration_session());

    core.set_custom_ik_disabled(false);
    assert!(core.interface().configuration);
    assert_eq!(core.configuration_label(), "Up");
}

#[test]
fn root_target_has_no_configurations() {
    let (mut core, _item) = targeted(0);
    assert!(!core.interface().configuration);
    assert_eq!(core.configuration_label(), UNAVAILABLE_LABEL);
    assert!(!core.open_configuration_session());
}

#[test]
fn trials_mark_the_wrist_limited_branch_infeasible() {
    let (mut core, item) = targeted(TOOL_LINK);
    let before = item.body().store_state();
    assert!(core.open_configuration_session());

    let session = core.configuration();
    assert_eq!(session.state(), SessionState::Trialed);
    assert_eq!(session.title(), "Arm configuration");
    assert_eq!(session.headers(), ["No", "Elbow"]);
    assert!(session.row(1).unwrap().is_feasible());
    assert!(!session.row(2).unwrap().is_feasible());

    // The trials leave the body as it was.
    assert_eq!(item.body().joint_positions(), before.joint_positions());
    assert!(!core.kinematics_kit().unwrap().is_busy());

    core.set_feasible_configurations_only(true);
    let visible: Vec<i32> = core.configuration().visible_rows().iter().map(|r| r.type_id()).collect();
    assert_eq!(visible, vec![1]);
}

#[test]
fn rerunning_trials_is_idempotent() {
    let (mut core, item) = targeted(TOOL_LINK);
    let before = item.body().store_state();
    assert!(core.open_configuration_session());
    let first: Vec<bool> = core.configuration().rows().iter().map(|r| r.is_feasible()).collect();

    assert!(core.update_configuration_states());
    assert!(core.update_configuration_states());
    let second: Vec<bool> = core.configuration().rows().iter().map(|r| r.is_feasible()).collect();

    assert_eq!(first, second);
    assert_eq!(item.body().store_state(), before);
}

#[test]
fn applying_the_current_branch_keeps_the_pose() {
    let (mut core, item) = targeted(TOOL_LINK);
    let pose = item.body().link_pose(TOOL_LINK).unwrap();
    assert!(core.open_configuration_session());
    assert!(core.apply_configuration(1));
    assert_eq!(core.result_status(), Some(ResultStatus::Solved));
    assert_iso_eq(&item.body().link_pose(TOOL_LINK).unwrap(), &pose, 1e-3);
    assert_eq!(core.configuration_label(), "Up");
}

#[test]
fn cancel_restores_and_closes() {
    let (mut core, item) = targeted(TOOL_LINK);
    let before = item.body().joint_positions();
    assert!(core.open_configuration_session());
    // Elbow down moves the arm off its current branch.
    assert!(core.apply_configuration(2));
    assert_eq!(core.result_status(), Some(ResultStatus::Solved));
    let moved = item.body().joint_positions();
    assert!(moved[1] < 0.0);
    assert!((moved[0] - before[0]).abs() > 0.1);

    assert!(core.cancel_configuration());
    assert!(!core.is_configuration_open());
    assert_eq!(core.configuration().state(), SessionState::Empty);
    for (a, b) in item.body().joint_positions().iter().zip(&before) {
        assert_relative_eq!(*a, *b, epsilon = 1e-6);
    }
}

#[test]
fn apply_needs_an_open_session() {
    let (mut core, _item) = targeted(TOOL_LINK);
    assert!(!core.apply_configuration(1));
    assert_eq!(core.result_status(), None);
}

#[test]
fn retargeting_refreshes_an_open_session() {
    let (mut core, item) = targeted(TOOL_LINK);
    assert!(core.open_configuration_session());
    assert!(core.set_target_body_and_link(&item, 0));
    assert!(core.is_configuration_open());
    assert_eq!(core.configuration().state(), SessionState::Empty);
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[test]
fn settings_round_trip_through_toml() {
    let (mut core, _item) = targeted(TOOL_LINK);
    assert!(core.select_coordinate_mode(CoordinateMode::World));
    core.set_target_link_type(TargetLinkType::IkLink);

    let text = core.store_settings().to_toml_string().unwrap();
    let restored = LinkPositionConfig::from_toml_str(&text).unwrap();
    assert_eq!(restored.coordinate_mode, CoordinateMode::World);
    assert_eq!(restored.preferred_coordinate_mode, CoordinateMode::World);
    assert_eq!(restored.target_link_type, TargetLinkType::IkLink);

    let mut fresh = LinkPositionCore::new();
    fresh.restore_settings(&restored);
    assert_eq!(fresh.target_link_type(), TargetLinkType::IkLink);
    assert_eq!(fresh.coordinate_mode(), CoordinateMode::World);
}
