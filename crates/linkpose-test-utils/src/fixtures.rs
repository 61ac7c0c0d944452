//! Bodies, kits and frame sets used across the test suites.

use std::rc::Rc;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use linkpose_core::FrameType;
use linkpose_frames::{CoordinateFrame, FrameSetSuite};
use linkpose_ik::{Body, BodyPtr, ChainConfig, LinkKinematicsKit, LinkKinematicsKitPtr};

/// Planar 3R arm in the XY plane with a tool link.
///
/// The elbow (`j2`) selects the configuration: "Up" for non-negative
/// values, "Down" for negative ones. The wrist (`j3`) stops at 0.4 rad, so
/// some poses are reachable with the elbow up only.
pub const PLANAR_ARM_TOML: &str = r#"
name = "planar"
base_link = "base"
ik_links = ["tool"]

[[joints]]
name = "j1"
child = "l1"
origin = { xyz = [0.0, 0.0, 0.1] }

[[joints]]
name = "j2"
child = "l2"
origin = { xyz = [0.3, 0.0, 0.0] }
lower = -2.5
upper = 2.5

[[joints]]
name = "j3"
child = "l3"
origin = { xyz = [0.25, 0.0, 0.0] }
lower = -2.0
upper = 0.4

[end_effector]
link = "tool"
origin = { xyz = [0.1, 0.0, 0.0] }

[configuration]
name = "Arm"

[[configuration.targets]]
joint = "j2"
label = "Elbow"
positive = "Up"
negative = "Down"
"#;

/// Index of the tool link in [`planar_arm`].
pub const TOOL_LINK: usize = 4;

pub fn planar_arm_config() -> ChainConfig {
    ChainConfig::from_toml_str(PLANAR_ARM_TOML).expect("fixture arm parses")
}

pub fn planar_arm() -> BodyPtr {
    Body::from_config(&planar_arm_config()).expect("fixture arm builds")
}

/// Kit targeting the tool link, with [`sample_frame_suite`] attached.
pub fn tool_kit(body: &BodyPtr) -> LinkKinematicsKitPtr {
    let kit = LinkKinematicsKit::new(Rc::clone(body), TOOL_LINK).expect("tool kit builds");
    kit.set_frame_sets(Some(sample_frame_suite()));
    kit
}

/// Kit targeting the root link, with [`sample_frame_suite`] attached.
pub fn root_kit(body: &BodyPtr) -> LinkKinematicsKitPtr {
    let kit = LinkKinematicsKit::new(Rc::clone(body), 0).expect("root kit builds");
    kit.set_frame_sets(Some(sample_frame_suite()));
    kit
}

/// Frame sets with a default frame each, plus:
///
/// - world `1` "table": translated to (0.5, 0.2, 0.0), yawed 90 degrees
/// - world `"station"`: translated to (-1.0, 0.0, 0.0)
/// - body `1` "mount": translated to (0.0, 0.0, 0.1)
/// - link `1` "tcp": translated to (0.0, 0.0, 0.05)
pub fn sample_frame_suite() -> FrameSetSuite {
    let suite = FrameSetSuite::new();
    let yaw = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f32::consts::FRAC_PI_2);

    let table = CoordinateFrame::with_transform(1, Isometry3::from_parts(Translation3::new(0.5, 0.2, 0.0), yaw));
    table.set_note("table", false);
    let station = CoordinateFrame::with_transform("station", Isometry3::translation(-1.0, 0.0, 0.0));
    let mount = CoordinateFrame::with_transform(1, Isometry3::translation(0.0, 0.0, 0.1));
    mount.set_note("mount", false);
    let tcp = CoordinateFrame::with_transform(1, Isometry3::translation(0.0, 0.0, 0.05));
    tcp.set_note("tcp", false);

    let world = suite.frame_set(FrameType::World);
    assert!(world.append(table), "fixture world frame");
    assert!(world.append(station), "fixture world frame");
    assert!(suite.frame_set(FrameType::Body).append(mount), "fixture body frame");
    assert!(suite.frame_set(FrameType::Link).append(tcp), "fixture link frame");
    suite
}
