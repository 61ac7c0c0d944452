//! Conversion between a link's pose and the pose an operator sees and
//! enters.
//!
//! ```text
//! display:  D = inv(B) · inv(F) · Ta · K
//! input:    T = B · F · D · inv(K),   then rotation normalised for the link
//! ```
//!
//! `F` is the base frame, `K` the link frame, `Ta` the link pose presented
//! in its attitude frame and `B` the base link's attitude pose. `B` only
//! takes part in Body mode. Both directions apply `B` from the left of the
//! frame product, so the pair is exact inverses when `B` and `F` commute,
//! e.g. when the base frame is the origin.

use nalgebra::Isometry3;

use linkpose_core::CoordinateMode;
use linkpose_frames::CoordinateFramePtr;
use linkpose_ik::BodyPtr;

/// Resolved frame parameters for one target in one coordinate mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformResolver {
    base: Isometry3<f32>,
    link_frame: Isometry3<f32>,
    base_link: Option<Isometry3<f32>>,
}

impl TransformResolver {
    pub fn new(base: Isometry3<f32>, link_frame: Isometry3<f32>) -> Self {
        Self {
            base,
            link_frame,
            base_link: None,
        }
    }

    /// Compensate for the base link's attitude pose (Body mode).
    #[must_use]
    pub fn with_base_link(mut self, base_link_pose: Isometry3<f32>) -> Self {
        self.base_link = Some(base_link_pose);
        self
    }

    pub fn base(&self) -> &Isometry3<f32> {
        &self.base
    }

    pub fn link_frame(&self) -> &Isometry3<f32> {
        &self.link_frame
    }

    pub fn base_link(&self) -> Option<&Isometry3<f32>> {
        self.base_link.as_ref()
    }

    /// Pose shown for a link whose attitude pose is `link_attitude_pose`.
    pub fn to_display(&self, link_attitude_pose: &Isometry3<f32>) -> Isometry3<f32> {
        let pose = self.base.inverse() * link_attitude_pose * self.link_frame;
        match &self.base_link {
            Some(base_link) => base_link.inverse() * pose,
            None => pose,
        }
    }

    /// Attitude pose the link must reach for the entered pose `input`.
    pub fn from_input(&self, input: &Isometry3<f32>) -> Isometry3<f32> {
        let pose = self.base * input * self.link_frame.inverse();
        match &self.base_link {
            Some(base_link) => base_link * pose,
            None => pose,
        }
    }
}

// ---------------------------------------------------------------------------
// KinematicsTarget
// ---------------------------------------------------------------------------

/// Everything needed to present and solve one target link.
#[derive(Debug, Clone)]
pub struct KinematicsTarget {
    pub body: BodyPtr,
    pub link: usize,
    pub base_frame: CoordinateFramePtr,
    pub link_frame: CoordinateFramePtr,
    pub coordinate_mode: CoordinateMode,
    /// Base link of the target's kit, if it has one.
    pub base_link: Option<usize>,
}

impl KinematicsTarget {
    /// Resolver for the current mode. The base link compensation applies
    /// in Body mode only.
    pub fn resolver(&self) -> TransformResolver {
        let resolver = TransformResolver::new(self.base_frame.position(), self.link_frame.position());
        let base_link_pose = match self.coordinate_mode {
            CoordinateMode::Body => self
                .base_link
                .and_then(|link| self.body.link_attitude_pose(link)),
            CoordinateMode::World | CoordinateMode::Local => None,
        };
        match base_link_pose {
            Some(pose) => resolver.with_base_link(pose),
            None => resolver,
        }
    }

    /// Pose to show for the link's current state.
    pub fn display_pose(&self) -> Option<Isometry3<f32>> {
        let pose = self.body.link_attitude_pose(self.link)?;
        Some(self.resolver().to_display(&pose))
    }

    /// World pose of the link to hand to the solver for the entered pose.
    pub fn solver_target(&self, input: &Isometry3<f32>) -> Isometry3<f32> {
        let mut pose = self.resolver().from_input(input);
        pose.rotation = self.body.rotation_from_attitude(self.link, &pose.rotation);
        pose
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Translation3, UnitQuaternion, Vector3};

    use linkpose_frames::CoordinateFrame;
    use linkpose_ik::{Body, ChainConfig};

    use super::*;

    const TILTED: &str = r#"
        [[joints]]
        name = "j1"
        child = "l1"
        origin = { xyz = [0.0, 0.0, 0.2] }
        attitude = [0.0, 0.0, 1.5707964]

        [end_effector]
        link = "tip"
        origin = { xyz = [0.3, 0.0, 0.0] }
        attitude = [0.0, 1.5707964, 0.0]
    "#;

    fn pose(x: f32, y: f32, z: f32, yaw: f32) -> Isometry3<f32> {
        Isometry3::from_parts(
            Translation3::new(x, y, z),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw),
        )
    }

    fn assert_iso_eq(a: &Isometry3<f32>, b: &Isometry3<f32>) {
        assert_relative_eq!(a.translation.vector, b.translation.vector, epsilon = 1e-5);
        assert_relative_eq!(a.rotation.angle_to(&b.rotation), 0.0, epsilon = 1e-4);
    }

    fn target(mode: CoordinateMode, base: Isometry3<f32>) -> KinematicsTarget {
        let body = Body::from_config(&ChainConfig::from_toml_str(TILTED).unwrap()).unwrap();
        body.set_joint_positions(&[0.4]).unwrap();
        body.set_root_pose(pose(1.0, -0.5, 0.0, 0.3));
        body.calc_forward_kinematics();
        KinematicsTarget {
            body,
            link: 2,
            base_frame: CoordinateFrame::with_transform(1, base),
            link_frame: CoordinateFrame::with_transform(1, pose(0.0, 0.05, 0.1, -0.2)),
            coordinate_mode: mode,
            base_link: Some(0),
        }
    }

    // -----------------------------------------------------------------------
    // Resolver algebra
    // -----------------------------------------------------------------------

    #[test]
    fn identity_frames_show_the_attitude_pose() {
        let resolver = TransformResolver::new(Isometry3::identity(), Isometry3::identity());
        let link = pose(0.1, 0.2, 0.3, 0.7);
        assert_iso_eq(&resolver.to_display(&link), &link);
    }

    #[test]
    fn input_inverts_display_without_base_link() {
        let resolver = TransformResolver::new(pose(0.5, 0.2, 0.0, 1.2), pose(0.0, 0.0, 0.05, -0.4));
        let link = pose(0.3, -0.1, 0.4, 0.25);
        let shown = resolver.to_display(&link);
        assert_iso_eq(&resolver.from_input(&shown), &link);
    }

    #[test]
    fn base_link_is_applied_on_the_left() {
        let base_link = pose(0.0, 0.0, 0.5, 0.5);
        let resolver = TransformResolver::new(Isometry3::identity(), Isometry3::identity())
            .with_base_link(base_link);
        let link = pose(1.0, 0.0, 0.0, 0.0);
        let shown = resolver.to_display(&link);
        assert_iso_eq(&shown, &(base_link.inverse() * link));
        assert_iso_eq(&resolver.from_input(&shown), &link);
    }

    #[test]
    fn base_link_order_is_preserved() {
        let base = pose(0.4, 0.0, 0.0, 0.0);
        let base_link = pose(0.0, 0.0, 0.0, std::f32::consts::FRAC_PI_2);
        let resolver = TransformResolver::new(base, Isometry3::identity()).with_base_link(base_link);
        let shown = resolver.to_display(&Isometry3::identity());
        // inv(B) · inv(F): the base frame offset is rotated by the base link.
        assert_relative_eq!(shown.translation.vector, Vector3::new(0.0, 0.4, 0.0), epsilon = 1e-6);
    }

    // -----------------------------------------------------------------------
    // Targets
    // -----------------------------------------------------------------------

    #[test]
    fn display_round_trips_in_world_mode() {
        let target = target(CoordinateMode::World, pose(0.5, 0.2, 0.0, 1.1));
        let shown = target.display_pose().unwrap();
        let solved = target.solver_target(&shown);
        assert_iso_eq(&solved, &target.body.link_pose(2).unwrap());
    }

    #[test]
    fn display_round_trips_in_body_mode_with_origin_base() {
        let target = target(CoordinateMode::Body, Isometry3::identity());
        assert!(target.resolver().base_link().is_some());
        let shown = target.display_pose().unwrap();
        let solved = target.solver_target(&shown);
        assert_iso_eq(&solved, &target.body.link_pose(2).unwrap());
    }

    #[test]
    fn local_mode_ignores_base_link() {
        let target = target(CoordinateMode::Local, pose(0.5, 0.2, 0.0, 1.1));
        assert!(target.resolver().base_link().is_none());
    }

    #[test]
    fn solver_target_removes_link_attitude() {
        let target = target(CoordinateMode::World, Isometry3::identity());
        let mut plain = target.clone();
        plain.link_frame = CoordinateFrame::identity();
        let attitude_pose = plain.body.link_attitude_pose(2).unwrap();
        assert_iso_eq(&plain.display_pose().unwrap(), &attitude_pose);
        assert_iso_eq(&plain.solver_target(&attitude_pose), &plain.body.link_pose(2).unwrap());
    }
}
