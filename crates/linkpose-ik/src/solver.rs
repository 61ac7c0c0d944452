//! Damped Least Squares (Levenberg-Marquardt) IK solver.
//!
//! Iteratively solves for joint positions that place the end-effector
//! at a target pose, using the geometric Jacobian and DLS pseudoinverse.

use nalgebra::{DMatrix, DVector, Isometry3, UnitQuaternion, Vector3};

use linkpose_core::SolverSettings;

use crate::chain::KinematicChain;

/// What the solver should target.
#[derive(Debug, Clone)]
pub enum IkTarget {
    /// Target position only (3-DOF constraint).
    Position(Vector3<f32>),
    /// Target full pose: position + orientation (6-DOF constraint).
    Pose(Isometry3<f32>),
}

/// Configuration for the DLS solver.
#[derive(Debug, Clone)]
pub struct DlsConfig {
    /// Maximum solver iterations.
    pub max_iterations: u32,
    /// Position error tolerance (meters).
    pub position_tolerance: f32,
    /// Orientation error tolerance (radians).
    pub angle_tolerance: f32,
    /// Damping factor (lambda). Higher = more robust near singularities,
    /// but slower convergence.
    pub damping: f32,
    /// Clamp every iterate to the chain's joint limits.
    pub clamp_to_limits: bool,
}

impl Default for DlsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            position_tolerance: 1e-4,
            angle_tolerance: 1e-3,
            damping: 0.01,
            clamp_to_limits: true,
        }
    }
}

impl From<&SolverSettings> for DlsConfig {
    fn from(settings: &SolverSettings) -> Self {
        Self {
            max_iterations: settings.max_iterations,
            position_tolerance: settings.position_tolerance,
            angle_tolerance: settings.angle_tolerance,
            damping: settings.damping,
            clamp_to_limits: true,
        }
    }
}

/// Per-joint `[lower, upper]` interval the iterates are projected onto.
pub type JointBounds = Vec<(f32, f32)>;

/// Result of an IK solve.
#[derive(Debug, Clone)]
pub struct IkResult {
    /// Solved joint positions.
    pub joint_positions: Vec<f32>,
    /// Whether the solver converged within tolerance.
    pub converged: bool,
    /// Number of iterations used.
    pub iterations: u32,
    /// Final position error (meters).
    pub position_error: f32,
    /// Final orientation error (radians). Zero if target is position-only.
    pub orientation_error: f32,
}

/// Damped Least Squares IK solver.
#[derive(Debug, Clone)]
pub struct DlsSolver {
    config: DlsConfig,
}

impl DlsSolver {
    /// Create a new solver with the given configuration.
    pub const fn new(config: DlsConfig) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(DlsConfig::default())
    }

    pub fn config(&self) -> &DlsConfig {
        &self.config
    }

    /// Solve IK for the given chain and target.
    ///
    /// `q_init` is the starting joint configuration (warm-start from current
    /// state). Iterates are clamped to the joint limits when
    /// [`DlsConfig::clamp_to_limits`] is set.
    pub fn solve(&self, chain: &KinematicChain, target: &IkTarget, q_init: &[f32]) -> IkResult {
        let bounds = if self.config.clamp_to_limits {
            chain
                .joints()
                .iter()
                .map(|j| (j.lower_limit, j.upper_limit))
                .collect()
        } else {
            vec![(f32::NEG_INFINITY, f32::INFINITY); chain.dof()]
        };
        self.solve_within(chain, target, q_init, &bounds)
    }

    /// Solve IK, projecting every iterate onto `bounds` instead of the
    /// chain's joint limits.
    ///
    /// # Panics
    ///
    /// Panics if `q_init` or `bounds` do not have one entry per joint.
    pub fn solve_within(
        &self,
        chain: &KinematicChain,
        target: &IkTarget,
        q_init: &[f32],
        bounds: &[(f32, f32)],
    ) -> IkResult {
        assert_eq!(q_init.len(), chain.dof());
        assert_eq!(bounds.len(), chain.dof());

        let mut q: Vec<f32> = q_init.to_vec();
        project(&mut q, bounds);

        for iteration in 0..self.config.max_iterations {
            let ee_pose = chain.forward_kinematics(&q);
            let (pos_err, ori_err, error_vec) = compute_error(&ee_pose, target);

            if self.is_converged(target, pos_err, ori_err) {
                return IkResult {
                    joint_positions: q,
                    converged: true,
                    iterations: iteration,
                    position_error: pos_err,
                    orientation_error: ori_err,
                };
            }

            let jacobian = compute_jacobian(chain, &q, target);
            let m = jacobian.nrows();

            // DLS: dq = J^T (J J^T + lambda^2 I)^{-1} * error
            let jjt = &jacobian * jacobian.transpose();
            let damped = jjt + DMatrix::identity(m, m) * (self.config.damping * self.config.damping);
            let Some(damped_inv) = damped.try_inverse() else {
                // Singular even with damping
                return IkResult {
                    joint_positions: q,
                    converged: false,
                    iterations: iteration,
                    position_error: pos_err,
                    orientation_error: ori_err,
                };
            };

            let dq = jacobian.transpose() * damped_inv * error_vec;
            for (value, step) in q.iter_mut().zip(dq.iter()) {
                *value += step;
            }
            project(&mut q, bounds);
        }

        let ee_pose = chain.forward_kinematics(&q);
        let (pos_err, ori_err, _) = compute_error(&ee_pose, target);

        IkResult {
            joint_positions: q,
            converged: self.is_converged(target, pos_err, ori_err),
            iterations: self.config.max_iterations,
            position_error: pos_err,
            orientation_error: ori_err,
        }
    }

    fn is_converged(&self, target: &IkTarget, pos_err: f32, ori_err: f32) -> bool {
        match target {
            IkTarget::Position(_) => pos_err < self.config.position_tolerance,
            IkTarget::Pose(_) => {
                pos_err < self.config.position_tolerance && ori_err < self.config.angle_tolerance
            }
        }
    }
}

fn project(q: &mut [f32], bounds: &[(f32, f32)]) {
    for (value, &(lower, upper)) in q.iter_mut().zip(bounds) {
        *value = value.clamp(lower, upper);
    }
}

/// Compute the error vector between current EE pose and target.
///
/// Returns (position_error_norm, orientation_error_norm, error_vector).
fn compute_error(ee_pose: &Isometry3<f32>, target: &IkTarget) -> (f32, f32, DVector<f32>) {
    match target {
        IkTarget::Position(target_pos) => {
            let pos_err = target_pos - ee_pose.translation.vector;
            let error = DVector::from_column_slice(&[pos_err.x, pos_err.y, pos_err.z]);
            (pos_err.norm(), 0.0, error)
        }
        IkTarget::Pose(target_pose) => {
            let pos_err = target_pose.translation.vector - ee_pose.translation.vector;

            // Orientation error as axis-angle
            let rot_err = target_pose.rotation * ee_pose.rotation.inverse();
            let ori_err_vec = orientation_error(&rot_err);

            let error = DVector::from_column_slice(&[
                pos_err.x, pos_err.y, pos_err.z,
                ori_err_vec.x, ori_err_vec.y, ori_err_vec.z,
            ]);
            (pos_err.norm(), ori_err_vec.norm(), error)
        }
    }
}

/// Extract orientation error as a 3-vector (axis * angle) from a unit quaternion.
fn orientation_error(q: &UnitQuaternion<f32>) -> Vector3<f32> {
    q.axis()
        .map_or_else(Vector3::zeros, |axis| axis.into_inner() * q.angle())
}

/// Compute the geometric Jacobian for the current configuration.
///
/// For position-only targets, returns a 3xN matrix.
/// For full-pose targets, returns a 6xN matrix (linear + angular rows).
fn compute_jacobian(chain: &KinematicChain, q: &[f32], target: &IkTarget) -> DMatrix<f32> {
    let n = chain.dof();
    let (origins, axes, ee_pos) = chain.joint_frames(q);

    let rows = match target {
        IkTarget::Position(_) => 3,
        IkTarget::Pose(_) => 6,
    };

    let mut jacobian = DMatrix::zeros(rows, n);

    for (i, joint) in chain.joints().iter().enumerate() {
        let z_i = &axes[i];
        let o_i = &origins[i];

        if joint.is_prismatic {
            jacobian[(0, i)] = z_i.x;
            jacobian[(1, i)] = z_i.y;
            jacobian[(2, i)] = z_i.z;
        } else {
            // Linear velocity: z_i x (ee_pos - o_i)
            let cross = z_i.cross(&(ee_pos - o_i));
            jacobian[(0, i)] = cross.x;
            jacobian[(1, i)] = cross.y;
            jacobian[(2, i)] = cross.z;

            if rows == 6 {
                jacobian[(3, i)] = z_i.x;
                jacobian[(4, i)] = z_i.y;
                jacobian[(5, i)] = z_i.z;
            }
        }
    }

    jacobian
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainConfig;
    use approx::assert_relative_eq;

    const PLANAR_ARM: &str = r#"
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
    "#;

    const SIX_DOF_ARM: &str = r#"
        [[joints]]
        name = "j1_base_yaw"
        child = "shoulder_link"
        origin = { xyz = [0.0, 0.0, 0.05] }
        lower = -3.14159
        upper = 3.14159

        [[joints]]
        name = "j2_shoulder_pitch"
        child = "upper_arm"
        origin = { xyz = [0.0, 0.0, 0.2] }
        axis = [0.0, 1.0, 0.0]
        lower = -1.5708
        upper = 2.356

        [[joints]]
        name = "j3_elbow_pitch"
        child = "elbow_link"
        origin = { xyz = [0.0, 0.0, 0.3] }
        axis = [0.0, 1.0, 0.0]
        lower = -2.356
        upper = 2.356

        [[joints]]
        name = "j4_forearm_roll"
        child = "forearm"
        origin = { xyz = [0.0, 0.0, 0.1] }
        lower = -3.14159
        upper = 3.14159

        [[joints]]
        name = "j5_wrist_pitch"
        child = "wrist_link"
        origin = { xyz = [0.0, 0.0, 0.2] }
        axis = [0.0, 1.0, 0.0]
        lower = -2.094
        upper = 2.094

        [[joints]]
        name = "j6_wrist_roll"
        child = "end_effector"
        origin = { xyz = [0.0, 0.0, 0.06] }
        lower = -3.14159
        upper = 3.14159
    "#;

    fn chain(text: &str) -> KinematicChain {
        KinematicChain::from_config(&ChainConfig::from_toml_str(text).unwrap()).unwrap()
    }

    #[test]
    fn ik_roundtrip_planar_pose() {
        let chain = chain(PLANAR_ARM);
        let q_target = [0.3, 0.8, -0.4];
        let ee_target = chain.forward_kinematics(&q_target);

        let solver = DlsSolver::with_defaults();
        let result = solver.solve(&chain, &IkTarget::Pose(ee_target), &[0.2, 0.6, -0.2]);

        assert!(result.converged, "IK did not converge: pos_err={}", result.position_error);
        let ee_solved = chain.forward_kinematics(&result.joint_positions);
        assert_relative_eq!(
            ee_solved.translation.vector,
            ee_target.translation.vector,
            epsilon = 1e-3
        );
    }

    #[test]
    fn ik_six_dof_position() {
        let chain = chain(SIX_DOF_ARM);

        let target = IkTarget::Position(Vector3::new(0.3, 0.0, 0.5));
        let solver = DlsSolver::with_defaults();
        let result = solver.solve(&chain, &target, &[0.0; 6]);

        assert!(result.converged, "IK did not converge: pos_err={}", result.position_error);

        let ee = chain.forward_kinematics(&result.joint_positions);
        assert_relative_eq!(ee.translation.x, 0.3, epsilon = 1e-3);
        assert_relative_eq!(ee.translation.y, 0.0, epsilon = 1e-3);
        assert_relative_eq!(ee.translation.z, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn ik_six_dof_full_pose_roundtrip() {
        let chain = chain(SIX_DOF_ARM);

        let q_target = [0.5, 0.3, -0.4, 0.2, 0.1, -0.3];
        let ee_target = chain.forward_kinematics(&q_target);

        let solver = DlsSolver::new(DlsConfig {
            max_iterations: 200,
            ..DlsConfig::default()
        });
        let result = solver.solve(&chain, &IkTarget::Pose(ee_target), &[0.0; 6]);

        assert!(result.converged, "IK did not converge: pos_err={}, ori_err={}",
            result.position_error, result.orientation_error);
        assert!(result.position_error < 1e-3);
        assert!(result.orientation_error < 1e-2);
    }

    #[test]
    fn ik_unreachable_target() {
        let chain = chain(PLANAR_ARM);

        // Reach of the arm is 0.65 m.
        let target = IkTarget::Position(Vector3::new(5.0, 5.0, 5.0));
        let solver = DlsSolver::new(DlsConfig {
            max_iterations: 50,
            ..DlsConfig::default()
        });
        let result = solver.solve(&chain, &target, &[0.0, 0.0, 0.0]);

        assert!(!result.converged);
        assert!(result.position_error > 1.0);
    }

    #[test]
    fn ik_warm_start() {
        let chain = chain(SIX_DOF_ARM);

        let target = IkTarget::Position(Vector3::new(0.2, 0.1, 0.6));
        let solver = DlsSolver::with_defaults();

        let cold = solver.solve(&chain, &target, &[0.0; 6]);
        assert!(cold.converged);

        let warm = solver.solve(&chain, &target, &cold.joint_positions);
        assert!(warm.converged);
        assert!(warm.iterations <= cold.iterations);
    }

    #[test]
    fn ik_respects_joint_limits() {
        let chain = chain(PLANAR_ARM);

        let target = IkTarget::Position(Vector3::new(0.2, 0.3, 0.1));
        let solver = DlsSolver::with_defaults();
        let result = solver.solve(&chain, &target, &[0.0, 0.0, 0.0]);

        assert!(chain.within_limits(&result.joint_positions, 1e-6));
    }

    #[test]
    fn solve_within_keeps_iterates_in_bounds() {
        let chain = chain(PLANAR_ARM);
        let ee_target = chain.forward_kinematics(&[0.3, 0.8, -0.4]);
        let solver = DlsSolver::new(DlsConfig {
            clamp_to_limits: false,
            ..DlsConfig::default()
        });
        let bounds = vec![
            (f32::NEG_INFINITY, f32::INFINITY),
            (f32::NEG_INFINITY, -1e-3),
            (f32::NEG_INFINITY, f32::INFINITY),
        ];
        let result = solver.solve_within(
            &chain,
            &IkTarget::Pose(ee_target),
            &[0.3, -0.8, -0.4],
            &bounds,
        );
        assert!(result.converged);
        assert!(result.joint_positions[1] < 0.0);
        // Mirror branch of the 0.3 / 0.8 / -0.4 pose.
        assert_relative_eq!(result.joint_positions[0], 1.0224, epsilon = 1e-2);
        assert_relative_eq!(result.joint_positions[2], 0.4776, epsilon = 1e-2);
    }

    #[test]
    fn config_from_solver_settings() {
        let settings = SolverSettings {
            max_iterations: 42,
            damping: 0.2,
            ..SolverSettings::default()
        };
        let config = DlsConfig::from(&settings);
        assert_eq!(config.max_iterations, 42);
        assert_relative_eq!(config.damping, 0.2);
        assert!(config.clamp_to_limits);
    }
}
