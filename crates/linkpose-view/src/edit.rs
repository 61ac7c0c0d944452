//! Solving a pose as one undoable body edit.

use tracing::debug;

use linkpose_ik::Body;

/// Run `solve` inside a kinematic state edit of `body`.
///
/// On success `finish` updates the remaining link poses, the body announces
/// its new state and the edit is accepted. On failure the body is rolled
/// back to where it was before the call.
pub fn solve_in_edit(body: &Body, solve: impl FnOnce() -> bool, finish: impl FnOnce()) -> bool {
    body.begin_kinematic_state_edit();
    let solved = solve();
    if solved {
        finish();
        body.notify_kinematic_state_change();
        body.accept_kinematic_state_edit();
    } else {
        debug!(body = body.name(), "solve failed, edit cancelled");
        body.cancel_kinematic_state_edit();
    }
    solved
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use linkpose_test_utils::planar_arm;

    use super::*;

    #[test]
    fn failure_rolls_back_joint_state() {
        let body = planar_arm();
        body.set_joint_positions(&[0.1, 0.2, -0.3]).unwrap();
        body.calc_forward_kinematics();
        let before = body.store_state();

        let solved = solve_in_edit(
            &body,
            || {
                body.set_joint_positions(&[1.0, 1.0, -1.0]).unwrap();
                false
            },
            || unreachable!(),
        );
        assert!(!solved);
        assert_eq!(body.store_state(), before);
        assert!(!body.is_editing());
    }

    #[test]
    fn success_notifies_and_commits() {
        let body = planar_arm();
        let notified = Rc::new(Cell::new(0));
        let sink = Rc::clone(&notified);
        let _sub = body.connect_kinematic_state_changed(move |_| sink.set(sink.get() + 1));
        let finished = Cell::new(false);

        let solved = solve_in_edit(
            &body,
            || body.set_joint_positions(&[0.5, 0.0, 0.0]).is_ok(),
            || finished.set(true),
        );
        assert!(solved);
        assert!(finished.get());
        assert_eq!(notified.get(), 1);
        assert!(!body.is_editing());
        assert_eq!(body.joint_position(0), Some(0.5));
    }
}
