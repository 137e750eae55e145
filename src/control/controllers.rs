//! Point-reach controller for differential drive robots

use super::state::ControllerState;
use crate::common::{clamp_angular, normalize_angle, Pose, TargetPose, VelocityCommand};
use crate::config::ControlParameters;

/// Outcome of a single control tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlTick {
    /// State the controller is in after this tick
    pub state: ControllerState,
    /// Command to publish, if the active control law issued one
    pub command: Option<VelocityCommand>,
}

/// Drives the robot to a target position and then to a final heading.
///
/// One controller instance belongs to one operation. It holds no pose of its
/// own: every call to [`step`](Self::step) receives the latest estimate.
#[derive(Debug, Clone)]
pub struct PointReachController {
    params: ControlParameters,
    target: TargetPose,
    state: ControllerState,
}

impl PointReachController {
    /// Create a controller for a new operation, starting with alignment
    pub fn new(params: ControlParameters, target: TargetPose) -> Self {
        Self::starting_in(params, target, ControllerState::AligningToTarget)
    }

    /// Create a controller entering the state machine at `state`
    pub fn starting_in(
        params: ControlParameters,
        target: TargetPose,
        state: ControllerState,
    ) -> Self {
        PointReachController {
            params,
            target,
            state,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn target(&self) -> TargetPose {
        self.target
    }

    pub fn params(&self) -> &ControlParameters {
        &self.params
    }

    pub fn is_done(&self) -> bool {
        self.state.is_terminal()
    }

    /// Begin a new operation toward `target`, whatever state the last one ended in
    pub fn reset(&mut self, target: TargetPose) {
        self.target = target;
        self.change_state(ControllerState::AligningToTarget);
    }

    /// Run the control law of the current state against `pose`
    pub fn step(&mut self, pose: &Pose) -> ControlTick {
        let command = match self.state {
            ControllerState::AligningToTarget => Some(self.fix_yaw(pose)),
            ControllerState::DrivingToTarget => self.go_straight_ahead(pose),
            ControllerState::AligningToFinalHeading => Some(self.fix_final_yaw(pose)),
            ControllerState::Done => Some(VelocityCommand::stop()),
        };

        ControlTick {
            state: self.state,
            command,
        }
    }

    fn fix_yaw(&mut self, pose: &Pose) -> VelocityCommand {
        let yaw_error = normalize_angle(pose.bearing_to(&self.target) - pose.heading);
        tracing::debug!("Yaw error to target: {:.4}", yaw_error);

        self.turn_in_place(yaw_error, ControllerState::DrivingToTarget)
    }

    fn go_straight_ahead(&mut self, pose: &Pose) -> Option<VelocityCommand> {
        let yaw_error = normalize_angle(pose.bearing_to(&self.target) - pose.heading);
        let position_error = pose.distance_to(&self.target);
        tracing::debug!(
            "Yaw error: {:.4}, position error: {:.4}",
            yaw_error,
            position_error
        );

        let mut command = None;
        if position_error > self.params.position_tolerance {
            // Angular term is not clamped while driving
            command = Some(VelocityCommand::new(
                self.params.linear_speed.min(self.params.linear_upper_bound),
                self.params.angular_gain * yaw_error,
            ));
        } else {
            self.change_state(ControllerState::AligningToFinalHeading);
        }

        // Evaluated after the position check and wins over it
        if yaw_error.abs() > self.params.coarse_yaw_tolerance {
            self.change_state(ControllerState::AligningToTarget);
        }

        command
    }

    fn fix_final_yaw(&mut self, pose: &Pose) -> VelocityCommand {
        let yaw_error = normalize_angle(self.target.final_heading - pose.heading);
        tracing::debug!("Yaw error to final heading: {:.4}", yaw_error);

        self.turn_in_place(yaw_error, ControllerState::Done)
    }

    /// Clamped proportional rotation shared by both alignment states
    fn turn_in_place(&mut self, yaw_error: f64, next: ControllerState) -> VelocityCommand {
        let mut command = VelocityCommand::stop();
        if yaw_error.abs() > self.params.fine_yaw_tolerance {
            command.angular = clamp_angular(
                self.params.angular_gain * yaw_error,
                self.params.angular_lower_bound,
                self.params.angular_upper_bound,
            );
        } else {
            self.change_state(next);
        }
        command
    }

    fn change_state(&mut self, next: ControllerState) {
        if self.state != next {
            tracing::info!("State changed to [{}]", next);
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn controller(target: TargetPose) -> PointReachController {
        PointReachController::new(ControlParameters::default(), target)
    }

    #[test]
    fn test_starts_aligning() {
        let ctrl = controller(TargetPose::new(1.0, 2.0, 0.0));
        assert_eq!(ctrl.state(), ControllerState::AligningToTarget);
        assert!(!ctrl.is_done());
    }

    #[test]
    fn test_target_straight_ahead() {
        let mut ctrl = controller(TargetPose::new(1.0, 0.0, 0.0));
        let pose = Pose::new(0.0, 0.0, 0.0);

        // Already facing the target: zero command and move on to driving
        let tick = ctrl.step(&pose);
        assert_eq!(tick.state, ControllerState::DrivingToTarget);
        assert_eq!(tick.command, Some(VelocityCommand::stop()));

        let tick = ctrl.step(&pose);
        assert_eq!(tick.state, ControllerState::DrivingToTarget);
        let cmd = tick.command.unwrap();
        assert_eq!(cmd.linear, 0.3);
        assert_eq!(cmd.angular, 0.0);
    }

    #[test]
    fn test_target_to_the_left_hits_lower_bound() {
        let mut ctrl = controller(TargetPose::new(0.0, 1.0, 0.0));
        let tick = ctrl.step(&Pose::new(0.0, 0.0, 0.0));

        assert_eq!(tick.state, ControllerState::AligningToTarget);
        let cmd = tick.command.unwrap();
        assert_eq!(cmd.linear, 0.0);
        assert_eq!(cmd.angular, -0.5);
    }

    #[test]
    fn test_target_to_the_right_hits_upper_bound() {
        let mut ctrl = controller(TargetPose::new(0.0, -1.0, 0.0));
        let tick = ctrl.step(&Pose::new(0.0, 0.0, 0.0));

        assert_eq!(tick.state, ControllerState::AligningToTarget);
        assert_eq!(tick.command.unwrap().angular, 0.6);
    }

    #[test]
    fn test_small_yaw_error_is_proportional() {
        // 0.1 rad to the right: -3.0 * -0.1 = 0.3, inside the bounds
        let mut ctrl = PointReachController::starting_in(
            ControlParameters::default(),
            TargetPose::new(0.0, 0.0, -0.1),
            ControllerState::AligningToFinalHeading,
        );
        let tick = ctrl.step(&Pose::new(0.0, 0.0, 0.0));
        assert!((tick.command.unwrap().angular - 0.3).abs() < 1e-12);
        assert_eq!(tick.state, ControllerState::AligningToFinalHeading);
    }

    #[test]
    fn test_driving_angular_is_not_clamped() {
        // 15 degrees off, inside the coarse tolerance
        let yaw = 15f64.to_radians();
        let mut ctrl = PointReachController::starting_in(
            ControlParameters::default(),
            TargetPose::new(5.0, 0.0, 0.0),
            ControllerState::DrivingToTarget,
        );
        let tick = ctrl.step(&Pose::new(0.0, 0.0, yaw));

        assert_eq!(tick.state, ControllerState::DrivingToTarget);
        let cmd = tick.command.unwrap();
        assert!((cmd.angular - 3.0 * yaw).abs() < 1e-12);
        assert!(cmd.angular > 0.6);
    }

    #[test]
    fn test_linear_setpoint_limited_by_upper_bound() {
        let params = ControlParameters {
            linear_speed: 1.5,
            ..ControlParameters::default()
        };
        let mut ctrl = PointReachController::starting_in(
            params,
            TargetPose::new(5.0, 0.0, 0.0),
            ControllerState::DrivingToTarget,
        );
        let cmd = ctrl.step(&Pose::default()).command.unwrap();
        assert_eq!(cmd.linear, 0.6);
    }

    #[test]
    fn test_drifting_off_course_realigns() {
        let mut ctrl = PointReachController::starting_in(
            ControlParameters::default(),
            TargetPose::new(5.0, 0.0, 0.0),
            ControllerState::DrivingToTarget,
        );
        let tick = ctrl.step(&Pose::new(0.0, 0.0, 30f64.to_radians()));

        // Still far away, so a drive command is issued before re-aligning
        assert!(tick.command.is_some());
        assert_eq!(tick.state, ControllerState::AligningToTarget);
    }

    #[test]
    fn test_arrival_moves_to_final_heading_without_command() {
        let mut ctrl = PointReachController::starting_in(
            ControlParameters::default(),
            TargetPose::new(1.0, 0.0, FRAC_PI_2),
            ControllerState::DrivingToTarget,
        );
        let tick = ctrl.step(&Pose::new(0.95, 0.0, 0.0));

        assert_eq!(tick.state, ControllerState::AligningToFinalHeading);
        assert!(tick.command.is_none());
    }

    #[test]
    fn test_realignment_overrides_arrival_in_same_tick() {
        // Within position tolerance, but the target sits 90 degrees to the left
        let mut ctrl = PointReachController::starting_in(
            ControlParameters::default(),
            TargetPose::new(0.0, 0.05, 0.0),
            ControllerState::DrivingToTarget,
        );
        let tick = ctrl.step(&Pose::new(0.0, 0.0, 0.0));

        assert_eq!(tick.state, ControllerState::AligningToTarget);
        assert!(tick.command.is_none());
    }

    #[test]
    fn test_final_heading_reached() {
        let mut ctrl = PointReachController::starting_in(
            ControlParameters::default(),
            TargetPose::new(0.0, 0.0, PI / 2.0),
            ControllerState::AligningToFinalHeading,
        );
        let tick = ctrl.step(&Pose::new(0.0, 0.0, PI / 2.0 + 0.01));

        assert_eq!(tick.state, ControllerState::Done);
        assert_eq!(tick.command, Some(VelocityCommand::stop()));
    }

    #[test]
    fn test_final_heading_across_wraparound() {
        // Heading 179 degrees, target -178 degrees: 3 degrees apart across the seam
        let mut ctrl = PointReachController::starting_in(
            ControlParameters::default(),
            TargetPose::new(0.0, 0.0, (-178f64).to_radians()),
            ControllerState::AligningToFinalHeading,
        );
        let tick = ctrl.step(&Pose::new(0.0, 0.0, 179f64.to_radians()));
        let err = 3f64.to_radians();
        assert!((tick.command.unwrap().angular - (-3.0 * err)).abs() < 1e-9);
    }

    #[test]
    fn test_done_emits_stop() {
        let mut ctrl = PointReachController::starting_in(
            ControlParameters::default(),
            TargetPose::new(3.0, 3.0, 0.0),
            ControllerState::Done,
        );
        let tick = ctrl.step(&Pose::default());
        assert_eq!(tick.state, ControllerState::Done);
        assert_eq!(tick.command, Some(VelocityCommand::stop()));
        assert!(ctrl.is_done());
    }

    #[test]
    fn test_target_at_pose_advances_one_state_per_tick() {
        let pose = Pose::new(2.0, -1.0, 0.0);
        let target = TargetPose::new(2.0, -1.0, 0.0);
        let expected = [
            (ControllerState::AligningToTarget, ControllerState::DrivingToTarget),
            (
                ControllerState::DrivingToTarget,
                ControllerState::AligningToFinalHeading,
            ),
            (ControllerState::AligningToFinalHeading, ControllerState::Done),
        ];

        for (start, next) in expected {
            let mut ctrl =
                PointReachController::starting_in(ControlParameters::default(), target, start);
            assert_eq!(ctrl.step(&pose).state, next, "from {:?}", start);
        }

        let mut ctrl = PointReachController::new(ControlParameters::default(), target);
        let ticks = (0..3).map(|_| ctrl.step(&pose).state).last();
        assert_eq!(ticks, Some(ControllerState::Done));
    }

    #[test]
    fn test_command_limits_hold_over_pose_grid() {
        let params = ControlParameters::default();
        let target = TargetPose::new(0.7, -0.4, 1.2);

        for ix in -5..=5 {
            for iy in -5..=5 {
                for ih in -12..=12 {
                    let pose = Pose::new(ix as f64 * 0.3, iy as f64 * 0.3, ih as f64 * 0.5);
                    for start in ControllerState::ALL {
                        let mut ctrl =
                            PointReachController::starting_in(params.clone(), target, start);
                        let Some(cmd) = ctrl.step(&pose).command else {
                            continue;
                        };
                        assert!(cmd.linear <= params.linear_upper_bound);
                        if start != ControllerState::DrivingToTarget {
                            assert!(cmd.angular >= params.angular_lower_bound);
                            assert!(cmd.angular <= params.angular_upper_bound);
                            assert_eq!(cmd.linear, 0.0);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_reset_after_done() {
        let mut ctrl = PointReachController::starting_in(
            ControlParameters::default(),
            TargetPose::new(0.0, 0.0, 0.0),
            ControllerState::Done,
        );
        ctrl.reset(TargetPose::new(1.0, 1.0, 0.0));
        assert_eq!(ctrl.state(), ControllerState::AligningToTarget);
        assert_eq!(ctrl.target(), TargetPose::new(1.0, 1.0, 0.0));
    }
}
