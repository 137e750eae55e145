//! Kinematic simulation of a differential drive robot
//!
//! The simulated robot consumes velocity commands like a real base would and
//! reports its motion back through a [`PoseTracker`], closing the loop for
//! tests and the demo binary.

use crate::common::{Pose, VelocityCommand};
use crate::error::Result;
use crate::interface::VelocitySink;
use crate::perception::PoseTracker;
use nalgebra::{Point3, UnitQuaternion};
use std::f64::consts::PI;
use std::sync::{Mutex, MutexGuard};

/// Unicycle model integrating each command over a fixed time step
#[derive(Debug)]
pub struct SimulatedRobot {
    tracker: PoseTracker,
    dt: f64,
    inner: Mutex<SimState>,
}

#[derive(Debug)]
struct SimState {
    pose: Pose,
    last_command: Option<VelocityCommand>,
    command_count: usize,
    /// Only kept when enabled with [`SimulatedRobot::with_history`]
    history: Option<Vec<VelocityCommand>>,
}

impl SimulatedRobot {
    /// Place the robot at `initial` and publish that pose to `tracker`
    pub fn new(tracker: PoseTracker, initial: Pose, dt: f64) -> Self {
        let robot = SimulatedRobot {
            tracker,
            dt,
            inner: Mutex::new(SimState {
                pose: initial,
                last_command: None,
                command_count: 0,
                history: None,
            }),
        };
        robot.report(&initial);
        robot
    }

    /// Ground-truth pose of the simulated robot
    pub fn pose(&self) -> Pose {
        self.state().pose
    }

    /// Record every command received from now on
    pub fn with_history(self) -> Self {
        self.state().history.get_or_insert_with(Vec::new);
        self
    }

    /// Recorded commands, oldest first; empty unless history is enabled
    pub fn commands(&self) -> Vec<VelocityCommand> {
        self.state().history.clone().unwrap_or_default()
    }

    pub fn last_command(&self) -> Option<VelocityCommand> {
        self.state().last_command
    }

    pub fn command_count(&self) -> usize {
        self.state().command_count
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Feed the pose through the same quaternion path odometry takes
    fn report(&self, pose: &Pose) {
        let orientation = UnitQuaternion::from_euler_angles(0.0, 0.0, pose.heading);
        self.tracker
            .update(*orientation.quaternion(), Point3::new(pose.x, pose.y, 0.0));
    }
}

impl VelocitySink for SimulatedRobot {
    fn publish(&self, command: VelocityCommand) -> Result<()> {
        let pose = {
            let mut state = self.state();
            state.pose = integrate(&state.pose, &command, self.dt);
            state.last_command = Some(command);
            state.command_count += 1;
            if let Some(history) = state.history.as_mut() {
                history.push(command);
            }
            state.pose
        };
        self.report(&pose);
        Ok(())
    }
}

/// Advance a pose under constant linear and angular velocity for `dt` seconds
pub fn integrate(pose: &Pose, command: &VelocityCommand, dt: f64) -> Pose {
    let (x, y, heading) = if command.angular.abs() < 1e-9 {
        (
            pose.x + command.linear * pose.heading.cos() * dt,
            pose.y + command.linear * pose.heading.sin() * dt,
            pose.heading,
        )
    } else {
        let r = command.linear / command.angular;
        let heading = pose.heading + command.angular * dt;
        (
            pose.x + r * (heading.sin() - pose.heading.sin()),
            pose.y + r * (pose.heading.cos() - heading.cos()),
            heading,
        )
    };
    Pose::new(x, y, wrap(heading))
}

fn wrap(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_straight_line() {
        let pose = integrate(&Pose::default(), &VelocityCommand::new(0.3, 0.0), 1.0);
        assert!((pose.x - 0.3).abs() < 1e-12);
        assert!(pose.y.abs() < 1e-12);
    }

    #[test]
    fn test_turn_in_place() {
        let pose = integrate(&Pose::default(), &VelocityCommand::new(0.0, 0.5), 1.0);
        assert!(pose.x.abs() < 1e-12 && pose.y.abs() < 1e-12);
        assert!((pose.heading - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_quarter_arc() {
        // Radius 1, quarter circle to the left
        let pose = integrate(&Pose::default(), &VelocityCommand::new(FRAC_PI_2, FRAC_PI_2), 1.0);
        assert!((pose.x - 1.0).abs() < 1e-9);
        assert!((pose.y - 1.0).abs() < 1e-9);
        assert!((pose.heading - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_publish_updates_tracker() {
        let tracker = PoseTracker::new();
        let robot = SimulatedRobot::new(tracker.clone(), Pose::new(1.0, 2.0, 0.0), 0.5);
        assert_eq!(tracker.current_pose(), Pose::new(1.0, 2.0, 0.0));

        robot.publish(VelocityCommand::new(0.2, 0.0)).unwrap();
        let pose = tracker.current_pose();
        assert!((pose.x - 1.1).abs() < 1e-9);
        assert_eq!(robot.command_count(), 1);
        assert_eq!(robot.last_command(), Some(VelocityCommand::new(0.2, 0.0)));
    }

    #[test]
    fn test_history_is_opt_in() {
        let robot = SimulatedRobot::new(PoseTracker::new(), Pose::default(), 0.05);
        for _ in 0..100 {
            robot.publish(VelocityCommand::new(0.1, 0.2)).unwrap();
        }
        assert_eq!(robot.command_count(), 100);
        assert!(robot.commands().is_empty());
        assert_eq!(robot.last_command(), Some(VelocityCommand::new(0.1, 0.2)));

        let recording =
            SimulatedRobot::new(PoseTracker::new(), Pose::default(), 0.05).with_history();
        recording.publish(VelocityCommand::new(0.3, 0.0)).unwrap();
        recording.publish(VelocityCommand::stop()).unwrap();
        assert_eq!(
            recording.commands(),
            vec![VelocityCommand::new(0.3, 0.0), VelocityCommand::stop()]
        );
    }
}
