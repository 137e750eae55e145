//! Shared fixtures for the integration tests

use point_reach_core::common::Pose;
use point_reach_core::config::ControlParameters;
use point_reach_core::perception::PoseTracker;
use point_reach_core::sim::SimulatedRobot;
use std::sync::Arc;

pub const SIM_DT: f64 = 0.05;

/// Default parameters with the gain sign matching the simulator
pub fn sim_params() -> ControlParameters {
    ControlParameters {
        angular_gain: 3.0,
        ..ControlParameters::default()
    }
}

pub fn sim_robot(initial: Pose) -> (PoseTracker, Arc<SimulatedRobot>) {
    let tracker = PoseTracker::new();
    let robot = Arc::new(SimulatedRobot::new(tracker.clone(), initial, SIM_DT).with_history());
    (tracker, robot)
}
