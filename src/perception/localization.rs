//! Pose tracking from odometry estimates

use super::PoseSource;
use crate::common::Pose;
use nalgebra::{Point3, Quaternion, UnitQuaternion};
use std::sync::{Arc, RwLock};

/// Holds the most recent planar pose estimate.
///
/// Cloning yields another handle to the same snapshot cell, so the odometry
/// producer and the control loop can each keep one. Reads and writes take the
/// whole pose at once and never observe a half-written update.
#[derive(Debug, Clone, Default)]
pub struct PoseTracker {
    pose: Arc<RwLock<Pose>>,
}

impl PoseTracker {
    /// Create a tracker reporting the origin until the first update
    pub fn new() -> Self {
        PoseTracker::default()
    }

    /// Store a new estimate from a 3D position and orientation.
    ///
    /// Only the yaw of the orientation is kept. A quaternion that cannot be
    /// normalized leaves the previous heading in place.
    pub fn update(&self, orientation: Quaternion<f64>, position: Point3<f64>) {
        let heading = yaw_from_quaternion(orientation);

        let mut pose = match self.pose.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let heading = match heading {
            Some(yaw) => yaw,
            None => {
                tracing::warn!(
                    "Degenerate orientation {:?}, keeping heading {:.3}",
                    orientation.coords,
                    pose.heading
                );
                pose.heading
            }
        };
        *pose = Pose::new(position.x, position.y, heading);
    }

    /// Store a planar pose directly
    pub fn set_pose(&self, new_pose: Pose) {
        match self.pose.write() {
            Ok(mut guard) => *guard = new_pose,
            Err(poisoned) => *poisoned.into_inner() = new_pose,
        }
    }

    /// Get the latest pose snapshot
    pub fn current_pose(&self) -> Pose {
        match self.pose.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl PoseSource for PoseTracker {
    fn current_pose(&self) -> Pose {
        PoseTracker::current_pose(self)
    }
}

/// Rotation about the vertical axis, or `None` for a zero or non-finite quaternion
pub fn yaw_from_quaternion(orientation: Quaternion<f64>) -> Option<f64> {
    if !orientation.coords.iter().all(|c| c.is_finite()) {
        return None;
    }
    UnitQuaternion::try_new(orientation, f64::EPSILON).map(|q| q.euler_angles().2)
}
