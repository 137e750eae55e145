//! Planar pose and command types

/// Planar robot pose: position plus heading about the vertical axis.
///
/// Heading is in radians and is not wrapped; any real value is valid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Pose { x, y, heading }
    }

    /// Euclidean distance from this pose to a target position
    pub fn distance_to(&self, target: &TargetPose) -> f64 {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Angle of the ray from this pose to a target position
    pub fn bearing_to(&self, target: &TargetPose) -> f64 {
        (target.y - self.y).atan2(target.x - self.x)
    }
}

/// Commanded goal for one control operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPose {
    pub x: f64,
    pub y: f64,
    pub final_heading: f64,
}

impl TargetPose {
    pub fn new(x: f64, y: f64, final_heading: f64) -> Self {
        TargetPose {
            x,
            y,
            final_heading,
        }
    }
}

/// Velocity command for the robot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityCommand {
    pub linear: f64,
    pub angular: f64,
}

impl VelocityCommand {
    pub fn new(linear: f64, angular: f64) -> Self {
        VelocityCommand { linear, angular }
    }

    /// Zero command that stops the robot
    pub fn stop() -> Self {
        VelocityCommand::default()
    }

    pub fn is_stop(&self) -> bool {
        self.linear == 0.0 && self.angular == 0.0
    }
}
