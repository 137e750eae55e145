//! Common utilities and types shared across the controller

pub mod math;
pub mod types;

pub use self::math::{clamp_angular, normalize_angle};
pub use self::types::{Pose, TargetPose, VelocityCommand};
