//! Angle and command-limit helpers used by the control laws

use std::f64::consts::PI;

/// Reflect an angle once toward the [-π, π] range.
///
/// Angles with magnitude above π are shifted by `2π` toward zero. Only one
/// shift is applied, so inputs outside (-2π, 2π) come back still outside
/// [-π, π]. Tolerance checks downstream are tuned against this behaviour.
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    if angle.abs() > PI {
        angle - 2.0 * PI * angle.signum()
    } else {
        angle
    }
}

/// Limit an angular command to `[lower, upper]`.
///
/// The upper bound is checked first, then the lower one.
#[inline]
pub fn clamp_angular(value: f64, lower: f64, upper: f64) -> f64 {
    if value > upper {
        upper
    } else if value < lower {
        lower
    } else {
        value
    }
}
