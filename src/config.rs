//! Configuration loading for the point-reach controller

use crate::error::{PointReachError, Result};
use serde::Deserialize;
use std::f64::consts::PI;
use std::path::Path;
use std::time::{Duration, Instant};

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PointReachConfig {
    #[serde(default)]
    pub control: ControlParameters,
    #[serde(default)]
    pub node: NodeConfig,
}

/// Gains, tolerances and command limits of the control laws.
///
/// Set once at startup and read-only afterwards.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ControlParameters {
    /// Heading error that forces re-alignment while driving (radians, default: 20°)
    #[serde(default = "default_coarse_yaw_tolerance")]
    pub coarse_yaw_tolerance: f64,

    /// Heading error accepted as aligned (radians, default: 2°)
    #[serde(default = "default_fine_yaw_tolerance")]
    pub fine_yaw_tolerance: f64,

    /// Distance accepted as arrived (default: 0.1)
    #[serde(default = "default_position_tolerance")]
    pub position_tolerance: f64,

    /// Proportional gain on heading error (default: -3.0)
    #[serde(default = "default_angular_gain")]
    pub angular_gain: f64,

    /// Forward speed while driving (default: 0.3)
    #[serde(default = "default_linear_speed")]
    pub linear_speed: f64,

    /// Lower bound of the clamped angular command (default: -0.5)
    #[serde(default = "default_angular_lower_bound")]
    pub angular_lower_bound: f64,

    /// Upper bound of the clamped angular command (default: 0.6)
    #[serde(default = "default_angular_upper_bound")]
    pub angular_upper_bound: f64,

    /// Upper bound of the linear command (default: 0.6)
    #[serde(default = "default_linear_upper_bound")]
    pub linear_upper_bound: f64,
}

impl Default for ControlParameters {
    fn default() -> Self {
        Self {
            coarse_yaw_tolerance: default_coarse_yaw_tolerance(),
            fine_yaw_tolerance: default_fine_yaw_tolerance(),
            position_tolerance: default_position_tolerance(),
            angular_gain: default_angular_gain(),
            linear_speed: default_linear_speed(),
            angular_lower_bound: default_angular_lower_bound(),
            angular_upper_bound: default_angular_upper_bound(),
            linear_upper_bound: default_linear_upper_bound(),
        }
    }
}

impl ControlParameters {
    /// Check that tolerances and bounds describe a usable controller
    pub fn validate(&self) -> Result<()> {
        let tolerances = [
            ("coarse_yaw_tolerance", self.coarse_yaw_tolerance),
            ("fine_yaw_tolerance", self.fine_yaw_tolerance),
            ("position_tolerance", self.position_tolerance),
        ];
        for (name, value) in tolerances {
            if !(value.is_finite() && value > 0.0) {
                return Err(PointReachError::Config(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if self.angular_lower_bound >= self.angular_upper_bound {
            return Err(PointReachError::Config(format!(
                "angular bounds are inverted: [{}, {}]",
                self.angular_lower_bound, self.angular_upper_bound
            )));
        }

        if !self.angular_gain.is_finite() {
            return Err(PointReachError::Config(format!(
                "angular_gain must be finite, got {}",
                self.angular_gain
            )));
        }

        if !(self.linear_speed.is_finite() && self.linear_speed >= 0.0) {
            return Err(PointReachError::Config(format!(
                "linear_speed must be non-negative, got {}",
                self.linear_speed
            )));
        }

        if !(self.linear_upper_bound.is_finite() && self.linear_upper_bound > 0.0) {
            return Err(PointReachError::Config(format!(
                "linear_upper_bound must be positive, got {}",
                self.linear_upper_bound
            )));
        }

        Ok(())
    }
}

/// Transport wiring and driver timing
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NodeConfig {
    /// Velocity command topic (default: /cmd_vel)
    #[serde(default = "default_cmd_vel_topic")]
    pub cmd_vel_topic: String,

    /// Odometry topic (default: /odom)
    #[serde(default = "default_odom_topic")]
    pub odom_topic: String,

    #[serde(default = "default_goal_topic")]
    pub goal_topic: String,

    #[serde(default = "default_cancel_topic")]
    pub cancel_topic: String,

    #[serde(default = "default_feedback_topic")]
    pub feedback_topic: String,

    #[serde(default = "default_result_topic")]
    pub result_topic: String,

    /// Tick rate of the cancellable driver in Hz (default: 20)
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: f64,

    /// Optional deadline for one cancellable operation (seconds).
    /// Operations run until done or cancelled when unset.
    #[serde(default)]
    pub timeout_secs: Option<f64>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            cmd_vel_topic: default_cmd_vel_topic(),
            odom_topic: default_odom_topic(),
            goal_topic: default_goal_topic(),
            cancel_topic: default_cancel_topic(),
            feedback_topic: default_feedback_topic(),
            result_topic: default_result_topic(),
            tick_rate_hz: default_tick_rate_hz(),
            timeout_secs: None,
        }
    }
}

impl NodeConfig {
    /// Period between ticks of the cancellable driver
    pub fn tick_period(&self) -> Result<Duration> {
        seconds("tick_rate_hz", 1.0 / self.tick_rate_hz)
    }

    pub fn timeout(&self) -> Result<Option<Duration>> {
        self.timeout_secs
            .map(|timeout| seconds("timeout_secs", timeout))
            .transpose()
    }

    pub fn validate(&self) -> Result<()> {
        self.tick_period()?;
        self.timeout()?;
        Ok(())
    }
}

/// Non-zero duration that can still be added to the current instant
fn seconds(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|duration| !duration.is_zero())
        .filter(|duration| Instant::now().checked_add(*duration).is_some())
        .ok_or_else(|| {
            PointReachError::Config(format!("{} gives an unusable duration of {} s", name, secs))
        })
}

impl PointReachConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: PointReachConfig = toml::from_str(contents)?;
        config.control.validate()?;
        config.node.validate()?;
        Ok(config)
    }
}

fn default_coarse_yaw_tolerance() -> f64 {
    PI / 9.0
}

fn default_fine_yaw_tolerance() -> f64 {
    PI / 90.0
}

fn default_position_tolerance() -> f64 {
    0.1
}

fn default_angular_gain() -> f64 {
    -3.0
}

fn default_linear_speed() -> f64 {
    0.3
}

fn default_angular_lower_bound() -> f64 {
    -0.5
}

fn default_angular_upper_bound() -> f64 {
    0.6
}

fn default_linear_upper_bound() -> f64 {
    0.6
}

fn default_cmd_vel_topic() -> String {
    "/cmd_vel".to_string()
}

fn default_odom_topic() -> String {
    "/odom".to_string()
}

fn default_goal_topic() -> String {
    "/go_to_point/goal".to_string()
}

fn default_cancel_topic() -> String {
    "/go_to_point/cancel".to_string()
}

fn default_feedback_topic() -> String {
    "/go_to_point/feedback".to_string()
}

fn default_result_topic() -> String {
    "/go_to_point/result".to_string()
}

fn default_tick_rate_hz() -> f64 {
    20.0
}
