//! Controller states of a point-reach operation

use crate::error::{PointReachError, Result};
use std::fmt;

/// Active phase of one point-reach operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    /// Turning in place to face the target position
    AligningToTarget,
    /// Driving forward while steering toward the target position
    DrivingToTarget,
    /// Turning in place to the commanded final heading
    AligningToFinalHeading,
    /// Target reached; the robot is stopped
    Done,
}

impl ControllerState {
    pub const ALL: [ControllerState; 4] = [
        ControllerState::AligningToTarget,
        ControllerState::DrivingToTarget,
        ControllerState::AligningToFinalHeading,
        ControllerState::Done,
    ];

    /// Stable numeric code, used in logs and wire feedback
    pub fn code(self) -> u8 {
        match self {
            ControllerState::AligningToTarget => 0,
            ControllerState::DrivingToTarget => 1,
            ControllerState::AligningToFinalHeading => 2,
            ControllerState::Done => 3,
        }
    }

    /// Decode a state code.
    ///
    /// Any code outside `0..=3` is a logic error upstream and is logged as such.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(ControllerState::AligningToTarget),
            1 => Ok(ControllerState::DrivingToTarget),
            2 => Ok(ControllerState::AligningToFinalHeading),
            3 => Ok(ControllerState::Done),
            unknown => {
                tracing::error!("Unknown state code [{}]", unknown);
                Err(PointReachError::UnknownState(unknown))
            }
        }
    }

    /// Human-readable status reported as operation feedback
    pub fn label(self) -> &'static str {
        match self {
            ControllerState::AligningToTarget => "Aligning heading",
            ControllerState::DrivingToTarget => "Driving to target",
            ControllerState::AligningToFinalHeading => "Aligning final heading",
            ControllerState::Done => "Target reached",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ControllerState::Done
    }
}

impl TryFrom<u8> for ControllerState {
    type Error = PointReachError;

    fn try_from(code: u8) -> Result<Self> {
        ControllerState::from_code(code)
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.label())
    }
}
