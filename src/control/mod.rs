//! Control module: the point-reach state machine
pub mod controllers;
pub mod state;

pub use self::controllers::{ControlTick, PointReachController};
pub use self::state::ControllerState;
