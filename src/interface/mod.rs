//! Command interfaces: the drivers that run a point-reach operation
//!
//! Both drivers share one [`PointReachController`] engine and differ only in
//! how they schedule ticks:
//!
//! - [`BlockingPointReachService`] loops without delay until the target is
//!   reached and cannot be interrupted.
//! - [`CancellableGoalServer`] ticks at a fixed rate, reports feedback and
//!   honours cancellation between ticks.
pub mod blocking;
pub mod cancellable;

pub use self::blocking::{BlockingPointReachService, PositionResponse};
pub use self::cancellable::{
    CancelToken, CancellableGoalServer, Feedback, GoalClient, GoalOutcome, GoalResult,
};

use crate::common::VelocityCommand;
use crate::control::{ControlTick, PointReachController};
use crate::error::{PointReachError, Result};
use crate::perception::PoseSource;
use std::sync::Arc;
use tokio::sync::watch;

/// Downstream consumer of velocity commands.
///
/// Commands are fire-and-forget; the latest one published is the one in force.
pub trait VelocitySink: Send + Sync {
    fn publish(&self, command: VelocityCommand) -> Result<()>;
}

impl<T: VelocitySink + ?Sized> VelocitySink for Arc<T> {
    fn publish(&self, command: VelocityCommand) -> Result<()> {
        (**self).publish(command)
    }
}

impl VelocitySink for watch::Sender<VelocityCommand> {
    fn publish(&self, command: VelocityCommand) -> Result<()> {
        self.send(command)
            .map_err(|e| PointReachError::Publish(e.to_string()))
    }
}

/// Publish a command, logging instead of failing the operation
pub(crate) fn publish_or_warn<V: VelocitySink + ?Sized>(sink: &V, command: VelocityCommand) {
    if let Err(e) = sink.publish(command) {
        tracing::warn!("{}", e);
    }
}

/// Read the latest pose, run one control step and publish its command
pub(crate) fn run_tick<P, V>(
    controller: &mut PointReachController,
    pose_source: &P,
    sink: &V,
) -> ControlTick
where
    P: PoseSource + ?Sized,
    V: VelocitySink + ?Sized,
{
    let pose = pose_source.current_pose();
    let tick = controller.step(&pose);
    if let Some(command) = tick.command {
        publish_or_warn(sink, command);
    }
    tick
}
