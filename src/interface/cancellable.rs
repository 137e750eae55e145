//! Cancellable go-to-point goals with periodic feedback

use super::{publish_or_warn, run_tick, VelocitySink};
use crate::common::{TargetPose, VelocityCommand};
use crate::config::{ControlParameters, PointReachConfig};
use crate::control::{ControllerState, PointReachController};
use crate::error::Result;
use crate::perception::PoseSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const DEFAULT_TICK_RATE_HZ: f64 = 20.0;
const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Progress report emitted once per tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub state: ControllerState,
    /// Human-readable label of `state`
    pub status: String,
}

impl From<ControllerState> for Feedback {
    fn from(state: ControllerState) -> Self {
        Feedback {
            state,
            status: state.label().to_string(),
        }
    }
}

/// Payload of a successfully completed goal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalResult {
    pub ok: bool,
}

/// How a goal ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalOutcome {
    /// The target was reached
    Succeeded(GoalResult),
    /// Cancelled or preempted before reaching the target; no result payload
    Canceled,
    /// The configured deadline elapsed first
    TimedOut,
}

impl GoalOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GoalOutcome::Succeeded(GoalResult { ok: true }))
    }

    pub fn result(&self) -> Option<GoalResult> {
        match self {
            GoalOutcome::Succeeded(result) => Some(*result),
            _ => None,
        }
    }
}

/// Shared flag used to request cancellation of a running goal.
///
/// The goal loop polls it once per tick, so the command of a tick already in
/// flight may still be published after `cancel` returns.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Whether both tokens control the same goal
    pub fn same_goal(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Caller side of a spawned goal
pub struct GoalClient {
    cancel: CancelToken,
    feedback: mpsc::UnboundedReceiver<Feedback>,
    handle: JoinHandle<GoalOutcome>,
}

impl GoalClient {
    /// Request cancellation; takes effect at the next tick boundary
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Next feedback event, or `None` once the goal has finished and all
    /// events were consumed
    pub async fn next_feedback(&mut self) -> Option<Feedback> {
        self.feedback.recv().await
    }

    /// Feedback already emitted and not yet consumed, without waiting
    pub fn try_next_feedback(&mut self) -> Option<Feedback> {
        self.feedback.try_recv().ok()
    }

    /// Wait for the goal to end.
    ///
    /// Feedback not consumed yet is discarded, and the goal stops queueing more.
    pub async fn outcome(self) -> Result<GoalOutcome> {
        let GoalClient {
            feedback, handle, ..
        } = self;
        drop(feedback);
        Ok(handle.await?)
    }
}

/// Runs goals at a fixed tick rate with feedback and cooperative cancellation
pub struct CancellableGoalServer<P, V> {
    params: ControlParameters,
    pose_source: P,
    sink: V,
    tick_period: Duration,
    timeout: Option<Duration>,
    active: Mutex<()>,
}

impl<P: PoseSource, V: VelocitySink> CancellableGoalServer<P, V> {
    /// Server ticking at 20 Hz with no deadline
    pub fn new(params: ControlParameters, pose_source: P, sink: V) -> Self {
        CancellableGoalServer {
            params,
            pose_source,
            sink,
            tick_period: Duration::from_secs_f64(1.0 / DEFAULT_TICK_RATE_HZ),
            timeout: None,
            active: Mutex::new(()),
        }
    }

    /// Server using the control parameters, tick rate and deadline of `config`
    pub fn from_config(config: &PointReachConfig, pose_source: P, sink: V) -> Result<Self> {
        Ok(Self::new(config.control.clone(), pose_source, sink)
            .with_tick_period(config.node.tick_period()?)
            .with_timeout(config.node.timeout()?))
    }

    /// Periods shorter than one millisecond are raised to one millisecond
    pub fn with_tick_period(mut self, tick_period: Duration) -> Self {
        if tick_period < MIN_TICK_PERIOD {
            tracing::warn!(
                "Tick period {:?} is too short, using {:?}",
                tick_period,
                MIN_TICK_PERIOD
            );
        }
        self.tick_period = tick_period.max(MIN_TICK_PERIOD);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Run one goal to completion, cancellation or timeout.
    ///
    /// Waits for any goal already running on this server to finish first.
    pub async fn execute(
        &self,
        goal: TargetPose,
        cancel: &CancelToken,
        feedback: &mpsc::UnboundedSender<Feedback>,
    ) -> GoalOutcome {
        let _active = self.active.lock().await;
        tracing::info!(
            "Accepted goal x={:.3}, y={:.3}, theta={:.3}",
            goal.x,
            goal.y,
            goal.final_heading
        );

        let mut controller = PointReachController::new(self.params.clone(), goal);
        // A deadline past the end of representable time never fires
        let deadline = self
            .timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));
        let mut ticker = tokio::time::interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if cancel.is_cancelled() {
                tracing::info!("Goal was preempted in state [{}]", controller.state());
                publish_or_warn(&self.sink, VelocityCommand::stop());
                return GoalOutcome::Canceled;
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                tracing::warn!("Goal timed out in state [{}]", controller.state());
                publish_or_warn(&self.sink, VelocityCommand::stop());
                return GoalOutcome::TimedOut;
            }

            let state = controller.state();
            if feedback.send(Feedback::from(state)).is_err() {
                tracing::debug!("Feedback receiver dropped");
            }

            run_tick(&mut controller, &self.pose_source, &self.sink);

            if state.is_terminal() {
                tracing::info!("Goal succeeded");
                return GoalOutcome::Succeeded(GoalResult { ok: true });
            }
        }
    }
}

impl<P, V> CancellableGoalServer<P, V>
where
    P: PoseSource + 'static,
    V: VelocitySink + 'static,
{
    /// Start a goal on the tokio runtime and hand back its client side
    pub fn spawn_goal(self: &Arc<Self>, goal: TargetPose) -> GoalClient {
        let cancel = CancelToken::new();
        let (feedback_tx, feedback_rx) = mpsc::unbounded_channel();

        let server = Arc::clone(self);
        let token = cancel.clone();
        let handle =
            tokio::spawn(async move { server.execute(goal, &token, &feedback_tx).await });

        GoalClient {
            cancel,
            feedback: feedback_rx,
            handle,
        }
    }
}
