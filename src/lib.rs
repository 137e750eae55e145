pub mod common;
pub mod config;
pub mod control;
pub mod error;
pub mod interface;
pub mod perception;
pub mod sim;

use crate::config::PointReachConfig;
use crate::interface::{BlockingPointReachService, CancellableGoalServer, VelocitySink};
use crate::perception::PoseTracker;
use std::sync::Arc;

pub use crate::error::{PointReachError, Result};

/// Blocking service driving the shared pose tracker and sink
pub type PointReachService<V> = BlockingPointReachService<PoseTracker, Arc<V>>;

/// Goal server driving the shared pose tracker and sink
pub type PointReachGoalServer<V> = CancellableGoalServer<PoseTracker, Arc<V>>;

/// Core functionality of the point-reach controller: one pose tracker and one
/// velocity sink wired into both command interfaces
pub struct PointReachCore<V> {
    tracker: PoseTracker,
    service: PointReachService<V>,
    goals: Arc<PointReachGoalServer<V>>,
}

impl<V: VelocitySink + 'static> PointReachCore<V> {
    /// Create a new instance of PointReachCore
    pub fn new(config: &PointReachConfig, tracker: PoseTracker, sink: Arc<V>) -> Result<Self> {
        let service = BlockingPointReachService::new(
            config.control.clone(),
            tracker.clone(),
            Arc::clone(&sink),
        );
        let goals = Arc::new(CancellableGoalServer::from_config(
            config,
            tracker.clone(),
            sink,
        )?);

        Ok(PointReachCore {
            tracker,
            service,
            goals,
        })
    }

    /// Handle for feeding pose estimates into the controller
    pub fn pose_tracker(&self) -> &PoseTracker {
        &self.tracker
    }

    /// Get a reference to the blocking go-to-point service
    pub fn service(&self) -> &PointReachService<V> {
        &self.service
    }

    /// Get the cancellable goal server
    pub fn goal_server(&self) -> Arc<PointReachGoalServer<V>> {
        Arc::clone(&self.goals)
    }
}

/// Install the tracing subscriber used by the binaries.
///
/// `RUST_LOG` takes precedence over the `info` default.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
