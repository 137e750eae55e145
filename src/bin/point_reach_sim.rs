use anyhow::{Context, Result};
use point_reach_core::common::{Pose, TargetPose};
use point_reach_core::config::PointReachConfig;
use point_reach_core::perception::PoseTracker;
use point_reach_core::sim::SimulatedRobot;
use point_reach_core::PointReachCore;
use std::f64::consts::FRAC_PI_2;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const SIM_DT: f64 = 0.05;
const FALLBACK_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    point_reach_core::init_logging();

    let mut config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            PointReachConfig::load(Path::new(&path))
                .with_context(|| format!("failed to load {}", path))?
        }
        None if Path::new("config/sim.toml").exists() => {
            info!("Loading configuration from config/sim.toml");
            PointReachConfig::load(Path::new("config/sim.toml"))?
        }
        None => {
            info!("Using default configuration");
            PointReachConfig::default()
        }
    };

    // The simulation must end even if the gain sign does not suit the model
    if config.node.timeout_secs.is_none() {
        config.node.timeout_secs = Some(FALLBACK_TIMEOUT.as_secs_f64());
    }

    let tracker = PoseTracker::new();
    let robot = Arc::new(SimulatedRobot::new(tracker.clone(), Pose::default(), SIM_DT));
    let core = PointReachCore::new(&config, tracker, Arc::clone(&robot))?;

    // Cancellable goal first: it is bounded by the deadline
    let goal = TargetPose::new(1.0, 1.0, FRAC_PI_2);
    info!("Sending goal {:?}", goal);
    let mut client = core.goal_server().spawn_goal(goal);
    let mut last_status = String::new();
    while let Some(feedback) = client.next_feedback().await {
        if feedback.status != last_status {
            info!("Feedback: {}", feedback.status);
            last_status = feedback.status;
        }
    }
    let outcome = client.outcome().await?;
    info!("Goal outcome: {:?}, robot at {:?}", outcome, robot.pose());

    if !outcome.is_success() {
        warn!("Skipping blocking request: the goal did not complete with this configuration");
        return Ok(());
    }

    // Blocking request back to the origin
    let request = TargetPose::new(0.0, 0.0, 0.0);
    info!("Calling blocking service with {:?}", request);
    let service_core = Arc::new(core);
    let worker = Arc::clone(&service_core);
    let response =
        tokio::task::spawn_blocking(move || worker.service().go_to_point(request)).await?;
    info!(
        "Service response: success={}, robot at {:?}, {} commands issued",
        response.success,
        robot.pose(),
        robot.command_count()
    );

    Ok(())
}
