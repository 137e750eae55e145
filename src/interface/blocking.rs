//! Blocking go-to-point service

use super::{run_tick, VelocitySink};
use crate::common::TargetPose;
use crate::config::ControlParameters;
use crate::control::PointReachController;
use crate::perception::PoseSource;
use std::sync::Mutex;

/// Reply to a blocking go-to-point request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionResponse {
    pub success: bool,
}

/// Runs the controller in a tight loop until the target is reached.
///
/// There is no inter-tick delay, no cancellation and no deadline: a target the
/// robot cannot reach keeps the calling thread busy indefinitely. Concurrent
/// requests are served one after the other.
pub struct BlockingPointReachService<P, V> {
    params: ControlParameters,
    pose_source: P,
    sink: V,
    busy: Mutex<()>,
}

impl<P: PoseSource, V: VelocitySink> BlockingPointReachService<P, V> {
    pub fn new(params: ControlParameters, pose_source: P, sink: V) -> Self {
        BlockingPointReachService {
            params,
            pose_source,
            sink,
            busy: Mutex::new(()),
        }
    }

    /// Drive to `request` and report success once stopped there
    pub fn go_to_point(&self, request: TargetPose) -> PositionResponse {
        let _busy = match self.busy.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        tracing::info!(
            "Going to point x={:.3}, y={:.3}, theta={:.3}",
            request.x,
            request.y,
            request.final_heading
        );

        let mut controller = PointReachController::new(self.params.clone(), request);
        let mut ticks: u64 = 0;
        loop {
            let finishing = controller.is_done();
            run_tick(&mut controller, &self.pose_source, &self.sink);
            ticks += 1;
            if finishing {
                break;
            }
        }

        tracing::info!("Target reached after {} ticks", ticks);
        PositionResponse { success: true }
    }
}
