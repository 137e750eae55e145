//! ROS 2 node driving the point-reach controller from odometry.
//!
//! Only the cancellable goal interface is exposed: goals arrive as
//! `PoseStamped` messages, an `Empty` message cancels the active goal, and
//! state labels and results are published on their own topics. The blocking
//! request/response loop has no ROS service here and is reached through
//! [`PointReachCore::service`] when embedding the library.

use anyhow::{Error, Result};
use nalgebra::{Point3, Quaternion};
use point_reach_core::common::{TargetPose, VelocityCommand};
use point_reach_core::config::PointReachConfig;
use point_reach_core::interface::{CancelToken, GoalOutcome, VelocitySink};
use point_reach_core::perception::localization::yaw_from_quaternion;
use point_reach_core::perception::PoseTracker;
use point_reach_core::{PointReachCore, PointReachError};
use rclrs::{
    Context, CreateBasicExecutor, Node, RclrsErrorFilter, SpinOptions, QOS_PROFILE_DEFAULT,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

// Import the message types directly from the crates
use geometry_msgs::msg::{PoseStamped, Twist};
use nav_msgs::msg::Odometry;
use std_msgs::msg::{Bool, Empty, String as StringMsg};

/// Velocity sink publishing `Twist` messages
struct TwistPublisher(Arc<rclrs::Publisher<Twist>>);

impl VelocitySink for TwistPublisher {
    fn publish(&self, command: VelocityCommand) -> point_reach_core::Result<()> {
        let mut twist = Twist::default();
        twist.linear.x = command.linear;
        twist.angular.z = command.angular;
        self.0
            .publish(&twist)
            .map_err(|e| PointReachError::Publish(e.to_string()))
    }
}

struct PointReachNode {
    core: PointReachCore<TwistPublisher>,
    node: Arc<Node>,
    runtime: tokio::runtime::Handle,
    feedback_publisher: Arc<rclrs::Publisher<StringMsg>>,
    result_publisher: Arc<rclrs::Publisher<Bool>>,
    active_goal: Arc<Mutex<Option<CancelToken>>>,
    odom_subscription: Mutex<Option<Arc<rclrs::Subscription<Odometry>>>>,
    goal_subscription: Mutex<Option<Arc<rclrs::Subscription<PoseStamped>>>>,
    cancel_subscription: Mutex<Option<Arc<rclrs::Subscription<Empty>>>>,
}

impl PointReachNode {
    pub fn new(
        executor: &rclrs::Executor,
        name: &str,
        config: &PointReachConfig,
        runtime: tokio::runtime::Handle,
    ) -> Result<Arc<Self>> {
        let node = executor.create_node(name)?;
        let topics = &config.node;

        info!(
            "Topics: cmd_vel={}, odom={}, goal={}, cancel={}",
            topics.cmd_vel_topic, topics.odom_topic, topics.goal_topic, topics.cancel_topic
        );

        let cmd_vel_publisher =
            node.create_publisher::<Twist>(&topics.cmd_vel_topic, QOS_PROFILE_DEFAULT)?;
        let feedback_publisher =
            node.create_publisher::<StringMsg>(&topics.feedback_topic, QOS_PROFILE_DEFAULT)?;
        let result_publisher =
            node.create_publisher::<Bool>(&topics.result_topic, QOS_PROFILE_DEFAULT)?;

        let core = PointReachCore::new(
            config,
            PoseTracker::new(),
            Arc::new(TwistPublisher(cmd_vel_publisher)),
        )?;

        let point_reach_node = Arc::new(PointReachNode {
            core,
            node,
            runtime,
            feedback_publisher,
            result_publisher,
            active_goal: Arc::new(Mutex::new(None)),
            odom_subscription: None.into(),
            goal_subscription: None.into(),
            cancel_subscription: None.into(),
        });

        // Odometry feeds the pose tracker
        let tracker = point_reach_node.core.pose_tracker().clone();
        let odom_subscription = point_reach_node.node.create_subscription::<Odometry, _>(
            &topics.odom_topic,
            QOS_PROFILE_DEFAULT,
            move |msg: Odometry| {
                let p = &msg.pose.pose.position;
                let q = &msg.pose.pose.orientation;
                tracker.update(Quaternion::new(q.w, q.x, q.y, q.z), Point3::new(p.x, p.y, p.z));
            },
        )?;
        *lock(&point_reach_node.odom_subscription) = Some(odom_subscription);

        let node_clone = Arc::clone(&point_reach_node);
        let goal_subscription = point_reach_node.node.create_subscription::<PoseStamped, _>(
            &topics.goal_topic,
            QOS_PROFILE_DEFAULT,
            move |msg: PoseStamped| {
                node_clone.goal_callback(msg);
            },
        )?;
        *lock(&point_reach_node.goal_subscription) = Some(goal_subscription);

        let node_clone = Arc::clone(&point_reach_node);
        let cancel_subscription = point_reach_node.node.create_subscription::<Empty, _>(
            &topics.cancel_topic,
            QOS_PROFILE_DEFAULT,
            move |_msg: Empty| {
                node_clone.cancel_callback();
            },
        )?;
        *lock(&point_reach_node.cancel_subscription) = Some(cancel_subscription);

        Ok(point_reach_node)
    }

    fn goal_callback(&self, msg: PoseStamped) {
        let q = &msg.pose.orientation;
        let final_heading = yaw_from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
            .unwrap_or_else(|| {
                warn!("Goal orientation is degenerate, using heading 0");
                0.0
            });
        let goal = TargetPose::new(msg.pose.position.x, msg.pose.position.y, final_heading);
        info!("Received new goal: {:?}", goal);

        // A new goal preempts the one in progress
        if let Some(previous) = lock(&self.active_goal).take() {
            info!("Preempting active goal");
            previous.cancel();
        }

        let _guard = self.runtime.enter();
        let mut client = self.core.goal_server().spawn_goal(goal);
        let token = client.cancel_token();
        *lock(&self.active_goal) = Some(token.clone());

        let active_goal = Arc::clone(&self.active_goal);
        let feedback_publisher = Arc::clone(&self.feedback_publisher);
        let result_publisher = Arc::clone(&self.result_publisher);
        self.runtime.spawn(async move {
            while let Some(feedback) = client.next_feedback().await {
                let msg = StringMsg {
                    data: feedback.status,
                };
                if let Err(e) = feedback_publisher.publish(&msg) {
                    warn!("Failed to publish feedback: {}", e);
                }
            }

            match client.outcome().await {
                Ok(GoalOutcome::Succeeded(result)) => {
                    if let Err(e) = result_publisher.publish(&Bool { data: result.ok }) {
                        warn!("Failed to publish result: {}", e);
                    }
                }
                Ok(outcome) => info!("Goal ended without result: {:?}", outcome),
                Err(e) => warn!("{}", e),
            }

            // Leave the slot alone if a newer goal already took it
            let mut active = lock(&active_goal);
            if active.as_ref().is_some_and(|current| current.same_goal(&token)) {
                *active = None;
            }
        });
    }

    fn cancel_callback(&self) {
        match lock(&self.active_goal).take() {
            Some(token) => {
                info!("Cancel requested");
                token.cancel();
            }
            None => info!("Cancel requested with no active goal"),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn main() -> Result<(), Error> {
    point_reach_core::init_logging();

    let config = match std::env::args().nth(1).filter(|arg| !arg.starts_with("--")) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            PointReachConfig::load(Path::new(&path))?
        }
        None => PointReachConfig::default(),
    };

    let runtime = tokio::runtime::Runtime::new()?;

    let mut executor = Context::default_from_env()?.create_basic_executor();
    let _point_reach_node =
        PointReachNode::new(&executor, "go_to_point", &config, runtime.handle().clone())?;

    info!("Point reach node initialized. Starting to spin...");

    executor
        .spin(SpinOptions::default())
        .first_error()
        .map_err(|err| err.into())
}
