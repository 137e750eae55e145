//! Perception module: access to the latest pose estimate
pub mod localization;

pub use self::localization::PoseTracker;

use crate::common::Pose;

/// Read-only view of a continuously updated pose estimate.
///
/// The controller calls this before every control computation instead of
/// holding on to a copy.
pub trait PoseSource: Send + Sync {
    /// Latest pose snapshot
    fn current_pose(&self) -> Pose;
}

impl<T: PoseSource + ?Sized> PoseSource for std::sync::Arc<T> {
    fn current_pose(&self) -> Pose {
        (**self).current_pose()
    }
}
