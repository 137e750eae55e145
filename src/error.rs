//! Error types for the point-reach controller

use thiserror::Error;

/// Point-reach controller error type
#[derive(Error, Debug)]
pub enum PointReachError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown controller state code: {0}")]
    UnknownState(u8),

    #[error("Failed to publish velocity command: {0}")]
    Publish(String),

    #[error("Goal task failed: {0}")]
    GoalTask(#[from] tokio::task::JoinError),
}

impl From<toml::de::Error> for PointReachError {
    fn from(e: toml::de::Error) -> Self {
        PointReachError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PointReachError>;
