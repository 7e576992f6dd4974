use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum TaskQueueError {
    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),

    #[error("Redis connection error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    PoolError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<TaskQueueError> for AppError {
    fn from(err: TaskQueueError) -> Self {
        match err {
            TaskQueueError::InvalidPayload(msg) => AppError::ValidationError(msg),
            other => AppError::ExternalService(format!("Task queue unavailable: {}", other)),
        }
    }
}
