use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::error::AppError;

/// Error kinds surfaced by the scheduling engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Conflict,
    PolicyDenied,
    Timeout,
    Cancelled,
    Store,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Policy denied: {0}")]
    PolicyDenied(String),

    #[error("Store operation '{operation}' timed out after {timeout_ms} ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Store operation cancelled: {0}")]
    Cancelled(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl ScheduleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScheduleError::NotFound(_) => ErrorKind::NotFound,
            ScheduleError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ScheduleError::Conflict(_) => ErrorKind::Conflict,
            ScheduleError::PolicyDenied(_) => ErrorKind::PolicyDenied,
            ScheduleError::Timeout { .. } => ErrorKind::Timeout,
            ScheduleError::Cancelled(_) => ErrorKind::Cancelled,
            ScheduleError::Store(_) => ErrorKind::Store,
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        let message = err.to_string();
        match err {
            ScheduleError::NotFound(_) => AppError::NotFound(message),
            ScheduleError::InvalidArgument(_) => AppError::BadRequest(message),
            ScheduleError::Conflict(_) => AppError::Conflict(message),
            ScheduleError::PolicyDenied(_) => AppError::PolicyDenied(message),
            ScheduleError::Timeout { .. } => AppError::Timeout(message),
            ScheduleError::Cancelled(_) => AppError::Unavailable(message),
            ScheduleError::Store(_) => AppError::Internal(message),
        }
    }
}
