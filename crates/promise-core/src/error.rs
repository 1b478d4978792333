//! Errors reported by an engine through the failure side of a callback.

use thiserror::Error;

use crate::message::MessageKind;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors an engine may answer a request with.
///
/// The adapter treats these as opaque engine semantics; it only maps them to
/// HTTP status codes via [`EngineError::code`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("promise not found: {0}")]
    PromiseNotFound(String),

    #[error("promise already exists: {0}")]
    PromiseAlreadyExists(String),

    #[error("promise already resolved: {0}")]
    PromiseAlreadyResolved(String),

    #[error("promise already rejected: {0}")]
    PromiseAlreadyRejected(String),

    #[error("promise already canceled: {0}")]
    PromiseAlreadyCanceled(String),

    #[error("promise already timed out: {0}")]
    PromiseAlreadyTimedout(String),

    #[error("schedule not found: {0}")]
    ScheduleNotFound(String),

    #[error("schedule already exists: {0}")]
    ScheduleAlreadyExists(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task already claimed: {0}")]
    TaskAlreadyClaimed(String),

    #[error("task already completed: {0}")]
    TaskAlreadyCompleted(String),

    #[error("task {id} counter mismatch: expected {expected}, got {actual}")]
    TaskInvalidCounter { id: String, expected: u64, actual: u64 },

    #[error("task {0} is not claimed")]
    TaskInvalidState(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("engine is stopped")]
    Stopped,

    #[error("engine dropped the {0} callback without answering")]
    Abandoned(MessageKind),

    #[error("engine answered {expected} with a {actual} response")]
    UnexpectedResponse {
        expected: MessageKind,
        actual: MessageKind,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::PromiseNotFound(_) => "promise_not_found",
            EngineError::PromiseAlreadyExists(_) => "promise_already_exists",
            EngineError::PromiseAlreadyResolved(_) => "promise_already_resolved",
            EngineError::PromiseAlreadyRejected(_) => "promise_already_rejected",
            EngineError::PromiseAlreadyCanceled(_) => "promise_already_canceled",
            EngineError::PromiseAlreadyTimedout(_) => "promise_already_timedout",
            EngineError::ScheduleNotFound(_) => "schedule_not_found",
            EngineError::ScheduleAlreadyExists(_) => "schedule_already_exists",
            EngineError::TaskNotFound(_) => "task_not_found",
            EngineError::TaskAlreadyClaimed(_) => "task_already_claimed",
            EngineError::TaskAlreadyCompleted(_) => "task_already_completed",
            EngineError::TaskInvalidCounter { .. } => "task_invalid_counter",
            EngineError::TaskInvalidState(_) => "task_invalid_state",
            EngineError::Invalid(_) => "invalid_request",
            EngineError::Stopped => "engine_stopped",
            EngineError::Abandoned(_) => "callback_abandoned",
            EngineError::UnexpectedResponse { .. } => "unexpected_response",
            EngineError::Storage(_) => "storage_error",
        }
    }
}
