use std::time::Duration;

use kmodel_core::MapError;
use thiserror::Error;

use crate::task::TaskError;

pub type ResponseResult<T> = std::result::Result<T, ResponseError>;

#[derive(Debug, Error)]
pub enum ResponseError {
    /// The deferred reply did not arrive in time. The task may still
    /// complete; calling `get` again is allowed.
    #[error("no reply within {0:?}")]
    TimeoutExceeded(Option<Duration>),

    #[error("unexpected reply from task: {0}")]
    UnexpectedReplyShape(String),

    /// Failure raised by the task itself, forwarded unchanged.
    #[error(transparent)]
    Task(TaskError),

    #[error("task has not completed")]
    NotReady,

    #[error("translating reply payload: {0}")]
    Map(#[from] MapError),
}

impl From<TaskError> for ResponseError {
    fn from(e: TaskError) -> Self {
        match e {
            TaskError::Timeout(after) => ResponseError::TimeoutExceeded(after),
            other => ResponseError::Task(other),
        }
    }
}
