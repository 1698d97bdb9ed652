use mooncaker_model::OperatorId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("key transport is closed")]
    Closed,

    #[error("timed out waiting for a new api key")]
    TimedOut,

    #[error("wait for a new api key was canceled")]
    Canceled,

    #[error("caller '{0}' is not allowed to supply keys")]
    Unauthorized(OperatorId),

    #[error("internal error: {0}")]
    Internal(String),
}
