use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("supervisor error: {0}")]
    Supervisor(String),

    #[error("invalid worker policy: {0}")]
    InvalidPolicy(String),
}
