use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("api key cannot be empty")]
    EmptyKey,

    #[error("operator id cannot be empty")]
    EmptyOperator,

    #[error("notice has no recipients")]
    NoRecipients,

    #[error("notice subject cannot be empty")]
    EmptySubject,
}
