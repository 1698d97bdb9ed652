use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Outbound operator notice: subject, body and recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

impl Notice {
    pub fn new(
        subject: impl Into<String>,
        body: impl Into<String>,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            recipients,
        }
    }

    /// Checks that the notice can be delivered.
    ///
    /// Rules:
    /// - `subject` is not blank;
    /// - at least one non-blank recipient.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.subject.trim().is_empty() {
            return Err(ModelError::EmptySubject);
        }
        if !self.recipients.iter().any(|r| !r.trim().is_empty()) {
            return Err(ModelError::NoRecipients);
        }
        Ok(())
    }
}
