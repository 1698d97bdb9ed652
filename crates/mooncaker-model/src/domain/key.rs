use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Working credential used by the crawler.
///
/// Any non-empty string is accepted and stored verbatim.
/// `Debug` and `Display` never print the full value; use [`ApiKey::expose`] to read it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct ApiKey(String);

impl ApiKey {
    /// Create a key from a string-like value.
    ///
    /// # Examples
    /// ```
    /// use mooncaker_model::ApiKey;
    ///
    /// let key = ApiKey::new("ABC123").unwrap();
    /// assert_eq!(key.expose(), "ABC123");
    /// assert!(ApiKey::new("").is_err());
    /// ```
    pub fn new(s: impl Into<String>) -> Result<Self, ModelError> {
        Self::try_from(s.into())
    }

    /// Shortest key whose first characters may appear in masked output.
    pub const MASK_MIN_LEN: usize = 6;

    /// Returns the raw key value.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Masked form safe for logs and operator replies.
    ///
    /// Keys shorter than [`Self::MASK_MIN_LEN`] characters are hidden entirely.
    pub fn masked(&self) -> String {
        if self.0.chars().count() < Self::MASK_MIN_LEN {
            return "***".to_owned();
        }
        let head: String = self.0.chars().take(2).collect();
        format!("{head}***")
    }
}

impl TryFrom<String> for ApiKey {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(ModelError::EmptyKey);
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for ApiKey {
    type Error = ModelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_owned())
    }
}

impl From<ApiKey> for String {
    fn from(key: ApiKey) -> Self {
        key.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.masked()).finish()
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}
