mod domain;
pub use domain::{AllowList, ApiKey, Notice, OperatorId};

mod error;
pub use error::ModelError;
