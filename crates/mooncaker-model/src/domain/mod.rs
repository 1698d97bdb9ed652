mod key;
pub use key::ApiKey;

mod operator;
pub use operator::{AllowList, OperatorId};

mod notice;
pub use notice::Notice;
