use async_trait::async_trait;

use crate::domain::users::user::UserRecord;

/// Authenticated caller, as established by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub account_id: String,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn current_user(&self, session: &Session) -> anyhow::Result<Option<UserRecord>>;
}
