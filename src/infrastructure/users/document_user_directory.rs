use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use crate::application::ports::document_store::{Collection, DocumentStore, Query};
use crate::application::ports::user_directory::{Session, UserDirectory};
use crate::domain::users::user::UserRecord;

/// Resolves the session's account to its profile in the `users` collection.
pub struct DocumentUserDirectory {
    store: Arc<dyn DocumentStore>,
}

impl DocumentUserDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UserDirectory for DocumentUserDirectory {
    async fn current_user(&self, session: &Session) -> anyhow::Result<Option<UserRecord>> {
        let queries = [
            Query::equal("accountId", [session.account_id.as_str()]),
            Query::Limit(1),
        ];
        let list = self
            .store
            .list_documents(Collection::Users, &queries)
            .await?;
        match list.documents.into_iter().next() {
            Some(doc) => {
                let user = serde_json::from_value(doc).with_context(|| {
                    format!("invalid user document for account {}", session.account_id)
                })?;
                Ok(Some(user))
            }
            None => {
                tracing::debug!(account_id = %session.account_id, "user_profile_missing");
                Ok(None)
            }
        }
    }
}
