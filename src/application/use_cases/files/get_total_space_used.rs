use crate::application::ports::document_store::{Collection, DocumentStore};
use crate::application::ports::user_directory::{Session, UserDirectory};
use crate::application::services::file_query::owned_query;
use crate::application::services::space::aggregate;
use crate::domain::files::file::FileRecord;
use crate::domain::files::space::SpaceSummary;

use super::{FileActionError, require_user};

pub struct GetTotalSpaceUsed<'a, D, U>
where
    D: DocumentStore + ?Sized,
    U: UserDirectory + ?Sized,
{
    pub store: &'a D,
    pub users: &'a U,
    pub quota_bytes: u64,
}

impl<'a, D, U> GetTotalSpaceUsed<'a, D, U>
where
    D: DocumentStore + ?Sized,
    U: UserDirectory + ?Sized,
{
    pub async fn execute(&self, session: &Session) -> Result<SpaceSummary, FileActionError> {
        let user = require_user(self.users, session).await?;
        let list = self
            .store
            .list_documents(Collection::Files, &owned_query(&user))
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, user_id = %user.id, "total_space_used_failed");
                err
            })?;
        let records = list
            .documents
            .into_iter()
            .map(FileRecord::from_document)
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(|err| {
                tracing::error!(error = ?err, user_id = %user.id, "total_space_decode_failed");
                err
            })?;
        Ok(aggregate(&records, self.quota_bytes))
    }
}
