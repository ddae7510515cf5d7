use serde_json::json;

use crate::application::ports::document_store::{Collection, DocumentStore};
use crate::application::ports::revalidation_port::RevalidationPort;
use crate::domain::files::file::{FileRecord, encode_shared_with};

use super::FileActionError;

/// Replaces the list of emails a file is shared with.
pub struct UpdateFileUsers<'a, D, R>
where
    D: DocumentStore + ?Sized,
    R: RevalidationPort + ?Sized,
{
    pub store: &'a D,
    pub revalidator: &'a R,
}

impl<'a, D, R> UpdateFileUsers<'a, D, R>
where
    D: DocumentStore + ?Sized,
    R: RevalidationPort + ?Sized,
{
    pub async fn execute(
        &self,
        file_id: &str,
        emails: &[String],
        path: &str,
    ) -> Result<FileRecord, FileActionError> {
        let updated = self
            .store
            .update_document(
                Collection::Files,
                file_id,
                json!({ "users": encode_shared_with(emails) }),
            )
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, file_id = %file_id, "update_file_users_failed");
                err
            })?;
        self.revalidator.revalidate(path).await?;
        Ok(FileRecord::from_document(updated)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::files::fakes::{FlakyDocuments, RecordingRevalidator};
    use crate::infrastructure::memory::MemoryDocumentStore;

    #[tokio::test]
    async fn writes_serialized_list_and_returns_parsed() {
        let docs = FlakyDocuments::new(MemoryDocumentStore::new());
        docs.seed("f1", "user-a", "image", 10, &[]).await;
        let reval = RecordingRevalidator::default();
        let uc = UpdateFileUsers {
            store: &docs,
            revalidator: &reval,
        };
        let emails = vec!["b@example.com".to_string(), "c@example.com".to_string()];
        let rec = uc.execute("f1", &emails, "/images").await.unwrap();
        assert_eq!(rec.users, emails);

        let stored = docs.inner.get(Collection::Files, "f1").await.unwrap();
        assert_eq!(stored["users"], "[\"b@example.com\",\"c@example.com\"]");
        assert_eq!(*reval.paths.lock().await, vec!["/images".to_string()]);
    }
}
