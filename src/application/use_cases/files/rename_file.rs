use serde_json::json;

use crate::application::ports::document_store::{Collection, DocumentStore};
use crate::application::ports::revalidation_port::RevalidationPort;
use crate::domain::files::file::FileRecord;

use super::FileActionError;

pub struct RenameFile<'a, D, R>
where
    D: DocumentStore + ?Sized,
    R: RevalidationPort + ?Sized,
{
    pub store: &'a D,
    pub revalidator: &'a R,
}

impl<'a, D, R> RenameFile<'a, D, R>
where
    D: DocumentStore + ?Sized,
    R: RevalidationPort + ?Sized,
{
    pub async fn execute(
        &self,
        file_id: &str,
        name: &str,
        extension: &str,
        path: &str,
    ) -> Result<FileRecord, FileActionError> {
        let new_name = format!("{name}.{extension}");
        let updated = self
            .store
            .update_document(Collection::Files, file_id, json!({ "name": new_name }))
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, file_id = %file_id, "rename_file_failed");
                err
            })?;
        self.revalidator.revalidate(path).await?;
        Ok(FileRecord::from_document(updated)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::document_store::is_not_found;
    use crate::application::use_cases::files::fakes::{FlakyDocuments, RecordingRevalidator};
    use crate::infrastructure::memory::MemoryDocumentStore;

    #[tokio::test]
    async fn stores_name_dot_extension() {
        let docs = FlakyDocuments::new(MemoryDocumentStore::new());
        docs.seed("f1", "user-a", "document", 10, &[]).await;
        let reval = RecordingRevalidator::default();
        let uc = RenameFile {
            store: &docs,
            revalidator: &reval,
        };
        let rec = uc.execute("f1", "report", "pdf", "/documents").await.unwrap();
        assert_eq!(rec.name, "report.pdf");
        assert_eq!(rec.size, 10);
        assert_eq!(*reval.paths.lock().await, vec!["/documents".to_string()]);
    }

    #[tokio::test]
    async fn unknown_file_surfaces_backend_error() {
        let docs = FlakyDocuments::new(MemoryDocumentStore::new());
        let reval = RecordingRevalidator::default();
        let uc = RenameFile {
            store: &docs,
            revalidator: &reval,
        };
        let err = uc.execute("missing", "a", "b", "/").await.unwrap_err();
        let FileActionError::Backend(inner) = err else {
            panic!("expected backend error");
        };
        assert!(is_not_found(&inner));
        assert!(reval.paths.lock().await.is_empty());
    }
}
