use crate::application::ports::document_store::{Collection, DocumentStore};
use crate::application::ports::object_store::ObjectStore;
use crate::application::ports::revalidation_port::RevalidationPort;

use super::FileActionError;

pub struct DeleteFile<'a, D, O, R>
where
    D: DocumentStore + ?Sized,
    O: ObjectStore + ?Sized,
    R: RevalidationPort + ?Sized,
{
    pub store: &'a D,
    pub objects: &'a O,
    pub revalidator: &'a R,
}

impl<'a, D, O, R> DeleteFile<'a, D, O, R>
where
    D: DocumentStore + ?Sized,
    O: ObjectStore + ?Sized,
    R: RevalidationPort + ?Sized,
{
    /// Removes the metadata document first, then its backing object.
    pub async fn execute(
        &self,
        file_id: &str,
        bucket_file_id: &str,
        path: &str,
    ) -> Result<(), FileActionError> {
        self.store
            .delete_document(Collection::Files, file_id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, file_id = %file_id, "delete_file_document_failed");
                err
            })?;
        self.objects
            .delete_object(bucket_file_id)
            .await
            .map_err(|err| {
                tracing::error!(
                    error = ?err,
                    file_id = %file_id,
                    object_id = %bucket_file_id,
                    "delete_file_object_failed"
                );
                err
            })?;
        self.revalidator.revalidate(path).await?;
        Ok(())
    }
}
