use crate::application::ports::document_store::{Collection, DocumentStore};
use crate::application::ports::object_store::ObjectStore;
use crate::application::ports::revalidation_port::RevalidationPort;
use crate::application::ports::user_directory::{Session, UserDirectory};
use crate::domain::files::file::{FileRecord, NewFileDocument};
use crate::domain::files::file_type::classify;

use super::{FileActionError, unique_id};

pub struct UploadFileInput {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub owner_id: Option<String>,
    pub account_id: Option<String>,
    pub path: String,
}

pub struct UploadFile<'a, D, O, U, R>
where
    D: DocumentStore + ?Sized,
    O: ObjectStore + ?Sized,
    U: UserDirectory + ?Sized,
    R: RevalidationPort + ?Sized,
{
    pub store: &'a D,
    pub objects: &'a O,
    pub users: &'a U,
    pub revalidator: &'a R,
}

impl<'a, D, O, U, R> UploadFile<'a, D, O, U, R>
where
    D: DocumentStore + ?Sized,
    O: ObjectStore + ?Sized,
    U: UserDirectory + ?Sized,
    R: RevalidationPort + ?Sized,
{
    /// Stores the object, then its metadata document. If the document cannot be
    /// created the object is deleted again; a failed cleanup leaves an orphan.
    pub async fn execute(
        &self,
        session: &Session,
        input: UploadFileInput,
    ) -> Result<FileRecord, FileActionError> {
        let mut owner = input.owner_id.filter(|s| !s.trim().is_empty());
        let mut account = input.account_id.filter(|s| !s.trim().is_empty());

        if owner.is_none() || account.is_none() {
            let current = self.users.current_user(session).await.map_err(|err| {
                tracing::error!(error = ?err, "current_user_failed");
                err
            })?;
            if let Some(user) = current {
                owner = owner.or(Some(user.id));
                account = account.or(user.account_id);
            }
        }
        let account_id = account.ok_or(FileActionError::MissingField("accountId"))?;
        let owner = owner.ok_or(FileActionError::MissingField("owner"))?;

        let object = self
            .objects
            .create_object(&unique_id(), &input.filename, input.bytes)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, filename = %input.filename, "create_object_failed");
                err
            })?;

        let (file_type, extension) = classify(&object.name);
        let document = NewFileDocument {
            file_type,
            name: object.name.clone(),
            url: self.objects.object_url(&object.id),
            extension,
            size: object.size,
            owner,
            account_id,
            users: Vec::new(),
            bucket_file_id: object.id.clone(),
        };

        let created = match self
            .store
            .create_document(Collection::Files, &unique_id(), document.into_value())
            .await
        {
            Ok(doc) => doc,
            Err(err) => {
                tracing::error!(error = ?err, object_id = %object.id, "create_file_document_failed");
                if let Err(cleanup) = self.objects.delete_object(&object.id).await {
                    tracing::error!(
                        error = ?cleanup,
                        object_id = %object.id,
                        "orphaned_object_cleanup_failed"
                    );
                }
                return Err(err.into());
            }
        };

        self.revalidator.revalidate(&input.path).await?;
        Ok(FileRecord::from_document(created)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::application::ports::document_store::BackendError;
    use crate::application::use_cases::files::fakes::{
        FixedUsers, FlakyDocuments, FlakyObjects, RecordingRevalidator, alice, session,
    };
    use crate::domain::files::file_type::FileType;
    use crate::infrastructure::memory::MemoryDocumentStore;

    fn input(owner: Option<&str>, account: Option<&str>) -> UploadFileInput {
        UploadFileInput {
            bytes: b"%PDF-1.7".to_vec(),
            filename: "Quarterly Report.PDF".into(),
            owner_id: owner.map(str::to_owned),
            account_id: account.map(str::to_owned),
            path: "/documents".into(),
        }
    }

    #[tokio::test]
    async fn stores_object_and_document() {
        let docs = FlakyDocuments::new(MemoryDocumentStore::new());
        let objects = FlakyObjects::new();
        let users = FixedUsers(Some(alice()));
        let reval = RecordingRevalidator::default();
        let uc = UploadFile {
            store: &docs,
            objects: &objects,
            users: &users,
            revalidator: &reval,
        };
        let rec = uc.execute(&session(), input(None, None)).await.unwrap();
        assert_eq!(rec.file_type, FileType::Document);
        assert_eq!(rec.extension, "pdf");
        assert_eq!(rec.name, "Quarterly Report.PDF");
        assert_eq!(rec.size, 8);
        assert_eq!(rec.owner, "user-a");
        assert_eq!(rec.account_id, "acc-a");
        assert!(rec.users.is_empty());
        assert!(objects.inner.contains(&rec.bucket_file_id).await);
        assert_eq!(rec.url.as_deref(), Some(objects.object_url(&rec.bucket_file_id).as_str()));
        assert_eq!(*reval.paths.lock().await, vec!["/documents".to_string()]);

        let stored = docs.inner.get(Collection::Files, &rec.id).await.unwrap();
        assert_eq!(stored["users"], "[]");
    }

    #[tokio::test]
    async fn explicit_owner_and_account_skip_identity_lookup() {
        let docs = FlakyDocuments::new(MemoryDocumentStore::new());
        let objects = FlakyObjects::new();
        let users = FixedUsers(None);
        let reval = RecordingRevalidator::default();
        let uc = UploadFile {
            store: &docs,
            objects: &objects,
            users: &users,
            revalidator: &reval,
        };
        let rec = uc
            .execute(&session(), input(Some("user-x"), Some("acc-x")))
            .await
            .unwrap();
        assert_eq!(rec.owner, "user-x");
        assert_eq!(rec.account_id, "acc-x");
    }

    #[tokio::test]
    async fn missing_account_is_fatal_before_storing() {
        let docs = FlakyDocuments::new(MemoryDocumentStore::new());
        let objects = FlakyObjects::new();
        let users = FixedUsers(None);
        let reval = RecordingRevalidator::default();
        let uc = UploadFile {
            store: &docs,
            objects: &objects,
            users: &users,
            revalidator: &reval,
        };
        let err = uc
            .execute(&session(), input(Some("user-x"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, FileActionError::MissingField("accountId")));
        assert_eq!(objects.inner.count().await, 0);
        assert!(reval.paths.lock().await.is_empty());
    }

    #[tokio::test]
    async fn failed_document_deletes_stored_object() {
        let docs = FlakyDocuments::new(MemoryDocumentStore::new());
        docs.fail_create.store(true, Ordering::SeqCst);
        let objects = FlakyObjects::new();
        let users = FixedUsers(Some(alice()));
        let reval = RecordingRevalidator::default();
        let uc = UploadFile {
            store: &docs,
            objects: &objects,
            users: &users,
            revalidator: &reval,
        };
        let err = uc.execute(&session(), input(None, None)).await.unwrap_err();
        let FileActionError::Backend(inner) = err else {
            panic!("expected backend error, got {err:?}");
        };
        let backend = inner.downcast_ref::<BackendError>().unwrap();
        assert!(backend.message.contains("Invalid document structure"));
        assert_eq!(objects.inner.count().await, 0);
        assert_eq!(docs.inner.count(Collection::Files).await, 0);
        assert!(reval.paths.lock().await.is_empty());
    }

    #[tokio::test]
    async fn failed_cleanup_still_returns_original_error() {
        let docs = FlakyDocuments::new(MemoryDocumentStore::new());
        docs.fail_create.store(true, Ordering::SeqCst);
        let objects = FlakyObjects::new();
        objects.fail_delete.store(true, Ordering::SeqCst);
        let users = FixedUsers(Some(alice()));
        let reval = RecordingRevalidator::default();
        let uc = UploadFile {
            store: &docs,
            objects: &objects,
            users: &users,
            revalidator: &reval,
        };
        let err = uc.execute(&session(), input(None, None)).await.unwrap_err();
        assert!(err.to_string().contains("Invalid document structure"));
        // The orphan stays behind.
        assert_eq!(objects.inner.count().await, 1);
    }
}
