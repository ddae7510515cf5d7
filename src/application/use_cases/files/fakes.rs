use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::application::ports::document_store::{
    BackendError, Collection, DocumentList, DocumentStore, Query,
};
use crate::application::ports::object_store::{ObjectStore, StoredObject};
use crate::application::ports::revalidation_port::RevalidationPort;
use crate::application::ports::user_directory::{Session, UserDirectory};
use crate::domain::users::user::UserRecord;
use crate::infrastructure::memory::{MemoryDocumentStore, MemoryObjectStore};

pub fn alice() -> UserRecord {
    UserRecord {
        id: "user-a".into(),
        email: "a@example.com".into(),
        full_name: "Alice".into(),
        avatar: String::new(),
        account_id: Some("acc-a".into()),
    }
}

pub fn session() -> Session {
    Session {
        account_id: "acc-a".into(),
    }
}

pub struct FixedUsers(pub Option<UserRecord>);

#[async_trait]
impl UserDirectory for FixedUsers {
    async fn current_user(&self, _session: &Session) -> anyhow::Result<Option<UserRecord>> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
pub struct RecordingRevalidator {
    pub paths: Mutex<Vec<String>>,
}

#[async_trait]
impl RevalidationPort for RecordingRevalidator {
    async fn revalidate(&self, path: &str) -> anyhow::Result<()> {
        self.paths.lock().await.push(path.to_string());
        Ok(())
    }
}

fn server_error(message: &str) -> anyhow::Error {
    BackendError {
        code: 500,
        kind: "general_unknown".into(),
        message: message.into(),
    }
    .into()
}

/// Memory store with switchable failures and a log of list calls.
pub struct FlakyDocuments {
    pub inner: MemoryDocumentStore,
    pub fail_create: AtomicBool,
    pub fail_list: AtomicBool,
    pub list_calls: Mutex<Vec<Vec<Query>>>,
}

impl FlakyDocuments {
    pub fn new(inner: MemoryDocumentStore) -> Self {
        Self {
            inner,
            fail_create: AtomicBool::new(false),
            fail_list: AtomicBool::new(false),
            list_calls: Mutex::new(Vec::new()),
        }
    }

    pub async fn seed(&self, id: &str, owner: &str, kind: &str, size: u64, users: &[&str]) {
        let users: Vec<String> = users.iter().map(|u| u.to_string()).collect();
        self.inner
            .create_document(
                Collection::Files,
                id,
                json!({
                    "type": kind,
                    "name": format!("{id}.bin"),
                    "url": format!("mem://{id}"),
                    "extension": "bin",
                    "size": size,
                    "owner": owner,
                    "accountId": format!("acc-{owner}"),
                    "users": Value::from(users).to_string(),
                    "bucketFileId": format!("obj-{id}"),
                }),
            )
            .await
            .unwrap();
    }
}

#[async_trait]
impl DocumentStore for FlakyDocuments {
    async fn create_document(
        &self,
        collection: Collection,
        id: &str,
        data: Value,
    ) -> anyhow::Result<Value> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(server_error("Invalid document structure: missing attribute"));
        }
        self.inner.create_document(collection, id, data).await
    }

    async fn list_documents(
        &self,
        collection: Collection,
        queries: &[Query],
    ) -> anyhow::Result<DocumentList> {
        self.list_calls.lock().await.push(queries.to_vec());
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(server_error("Server error"));
        }
        self.inner.list_documents(collection, queries).await
    }

    async fn update_document(
        &self,
        collection: Collection,
        id: &str,
        data: Value,
    ) -> anyhow::Result<Value> {
        self.inner.update_document(collection, id, data).await
    }

    async fn delete_document(&self, collection: Collection, id: &str) -> anyhow::Result<()> {
        self.inner.delete_document(collection, id).await
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Object store whose deletes can be made to fail.
pub struct FlakyObjects {
    pub inner: MemoryObjectStore,
    pub fail_delete: AtomicBool,
}

impl FlakyObjects {
    pub fn new() -> Self {
        Self {
            inner: MemoryObjectStore::new("mem://objects"),
            fail_delete: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ObjectStore for FlakyObjects {
    async fn create_object(
        &self,
        id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> anyhow::Result<StoredObject> {
        self.inner.create_object(id, filename, bytes).await
    }

    async fn delete_object(&self, id: &str) -> anyhow::Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(server_error("storage unavailable"));
        }
        self.inner.delete_object(id).await
    }

    fn object_url(&self, id: &str) -> String {
        self.inner.object_url(id)
    }
}
