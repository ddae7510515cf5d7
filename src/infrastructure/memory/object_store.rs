use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::ports::document_store::BackendError;
use crate::application::ports::object_store::{ObjectStore, StoredObject};

pub struct MemoryObjectStore {
    base_url: String,
    objects: Mutex<HashMap<String, (StoredObject, Vec<u8>)>>,
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.objects.lock().await.contains_key(id)
    }

    pub async fn count(&self) -> usize {
        self.objects.lock().await.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn create_object(
        &self,
        id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> anyhow::Result<StoredObject> {
        let stored = StoredObject {
            id: id.to_string(),
            name: filename.to_string(),
            size: bytes.len() as u64,
        };
        self.objects
            .lock()
            .await
            .insert(id.to_string(), (stored.clone(), bytes));
        Ok(stored)
    }

    async fn delete_object(&self, id: &str) -> anyhow::Result<()> {
        match self.objects.lock().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(BackendError {
                code: 404,
                kind: "storage_file_not_found".into(),
                message: format!("The requested file '{id}' could not be found."),
            }
            .into()),
        }
    }

    fn object_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id)
    }
}
