use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub id: String,
    pub name: String,
    pub size: u64,
}

/// Binary object storage bound to a single bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn create_object(
        &self,
        id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> anyhow::Result<StoredObject>;
    async fn delete_object(&self, id: &str) -> anyhow::Result<()>;
    fn object_url(&self, id: &str) -> String;
}
