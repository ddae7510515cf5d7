use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct RevalidationSignal {
    pub path: String,
    pub at: DateTime<Utc>,
}

/// Tells the presentation side that data shown under `path` may be stale.
#[async_trait]
pub trait RevalidationPort: Send + Sync {
    async fn revalidate(&self, path: &str) -> anyhow::Result<()>;
}
