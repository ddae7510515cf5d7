use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Files,
    Users,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Files => "files",
            Collection::Users => "users",
        }
    }
}

/// Backend-neutral list predicate. Adapters translate it to their own query language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Equal {
        attribute: String,
        values: Vec<String>,
    },
    /// Full-text match; may require an index on the backend.
    Search {
        attribute: String,
        term: String,
    },
    Contains {
        attribute: String,
        value: String,
    },
    Or(Vec<Query>),
    Limit(u32),
    OrderAsc(String),
    OrderDesc(String),
}

impl Query {
    pub fn equal<I, S>(attribute: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query::Equal {
            attribute: attribute.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn search(attribute: &str, term: &str) -> Self {
        Query::Search {
            attribute: attribute.to_string(),
            term: term.to_string(),
        }
    }

    pub fn contains(attribute: &str, value: &str) -> Self {
        Query::Contains {
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentList {
    pub total: u64,
    pub documents: Vec<Value>,
}

/// Error reported by a document or object backend, carried unchanged to callers.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} (code {code}, {kind})")]
pub struct BackendError {
    pub code: u16,
    pub kind: String,
    pub message: String,
}

impl BackendError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: 404,
            kind: "document_not_found".into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code == 404
    }

    pub fn is_missing_fulltext_index(&self) -> bool {
        self.message.contains("fulltext")
    }
}

pub fn is_missing_fulltext_index(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<BackendError>())
        .any(BackendError::is_missing_fulltext_index)
}

pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<BackendError>())
        .any(BackendError::is_not_found)
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_document(
        &self,
        collection: Collection,
        id: &str,
        data: Value,
    ) -> anyhow::Result<Value>;
    async fn list_documents(
        &self,
        collection: Collection,
        queries: &[Query],
    ) -> anyhow::Result<DocumentList>;
    async fn update_document(
        &self,
        collection: Collection,
        id: &str,
        data: Value,
    ) -> anyhow::Result<Value>;
    async fn delete_document(&self, collection: Collection, id: &str) -> anyhow::Result<()>;
    async fn ping(&self) -> anyhow::Result<()>;
}
