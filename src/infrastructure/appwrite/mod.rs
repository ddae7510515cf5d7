//! Appwrite REST adapter: document database and storage bucket access with a
//! server API key.

mod databases;
mod query;
mod storage;

pub use query::{encode_queries, query_json};

use anyhow::Context;
use serde::Deserialize;

use crate::application::ports::document_store::{BackendError, Collection};
use crate::bootstrap::config::{AppwriteConfig, Config};

#[derive(Clone)]
pub struct AppwriteClient {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    api_key: String,
    database_id: String,
    files_collection_id: String,
    users_collection_id: String,
    bucket_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: u16,
    #[serde(default, rename = "type")]
    kind: String,
}

impl AppwriteClient {
    pub fn new(cfg: &AppwriteConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("filestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build Appwrite HTTP client")?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            project_id: cfg.project_id.clone(),
            api_key: cfg.api_key.clone(),
            database_id: cfg.database_id.clone(),
            files_collection_id: cfg.files_collection_id.clone(),
            users_collection_id: cfg.users_collection_id.clone(),
            bucket_id: cfg.bucket_id.clone(),
        })
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let appwrite = cfg
            .appwrite
            .as_ref()
            .context("Appwrite settings must be configured when using the Appwrite backend")?;
        Self::new(appwrite)
    }

    fn collection_id(&self, collection: Collection) -> &str {
        match collection {
            Collection::Files => &self.files_collection_id,
            Collection::Users => &self.users_collection_id,
        }
    }

    fn documents_url(&self, collection: Collection) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.endpoint,
            urlencoding::encode(&self.database_id),
            urlencoding::encode(self.collection_id(collection)),
        )
    }

    fn files_url(&self) -> String {
        format!(
            "{}/storage/buckets/{}/files",
            self.endpoint,
            urlencoding::encode(&self.bucket_id)
        )
    }

    /// Public view URL for an object in the configured bucket.
    pub fn file_view_url(&self, file_id: &str) -> String {
        format!(
            "{}/{}/view?project={}",
            self.files_url(),
            urlencoding::encode(file_id),
            urlencoding::encode(&self.project_id)
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> anyhow::Result<reqwest::Response> {
        let resp = req.send().await.context("Appwrite request failed")?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        Err(backend_error(status.as_u16(), &text).into())
    }
}

fn backend_error(status: u16, body: &str) -> BackendError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => BackendError {
            code: if parsed.code == 0 { status } else { parsed.code },
            kind: parsed.kind,
            message: parsed.message,
        },
        Err(_) => BackendError {
            code: status,
            kind: "unknown".into(),
            message: body.trim().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AppwriteClient {
        AppwriteClient::new(&AppwriteConfig {
            endpoint: "https://cloud.appwrite.io/v1/".into(),
            project_id: "proj".into(),
            api_key: "key".into(),
            database_id: "db".into(),
            files_collection_id: "files".into(),
            users_collection_id: "users".into(),
            bucket_id: "bucket".into(),
        })
        .unwrap()
    }

    #[test]
    fn builds_view_url() {
        assert_eq!(
            client().file_view_url("abc"),
            "https://cloud.appwrite.io/v1/storage/buckets/bucket/files/abc/view?project=proj"
        );
    }

    #[test]
    fn routes_collections() {
        let c = client();
        assert_eq!(
            c.documents_url(Collection::Users),
            "https://cloud.appwrite.io/v1/databases/db/collections/users/documents"
        );
    }

    #[test]
    fn parses_error_bodies() {
        let err = backend_error(
            400,
            r#"{"message":"Searching by attribute \"users\" requires a fulltext index.","code":400,"type":"general_query_invalid","version":"1.5.7"}"#,
        );
        assert!(err.is_missing_fulltext_index());
        assert_eq!(err.kind, "general_query_invalid");

        let err = backend_error(502, "Bad Gateway");
        assert_eq!(err.code, 502);
        assert_eq!(err.message, "Bad Gateway");
    }
}
