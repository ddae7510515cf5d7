use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppwriteClient;
use super::query::{encode_queries, has_limit, next_cursor, page_queries};
use crate::application::ports::document_store::{
    Collection, DocumentList, DocumentStore, Query,
};

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    documents: Vec<Value>,
}

#[async_trait]
impl DocumentStore for AppwriteClient {
    async fn create_document(
        &self,
        collection: Collection,
        id: &str,
        data: Value,
    ) -> anyhow::Result<Value> {
        let url = self.documents_url(collection);
        let req = self
            .request(Method::POST, &url)
            .json(&json!({ "documentId": id, "data": data }));
        Ok(self.send(req).await?.json::<Value>().await?)
    }

    async fn list_documents(
        &self,
        collection: Collection,
        queries: &[Query],
    ) -> anyhow::Result<DocumentList> {
        let url = self.documents_url(collection);
        if has_limit(queries) {
            let req = self
                .request(Method::GET, &url)
                .query(&encode_queries(queries));
            let body: ListResponse = self.send(req).await?.json().await?;
            return Ok(DocumentList {
                total: body.total,
                documents: body.documents,
            });
        }

        // Without a limit Appwrite returns a single default-sized page
        let mut documents = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let req = self
                .request(Method::GET, &url)
                .query(&page_queries(queries, cursor.as_deref()));
            let body: ListResponse = self.send(req).await?.json().await?;
            let next = next_cursor(
                &body.documents,
                (documents.len() + body.documents.len()) as u64,
                body.total,
            );
            documents.extend(body.documents);
            match next {
                Some(id) => cursor = Some(id),
                None => {
                    tracing::debug!(
                        collection = collection.as_str(),
                        fetched = documents.len(),
                        total = body.total,
                        "appwrite_listing_paged"
                    );
                    return Ok(DocumentList {
                        total: body.total,
                        documents,
                    });
                }
            }
        }
    }

    async fn update_document(
        &self,
        collection: Collection,
        id: &str,
        data: Value,
    ) -> anyhow::Result<Value> {
        let url = format!(
            "{}/{}",
            self.documents_url(collection),
            urlencoding::encode(id)
        );
        let req = self
            .request(Method::PATCH, &url)
            .json(&json!({ "data": data }));
        Ok(self.send(req).await?.json::<Value>().await?)
    }

    async fn delete_document(&self, collection: Collection, id: &str) -> anyhow::Result<()> {
        let url = format!(
            "{}/{}",
            self.documents_url(collection),
            urlencoding::encode(id)
        );
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        let url = format!(
            "{}/databases/{}",
            self.endpoint,
            urlencoding::encode(&self.database_id)
        );
        self.send(self.request(Method::GET, &url)).await?;
        Ok(())
    }
}
