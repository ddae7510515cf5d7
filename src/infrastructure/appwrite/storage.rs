use async_trait::async_trait;
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::AppwriteClient;
use crate::application::ports::object_store::{ObjectStore, StoredObject};

// Appwrite rejects single requests above 5 MiB; larger files go up in ranges.
const CHUNK_SIZE: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct FileResponse {
    #[serde(rename = "$id")]
    id: String,
    name: String,
    #[serde(rename = "sizeOriginal", default)]
    size_original: u64,
}

fn file_part(filename: &str, bytes: Vec<u8>) -> anyhow::Result<Part> {
    let mime = mime_guess::from_path(filename).first_or_octet_stream();
    Ok(Part::bytes(bytes)
        .file_name(filename.to_string())
        .mime_str(mime.essence_str())?)
}

#[async_trait]
impl ObjectStore for AppwriteClient {
    async fn create_object(
        &self,
        id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> anyhow::Result<StoredObject> {
        let url = self.files_url();
        let total = bytes.len();

        let resp: FileResponse = if total <= CHUNK_SIZE {
            let form = Form::new()
                .text("fileId", id.to_string())
                .part("file", file_part(filename, bytes)?);
            self.send(self.request(Method::POST, &url).multipart(form))
                .await?
                .json()
                .await?
        } else {
            let mut last: Option<FileResponse> = None;
            for (index, chunk) in bytes.chunks(CHUNK_SIZE).enumerate() {
                let start = index * CHUNK_SIZE;
                let end = start + chunk.len() - 1;
                let form = Form::new()
                    .text("fileId", id.to_string())
                    .part("file", file_part(filename, chunk.to_vec())?);
                let mut req = self
                    .request(Method::POST, &url)
                    .header("Content-Range", format!("bytes {start}-{end}/{total}"))
                    .multipart(form);
                if index > 0 {
                    req = req.header("X-Appwrite-ID", id);
                }
                tracing::debug!(file_id = %id, start, end, total, "appwrite_chunk_upload");
                last = Some(self.send(req).await?.json().await?);
            }
            last.ok_or_else(|| anyhow::anyhow!("chunked upload produced no response"))?
        };

        Ok(StoredObject {
            size: if resp.size_original == 0 {
                total as u64
            } else {
                resp.size_original
            },
            id: resp.id,
            name: resp.name,
        })
    }

    async fn delete_object(&self, id: &str) -> anyhow::Result<()> {
        let url = format!("{}/{}", self.files_url(), urlencoding::encode(id));
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    fn object_url(&self, id: &str) -> String {
        self.file_view_url(id)
    }
}
