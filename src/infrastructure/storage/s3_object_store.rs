use anyhow::{Context, anyhow};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, error::SdkError};

use crate::application::ports::document_store::BackendError;
use crate::application::ports::object_store::{ObjectStore, StoredObject};
use crate::bootstrap::config::{Config, S3Config};

/// Objects are keyed by their id; the original filename travels in
/// `Content-Disposition`.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    base_url: String,
}

impl S3ObjectStore {
    pub async fn new(cfg: &Config) -> anyhow::Result<Self> {
        let s3 = cfg
            .s3
            .as_ref()
            .context("S3 bucket must be configured when using the S3 object backend")?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &s3.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let (Some(access), Some(secret)) = (&s3.access_key, &s3.secret_key) {
            let creds = Credentials::new(
                access.clone(),
                secret.clone(),
                None,
                None,
                "filestore-s3-static",
            );
            builder = builder.credentials_provider(creds);
        }
        if let Some(endpoint) = &s3.endpoint {
            builder = builder.endpoint_url(endpoint.clone());
        }
        if s3.use_path_style {
            builder = builder.force_path_style(true);
        }

        let client = Client::from_conf(builder.build());
        ensure_bucket(&client, &s3.bucket).await?;

        Ok(Self {
            client,
            bucket: s3.bucket.clone(),
            base_url: public_base_url(s3),
        })
    }

    async fn object_exists(&self, key: &str) -> anyhow::Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(service_err)) => {
                let head_err: &HeadObjectError = service_err.err();
                if head_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow!("head_object error for {}: {}", key, head_err))
                }
            }
            Err(other) => Err(anyhow!("head_object failed for {}: {}", key, other)),
        }
    }
}

fn public_base_url(s3: &S3Config) -> String {
    if let Some(url) = &s3.public_url {
        return url.clone();
    }
    match &s3.endpoint {
        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), s3.bucket),
        None => {
            let region = s3.region.as_deref().unwrap_or("us-east-1");
            format!("https://{}.s3.{}.amazonaws.com", s3.bucket, region)
        }
    }
}

fn content_disposition(filename: &str) -> String {
    format!(
        "inline; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn create_object(
        &self,
        id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> anyhow::Result<StoredObject> {
        let size = bytes.len() as u64;
        let mime_type = mime_guess::from_path(filename)
            .first()
            .map(|m| m.essence_str().to_string());
        let mut put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(id)
            .content_disposition(content_disposition(filename))
            .body(ByteStream::from(bytes));
        if let Some(mime) = &mime_type {
            put = put.content_type(mime);
        }
        put.send()
            .await
            .with_context(|| format!("failed to upload object {id}"))?;
        tracing::debug!(object_id = %id, size, "s3_object_stored");
        Ok(StoredObject {
            id: id.to_string(),
            name: filename.to_string(),
            size,
        })
    }

    async fn delete_object(&self, id: &str) -> anyhow::Result<()> {
        // S3 deletes are idempotent; surface a missing key the same way the
        // other backends do.
        if !self.object_exists(id).await? {
            return Err(BackendError {
                code: 404,
                kind: "storage_file_not_found".into(),
                message: format!("The requested file '{id}' could not be found."),
            }
            .into());
        }
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(id)
            .send()
            .await
            .with_context(|| format!("failed to delete object {id}"))?;
        Ok(())
    }

    fn object_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(id))
    }
}

async fn ensure_bucket(client: &Client, bucket: &str) -> anyhow::Result<()> {
    match client.head_bucket().bucket(bucket).send().await {
        Ok(_) => return Ok(()),
        Err(SdkError::ServiceError(service_err)) => {
            if !matches!(service_err.err(), HeadBucketError::NotFound(_)) {
                return Err(anyhow!(service_err.err().to_string()));
            }
        }
        Err(err) => return Err(anyhow!(err.to_string())),
    }

    tracing::info!(%bucket, "s3_bucket_created");
    match client.create_bucket().bucket(bucket).send().await {
        Ok(_) => Ok(()),
        Err(SdkError::ServiceError(service_err)) => match service_err.err() {
            CreateBucketError::BucketAlreadyOwnedByYou(_) => Ok(()),
            CreateBucketError::BucketAlreadyExists(_) => Ok(()),
            other => Err(anyhow!(other.to_string())),
        },
        Err(err) => Err(anyhow!(err.to_string())),
    }
}
