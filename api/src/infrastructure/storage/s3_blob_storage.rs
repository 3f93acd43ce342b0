use anyhow::{Context, anyhow};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, error::SdkError};
use std::path::Path;

use crate::application::ports::blob_storage::BlobStorage;
use crate::bootstrap::config::Config;
use crate::infrastructure::storage::{normalize_prefix, normalize_relative};

/// S3 has no directories; object keys are `<root_prefix>/<relative path>`.
pub struct S3BlobStorage {
    client: Client,
    bucket: String,
    root_prefix: String,
}

impl S3BlobStorage {
    pub async fn new(cfg: &Config) -> anyhow::Result<Self> {
        let bucket = cfg
            .s3_bucket
            .clone()
            .context("S3 bucket must be configured when using S3 storage backend")?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &cfg.s3_region {
            loader = loader.region(Region::new(region.clone()));
        }

        let shared_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);

        if let (Some(access), Some(secret)) = (&cfg.s3_access_key, &cfg.s3_secret_key) {
            let creds = Credentials::new(
                access.clone(),
                secret.clone(),
                None,
                None,
                "attachments-s3-static",
            );
            builder = builder.credentials_provider(creds);
        }

        if let Some(endpoint) = &cfg.s3_endpoint {
            builder = builder.endpoint_url(endpoint.clone());
        }

        if cfg.s3_use_path_style {
            builder = builder.force_path_style(true);
        }

        let client = Client::from_conf(builder.build());

        ensure_bucket(&client, &bucket).await?;

        Ok(Self {
            client,
            bucket,
            root_prefix: normalize_prefix(Path::new(&cfg.uploads_dir)),
        })
    }

    fn key_for(&self, path: &str) -> anyhow::Result<String> {
        let rel = normalize_relative(path)?;
        Ok(if self.root_prefix.is_empty() {
            rel
        } else {
            format!("{}/{}", self.root_prefix, rel)
        })
    }
}

#[async_trait]
impl BlobStorage for S3BlobStorage {
    async fn ensure_directory(&self, dir: &str) -> anyhow::Result<String> {
        normalize_relative(dir)
    }

    async fn write_new(&self, path: &str, bytes: &[u8]) -> anyhow::Result<bool> {
        let key = self.key_for(path)?;
        let mut put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .if_none_match("*")
            .body(ByteStream::from(bytes.to_vec()));
        if let Some(mime) = mime_guess::from_path(path).first() {
            put = put.content_type(mime.essence_str());
        }
        match put.send().await {
            Ok(_) => Ok(true),
            // 412: key exists; 409: a concurrent conditional write won
            Err(err) if is_key_taken(err.raw_response().map(|r| r.status().as_u16())) => {
                Ok(false)
            }
            Err(err) => Err(anyhow!("put_object failed for {}: {}", key, err)),
        }
    }

    async fn exists(&self, path: &str) -> anyhow::Result<bool> {
        let key = self.key_for(path)?;
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => match err {
                SdkError::ServiceError(service_err) => {
                    let head_err: &HeadObjectError = service_err.err();
                    if head_err.is_not_found() {
                        Ok(false)
                    } else {
                        Err(anyhow!("head_object error for {}: {}", key, head_err))
                    }
                }
                other => Err(anyhow!("head_object failed for {}: {}", key, other)),
            },
        }
    }

    async fn delete(&self, path: &str) -> anyhow::Result<()> {
        let key = self.key_for(path)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .with_context(|| format!("failed to delete object {key}"))?;
        Ok(())
    }

    async fn read(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let key = self.key_for(path)?;
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .with_context(|| format!("failed to get object {key}"))?;
        let data = object
            .body
            .collect()
            .await
            .with_context(|| format!("failed to read object {key}"))?;
        Ok(data.into_bytes().to_vec())
    }
}

fn is_key_taken(status: Option<u16>) -> bool {
    matches!(status, Some(409) | Some(412))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditional_put_conflicts_mean_the_key_is_taken() {
        assert!(is_key_taken(Some(412)));
        assert!(is_key_taken(Some(409)));
        assert!(!is_key_taken(Some(403)));
        assert!(!is_key_taken(None));
    }
}
