//! S3 result store.
//!
//! Works against AWS and S3-compatible endpoints (MinIO, GCS interop).
//! Objects are listed under `path_prefix` and returned as full keys.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use serde::Deserialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument};

use crate::{ResultStore, StoreError};

const DEFAULT_REGION: &str = "us-east-1";

/// `storage_config` block for `storage_type: s3`
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub bucket: String,

    /// Static credentials; when absent the default AWS provider chain is used
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,

    #[serde(default)]
    pub region_name: Option<String>,

    /// Only keys under this prefix are listed
    #[serde(default)]
    pub path_prefix: String,

    /// Custom endpoint for S3-compatible stores
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl S3Config {
    pub fn from_json(
        config: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, StoreError> {
        serde_json::from_value(serde_json::Value::Object(config.clone())).map_err(|source| {
            StoreError::InvalidConfig {
                storage_type: "s3".to_string(),
                source,
            }
        })
    }

    fn region(&self) -> String {
        self.region_name
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REGION)
            .to_string()
    }
}

pub struct S3Store {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3Store {
    pub fn new(client: Client, bucket: String, prefix: String) -> Self {
        Self {
            client,
            bucket,
            prefix,
        }
    }

    /// Build a client from the source config.
    pub async fn connect(config: S3Config) -> Self {
        let region = config.region();
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.clone()));

        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key_id,
                secret,
                None,
                None,
                "resource-source",
            ));
        }

        let sdk_config = loader.load().await;
        let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(true);
        if let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.is_empty()) {
            s3_config = s3_config.endpoint_url(endpoint);
        }

        info!(
            bucket = %config.bucket,
            %region,
            endpoint = config.endpoint.as_deref().unwrap_or("default"),
            "S3 client initialised"
        );

        Self::new(
            Client::from_conf(s3_config.build()),
            config.bucket,
            config.path_prefix,
        )
    }
}

#[async_trait]
impl ResultStore for S3Store {
    #[instrument(skip(self), fields(bucket = %self.bucket, prefix = %self.prefix))]
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&self.prefix);

            if let Some(ref token) = continuation_token {
                req = req.continuation_token(token);
            }

            let resp = req.send().await.map_err(|err| {
                StoreError::unavailable(format!(
                    "unable to list bucket '{}' with '{}': {}",
                    self.bucket,
                    self.prefix,
                    DisplayErrorContext(&err)
                ))
            })?;

            for obj in resp.contents() {
                if let Some(k) = obj.key() {
                    keys.push(k.to_string());
                }
            }

            match resp.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(count = keys.len(), "listed results");
        Ok(keys)
    }

    #[instrument(skip(self, sink), fields(bucket = %self.bucket))]
    async fn get(
        &self,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), StoreError> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    StoreError::NotFound {
                        key: key.to_string(),
                    }
                } else {
                    StoreError::unavailable(format!(
                        "unable to fetch '{}': {}",
                        key,
                        DisplayErrorContext(&err)
                    ))
                }
            })?;

        let mut body = resp.body.into_async_read();
        let bytes = tokio::io::copy(&mut body, &mut *sink)
            .await
            .map_err(|source| StoreError::Sink {
                key: key.to_string(),
                source,
            })?;
        sink.flush().await.map_err(|source| StoreError::Sink {
            key: key.to_string(),
            source,
        })?;

        debug!(bytes, "result downloaded");
        Ok(())
    }

    #[instrument(skip(self, body), fields(bucket = %self.bucket, len = body.len()))]
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type("application/xml")
            .send()
            .await
            .map_err(|err| {
                StoreError::unavailable(format!(
                    "unable to upload '{}': {}",
                    key,
                    DisplayErrorContext(&err)
                ))
            })?;

        debug!("result uploaded");
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                StoreError::unavailable(format!(
                    "unable to delete '{}': {}",
                    key,
                    DisplayErrorContext(&err)
                ))
            })?;

        debug!("result deleted");
        Ok(())
    }

    fn prefix(&self) -> Option<&str> {
        Some(self.prefix.as_str()).filter(|p| !p.is_empty())
    }
}
