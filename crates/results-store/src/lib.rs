//! Blob storage for test result archives.
//!
//! Archives are byte blobs addressed by key; the key embeds the archive's
//! timestamp (see [`results_core::key`]). Backends only move bytes around and
//! never interpret keys.

use async_trait::async_trait;
use results_core::Source;
use thiserror::Error;
use tokio::io::AsyncWrite;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not find file with key '{key}'")]
    NotFound { key: String },

    /// Transport, auth or service failure reported by the backend
    #[error("{message}")]
    Unavailable { message: String },

    #[error("failed to copy '{key}' to local file: {source}")]
    Sink {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported storage type '{0}'")]
    UnsupportedType(String),

    #[error("invalid {storage_type} storage config: {source}")]
    InvalidConfig {
        storage_type: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Storage interface for result archives
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Every key under the store's prefix, in no particular order
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Stream the object at `key` into `sink`
    async fn get(
        &self,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), StoreError>;

    /// Store `body` at `key`, replacing any existing object
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError>;

    /// Remove the object at `key`
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Key prefix new archives should be written under, if any
    fn prefix(&self) -> Option<&str> {
        None
    }
}

/// In-memory store for testing
pub mod memory;

/// S3 (and S3-compatible) store for production
pub mod s3;

pub use memory::MemoryStore;
pub use s3::{S3Config, S3Store};

/// Build the backend named by a request's `source` block.
pub async fn from_source(source: &Source) -> Result<Box<dyn ResultStore>, StoreError> {
    match source.storage_type.as_str() {
        "s3" => {
            let config = S3Config::from_json(&source.storage_config)?;
            Ok(Box::new(S3Store::connect(config).await))
        }
        other => Err(StoreError::UnsupportedType(other.to_string())),
    }
}
