//! `out`: upload a results file as a new version.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use results_core::{KeyCodec, OutRequest, OutResponse, Version};
use results_store::ResultStore;
use tracing::{info, instrument};

use crate::error::{ResourceError, Result};

pub struct Publisher {
    store: Arc<dyn ResultStore>,
}

impl Publisher {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self { store }
    }

    /// Handle an `out` request; `params.file` is relative to `sources_dir`.
    pub async fn put(&self, request: &OutRequest, sources_dir: &Path) -> Result<OutResponse> {
        let version = self
            .publish(&sources_dir.join(&request.params.file), Utc::now())
            .await?;
        Ok(OutResponse { version })
    }

    /// Upload `file` under a key stamped with `now`.
    #[instrument(skip(self))]
    pub async fn publish(&self, file: &Path, now: DateTime<Utc>) -> Result<Version> {
        let body = tokio::fs::read(file)
            .await
            .map_err(|e| ResourceError::io("unable to read results file", file, e))?;

        let key = KeyCodec::encode(self.store.prefix(), now);
        self.store.put(&key, body).await?;

        info!(%key, "published results");
        Ok(Version::new(key))
    }
}
