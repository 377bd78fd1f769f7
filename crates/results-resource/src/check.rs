//! `check`: discover versions at or after the last one the pipeline saw.
//!
//! The starting version is re-emitted when it still exists, so the pipeline
//! can confirm it and pick up anything newer in a single response.

use std::sync::Arc;

use results_core::{decode_all, sort_ascending, CheckResponse, KeyCodec, KeyError, Version};
use results_store::ResultStore;
use tracing::{debug, instrument};

use crate::error::Result;

/// Versions among `all_keys` whose timestamp is at or after
/// `starting_version`'s, oldest first. No starting version selects everything.
pub fn resolve_check<I, S>(
    codec: &KeyCodec,
    all_keys: I,
    starting_version: Option<&Version>,
) -> std::result::Result<CheckResponse, KeyError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let start = starting_version
        .filter(|v| !v.is_empty())
        .map(|v| codec.parse(&v.key))
        .transpose()?;

    let mut eligible: Vec<_> = decode_all(codec, all_keys)?
        .into_iter()
        .filter(|k| start.is_none_or(|s| k.timestamp >= s))
        .collect();
    sort_ascending(&mut eligible);

    Ok(eligible.into_iter().map(|k| Version::new(k.key)).collect())
}

pub struct Checker {
    store: Arc<dyn ResultStore>,
    codec: KeyCodec,
}

impl Checker {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self {
            store,
            codec: KeyCodec::standard().clone(),
        }
    }

    pub fn with_codec(mut self, codec: KeyCodec) -> Self {
        self.codec = codec;
        self
    }

    #[instrument(skip(self))]
    pub async fn check(&self, starting_version: Option<&Version>) -> Result<CheckResponse> {
        if let Some(start) = starting_version.filter(|v| !v.is_empty()) {
            self.codec.parse(&start.key)?;
        }

        let keys = self.store.list().await?;
        let listed = keys.len();

        let versions = resolve_check(&self.codec, keys, starting_version)?;
        debug!(listed, selected = versions.len(), "resolved check");
        Ok(versions)
    }
}
