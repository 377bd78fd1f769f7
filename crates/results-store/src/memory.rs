//! In-memory result store for testing.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{ResultStore, StoreError};

pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    get_calls: RwLock<Vec<String>>,
    failure: RwLock<Option<String>>,
    prefix: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            get_calls: RwLock::new(Vec::new()),
            failure: RwLock::new(None),
            prefix: None,
        }
    }

    /// Store with `prefix` reported as the upload prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::new()
        }
    }

    /// Seed an object without going through the trait
    pub fn insert(&self, key: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.objects.write().unwrap().insert(key.into(), body.into());
    }

    pub fn contents(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().unwrap().get(key).cloned()
    }

    /// Keys passed to `get`, in call order
    pub fn get_calls(&self) -> Vec<String> {
        self.get_calls.read().unwrap().clone()
    }

    /// Make every subsequent operation fail as unavailable with `message`
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write().unwrap() = Some(message.into());
    }

    fn check_available(&self) -> Result<(), StoreError> {
        match self.failure.read().unwrap().as_ref() {
            Some(message) => Err(StoreError::unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        Ok(self.objects.read().unwrap().keys().cloned().collect())
    }

    async fn get(
        &self,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), StoreError> {
        self.get_calls.write().unwrap().push(key.to_string());
        self.check_available()?;

        let body = self.contents(key).ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })?;
        sink.write_all(&body)
            .await
            .map_err(|source| StoreError::Sink {
                key: key.to_string(),
                source,
            })?;
        sink.flush().await.map_err(|source| StoreError::Sink {
            key: key.to_string(),
            source,
        })
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        self.check_available()?;
        self.insert(key, body);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.objects.write().unwrap().remove(key);
        Ok(())
    }

    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}
