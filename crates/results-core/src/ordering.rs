//! Ordering of storage keys by their embedded timestamp.
//!
//! Keys are decoded once, up front, into [`VersionedKey`]s; a malformed key
//! fails the whole batch before anything is sorted.

use chrono::{DateTime, Utc};

use crate::key::{KeyCodec, KeyError};

/// A storage key paired with its decoded timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedKey {
    pub key: String,
    pub timestamp: DateTime<Utc>,
}

/// Decode every key, failing on the first one the codec rejects.
pub fn decode_all<I, S>(codec: &KeyCodec, keys: I) -> Result<Vec<VersionedKey>, KeyError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    keys.into_iter()
        .map(|key| {
            let key = key.into();
            let timestamp = codec.parse(&key)?;
            Ok(VersionedKey { key, timestamp })
        })
        .collect()
}

/// Oldest first. Stable; equal timestamps keep their input order.
pub fn sort_ascending(keys: &mut [VersionedKey]) {
    keys.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
}

/// Newest first. Stable; equal timestamps keep their input order.
pub fn sort_descending(keys: &mut [VersionedKey]) {
    keys.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
