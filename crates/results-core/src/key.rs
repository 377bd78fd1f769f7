//! Storage key codec.
//!
//! Result archives are stored under keys of the form
//! `<optional/path/prefix/>test-results-<RFC 3339 timestamp>.xml`, e.g.
//! `nightly/test-results-2018-01-02T15:04:05Z.xml`. The embedded timestamp is
//! the only thing that orders versions; everything else about a key is opaque.

use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use thiserror::Error;

/// Pattern a key must match. The single capture group is the timestamp.
pub const DEFAULT_KEY_PATTERN: &str = r"/?test-results-(.+)\.xml$";

/// Timestamp format embedded in keys (RFC 3339, e.g. `2006-01-02T15:04:05Z`).
pub const TIMESTAMP_FORMAT: &str = "RFC 3339";

const KEY_FILE_PREFIX: &str = "test-results-";
const KEY_FILE_SUFFIX: &str = ".xml";

static STANDARD: LazyLock<KeyCodec> = LazyLock::new(|| KeyCodec {
    pattern: Regex::new(DEFAULT_KEY_PATTERN).expect("default key pattern is valid"),
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid filename '{key}'")]
    InvalidKey { key: String },

    #[error("invalid timestamp '{timestamp}' in key '{key}': expected {}", TIMESTAMP_FORMAT)]
    InvalidTimestamp { key: String, timestamp: String },
}

/// Extracts and embeds timestamps in storage keys.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    pattern: Regex,
}

impl KeyCodec {
    /// Codec for a custom key pattern. The pattern must have exactly one
    /// capture group holding the timestamp.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(pattern)?;
        if pattern.captures_len() != 2 {
            return Err(regex::Error::Syntax(format!(
                "key pattern '{}' must have exactly one capture group",
                pattern.as_str()
            )));
        }
        Ok(Self { pattern })
    }

    /// The `test-results-<timestamp>.xml` codec.
    pub fn standard() -> &'static KeyCodec {
        &STANDARD
    }

    /// Decode the timestamp embedded in `key`.
    pub fn parse(&self, key: &str) -> Result<DateTime<Utc>, KeyError> {
        let captures = self
            .pattern
            .captures(key)
            .ok_or_else(|| KeyError::InvalidKey {
                key: key.to_string(),
            })?;
        let timestamp = captures.get(1).map(|m| m.as_str()).unwrap_or_default();

        DateTime::parse_from_rfc3339(timestamp)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| KeyError::InvalidTimestamp {
                key: key.to_string(),
                timestamp: timestamp.to_string(),
            })
    }

    /// Build the key for an archive taken at `timestamp`, optionally nested
    /// under `prefix`. Always produces a key [`KeyCodec::standard`] accepts.
    pub fn encode(prefix: Option<&str>, timestamp: DateTime<Utc>) -> String {
        let file_name = format!(
            "{KEY_FILE_PREFIX}{}{KEY_FILE_SUFFIX}",
            timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        match prefix.map(|p| p.trim_end_matches('/')) {
            Some(p) if !p.is_empty() => format!("{p}/{file_name}"),
            _ => file_name,
        }
    }
}

/// Decode a key with the standard codec.
pub fn parse_key(key: &str) -> Result<DateTime<Utc>, KeyError> {
    KeyCodec::standard().parse(key)
}

/// Final path segment of a key, used as the local file name.
pub fn base_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
