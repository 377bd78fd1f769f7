//! Request and response envelopes exchanged with the pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metadata key carrying the number of fetched archives.
pub const TEST_SUITE_COUNT: &str = "test_suite_count";

/// Opaque marker for one stored archive. Only the resolvers look inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub key: String,
}

impl Version {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// The zero marker, meaning "nothing seen yet".
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

/// Where archives live: a backend type and its backend-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(alias = "StorageType")]
    pub storage_type: String,

    #[serde(default, alias = "StorageConfig")]
    pub storage_config: serde_json::Map<String, serde_json::Value>,
}

/// One summary to render after a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Summary kind understood by the viewer (e.g. `pass-fail`)
    #[serde(rename = "type")]
    pub kind: String,

    /// How many of the most recent archives this summary looks at; 0 = all
    #[serde(default)]
    pub limit: usize,
}

impl Summary {
    pub fn new(kind: impl Into<String>, limit: usize) -> Self {
        Self {
            kind: kind.into(),
            limit,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckRequest {
    pub source: Source,

    #[serde(default)]
    pub version: Option<Version>,
}

impl CheckRequest {
    /// The marker to check from, if the pipeline has seen one.
    pub fn starting_version(&self) -> Option<&Version> {
        self.version.as_ref().filter(|v| !v.is_empty())
    }
}

/// Versions at or after the starting marker, oldest first.
pub type CheckResponse = Vec<Version>;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InParams {
    #[serde(default)]
    pub summaries: Vec<Summary>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InRequest {
    pub source: Source,
    pub version: Version,

    #[serde(default)]
    pub params: InParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InResponse {
    pub version: Version,
    pub metadata: BTreeMap<String, String>,
}

impl InResponse {
    pub fn new(version: Version, fetched: usize) -> Self {
        let metadata = BTreeMap::from([(TEST_SUITE_COUNT.to_string(), fetched.to_string())]);
        Self { version, metadata }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutParams {
    /// Results file to upload, relative to the sources directory
    pub file: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutRequest {
    pub source: Source,
    pub params: OutParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutResponse {
    pub version: Version,
}
