//! Process configuration for the resource binary.
//!
//! Storage settings arrive per invocation in the request's `source` block.
//! Everything about the host environment (which viewer binary to run, how
//! loud to log) lives in an optional TOML file:
//!
//! ```toml
//! [viewer]
//! program = "/usr/local/bin/junit-viewer"
//!
//! [logging]
//! filter = "results_resource=debug,info"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub viewer: ViewerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Summary renderer executable
    #[serde(default = "default_viewer_program")]
    pub program: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            program: default_viewer_program(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_viewer_program() -> String {
    "junit-viewer".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl ResourceConfig {
    /// Load from a specific path
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("unable to read config '{}': {}", path.display(), e))?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from `path` if given, otherwise fall back to defaults
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::load_from(p),
            None => Ok(Self::default()),
        }
    }
}
