//! Errors surfaced by check, in and out.
//!
//! Nothing here is retried; every variant aborts the current invocation.

use std::path::PathBuf;

use results_core::KeyError;
use results_store::StoreError;
use thiserror::Error;

use crate::viewer::SummaryError;

pub type Result<T> = std::result::Result<T, ResourceError>;

#[derive(Debug, Error)]
pub enum ResourceError {
    /// Malformed key or version marker
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    /// Local filesystem failure
    #[error("{action} '{}': {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Summary(#[from] SummaryError),
}

impl ResourceError {
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
