//! Pipeline resource for timestamped test result archives.
//!
//! - `check` lists versions at or after the last one seen
//! - `in` downloads a bounded window ending at a version and prints summaries
//! - `out` uploads a results file as a new version

pub mod check;
pub mod error;
pub mod fetch;
pub mod publish;
pub mod viewer;

pub use check::{resolve_check, Checker};
pub use error::{ResourceError, Result};
pub use fetch::{effective_limit, FetchWindow, Fetcher};
pub use publish::Publisher;
pub use viewer::{JunitCli, SummaryError, SummaryViewer, SUPPORTED_KINDS};
