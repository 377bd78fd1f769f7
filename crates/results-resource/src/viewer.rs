//! Summary rendering via the external `junit-viewer` CLI.
//!
//! The viewer reads every `.xml` file in the results directory and prints a
//! report. It runs once per requested summary, after all downloads finish.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use results_core::Summary;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Summary kinds the viewer understands
pub const SUPPORTED_KINDS: &[&str] = &["pass-fail", "frequent-failures"];

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("found no .xml files in results dir '{}'", .dir.display())]
    NoResultsFound { dir: PathBuf },

    #[error("unsupported summary type '{0}' (expected one of: {kinds})", kinds = SUPPORTED_KINDS.join(", "))]
    UnsupportedKind(String),

    #[error("failed to print '{kind}' summary: {reason}")]
    Failed { kind: String, reason: String },
}

/// Renders one summary over the archives in a results directory
#[async_trait]
pub trait SummaryViewer: Send + Sync {
    async fn print_summary(
        &self,
        summary: &Summary,
        results_dir: &Path,
    ) -> Result<(), SummaryError>;
}

/// [`SummaryViewer`] backed by the junit-viewer executable.
pub struct JunitCli {
    program: String,
    output: Mutex<Box<dyn Write + Send>>,
}

impl JunitCli {
    /// Viewer whose report goes to stderr (stdout carries the JSON response)
    pub fn new(program: impl Into<String>) -> Self {
        Self::with_output(program, std::io::stderr())
    }

    pub fn with_output(program: impl Into<String>, output: impl Write + Send + 'static) -> Self {
        Self {
            program: program.into(),
            output: Mutex::new(Box::new(output)),
        }
    }

    fn forward(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut out = self
            .output
            .lock()
            .map_err(|_| std::io::Error::other("viewer output lock poisoned"))?;
        out.write_all(bytes)?;
        out.flush()
    }
}

/// `.xml` files directly inside `dir`, sorted by path.
async fn find_result_files(dir: &Path) -> Result<Vec<PathBuf>, SummaryError> {
    let no_results = || SummaryError::NoResultsFound {
        dir: dir.to_path_buf(),
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(|_| no_results())?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|_| no_results())? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "xml") {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(no_results());
    }
    files.sort();
    Ok(files)
}

#[async_trait]
impl SummaryViewer for JunitCli {
    #[instrument(skip(self), fields(program = %self.program))]
    async fn print_summary(
        &self,
        summary: &Summary,
        results_dir: &Path,
    ) -> Result<(), SummaryError> {
        if !SUPPORTED_KINDS.contains(&summary.kind.as_str()) {
            return Err(SummaryError::UnsupportedKind(summary.kind.clone()));
        }

        let files = find_result_files(results_dir).await?;
        debug!(files = files.len(), "rendering summary");

        let failed = |reason: String| SummaryError::Failed {
            kind: summary.kind.clone(),
            reason,
        };

        let output = Command::new(&self.program)
            .arg("-o")
            .arg(&summary.kind)
            .arg("-l")
            .arg(summary.limit.to_string())
            .args(&files)
            .output()
            .await
            .map_err(|e| failed(format!("unable to run '{}': {}", self.program, e)))?;

        self.forward(&output.stdout)
            .and_then(|_| self.forward(&output.stderr))
            .map_err(|e| failed(format!("unable to write viewer output: {}", e)))?;

        if !output.status.success() {
            return Err(failed(format!("{} exited with {}", self.program, output.status)));
        }
        Ok(())
    }
}
