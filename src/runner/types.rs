//! Types for per-test comparison outcomes and the run summary.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::hashes::HashLibraryError;

/// Final verdict for one test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Every configured check passed
    Passed,

    /// A configured hash or image check failed
    Failed,

    /// A required baseline or hash entry was missing, or no check could run
    Error,
}

impl TestStatus {
    /// Lowercase word used in the summary documents
    pub fn label(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Structured outcome of one test comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Test identifier (also names the artifact subdirectory, dot-joined)
    pub test_id: String,

    /// Final verdict
    pub status: TestStatus,

    /// Whether a hash comparison was configured and executed
    pub hash_checked: bool,

    /// Hash verdict; `None` when no hash comparison ran
    pub hash_matched: Option<bool>,

    /// Whether a pixel comparison was executed
    pub image_checked: bool,

    /// Pixel verdict; `None` when no pixel comparison ran
    pub image_matched: Option<bool>,

    /// Whether a baseline image was located for this test
    pub baseline_found: bool,

    /// RMS deviation of the pixel comparison, when one ran to completion
    pub rms: Option<f64>,

    /// Discriminated failure description; `None` on a clean pass
    pub message: Option<String>,
}

impl ComparisonResult {
    /// Start a record for a test with nothing checked yet
    pub fn new(test_id: impl Into<String>) -> Self {
        Self {
            test_id: test_id.into(),
            status: TestStatus::Passed,
            hash_checked: false,
            hash_matched: None,
            image_checked: false,
            image_matched: None,
            baseline_found: false,
            rms: None,
            message: None,
        }
    }

    /// Append a line to the failure message
    pub fn push_message(&mut self, text: &str) {
        match &mut self.message {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(text);
            }
            None => self.message = Some(text.to_string()),
        }
    }
}

/// Aggregated outcomes for a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Root directory holding per-test artifact subdirectories
    pub results_dir: PathBuf,

    /// Per-test outcomes in execution order
    pub results: Vec<ComparisonResult>,
}

impl RunSummary {
    /// Create an empty summary rooted at a results directory
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
            results: Vec::new(),
        }
    }

    /// True when no test failed or errored.
    ///
    /// The host process must exit non-zero whenever this is false.
    pub fn overall_success(&self) -> bool {
        self.results
            .iter()
            .all(|r| r.status == TestStatus::Passed)
    }

    /// Number of tests with the given status
    pub fn count(&self, status: TestStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// Result type for run engine operations
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Fatal errors that abort the run before or outside per-test comparison.
///
/// Recoverable conditions (missing baseline, missing hash entry, pixel or
/// hash mismatch) never appear here; they are resolved into a per-test
/// [`ComparisonResult`] instead.
#[derive(Debug)]
pub enum RunnerError {
    /// Malformed options bag
    Config(String),

    /// Hash library missing or corrupt
    HashLibrary(HashLibraryError),

    /// I/O error while persisting artifacts or summaries
    Io(std::io::Error),
}

impl std::fmt::Display for RunnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunnerError::Config(msg) => write!(f, "Configuration error: {}", msg),
            RunnerError::HashLibrary(err) => write!(f, "{}", err),
            RunnerError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for RunnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunnerError::Config(_) => None,
            RunnerError::HashLibrary(err) => Some(err),
            RunnerError::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for RunnerError {
    fn from(err: std::io::Error) -> Self {
        RunnerError::Io(err)
    }
}

impl From<HashLibraryError> for RunnerError {
    fn from(err: HashLibraryError) -> Self {
        RunnerError::HashLibrary(err)
    }
}
