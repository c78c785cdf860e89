//! Per-run comparison options.
//!
//! All knobs the engine consumes are collected into a single immutable
//! [`CompareOptions`] bag, resolved once before comparisons begin and passed
//! explicitly into the run engine. There is no ambient/global configuration
//! lookup; the CLI binary maps its arguments and environment variables onto
//! this struct.

use std::path::PathBuf;

use crate::baseline::{BaselineSource, parse_baseline_spec};

// ============================================================================
// Default Values
// ============================================================================

/// Default RMS tolerance for pixel comparison
pub const DEFAULT_TOLERANCE: f64 = 2.0;

/// RMS tolerance used on Windows, where font rendering differs noticeably
pub const DEFAULT_TOLERANCE_WINDOWS: f64 = 10.0;

/// Default root directory for per-test result artifacts
pub const DEFAULT_RESULTS_DIR: &str = "./figcheck_results";

/// Default connect timeout for a remote baseline fetch (seconds)
pub const DEFAULT_FETCH_TIMEOUT: u64 = 30;

/// The tolerance used when none is configured.
///
/// Windows hosts get a wider default to absorb platform font-rendering
/// variance in text-heavy figures.
pub fn default_tolerance() -> f64 {
    if cfg!(windows) {
        DEFAULT_TOLERANCE_WINDOWS
    } else {
        DEFAULT_TOLERANCE
    }
}

// ============================================================================
// Summary format
// ============================================================================

/// Which summary documents to emit at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SummaryFormat {
    /// Emit `fig_comparison.html`
    pub html: bool,
    /// Emit `fig_comparison.json`
    pub json: bool,
}

impl SummaryFormat {
    /// No summary documents at all
    pub const NONE: SummaryFormat = SummaryFormat { html: false, json: false };

    /// True if any summary document was requested
    pub fn any(&self) -> bool {
        self.html || self.json
    }
}

/// Parse a summary format selector such as "html", "json" or "html,json"
pub fn parse_summary_format(spec: &str) -> Option<SummaryFormat> {
    let mut format = SummaryFormat::default();
    for part in spec.split(',') {
        match part.trim().to_lowercase().as_str() {
            "" => {}
            "html" => format.html = true,
            "json" => format.json = true,
            _ => return None,
        }
    }
    Some(format)
}

// ============================================================================
// Options bag
// ============================================================================

/// Immutable options consumed by the run engine
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Ordered baseline sources; the first candidate that yields an image wins
    pub baseline: Vec<BaselineSource>,

    /// Baseline filename override (default: last test-id segment + ".png")
    pub filename: Option<String>,

    /// Maximum allowed RMS deviation for an image comparison to match
    pub tolerance: f64,

    /// Hash library to verify computed hashes against
    pub hash_library: Option<PathBuf>,

    /// Directory to write rendered images into (image generation mode)
    pub generate_dir: Option<PathBuf>,

    /// Path to write a freshly generated hash library to at end of run
    pub generate_hash_library: Option<PathBuf>,

    /// Root directory for per-test result artifacts and summary documents
    pub results_dir: PathBuf,

    /// Persist result artifacts for passing tests too
    pub results_always: bool,

    /// Summary documents to emit at finalize
    pub summary: SummaryFormat,

    /// Per-candidate timeout for remote baseline fetches (seconds)
    pub fetch_timeout: u64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            baseline: Vec::new(),
            filename: None,
            tolerance: default_tolerance(),
            hash_library: None,
            generate_dir: None,
            generate_hash_library: None,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            results_always: false,
            summary: SummaryFormat::NONE,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl CompareOptions {
    /// Set baseline sources from a comma-separated spec of directories and URLs
    pub fn baseline_spec(mut self, spec: &str) -> Self {
        self.baseline = parse_baseline_spec(spec);
        self
    }

    /// Override the baseline filename
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the RMS tolerance
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Verify against a hash library
    pub fn hash_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.hash_library = Some(path.into());
        self
    }

    /// Write rendered images into a generation directory
    pub fn generate_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.generate_dir = Some(path.into());
        self
    }

    /// Generate a hash library at the given path
    pub fn generate_hash_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.generate_hash_library = Some(path.into());
        self
    }

    /// Set the results root directory
    pub fn results_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_dir = path.into();
        self
    }

    /// Persist artifacts for passing tests too
    pub fn results_always(mut self, always: bool) -> Self {
        self.results_always = always;
        self
    }

    /// Select summary documents
    pub fn summary(mut self, format: SummaryFormat) -> Self {
        self.summary = format;
        self
    }

    /// Set the per-candidate remote fetch timeout
    pub fn fetch_timeout(mut self, seconds: u64) -> Self {
        self.fetch_timeout = seconds;
        self
    }

    /// Check the bag for values the engine cannot run with.
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            ));
        }
        if let Some(name) = &self.filename {
            if name.is_empty() {
                return Err("baseline filename override is empty".to_string());
            }
            if name.contains('/') || name.contains('\\') {
                return Err(format!(
                    "baseline filename must not contain path separators: {:?}",
                    name
                ));
            }
        }
        if self.fetch_timeout == 0 {
            return Err("remote fetch timeout must be at least one second".to_string());
        }
        Ok(())
    }

    /// True if any comparison (hash or image) is configured
    pub fn any_check_configured(&self) -> bool {
        self.hash_library.is_some() || !self.baseline.is_empty()
    }
}

/// Baseline filename for a test id: the last dot-separated segment + ".png"
pub fn default_filename(test_id: &str) -> String {
    let last = test_id
        .rsplit(['.', ':'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(test_id);
    format!("{}.png", last)
}
