//! figcheck - Image-based regression testing for rendered figures.
//!
//! This crate provides:
//! - Content hashing and a persisted hash library for cheap comparisons
//! - Baseline resolution from local directories and remote mirrors
//! - Pixel comparison with an RMS tolerance and visual diff output
//! - A per-run result recorder with a fixed on-disk artifact layout
//! - Consolidated HTML/JSON summary reports
//! - A deterministic raster renderer for producing test figures
//!
//! # Example
//!
//! ```rust,no_run
//! use figcheck::config::CompareOptions;
//! use figcheck::runner::Runner;
//!
//! let options = CompareOptions::default()
//!     .baseline_spec("baseline")
//!     .results_dir("./results");
//! let mut runner = Runner::new(options).unwrap();
//! runner.compare_test("test.test_lines", "rendered/lines.png".as_ref()).unwrap();
//! let summary = runner.finalize().unwrap();
//! assert!(summary.overall_success());
//! ```

pub mod baseline;
pub mod config;
pub mod diff;
pub mod hashes;
pub mod render;
pub mod report;
pub mod runner;

// Re-export options and parse helpers
pub use config::{CompareOptions, SummaryFormat, default_tolerance};

// Re-export baseline resolution
pub use baseline::{BaselineError, BaselineSource, parse_baseline_spec, resolve_baseline};

// Re-export hashing
pub use hashes::{HashLibrary, HashLibraryError, compute_hash};

// Re-export comparison
pub use diff::{DiffError, PixelComparison, compare_files};

// Re-export the run engine and result types
pub use runner::{
    ComparisonResult, RunSummary, Runner, RunnerError, RunnerResult, TestStatus,
    artifact_dir_name,
};

// Re-export the deterministic renderer
pub use render::{Framebuffer, plot_series};
