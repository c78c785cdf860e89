//! The run engine: executes configured comparisons for each test, records
//! artifacts under a fixed layout, and finalizes the run summary.
//!
//! Per test the engine owns a subdirectory of the results root named after
//! the dot-joined test identifier, holding up to three fixed-named files:
//! `result.png` for any executed comparison, `baseline.png` when a baseline
//! was located, and `result-failed-diff.png` only when a pixel comparison
//! ran and failed. The presence of each file itself communicates which stage
//! ran, and the summary report links the fixed names whether or not they
//! exist.

pub mod types;

pub use types::{ComparisonResult, RunSummary, RunnerError, RunnerResult, TestStatus};

use std::fs;
use std::path::Path;

use crate::baseline::{BaselineError, resolve_baseline};
use crate::config::{CompareOptions, default_filename};
use crate::diff::compare_files;
use crate::hashes::{HashLibrary, HashLibraryError, compute_hash};
use crate::report;

/// Artifact filename for the rendered test output
pub const RESULT_IMAGE: &str = "result.png";

/// Artifact filename for the located baseline image
pub const BASELINE_IMAGE: &str = "baseline.png";

/// Artifact filename for the visual diff of a failed pixel comparison
pub const DIFF_IMAGE: &str = "result-failed-diff.png";

/// Map a test identifier to its artifact directory name: path separators and
/// `::` become dots, so `suite::module::test_a` and `suite/module/test_a`
/// both land in `suite.module.test_a`.
pub fn artifact_dir_name(test_id: &str) -> String {
    test_id.replace("::", ".").replace(['/', '\\'], ".")
}

/// Drives every configured comparison for a run.
///
/// Holds the loaded hash library and the accumulating summary; created once
/// per run, fed one test at a time, finalized once at the end. Recoverable
/// per-test conditions never abort the run.
#[derive(Debug)]
pub struct Runner {
    options: CompareOptions,
    hash_library: Option<HashLibrary>,
    generated: HashLibrary,
    summary: RunSummary,
}

impl Runner {
    /// Validate the options bag and load the hash library when configured.
    ///
    /// A missing hash library file is fatal unless a generate-hash path is
    /// active (the library is about to be created); a corrupt library is
    /// always fatal.
    pub fn new(options: CompareOptions) -> RunnerResult<Self> {
        options.validate().map_err(RunnerError::Config)?;

        let hash_library = match &options.hash_library {
            Some(path) => match HashLibrary::load(path) {
                Ok(lib) => Some(lib),
                Err(HashLibraryError::NotFound(_))
                    if options.generate_hash_library.is_some() =>
                {
                    None
                }
                Err(err) => return Err(err.into()),
            },
            None => None,
        };

        let summary = RunSummary::new(options.results_dir.clone());

        Ok(Self {
            options,
            hash_library,
            generated: HashLibrary::new(),
            summary,
        })
    }

    /// The options this run was configured with
    pub fn options(&self) -> &CompareOptions {
        &self.options
    }

    /// Run every configured check for one rendered test image and record the
    /// outcome. Returns the recorded result.
    pub fn compare_test(
        &mut self,
        test_id: &str,
        image_path: &Path,
    ) -> RunnerResult<&ComparisonResult> {
        let record = self.run_one(test_id, image_path)?;
        self.summary.results.push(record);
        Ok(self.summary.results.last().expect("just pushed"))
    }

    fn run_one(&mut self, test_id: &str, image_path: &Path) -> RunnerResult<ComparisonResult> {
        let mut record = ComparisonResult::new(test_id);
        let test_dir = self.options.results_dir.join(artifact_dir_name(test_id));
        fs::create_dir_all(&test_dir)?;

        let image_bytes = match fs::read(image_path) {
            Ok(bytes) => bytes,
            Err(err) => {
                record.status = TestStatus::Error;
                record.push_message(&format!(
                    "Unable to read result image {}: {}",
                    image_path.display(),
                    err
                ));
                self.cleanup_on_pass(&record, &test_dir);
                return Ok(record);
            }
        };

        // The result artifact is written once the rendered bytes are fully
        // in hand, never streamed.
        let result_artifact = test_dir.join(RESULT_IMAGE);
        fs::write(&result_artifact, &image_bytes)?;

        let filename = self
            .options
            .filename
            .clone()
            .unwrap_or_else(|| default_filename(test_id));

        if let Some(gen_dir) = self.options.generate_dir.clone() {
            fs::create_dir_all(&gen_dir)?;
            fs::write(gen_dir.join(&filename), &image_bytes)?;
        }

        let generating_hashes = self.options.generate_hash_library.is_some();
        if generating_hashes {
            self.generated.insert(test_id, compute_hash(&image_bytes));
        }

        // Image generation replaces the image comparison: with a generate
        // directory active there is nothing to compare against yet.
        let image_configured =
            !self.options.baseline.is_empty() && self.options.generate_dir.is_none();

        if let Some(library) = self.hash_library.as_ref() {
            self.check_hash(&mut record, test_id, &image_bytes, library);

            // Hybrid: the image step is skipped on a hash pass, except that a
            // hash failure (or results-always mode) triggers a secondary
            // comparison whose outcome only ever annotates the record.
            let hash_passed = record.hash_matched == Some(true);
            if image_configured && (!hash_passed || self.options.results_always) {
                self.check_image(&mut record, &result_artifact, &test_dir, &filename, false);
            }
        } else if image_configured {
            self.check_image(&mut record, &result_artifact, &test_dir, &filename, true);
        } else if self.options.generate_dir.is_none() && !generating_hashes {
            record.status = TestStatus::Error;
            record.push_message(
                "No baseline available for comparison test: no baseline image source, \
                 hash library, or generation path configured.",
            );
        }

        // Hash-library generation signals "library was just created, nothing
        // was verified" by failing the test; a real check failure is never
        // masked by it.
        if generating_hashes && record.status == TestStatus::Passed {
            record.status = TestStatus::Failed;
            record.push_message(&format!(
                "Hash library will be generated at {}; no existing hash was verified for this run.",
                self.options
                    .generate_hash_library
                    .as_ref()
                    .expect("generation path set")
                    .display()
            ));
        }

        self.cleanup_on_pass(&record, &test_dir);
        Ok(record)
    }

    /// Compare the computed content hash against the loaded library
    fn check_hash(
        &self,
        record: &mut ComparisonResult,
        test_id: &str,
        image_bytes: &[u8],
        library: &HashLibrary,
    ) {
        let library_path = self
            .options
            .hash_library
            .as_ref()
            .expect("hash check requires a library path");

        record.hash_checked = true;
        let computed = compute_hash(image_bytes);

        match library.lookup(test_id) {
            None => {
                record.status = TestStatus::Error;
                record.push_message(&format!(
                    "Hash for test '{}' not found in {}",
                    test_id,
                    library_path.display()
                ));
            }
            Some(expected) if expected == computed => {
                record.hash_matched = Some(true);
            }
            Some(expected) => {
                record.hash_matched = Some(false);
                record.status = TestStatus::Failed;
                record.push_message(&format!(
                    "Hash {} doesn't match hash {} in library {} for test {}.",
                    computed,
                    expected,
                    library_path.display(),
                    test_id
                ));
            }
        }
    }

    /// Resolve the baseline and run the pixel comparison.
    ///
    /// With `authoritative` set the image verdict decides the test status;
    /// otherwise (hybrid secondary comparison) the existing hash verdict
    /// stands and the outcome only enriches the failure message.
    fn check_image(
        &self,
        record: &mut ComparisonResult,
        result_artifact: &Path,
        test_dir: &Path,
        filename: &str,
        authoritative: bool,
    ) {
        // Only a hash failure wants its message enriched; the results-always
        // diagnostic for a passing hash stays silent.
        let annotate = authoritative || record.status != TestStatus::Passed;

        let resolved = resolve_baseline(
            &self.options.baseline,
            filename,
            test_dir,
            self.options.fetch_timeout,
        );

        let baseline_path = match resolved {
            Ok(path) => path,
            Err(BaselineError::NotFound { .. }) => {
                record.baseline_found = false;
                if authoritative {
                    record.status = TestStatus::Error;
                    let sources: Vec<String> = self
                        .options
                        .baseline
                        .iter()
                        .map(|s| s.describe())
                        .collect();
                    record.push_message(&format!(
                        "Image file not found for comparison test in:\n\t{}\n(This is expected for new tests.)\nGenerated Image:\n\t{}",
                        sources.join("\n\t"),
                        result_artifact.display()
                    ));
                } else if annotate {
                    record.push_message(&format!("Unable to find baseline image {}", filename));
                }
                return;
            }
            Err(err) => {
                record.baseline_found = false;
                if authoritative {
                    record.status = TestStatus::Error;
                }
                if annotate {
                    record.push_message(&err.to_string());
                }
                return;
            }
        };

        record.baseline_found = true;
        let baseline_artifact = test_dir.join(BASELINE_IMAGE);
        if baseline_path != baseline_artifact {
            // Read fully before writing so the fixed-named artifact never
            // holds partial bytes.
            let copied = fs::read(&baseline_path)
                .and_then(|bytes| fs::write(&baseline_artifact, bytes));
            if copied.is_err() {
                record.baseline_found = false;
                if authoritative {
                    record.status = TestStatus::Error;
                }
                if annotate {
                    record.push_message(&format!("Unable to find baseline image {}", filename));
                }
                return;
            }
            // A remote fetch lands in the test directory under the baseline
            // filename; only the fixed-named copy is kept.
            if baseline_path.starts_with(test_dir) {
                let _ = fs::remove_file(&baseline_path);
            }
        }

        match compare_files(result_artifact, &baseline_artifact, self.options.tolerance) {
            Ok(cmp) => {
                record.image_checked = true;
                record.image_matched = Some(cmp.matched);
                record.rms = cmp.rms;

                if cmp.matched {
                    if !authoritative && annotate {
                        record.push_message(
                            "However, the comparison to the baseline image succeeded.",
                        );
                    }
                } else {
                    if let Some(diff) = &cmp.diff_image {
                        let _ = fs::write(test_dir.join(DIFF_IMAGE), diff);
                    }
                    if authoritative {
                        record.status = TestStatus::Failed;
                    }
                    if annotate {
                        record.push_message(&cmp.message);
                    }
                }
            }
            Err(err) => {
                if authoritative {
                    record.status = TestStatus::Error;
                }
                if annotate {
                    record.push_message(&err.to_string());
                }
            }
        }
    }

    /// Passing tests leave no artifacts behind unless results-always is set
    fn cleanup_on_pass(&self, record: &ComparisonResult, test_dir: &Path) {
        if record.status == TestStatus::Passed && !self.options.results_always {
            let _ = fs::remove_dir_all(test_dir);
        }
    }

    /// Finish the run: write the generated hash library (atomic, merged over
    /// any existing document at the target path) and the requested summary
    /// documents. Consumes the runner and hands the summary to the caller.
    pub fn finalize(self) -> RunnerResult<RunSummary> {
        if let Some(path) = &self.options.generate_hash_library {
            let mut library = match HashLibrary::load(path) {
                Ok(existing) => existing,
                Err(HashLibraryError::NotFound(_)) => HashLibrary::new(),
                Err(err) => return Err(err.into()),
            };
            library.merge(&self.generated);
            library.write_atomic(path)?;
        }

        if self.options.summary.any() {
            fs::create_dir_all(&self.summary.results_dir)?;
            let written = report::write_summary(&self.summary, self.options.summary)?;
            if let Some(html_path) = written.html {
                println!(
                    "A summary of the failed tests can be found at: {}",
                    html_path.display()
                );
            }
        }

        Ok(self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompareOptions;
    use crate::render::plot_series;
    use std::path::PathBuf;

    fn render_to(dir: &Path, name: &str, series: &[f64]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, plot_series(series).to_png().unwrap()).unwrap();
        path
    }

    #[test]
    fn test_artifact_dir_name() {
        assert_eq!(artifact_dir_name("test.test_a"), "test.test_a");
        assert_eq!(artifact_dir_name("suite::mod::test_a"), "suite.mod.test_a");
        assert_eq!(artifact_dir_name("a/b\\c"), "a.b.c");
    }

    #[test]
    fn test_no_checks_and_no_generation_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let image = render_to(dir.path(), "fig.png", &[1.0, 2.0, 3.0]);

        let options = CompareOptions::default().results_dir(dir.path().join("results"));
        let mut runner = Runner::new(options).unwrap();
        let record = runner.compare_test("test.test_noop", &image).unwrap();

        assert_eq!(record.status, TestStatus::Error);
        assert!(record.message.as_ref().unwrap().contains("No baseline available"));
    }

    #[test]
    fn test_image_generation_alone_passes() {
        let dir = tempfile::tempdir().unwrap();
        let image = render_to(dir.path(), "fig.png", &[1.0, 2.0, 3.0]);
        let gen_dir = dir.path().join("gen");

        let options = CompareOptions::default()
            .results_dir(dir.path().join("results"))
            .generate_dir(&gen_dir);
        let mut runner = Runner::new(options).unwrap();
        let record = runner.compare_test("test.test_gen", &image).unwrap();

        assert_eq!(record.status, TestStatus::Passed);
        assert!(gen_dir.join("test_gen.png").is_file());
    }

    #[test]
    fn test_hash_generation_alone_fails_but_writes_library() {
        let dir = tempfile::tempdir().unwrap();
        let image = render_to(dir.path(), "fig.png", &[1.0, 2.0, 3.0]);
        let library_path = dir.path().join("spam").join("hashes.json");

        let options = CompareOptions::default()
            .results_dir(dir.path().join("results"))
            .generate_hash_library(&library_path);
        let mut runner = Runner::new(options).unwrap();
        let record = runner.compare_test("test.test_gen", &image).unwrap();
        assert_eq!(record.status, TestStatus::Failed);

        let summary = runner.finalize().unwrap();
        assert!(!summary.overall_success());
        let library = HashLibrary::load(&library_path).unwrap();
        assert!(library.lookup("test.test_gen").is_some());
    }

    #[test]
    fn test_missing_result_image_is_error_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let options = CompareOptions::default()
            .baseline_spec(dir.path().join("baseline").to_str().unwrap())
            .results_dir(dir.path().join("results"));
        let mut runner = Runner::new(options).unwrap();

        let record = runner
            .compare_test("test.test_unreadable", &dir.path().join("missing.png"))
            .unwrap();
        assert_eq!(record.status, TestStatus::Error);
        assert!(record.message.as_ref().unwrap().contains("Unable to read result image"));
    }
}
