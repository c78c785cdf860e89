//! Baseline image resolution with ordered mirror fallback.
//!
//! A baseline spec is an ordered list of candidate sources, each either a
//! filesystem directory or a remote base URL. Resolution walks the list in
//! declared order and stops at the first candidate that yields the requested
//! image; a failing candidate (missing file, unreachable host, HTTP error)
//! only advances the loop. Exhausting every candidate is the only way to get
//! [`BaselineError::NotFound`], so a suite can point at redundant or
//! partially-available mirrors without one bad mirror failing the run.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Result type for baseline resolution
pub type BaselineResult<T> = Result<T, BaselineError>;

/// Errors raised while resolving a baseline image
#[derive(Debug)]
pub enum BaselineError {
    /// Every candidate source was tried and none produced the image
    NotFound {
        /// Baseline filename that was requested
        filename: String,
        /// Description of each attempted candidate
        attempts: Vec<String>,
    },

    /// I/O error outside of a per-candidate fetch (e.g. scratch dir creation)
    Io(std::io::Error),
}

impl std::fmt::Display for BaselineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BaselineError::NotFound { filename, attempts } => {
                write!(f, "Unable to find baseline image {}", filename)?;
                for attempt in attempts {
                    write!(f, "\n\t{}", attempt)?;
                }
                Ok(())
            }
            BaselineError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for BaselineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BaselineError::NotFound { .. } => None,
            BaselineError::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for BaselineError {
    fn from(err: std::io::Error) -> Self {
        BaselineError::Io(err)
    }
}

/// One candidate source for baseline images
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaselineSource {
    /// A local directory containing baseline images
    Local(PathBuf),

    /// A remote base URL; the filename is appended for the fetch
    Remote(String),
}

impl BaselineSource {
    /// Human-readable description used in failure messages
    pub fn describe(&self) -> String {
        match self {
            BaselineSource::Local(dir) => dir.display().to_string(),
            BaselineSource::Remote(url) => url.clone(),
        }
    }
}

/// Parse a comma-separated baseline spec into ordered sources.
///
/// Entries starting with `http://` or `https://` become remote sources,
/// everything else is a local directory. Empty entries are skipped.
pub fn parse_baseline_spec(spec: &str) -> Vec<BaselineSource> {
    spec.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            if entry.starts_with("http://") || entry.starts_with("https://") {
                BaselineSource::Remote(entry.to_string())
            } else {
                BaselineSource::Local(PathBuf::from(entry))
            }
        })
        .collect()
}

/// Resolve a baseline image by trying each source in order.
///
/// Local candidates succeed when `dir/filename` exists and the path is
/// returned as-is. Remote candidates are fetched into `scratch_dir` with a
/// finite per-candidate timeout; the file only appears under its final name
/// after a complete download. The first success wins.
pub fn resolve_baseline(
    sources: &[BaselineSource],
    filename: &str,
    scratch_dir: &Path,
    timeout_secs: u64,
) -> BaselineResult<PathBuf> {
    let mut attempts = Vec::new();

    for source in sources {
        match source {
            BaselineSource::Local(dir) => {
                let candidate = dir.join(filename);
                if candidate.is_file() {
                    return Ok(candidate);
                }
                attempts.push(format!("{} (no such file)", candidate.display()));
            }
            BaselineSource::Remote(base) => {
                let url = join_url(base, filename);
                let dest = scratch_dir.join(filename);
                match fetch_remote(&url, &dest, timeout_secs) {
                    Ok(()) => return Ok(dest),
                    Err(reason) => attempts.push(format!("{} ({})", url, reason)),
                }
            }
        }
    }

    Err(BaselineError::NotFound {
        filename: filename.to_string(),
        attempts,
    })
}

/// Join a remote base URL and a filename, inserting a slash when needed
fn join_url(base: &str, filename: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, filename)
    } else {
        format!("{}/{}", base, filename)
    }
}

/// Fetch one URL to `dest` with curl, one attempt, finite timeout.
///
/// Downloads into a temporary sibling file and renames on success, so a
/// killed fetch never leaves partial bytes at the final name. Returns a
/// short reason string on failure so the caller can move to the next mirror.
fn fetch_remote(url: &str, dest: &Path, timeout_secs: u64) -> Result<(), String> {
    if let Some(dir) = dest.parent() {
        fs::create_dir_all(dir).map_err(|e| format!("scratch dir: {}", e))?;
    }

    let tmp = dest.with_extension(format!("part.{}", std::process::id()));
    let timeout = timeout_secs.to_string();

    let output = Command::new("curl")
        .args([
            "-s",
            "-f", // HTTP errors (404 and friends) become a non-zero exit
            "-L",
            "-o",
            &tmp.to_string_lossy(),
            "--connect-timeout",
            &timeout,
            "--max-time",
            &timeout,
            url,
        ])
        .output()
        .map_err(|e| format!("failed to spawn curl: {}", e))?;

    if !output.status.success() {
        let _ = fs::remove_file(&tmp);
        return Err(match output.status.code() {
            Some(22) => "HTTP error".to_string(),
            Some(28) => "timed out".to_string(),
            Some(code) => format!("curl exit code {}", code),
            None => "curl terminated".to_string(),
        });
    }

    fs::rename(&tmp, dest).map_err(|e| format!("rename failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_baseline_spec_mixed() {
        let sources = parse_baseline_spec("http://example.org/base/,baseline, https://m2.example.org");
        assert_eq!(
            sources,
            vec![
                BaselineSource::Remote("http://example.org/base/".to_string()),
                BaselineSource::Local(PathBuf::from("baseline")),
                BaselineSource::Remote("https://m2.example.org".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_baseline_spec_skips_empty() {
        assert!(parse_baseline_spec("").is_empty());
        assert_eq!(parse_baseline_spec("a,,b").len(), 2);
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h/b/", "f.png"), "http://h/b/f.png");
        assert_eq!(join_url("http://h/b", "f.png"), "http://h/b/f.png");
    }

    #[test]
    fn test_local_fallback_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        std::fs::create_dir_all(&first).unwrap();
        std::fs::create_dir_all(&second).unwrap();
        std::fs::write(second.join("fig.png"), b"png").unwrap();

        let sources = vec![
            BaselineSource::Local(first),
            BaselineSource::Local(second.clone()),
        ];
        let resolved = resolve_baseline(&sources, "fig.png", dir.path(), 1).unwrap();
        assert_eq!(resolved, second.join("fig.png"));
    }

    #[test]
    fn test_exhaustion_reports_all_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let sources = vec![
            BaselineSource::Local(dir.path().join("missing_a")),
            BaselineSource::Local(dir.path().join("missing_b")),
        ];
        let err = resolve_baseline(&sources, "fig.png", dir.path(), 1).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("Unable to find baseline image fig.png"));
        assert!(text.contains("missing_a"));
        assert!(text.contains("missing_b"));
    }
}
