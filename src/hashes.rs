//! Content hashing and the persisted hash library.
//!
//! A hash library is a single JSON object mapping test identifiers to
//! lowercase hex SHA-256 hashes of their expected rendered output. The file
//! is human-diffable and is always replaced as a whole document: writes go
//! to a temporary file in the same directory which is then renamed over the
//! target, so an interrupted run can never leave a truncated library behind.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Result type for hash library operations
pub type HashResult<T> = Result<T, HashLibraryError>;

/// Errors raised when loading or writing a hash library
#[derive(Debug)]
pub enum HashLibraryError {
    /// The library file does not exist
    NotFound(PathBuf),

    /// The library file exists but is not a valid JSON string map
    Corrupt(PathBuf, serde_json::Error),

    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for HashLibraryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashLibraryError::NotFound(path) => {
                write!(f, "Can't find hash library at path {}", path.display())
            }
            HashLibraryError::Corrupt(path, err) => {
                write!(f, "Corrupt hash library at {}: {}", path.display(), err)
            }
            HashLibraryError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for HashLibraryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HashLibraryError::NotFound(_) => None,
            HashLibraryError::Corrupt(_, err) => Some(err),
            HashLibraryError::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for HashLibraryError {
    fn from(err: std::io::Error) -> Self {
        HashLibraryError::Io(err)
    }
}

/// Compute the content hash of an encoded image: lowercase hex SHA-256.
///
/// Deterministic for identical bytes; used as a cheap stand-in for a full
/// pixel comparison.
pub fn compute_hash(image_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image_bytes);
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

/// An ordered mapping of test identifier to expected content hash
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashLibrary {
    entries: BTreeMap<String, String>,
}

impl HashLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a library from a JSON file.
    ///
    /// Fails with [`HashLibraryError::NotFound`] if the file does not exist
    /// and with [`HashLibraryError::Corrupt`] on malformed content. A corrupt
    /// library is fatal to the run since every subsequent lookup would be
    /// meaningless.
    pub fn load(path: &Path) -> HashResult<Self> {
        if !path.is_file() {
            return Err(HashLibraryError::NotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&raw)
            .map_err(|err| HashLibraryError::Corrupt(path.to_path_buf(), err))?;
        Ok(Self { entries })
    }

    /// Look up the expected hash for a test.
    ///
    /// `None` means "library present but test absent", which callers report
    /// differently from a missing library file.
    pub fn lookup(&self, test_id: &str) -> Option<&str> {
        self.entries.get(test_id).map(String::as_str)
    }

    /// Record a hash for a test, replacing any previous entry
    pub fn insert(&mut self, test_id: impl Into<String>, hash: impl Into<String>) {
        self.entries.insert(test_id.into(), hash.into());
    }

    /// Merge another library into this one; entries in `other` win
    pub fn merge(&mut self, other: &HashLibrary) {
        for (id, hash) in &other.entries {
            self.entries.insert(id.clone(), hash.clone());
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the library holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the library as pretty-printed JSON with an atomic whole-file
    /// replace: temp file in the target directory, then rename.
    pub fn write_atomic(&self, path: &Path) -> HashResult<()> {
        let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = parent {
            fs::create_dir_all(dir)?;
        }
        let document = serde_json::to_string_pretty(&self.entries)
            .map_err(|err| HashLibraryError::Corrupt(path.to_path_buf(), err))?;

        let mut tmp = path.to_path_buf();
        let tmp_name = format!(
            "{}.tmp.{}",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "hashes.json".to_string()),
            std::process::id()
        );
        tmp.set_file_name(tmp_name);

        fs::write(&tmp, document)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_hash_deterministic() {
        let a = compute_hash(b"figure bytes");
        let b = compute_hash(b"figure bytes");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_compute_hash_distinct_inputs() {
        assert_ne!(compute_hash(b"one"), compute_hash(b"two"));
    }

    #[test]
    fn test_lookup_distinguishes_missing_entry() {
        let mut lib = HashLibrary::new();
        lib.insert("test.test_a", "abc123");
        assert_eq!(lib.lookup("test.test_a"), Some("abc123"));
        assert_eq!(lib.lookup("test.test_b"), None);
    }

    #[test]
    fn test_merge_overrides_by_id() {
        let mut base = HashLibrary::new();
        base.insert("test.test_a", "old");
        base.insert("test.test_b", "keep");

        let mut update = HashLibrary::new();
        update.insert("test.test_a", "new");

        base.merge(&update);
        assert_eq!(base.lookup("test.test_a"), Some("new"));
        assert_eq!(base.lookup("test.test_b"), Some("keep"));
    }

    #[test]
    fn test_write_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hashes.json");

        let mut lib = HashLibrary::new();
        lib.insert("test.test_gen", compute_hash(b"png"));
        lib.write_atomic(&path).unwrap();

        let loaded = HashLibrary::load(&path).unwrap();
        assert_eq!(loaded, lib);

        // No temp file left behind
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_load_missing_reports_path() {
        let err = HashLibrary::load(Path::new("/not/a/path.json")).unwrap_err();
        assert!(err.to_string().contains("Can't find hash library at path"));
    }

    #[test]
    fn test_load_corrupt_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            HashLibrary::load(&path),
            Err(HashLibraryError::Corrupt(_, _))
        ));
    }
}
