//! # Result Cache
//!
//! Persistent mapping of fully-qualified candidate name -> resolution outcome.
//!
//! The cache is loaded once before a run, consulted and extended while the
//! workers run, and written back exactly once after every worker has
//! finished. Entries are never removed, so the file only grows across runs.
//!
//! On disk it is a plain JSON object:
//!
//! ```text
//! {
//!   "mail.example.com": true,
//!   "nope.example.com": false
//! }
//! ```
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

/// In-memory view of the persisted cache.
///
/// Keys are kept ordered so that the saved file is stable between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultCache {
    entries: BTreeMap<String, bool>,
}

/// Errors raised while loading or saving the cache.
///
/// A cache that exists but cannot be parsed is fatal: silently starting from
/// an empty cache would throw away the history of previous runs.
#[derive(Debug, thiserror::Error)]
pub enum CacheErrors {
    #[error("Couldn't read the cache file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("The cache file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Couldn't write the cache file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Couldn't serialize the cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the cache stored at `path`.
    ///
    /// Returns an empty cache if the file does not exist.
    ///
    /// # Errors
    /// - [`CacheErrors::Read`] if the file exists but can't be opened.
    /// - [`CacheErrors::Malformed`] if the content isn't a JSON object of booleans.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CacheErrors> {
        let path = path.as_ref();

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no cache file, starting empty");
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(CacheErrors::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let cache: ResultCache =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| {
                CacheErrors::Malformed {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        debug!(path = %path.display(), entries = cache.len(), "cache loaded");
        Ok(cache)
    }

    /// Serializes the full mapping to `path`, replacing any previous file.
    ///
    /// The content goes to a sibling `.tmp` file first and is renamed into
    /// place, so a crash mid-write leaves the old cache intact.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CacheErrors> {
        let path = path.as_ref();
        let write_err = |source| CacheErrors::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let saved = self
            .write_to(&tmp, path)
            .and_then(|()| fs::rename(&tmp, path).map_err(write_err));
        if saved.is_err() {
            fs::remove_file(&tmp).ok();
        }
        saved?;

        debug!(path = %path.display(), entries = self.len(), "cache saved");
        Ok(())
    }

    fn write_to(&self, tmp: &Path, path: &Path) -> Result<(), CacheErrors> {
        let write_err = |source| CacheErrors::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = BufWriter::new(File::create(tmp).map_err(write_err)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n").map_err(write_err)?;
        writer.flush().map_err(write_err)
    }

    /// Cached outcome for `fqc`, if it was tested before.
    pub fn get(&self, fqc: &str) -> Option<bool> {
        self.entries.get(fqc).copied()
    }

    pub fn contains(&self, fqc: &str) -> bool {
        self.entries.contains_key(fqc)
    }

    /// Records the outcome for `fqc`, returning the previous one if any.
    pub fn insert(&mut self, fqc: impl Into<String>, resolved: bool) -> Option<bool> {
        self.entries.insert(fqc.into(), resolved)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries that resolved.
    pub fn resolved_count(&self) -> usize {
        self.entries.values().filter(|r| **r).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, bool)> for ResultCache {
    fn from_iter<T: IntoIterator<Item = (String, bool)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::load(dir.path().join("cache.json")).unwrap();

        assert!(cache.is_empty());
    }

    #[test]
    fn test_save_then_load_reproduces_mapping() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = ResultCache::new();
        cache.insert("www.example.com", true);
        cache.insert("mail.example.com", true);
        cache.insert("nope.example.com", false);
        cache.save(&path).unwrap();

        let loaded = ResultCache::load(&path).unwrap();
        assert_eq!(loaded, cache);
        assert_eq!(loaded.get("nope.example.com"), Some(false));
        assert_eq!(loaded.resolved_count(), 2);
        assert!(!dir.path().join("cache.json.tmp").exists());
    }

    #[test]
    fn test_save_overwrites_and_creates_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let mut cache = ResultCache::new();
        cache.insert("a.example.com", true);
        cache.save(&path).unwrap();

        let smaller: ResultCache = [("b.example.com".to_string(), false)].into_iter().collect();
        smaller.save(&path).unwrap();

        assert_eq!(ResultCache::load(&path).unwrap(), smaller);
    }

    #[test]
    fn test_saved_file_is_plain_json_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = ResultCache::new();
        cache.insert("www.example.com", true);
        cache.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "www.example.com": true }));
    }

    #[test]
    fn test_load_malformed_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ \"www.example.com\": tru").unwrap();

        let res = ResultCache::load(&path);
        assert!(matches!(res, Err(CacheErrors::Malformed { .. })));
    }

    #[test]
    fn test_load_wrong_shape_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ \"www.example.com\": \"yes\" }").unwrap();

        assert!(matches!(
            ResultCache::load(&path),
            Err(CacheErrors::Malformed { .. })
        ));
    }

    #[test]
    fn test_insert_never_drops_entries() {
        let mut cache = ResultCache::new();

        assert_eq!(cache.insert("x.example.com", false), None);
        assert_eq!(cache.insert("x.example.com", true), Some(false));
        assert!(cache.contains("x.example.com"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.iter().collect::<Vec<_>>(), vec![("x.example.com", true)]);
    }

    #[test]
    fn test_failed_save_removes_temporary_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::create_dir(&path).unwrap();

        let mut cache = ResultCache::new();
        cache.insert("www.example.com", true);

        let res = cache.save(&path);

        assert!(matches!(res, Err(CacheErrors::Write { .. })));
        assert!(!dir.path().join("cache.json.tmp").exists());
        assert!(path.is_dir());
    }
}
