//! Durable response store backing continual mode.

use super::key::RequestKey;
use crate::Result;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Whether the cache started empty or was resumed from a prior run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Start,
    Resume,
}

/// Process-wide map from request identity to a previously produced answer,
/// persisted as a single JSON object on disk.
///
/// Writes are write-through: every [`store`](ResponseCache::store) rewrites
/// the whole file. A crash mid-write can corrupt the persisted file; that is
/// an accepted risk of the single-writer design (continual mode is refused
/// under multi-process execution for the same reason).
#[derive(Debug)]
pub struct ResponseCache {
    path: PathBuf,
    entries: HashMap<String, String>,
    mode: CacheMode,
}

impl ResponseCache {
    /// Open the cache at `path`. If the file exists its full contents are
    /// loaded into memory (resume mode); otherwise the cache starts empty.
    /// The parent directory is created if absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let entries: HashMap<String, String> = serde_json::from_str(&raw)?;
            info!(
                path = %path.display(),
                entries = entries.len(),
                "resuming from persistent response cache"
            );
            Ok(Self {
                path,
                entries,
                mode: CacheMode::Resume,
            })
        } else {
            Ok(Self {
                path,
                entries: HashMap::new(),
                mode: CacheMode::Start,
            })
        }
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the stored answer for `key`, if any. No side effects.
    pub fn lookup(&self, key: &RequestKey) -> Option<&str> {
        self.entries.get(&key.to_string()).map(String::as_str)
    }

    /// Insert or overwrite the entry and immediately persist the whole cache.
    pub fn store(&mut self, key: &RequestKey, answer: impl Into<String>) -> Result<()> {
        self.entries.insert(key.to_string(), answer.into());
        let raw = serde_json::to_string(&self.entries)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_start_mode_when_file_absent() {
        let dir = tempdir().unwrap();
        let cache = ResponseCache::open(dir.path().join("responses.json")).unwrap();
        assert_eq!(cache.mode(), CacheMode::Start);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_store_then_reload_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("responses.json");

        let mut cache = ResponseCache::open(&path).unwrap();
        cache.store(&RequestKey::new("t1", "val", 0), "answer A").unwrap();
        cache.store(&RequestKey::new("t1", "val", 1), "").unwrap();

        let reloaded = ResponseCache::open(&path).unwrap();
        assert_eq!(reloaded.mode(), CacheMode::Resume);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.lookup(&RequestKey::new("t1", "val", 0)),
            Some("answer A")
        );
        assert_eq!(reloaded.lookup(&RequestKey::new("t1", "val", 1)), Some(""));
    }

    #[test]
    fn test_store_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("responses.json");
        let key = RequestKey::new("t1", "val", 7);

        let mut cache = ResponseCache::open(&path).unwrap();
        cache.store(&key, "first").unwrap();
        cache.store(&key, "second").unwrap();
        assert_eq!(cache.lookup(&key), Some("second"));
        assert_eq!(cache.len(), 1);

        let reloaded = ResponseCache::open(&path).unwrap();
        assert_eq!(reloaded.lookup(&key), Some("second"));
    }

    #[test]
    fn test_missing_key_lookup() {
        let dir = tempdir().unwrap();
        let cache = ResponseCache::open(dir.path().join("responses.json")).unwrap();
        assert_eq!(cache.lookup(&RequestKey::new("t1", "val", 0)), None);
    }

    #[test]
    fn test_nested_directory_is_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/responses.json");
        let mut cache = ResponseCache::open(&path).unwrap();
        cache.store(&RequestKey::new("t", "s", 0), "x").unwrap();
        assert!(path.exists());
    }
}
