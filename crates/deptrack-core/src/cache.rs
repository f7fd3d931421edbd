use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzer::ParsedFile;
use crate::error::{Error, Result};

/// Cache entry for a single file: the result of its most recent analysis and
/// the modification time observed during that pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    modified: DateTime<Utc>,
    parsed: ParsedFile,
}

/// Tracks each analyzed file's last-known modification time and result so
/// unchanged files are not re-parsed.
///
/// Internally synchronized; workers may consult it concurrently.
#[derive(Debug, Default)]
pub struct FileCache {
    entries: Mutex<HashMap<PathBuf, CacheEntry>>,
}

/// Read a file's modification time as a UTC timestamp.
pub fn modified_time(path: &Path) -> Result<DateTime<Utc>> {
    let meta =
        std::fs::metadata(path).map_err(|_| Error::FileNotFound(path.to_path_buf()))?;
    let modified = meta.modified().map_err(|e| {
        Error::Resource(format!(
            "cannot read modification time of {}: {e}",
            path.display()
        ))
    })?;
    Ok(modified.into())
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, HashMap<PathBuf, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True when the file is absent from the cache, its modification time
    /// cannot be read, or the on-disk time differs from the recorded one in
    /// either direction. Reverted edits and clock skew both count as changed.
    pub fn needs_reanalysis(&self, path: &Path) -> bool {
        let Ok(current) = modified_time(path) else {
            return true;
        };
        match self.locked().get(path) {
            Some(entry) => entry.modified != current,
            None => true,
        }
    }

    /// Store or replace a file's analysis result. Timestamp and content land
    /// in one insertion under the lock, so no reader ever observes an entry
    /// mixing two analysis passes.
    pub fn record(&self, parsed: ParsedFile) {
        let key = parsed.path.clone();
        let entry = CacheEntry {
            modified: parsed.last_modified,
            parsed,
        };
        self.locked().insert(key, entry);
    }

    /// The most recent result recorded for a file, if any.
    pub fn get(&self, path: &Path) -> Option<ParsedFile> {
        self.locked().get(path).map(|e| e.parsed.clone())
    }

    pub fn invalidate(&self, path: &Path) {
        self.locked().remove(path);
    }

    pub fn clear(&self) {
        self.locked().clear();
    }

    pub fn len(&self) -> usize {
        self.locked().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locked().is_empty()
    }

    /// Drop entries for files that no longer exist on disk.
    pub fn prune(&self) {
        self.locked().retain(|path, _| path.exists());
    }

    /// Persist the cache as JSON so incremental state survives across runs.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.locked().clone();
        let content = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| Error::Resource(format!("failed to serialize cache: {e}")))?;
        std::fs::write(path, content)
            .map_err(|e| Error::Resource(format!("failed to write cache: {e}")))?;
        Ok(())
    }

    /// Load a previously saved cache.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|_| Error::FileNotFound(path.to_path_buf()))?;
        let entries: HashMap<PathBuf, CacheEntry> =
            serde_json::from_str(&content).map_err(|e| Error::ParseFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Dependency, DependencyKind, Language};
    use std::fs::{self, File};
    use std::time::{Duration, SystemTime};

    fn parsed_fixture(path: &Path, dep: &str) -> ParsedFile {
        let mut parsed = ParsedFile::new(
            path,
            Language::Kotlin,
            modified_time(path).unwrap(),
        );
        parsed
            .dependencies
            .push(Dependency::new(dep, DependencyKind::Internal, path, 1));
        parsed
    }

    #[test]
    fn test_unknown_file_needs_reanalysis() {
        let cache = FileCache::new();
        assert!(cache.needs_reanalysis(Path::new("/no/such/file.kt")));
    }

    #[test]
    fn test_recorded_file_is_fresh() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.kt");
        fs::write(&file, "import b").unwrap();

        let cache = FileCache::new();
        assert!(cache.needs_reanalysis(&file));
        cache.record(parsed_fixture(&file, "b"));
        assert!(!cache.needs_reanalysis(&file));
    }

    #[test]
    fn test_any_mtime_difference_is_stale() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.kt");
        fs::write(&file, "import b").unwrap();

        let cache = FileCache::new();
        cache.record(parsed_fixture(&file, "b"));

        // Move the mtime backwards: a reverted edit must still invalidate.
        let earlier = SystemTime::now() - Duration::from_secs(600);
        File::options()
            .write(true)
            .open(&file)
            .unwrap()
            .set_modified(earlier)
            .unwrap();
        assert!(cache.needs_reanalysis(&file));
    }

    #[test]
    fn test_record_replaces_wholesale() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.kt");
        fs::write(&file, "import b").unwrap();

        let cache = FileCache::new();
        cache.record(parsed_fixture(&file, "b"));
        cache.record(parsed_fixture(&file, "c"));

        let parsed = cache.get(&file).unwrap();
        assert_eq!(parsed.dependencies.len(), 1);
        assert_eq!(parsed.dependencies[0].name, "c");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.kt");
        fs::write(&file, "import b").unwrap();

        let cache = FileCache::new();
        cache.record(parsed_fixture(&file, "b"));
        cache.invalidate(&file);
        assert!(cache.get(&file).is_none());
        assert!(cache.needs_reanalysis(&file));

        cache.record(parsed_fixture(&file, "b"));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_prune_drops_deleted_files() {
        let tmp = tempfile::tempdir().unwrap();
        let kept = tmp.path().join("kept.kt");
        let gone = tmp.path().join("gone.kt");
        fs::write(&kept, "import a").unwrap();
        fs::write(&gone, "import b").unwrap();

        let cache = FileCache::new();
        cache.record(parsed_fixture(&kept, "a"));
        cache.record(parsed_fixture(&gone, "b"));

        fs::remove_file(&gone).unwrap();
        cache.prune();
        assert!(cache.get(&kept).is_some());
        assert!(cache.get(&gone).is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.kt");
        fs::write(&file, "import b").unwrap();

        let cache = FileCache::new();
        cache.record(parsed_fixture(&file, "b"));

        let cache_file = tmp.path().join("cache.json");
        cache.save(&cache_file).unwrap();

        let loaded = FileCache::load(&cache_file).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(!loaded.needs_reanalysis(&file));
        assert_eq!(loaded.get(&file).unwrap().dependencies[0].name, "b");
    }

    #[test]
    fn test_load_missing_file() {
        let err = FileCache::load(Path::new("/no/such/cache.json")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_load_corrupt_file() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_file = tmp.path().join("cache.json");
        fs::write(&cache_file, "{ not json").unwrap();
        let err = FileCache::load(&cache_file).unwrap_err();
        assert!(matches!(err, Error::ParseFailed { .. }));
    }
}
