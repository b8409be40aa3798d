// Scan results memoized per folder. An entry is reused while the folder's
// fingerprint (file list + modification times) is unchanged; otherwise the
// folder is classified again and the whole entry swapped under the write lock,
// so readers only ever see a complete old result or a complete new one.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use parking_lot::RwLock;

use super::sample_loader::{ScanResult, classify, list_audio_files};
use crate::error::ScanError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fingerprint {
    files: usize,
    digest: u64,
}

impl Fingerprint {
    pub fn of(root: &Path, files: &[PathBuf]) -> Self {
        let mut hasher = DefaultHasher::new();
        for file in files {
            file.strip_prefix(root).unwrap_or(file.as_path()).hash(&mut hasher);
            let (stamp, len) = std::fs::metadata(file)
                .map(|m| {
                    let stamp = m
                        .modified()
                        .ok()
                        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                        .map(|d| d.as_nanos())
                        .unwrap_or(0);
                    (stamp, m.len())
                })
                .unwrap_or((0, 0)); // vanished mid-scan
            stamp.hash(&mut hasher);
            len.hash(&mut hasher);
        }
        Self { files: files.len(), digest: hasher.finish() }
    }
}

#[derive(Clone)]
struct CacheEntry {
    fingerprint: Fingerprint,
    result: Arc<ScanResult>,
}

#[derive(Default)]
pub struct BucketCache {
    entries: RwLock<HashMap<PathBuf, CacheEntry>>,
}

impl BucketCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_scan(&self, folder: &Path) -> Result<Arc<ScanResult>, ScanError> {
        let (files, issues) = list_audio_files(folder)?;
        let key = folder.canonicalize().unwrap_or_else(|_| folder.to_path_buf());
        let fingerprint = Fingerprint::of(folder, &files);

        if let Some(entry) = self.entries.read().get(&key) {
            if entry.fingerprint == fingerprint {
                log::debug!("bucket cache hit for {}", folder.display());
                return Ok(Arc::clone(&entry.result));
            }
        }

        log::debug!("bucket cache miss for {}, rescanning", folder.display());
        let result = Arc::new(classify(folder, files, issues));
        self.entries.write().insert(key, CacheEntry { fingerprint, result: Arc::clone(&result) });
        Ok(result)
    }

    pub fn invalidate(&self, folder: &Path) {
        let key = folder.canonicalize().unwrap_or_else(|_| folder.to_path_buf());
        self.entries.write().remove(&key);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Symbol;
    use std::fs;
    use std::thread;

    #[test]
    fn unchanged_folder_reuses_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x__A.wav"), b"").unwrap();
        let cache = BucketCache::new();
        let first = cache.get_or_scan(dir.path()).unwrap();
        let second = cache.get_or_scan(dir.path()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn added_file_triggers_a_rescan_without_touching_old_readers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x__A.wav"), b"").unwrap();
        let cache = BucketCache::new();
        let before = cache.get_or_scan(dir.path()).unwrap();

        fs::write(dir.path().join("y__A.wav"), b"").unwrap();
        let after = cache.get_or_scan(dir.path()).unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.buckets.get(Symbol::A).len(), 1);
        assert_eq!(after.buckets.get(Symbol::A).len(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn changed_contents_change_the_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x__A.wav");
        fs::write(&file, b"").unwrap();
        let files = vec![file.clone()];
        let a = Fingerprint::of(dir.path(), &files);
        fs::write(&file, b"longer now").unwrap();
        let b = Fingerprint::of(dir.path(), &files);
        assert_ne!(a, b);
    }

    #[test]
    fn concurrent_readers_share_a_complete_result() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..8 {
            fs::write(dir.path().join(format!("s{i}__O.wav")), b"").unwrap();
        }
        let cache = Arc::new(BucketCache::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let root = dir.path().to_path_buf();
                thread::spawn(move || cache.get_or_scan(&root).unwrap().buckets.get(Symbol::O).len())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 8);
        }
    }

    #[test]
    fn invalidate_drops_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BucketCache::new();
        cache.get_or_scan(dir.path()).unwrap();
        cache.invalidate(dir.path());
        assert!(cache.is_empty());
    }
}
