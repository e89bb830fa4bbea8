//! Key-value store behind the day cache.
//!
//! The cache logic is backend-agnostic: `CacheStore` exposes bytes keyed by
//! (day, adjustment). `FsStore` is the production filesystem backend;
//! `MemStore` is the in-memory double used in tests.

use super::provider::{DataError, DayKey};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Byte store keyed by [`DayKey`]. Absence means "not yet successfully
/// fetched", never "known empty".
pub trait CacheStore {
    fn get(&self, key: &DayKey) -> Result<Option<Vec<u8>>, DataError>;
    fn put(&self, key: &DayKey, bytes: &[u8]) -> Result<(), DataError>;
}

/// Filesystem backend: one `{day}_{adj}.parquet` file per key.
///
/// Single-writer, single-process by assumption. Two processes writing the
/// same key race between existence check and write; that window is a known,
/// accepted limitation.
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, DataError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::CacheError(format!("create cache dir: {e}")))?;
        Ok(Self { dir })
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &DayKey) -> PathBuf {
        self.dir.join(format!("{}.parquet", key.file_stem()))
    }

    /// All keys with a persisted artifact, sorted ascending by day.
    pub fn cached_keys(&self) -> Result<Vec<DayKey>, DataError> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| DataError::CacheError(format!("read cache dir: {e}")))?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::CacheError(format!("dir entry: {e}")))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Some(key) = DayKey::parse_stem(stem) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

impl CacheStore for FsStore {
    fn get(&self, key: &DayKey) -> Result<Option<Vec<u8>>, DataError> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read(&path)
            .map(Some)
            .map_err(|e| DataError::CacheError(format!("read {}: {e}", path.display())))
    }

    fn put(&self, key: &DayKey, bytes: &[u8]) -> Result<(), DataError> {
        let path = self.key_path(key);
        let tmp_path = path.with_extension("parquet.tmp");

        fs::write(&tmp_path, bytes)
            .map_err(|e| DataError::CacheError(format!("write {}: {e}", tmp_path.display())))?;

        // Atomic rename into place
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })
    }
}

/// In-memory backend for tests.
#[derive(Default)]
pub struct MemStore {
    entries: Mutex<HashMap<DayKey, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemStore {
    fn get(&self, key: &DayKey) -> Result<Option<Vec<u8>>, DataError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &DayKey, bytes: &[u8]) -> Result<(), DataError> {
        self.entries.lock().unwrap().insert(*key, bytes.to_vec());
        Ok(())
    }
}
