//! Durable key/value storage for the local cache.
//!
//! Values are opaque strings; `cache` decides what goes in them.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("corrupted value: {0}")]
    Corrupt(String),
}

/// String-valued key/value store.
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage; contents vanish with the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One file per key under a directory, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path backing `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StorageError::Io(format!("{}: {err}", path.display()))),
        };
        validate_bytes(&path, &bytes)?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| StorageError::Corrupt(format!("{}: {e}", path.display())))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        write_atomically(&path, value.as_bytes())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(format!("{}: {err}", path.display()))),
        }
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| StorageError::Io(format!("{}: {e}", parent.display())))?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), StorageError> {
        let io = |e: std::io::Error| StorageError::Io(format!("{}: {e}", tmp_path.display()));
        let file = File::create(&tmp_path).map_err(io)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes).map_err(io)?;
        writer.flush().map_err(io)?;
        let file = writer
            .into_inner()
            .map_err(|e| StorageError::Io(format!("{}: {e}", tmp_path.display())))?;
        file.sync_all().map_err(io)?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StorageError::Io(format!(
            "{} -> {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

fn validate_bytes(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if bytes.contains(&0) {
        return Err(StorageError::Corrupt(format!(
            "{}: contains NUL byte(s)",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "stagetrack-storage-{prefix}-{}-{unique}",
            std::process::id()
        ))
    }

    #[test]
    fn file_storage_round_trips_and_replaces() {
        let dir = temp_dir("roundtrip");
        let mut storage = FileStorage::new(&dir);

        assert_eq!(storage.get("schedule").expect("read"), None);
        storage.set("schedule", "{\"a\":1}").expect("first write");
        storage.set("schedule", "{\"a\":2}").expect("second write");
        assert_eq!(
            storage.get("schedule").expect("read").as_deref(),
            Some("{\"a\":2}")
        );

        storage.remove("schedule").expect("remove");
        storage.remove("schedule").expect("remove is idempotent");
        assert_eq!(storage.get("schedule").expect("read"), None);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn file_storage_rejects_path_like_keys() {
        let storage = FileStorage::new(temp_dir("keys"));
        for key in ["", "../escape", "a/b", ".hidden"] {
            assert!(matches!(
                storage.path_for(key),
                Err(StorageError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn file_storage_reports_nul_and_non_utf8_as_corrupt() {
        let dir = temp_dir("corrupt");
        let storage = FileStorage::new(&dir);
        fs::create_dir_all(&dir).expect("dir should be created");

        let path = storage.path_for("nul").expect("valid key");
        fs::write(&path, b"{\"a\":1}\0").expect("fixture should write");
        assert!(matches!(storage.get("nul"), Err(StorageError::Corrupt(_))));

        let path = storage.path_for("bytes").expect("valid key");
        fs::write(&path, [0xff, 0xfe, 0xfd]).expect("fixture should write");
        assert!(matches!(storage.get("bytes"), Err(StorageError::Corrupt(_))));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn memory_storage_basics() {
        let mut storage = MemoryStorage::new();
        storage.set("k", "v").expect("set");
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.get("k").expect("get").as_deref(), Some("v"));
        storage.remove("k").expect("remove");
        assert!(storage.is_empty());
    }
}
