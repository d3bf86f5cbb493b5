//! Key/value persistence backends for the study set collection

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Durable key -> string store the collection blob is written to
pub trait PersistenceBackend: Send + Sync {
    /// Read the value stored under `key`; `Ok(None)` if nothing was ever written
    fn read(&self, key: &str) -> io::Result<Option<String>>;

    /// Replace the value stored under `key`
    fn write(&self, key: &str, value: &str) -> io::Result<()>;
}

impl<T: PersistenceBackend + ?Sized> PersistenceBackend for Arc<T> {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        (**self).write(key, value)
    }
}

/// Stores each key as `{data_dir}/{key}.json`
pub struct FileBackend {
    data_dir: PathBuf,
}

impl FileBackend {
    /// Create a file backend, creating the directory if needed
    pub fn new(data_dir: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }
}

impl PersistenceBackend for FileBackend {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(path).map(Some)
    }

    /// Atomic write (write to .tmp then rename)
    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.key_path(key);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

/// In-process backend for tests and throwaway sessions
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value, e.g. a blob written by an older release
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), value.to_string());
        }
        self
    }
}

impl PersistenceBackend for MemoryBackend {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory backend lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory backend lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
