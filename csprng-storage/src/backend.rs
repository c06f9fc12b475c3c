//! The `SeedStorage` backend contract and the three concrete backends:
//! file (durable, framed snapshot), preference (plain key-value), and
//! fallback (deliberately forgetful, used only when the configured
//! backend fails to open).

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use csprng_collectors::SystemPrng;
use csprng_primitives::{FramedReader, FramedWriter};
use tracing::warn;

use crate::error::StorageError;
use crate::seed::{MAX_DATA_LEN, MAX_NAME_LEN};

/// A backend for raw (already-scrambled) named byte values.
///
/// `Storage` (the higher-level facade in this crate) is the only intended
/// caller: it applies the scrambler and length checks before reaching a
/// backend, and handles corruption by removing the offending entry.
pub trait SeedStorage: Send + Sync {
    /// Write `value` under `name`, replacing any prior value.
    fn put_raw(&self, name: &str, value: Vec<u8>) -> Result<(), StorageError>;
    /// Read the value stored under `name`, if any.
    fn get_raw(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;
    /// Remove `name` entirely.
    fn remove(&self, name: &str) -> Result<(), StorageError>;
    /// Persist any buffered state to the backing medium.
    fn flush(&self) -> Result<(), StorageError>;
}

/// A file-backed store: an in-memory snapshot mirrored to disk on
/// `flush()`, using the framed wire format from §6.
pub struct FileBackend {
    path: PathBuf,
    snapshot: Mutex<HashMap<String, Vec<u8>>>,
}

impl FileBackend {
    /// Open `path`, loading any existing snapshot. Corrupt records are
    /// logged and dropped rather than failing the whole open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = match std::fs::File::open(&path) {
            Ok(file) => Self::load(file)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(StorageError::Io(err)),
        };
        Ok(Self {
            path,
            snapshot: Mutex::new(snapshot),
        })
    }

    fn load<R: Read>(reader: R) -> Result<HashMap<String, Vec<u8>>, StorageError> {
        let mut framed = FramedReader::new(reader);
        let mut map = HashMap::new();
        loop {
            let flag = match framed.read_u8() {
                Ok(Some(flag)) => flag,
                Ok(None) | Err(_) => break,
            };
            if flag == 0 {
                break;
            }
            let name = match framed.read_str() {
                Ok(name) => name,
                Err(err) => {
                    warn!(error = %err, "corrupt seed record name, stopping load");
                    break;
                }
            };
            let value = match framed.read_blob() {
                Ok(value) => value,
                Err(err) => {
                    warn!(error = %err, name, "corrupt seed record value, dropping entry");
                    continue;
                }
            };
            map.insert(name, value);
        }
        Ok(map)
    }

    fn write_snapshot(&self, map: &HashMap<String, Vec<u8>>) -> Result<(), StorageError> {
        let file = std::fs::File::create(&self.path)?;
        let mut framed = FramedWriter::new(file);
        for (name, value) in map {
            framed.write_u8(1).map_err(StorageError::Io)?;
            framed.write_str(name).map_err(StorageError::Io)?;
            framed.write_blob(value).map_err(StorageError::Io)?;
        }
        framed.write_u8(0).map_err(StorageError::Io)?;
        framed.flush().map_err(StorageError::Io)?;
        Ok(())
    }
}

impl SeedStorage for FileBackend {
    fn put_raw(&self, name: &str, value: Vec<u8>) -> Result<(), StorageError> {
        if name.len() > MAX_NAME_LEN {
            return Err(StorageError::NameTooLong { max: MAX_NAME_LEN });
        }
        if value.len() > MAX_DATA_LEN {
            return Err(StorageError::ValueTooLong { max: MAX_DATA_LEN });
        }
        self.snapshot
            .lock()
            .expect("snapshot lock poisoned")
            .insert(name.to_string(), value);
        Ok(())
    }

    fn get_raw(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .snapshot
            .lock()
            .expect("snapshot lock poisoned")
            .get(name)
            .cloned())
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        self.snapshot.lock().expect("snapshot lock poisoned").remove(name);
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        let map = self.snapshot.lock().expect("snapshot lock poisoned");
        if let Err(err) = self.write_snapshot(&map) {
            drop(map);
            // On write failure the partially written file is removed to
            // avoid persisting a corrupt snapshot.
            let _ = std::fs::remove_file(&self.path);
            return Err(err);
        }
        Ok(())
    }
}

/// A plain key-value store standing in for a platform preference API
/// (`java.util.prefs`-style backends on the original system); this crate
/// has no such platform surface, so it is backed by an in-memory map that
/// a caller may persist however it likes by reading `snapshot()`.
pub struct PreferenceBackend {
    snapshot: Mutex<HashMap<String, Vec<u8>>>,
}

impl PreferenceBackend {
    /// An empty preference store.
    pub fn new() -> Self {
        Self {
            snapshot: Mutex::new(HashMap::new()),
        }
    }

    /// A copy of the current key-value contents.
    pub fn snapshot(&self) -> HashMap<String, Vec<u8>> {
        self.snapshot.lock().expect("snapshot lock poisoned").clone()
    }
}

impl Default for PreferenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SeedStorage for PreferenceBackend {
    fn put_raw(&self, name: &str, value: Vec<u8>) -> Result<(), StorageError> {
        self.snapshot
            .lock()
            .expect("snapshot lock poisoned")
            .insert(name.to_string(), value);
        Ok(())
    }

    fn get_raw(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.snapshot.lock().expect("snapshot lock poisoned").get(name).cloned())
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        self.snapshot.lock().expect("snapshot lock poisoned").remove(name);
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Used only when the configured backend fails to instantiate.
/// Deliberately forgetful: writes are discarded, and every read feeds
/// `name` into the System PRNG aggregate as injected entropy and returns 64
/// fresh, unrelated bytes from it. Never rely on this for persistence.
pub struct FallbackBackend {
    system: Arc<SystemPrng>,
}

impl FallbackBackend {
    /// Build a fallback backend over a shared System PRNG aggregate.
    pub fn new(system: Arc<SystemPrng>) -> Self {
        Self { system }
    }
}

impl SeedStorage for FallbackBackend {
    fn put_raw(&self, _name: &str, _value: Vec<u8>) -> Result<(), StorageError> {
        Ok(())
    }

    fn get_raw(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.system.inject_seed(name.as_bytes().to_vec());
        Ok(Some(self.system.get_seed(64)))
    }

    fn remove(&self, _name: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_backend_round_trips_through_flush_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seeds.bin");

        let backend = FileBackend::open(&path).unwrap();
        backend.put_raw("x", vec![1, 2, 3]).unwrap();
        backend.flush().unwrap();

        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.get_raw("x").unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn file_backend_rejects_oversized_name() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path().join("seeds.bin")).unwrap();
        let name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(backend.put_raw(&name, vec![]).is_err());
    }

    #[test]
    fn fallback_backend_returns_64_bytes() {
        let backend = FallbackBackend::new(Arc::new(SystemPrng::new(1)));
        let value = backend.get_raw("anything").unwrap().unwrap();
        assert_eq!(value.len(), 64);
    }

    #[test]
    fn preference_backend_stores_and_removes() {
        let backend = PreferenceBackend::new();
        backend.put_raw("k", vec![9]).unwrap();
        assert_eq!(backend.get_raw("k").unwrap(), Some(vec![9]));
        backend.remove("k").unwrap();
        assert_eq!(backend.get_raw("k").unwrap(), None);
    }
}
