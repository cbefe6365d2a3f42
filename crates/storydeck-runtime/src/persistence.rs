#![forbid(unsafe_code)]

//! Persisted navigation state.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               NavigationHistory               │
//! │   - cached PersistedNavigation record         │
//! │   - swallows backend failures (warn!)         │
//! └──────────────────────────────────────────────┘
//!                        │
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │                StorageBackend                 │
//! │   - MemoryStorage: in-process, tests          │
//! │   - FileStorage: JSON file (file-storage)     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Design Invariants
//!
//! 1. **Graceful degradation**: storage failures never interrupt navigation.
//! 2. **Atomic writes**: the file backend writes `{path}.tmp` then renames.
//! 3. **Namespaced records**: one record per story namespace.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StorageError::Io` | File I/O failure | Logged, cached record kept |
//! | `StorageError::Serialization` | Corrupt JSON | Logged, empty history |
//! | `StorageError::Corruption` | Poisoned lock | Logged, empty history |
//! | Format version mismatch | Older/newer file | Stored records ignored |

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Navigation state that survives reloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedNavigation {
    /// Visited page ids, oldest first.
    #[serde(default)]
    pub navigation_path: Vec<String>,
    /// Page whose attachment was open when the story was left.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_page_id: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backends
// ─────────────────────────────────────────────────────────────────────────────

/// Durable key-value storage for [`PersistedNavigation`] records.
pub trait StorageBackend: Send + Sync {
    /// Human-readable backend name for logging.
    fn name(&self) -> &str;

    /// Load the record stored under `namespace`, if any.
    fn load(&self, namespace: &str) -> StorageResult<Option<PersistedNavigation>>;

    /// Replace the record stored under `namespace`.
    fn save(&self, namespace: &str, record: &PersistedNavigation) -> StorageResult<()>;

    /// Remove the record stored under `namespace`.
    fn clear(&self, namespace: &str) -> StorageResult<()>;

    fn is_available(&self) -> bool {
        true
    }
}

/// In-memory backend.
#[derive(Default)]
pub struct MemoryStorage {
    records: RwLock<HashMap<String, PersistedNavigation>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a record, as if it was saved by an earlier session.
    #[must_use]
    pub fn with_record(namespace: impl Into<String>, record: PersistedNavigation) -> Self {
        let storage = Self::default();
        storage
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace.into(), record);
        storage
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn load(&self, namespace: &str) -> StorageResult<Option<PersistedNavigation>> {
        let guard = self
            .records
            .read()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        Ok(guard.get(namespace).cloned())
    }

    fn save(&self, namespace: &str, record: &PersistedNavigation) -> StorageResult<()> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        guard.insert(namespace.to_string(), record.clone());
        Ok(())
    }

    fn clear(&self, namespace: &str) -> StorageResult<()> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        guard.remove(namespace);
        Ok(())
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.records.read().map(|g| g.len()).unwrap_or(0);
        f.debug_struct("MemoryStorage")
            .field("records", &count)
            .finish()
    }
}

#[cfg(feature = "file-storage")]
mod file_storage {
    use super::*;
    use std::fs::{self, File};
    use std::io::{BufReader, BufWriter, Write};
    use std::path::{Path, PathBuf};

    #[derive(Serialize, Deserialize)]
    struct HistoryFile {
        format_version: u32,
        records: HashMap<String, PersistedNavigation>,
    }

    impl HistoryFile {
        const FORMAT_VERSION: u32 = 1;

        fn new() -> Self {
            Self {
                format_version: Self::FORMAT_VERSION,
                records: HashMap::new(),
            }
        }
    }

    /// JSON file backend.
    ///
    /// ```json
    /// {
    ///   "format_version": 1,
    ///   "records": {
    ///     "storydeck::navigation": { "navigation_path": ["p0", "p1"] }
    ///   }
    /// }
    /// ```
    ///
    /// Writes go to `{path}.tmp`, are synced, then renamed over `{path}`.
    pub struct FileStorage {
        path: PathBuf,
    }

    impl FileStorage {
        /// The file is created on first save.
        #[must_use]
        pub fn new(path: impl AsRef<Path>) -> Self {
            Self {
                path: path.as_ref().to_path_buf(),
            }
        }

        #[must_use]
        pub fn path(&self) -> &Path {
            &self.path
        }

        fn temp_path(&self) -> PathBuf {
            let mut tmp = self.path.clone();
            tmp.set_extension("json.tmp");
            tmp
        }

        fn read_file(&self) -> StorageResult<HistoryFile> {
            if !self.path.exists() {
                return Ok(HistoryFile::new());
            }
            let reader = BufReader::new(File::open(&self.path)?);
            let file: HistoryFile = serde_json::from_reader(reader).map_err(|e| {
                StorageError::Serialization(format!("failed to parse history file: {e}"))
            })?;
            if file.format_version != HistoryFile::FORMAT_VERSION {
                tracing::warn!(
                    stored = file.format_version,
                    expected = HistoryFile::FORMAT_VERSION,
                    "history file format version mismatch, ignoring stored history"
                );
                return Ok(HistoryFile::new());
            }
            Ok(file)
        }

        fn write_file(&self, file: &HistoryFile) -> StorageResult<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let tmp_path = self.temp_path();
            {
                let mut writer = BufWriter::new(File::create(&tmp_path)?);
                serde_json::to_writer_pretty(&mut writer, file).map_err(|e| {
                    StorageError::Serialization(format!("failed to serialize history: {e}"))
                })?;
                writer.flush()?;
                writer.get_ref().sync_all()?;
            }
            fs::rename(&tmp_path, &self.path)?;
            Ok(())
        }
    }

    impl StorageBackend for FileStorage {
        fn name(&self) -> &str {
            "FileStorage"
        }

        fn load(&self, namespace: &str) -> StorageResult<Option<PersistedNavigation>> {
            Ok(self.read_file()?.records.remove(namespace))
        }

        fn save(&self, namespace: &str, record: &PersistedNavigation) -> StorageResult<()> {
            // A corrupt file is replaced rather than blocking every later save.
            let mut file = self.read_file().unwrap_or_else(|err| {
                tracing::warn!(error = %err, "discarding unreadable history file");
                HistoryFile::new()
            });
            file.records.insert(namespace.to_string(), record.clone());
            self.write_file(&file)?;
            tracing::debug!(
                path = %self.path.display(),
                namespace,
                entries = record.navigation_path.len(),
                "saved navigation history"
            );
            Ok(())
        }

        fn clear(&self, namespace: &str) -> StorageResult<()> {
            let mut file = self.read_file()?;
            if file.records.remove(namespace).is_none() {
                return Ok(());
            }
            if file.records.is_empty() {
                fs::remove_file(&self.path)?;
                return Ok(());
            }
            self.write_file(&file)
        }

        fn is_available(&self) -> bool {
            let Some(parent) = self.path.parent() else {
                return false;
            };
            if !parent.exists() {
                return fs::create_dir_all(parent).is_ok();
            }
            let marker = parent.join(".storydeck_write_check");
            if fs::write(&marker, b"ok").is_ok() {
                let _ = fs::remove_file(&marker);
                return true;
            }
            false
        }
    }

    impl fmt::Debug for FileStorage {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("FileStorage")
                .field("path", &self.path)
                .finish()
        }
    }
}

#[cfg(feature = "file-storage")]
pub use file_storage::FileStorage;

// ─────────────────────────────────────────────────────────────────────────────
// History
// ─────────────────────────────────────────────────────────────────────────────

/// Cached navigation record for one story, written through on every change.
///
/// Backend errors are logged and swallowed; the cached record stays
/// authoritative for the rest of the session. A backend that reports itself
/// unavailable at construction is never touched again.
pub struct NavigationHistory {
    backend: Box<dyn StorageBackend>,
    namespace: String,
    available: bool,
    cached: Mutex<PersistedNavigation>,
}

impl NavigationHistory {
    #[must_use]
    pub fn new(backend: Box<dyn StorageBackend>, namespace: impl Into<String>) -> Self {
        let available = backend.is_available();
        if !available {
            tracing::warn!(
                backend = backend.name(),
                "storage unavailable; navigation history kept in memory only"
            );
        }
        Self {
            backend,
            namespace: namespace.into(),
            available,
            cached: Mutex::new(PersistedNavigation::default()),
        }
    }

    #[must_use]
    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self::new(Box::new(MemoryStorage::new()), namespace)
    }

    /// Load the stored record into the cache and return it.
    pub fn load(&self) -> PersistedNavigation {
        if !self.available {
            return self.snapshot();
        }
        let record = match self.backend.load(&self.namespace) {
            Ok(record) => record.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(
                    backend = self.backend_name(),
                    error = %err,
                    "failed to load navigation history"
                );
                PersistedNavigation::default()
            }
        };
        *self.lock() = record.clone();
        record
    }

    #[must_use]
    pub fn snapshot(&self) -> PersistedNavigation {
        self.lock().clone()
    }

    pub fn save_path(&self, path: &[String]) {
        let record = {
            let mut cached = self.lock();
            cached.navigation_path = path.to_vec();
            cached.clone()
        };
        self.write(&record);
    }

    pub fn set_attachment_page_id(&self, page_id: Option<&str>) {
        let record = {
            let mut cached = self.lock();
            cached.attachment_page_id = page_id.map(str::to_string);
            cached.clone()
        };
        self.write(&record);
    }

    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Whether the backend accepted the availability check.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.available
    }

    fn write(&self, record: &PersistedNavigation) {
        if !self.available {
            return;
        }
        if let Err(err) = self.backend.save(&self.namespace, record) {
            tracing::warn!(
                backend = self.backend_name(),
                error = %err,
                "failed to persist navigation history"
            );
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PersistedNavigation> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for NavigationHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationHistory")
            .field("backend", &self.backend_name())
            .field("available", &self.available)
            .field("namespace", &self.namespace)
            .field("cached", &*self.lock())
            .finish()
    }
}
