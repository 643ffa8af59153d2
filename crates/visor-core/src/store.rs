#![forbid(unsafe_code)]

//! Settings persistence: load/merge/validate/save/reset.
//!
//! [`SettingsStore`] owns the canonical [`Settings`] record and a pluggable
//! [`StorageBackend`]. The whole record is serialized as one JSON document
//! under one storage key; the key itself belongs to the backend.
//!
//! # Design Invariants
//!
//! 1. **Graceful degradation**: storage failures never panic and never
//!    propagate. A failed load yields defaults; a failed save is logged as
//!    a warning and dropped.
//! 2. **Always valid**: whatever the backend returns is re-clamped and
//!    re-normalized before it becomes the canonical record.
//! 3. **Write-through**: every mutation persists synchronously
//!    (best-effort), so the stored record never lags the canonical one by
//!    more than one failed write.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | [`StorageError::Unavailable`] | No backend (e.g. storage disabled) | Defaults; saves skipped |
//! | [`StorageError::Backend`] | Quota, I/O | Warn, continue |
//! | Corrupt JSON | Partial write, foreign data | Warn, defaults |

use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::settings::{SettingUpdate, Settings};

/// Errors surfaced by storage backends.
///
/// These are reported, never propagated: every store operation degrades to a
/// safe default on error.
#[derive(Debug)]
pub enum StorageError {
    /// The backend is not available in this host (no storage object, no
    /// writable directory).
    Unavailable(String),
    /// The backend failed to read or write (quota exceeded, I/O error).
    Backend(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
            StorageError::Backend(msg) => write!(f, "storage backend error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A place to keep one serialized settings record.
///
/// Implementations hold the storage key; the store only ever deals in whole
/// serialized records. The engine is single-threaded (spec §5), so no
/// `Send`/`Sync` bound is required and web backends can wrap non-thread-safe
/// host objects directly.
pub trait StorageBackend {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Read the stored record, if any. `Ok(None)` means "never saved".
    fn load(&self) -> StorageResult<Option<String>>;

    /// Replace the stored record.
    fn store(&self, record: &str) -> StorageResult<()>;

    /// Remove the stored record.
    fn clear(&self) -> StorageResult<()>;

    /// Whether the backend can currently persist at all.
    fn is_available(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Memory backend (always available)
// ---------------------------------------------------------------------------

/// In-memory backend for tests and hosts without persistence.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    record: RefCell<Option<String>>,
}

impl MemoryStorage {
    /// Create an empty memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory backend pre-populated with a serialized record.
    #[must_use]
    pub fn with_record(record: impl Into<String>) -> Self {
        Self {
            record: RefCell::new(Some(record.into())),
        }
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn load(&self) -> StorageResult<Option<String>> {
        Ok(self.record.borrow().clone())
    }

    fn store(&self, record: &str) -> StorageResult<()> {
        *self.record.borrow_mut() = Some(record.to_string());
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        *self.record.borrow_mut() = None;
        Ok(())
    }
}

/// A backend that fails every operation. Used to exercise the degradation
/// paths in tests and as a stand-in when a host denies storage outright.
#[derive(Debug, Default)]
pub struct UnavailableStorage;

impl StorageBackend for UnavailableStorage {
    fn name(&self) -> &str {
        "UnavailableStorage"
    }

    fn load(&self) -> StorageResult<Option<String>> {
        Err(StorageError::Unavailable("storage denied by host".into()))
    }

    fn store(&self, _record: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable("storage denied by host".into()))
    }

    fn clear(&self) -> StorageResult<()> {
        Err(StorageError::Unavailable("storage denied by host".into()))
    }

    fn is_available(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// File backend (native / headless hosts)
// ---------------------------------------------------------------------------

/// JSON-file backend for native and headless hosts.
///
/// Writes use a temp-file + rename pattern so a crashed write never leaves a
/// half-written record behind:
/// 1. Write to `{path}.tmp`
/// 2. Flush and sync
/// 3. Rename `{path}.tmp` -> `{path}`
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Create a file backend at the given path. The file need not exist;
    /// it is created on first save.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone();
        tmp.set_extension("json.tmp");
        tmp
    }
}

impl StorageBackend for FileStorage {
    fn name(&self) -> &str {
        "FileStorage"
    }

    fn load(&self) -> StorageResult<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|e| StorageError::Backend(format!("read {}: {e}", self.path.display())))
    }

    fn store(&self, record: &str) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::Backend(format!("mkdir {}: {e}", parent.display())))?;
        }
        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)
                .map_err(|e| StorageError::Backend(format!("create {}: {e}", tmp.display())))?;
            file.write_all(record.as_bytes())
                .and_then(|()| file.sync_all())
                .map_err(|e| StorageError::Backend(format!("write {}: {e}", tmp.display())))?;
        }
        fs::rename(&tmp, &self.path)
            .map_err(|e| StorageError::Backend(format!("rename {}: {e}", self.path.display())))
    }

    fn clear(&self) -> StorageResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| StorageError::Backend(format!("remove {}: {e}", self.path.display())))?;
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        match self.path.parent() {
            Some(parent) if parent.as_os_str().is_empty() => true,
            Some(parent) => parent.exists() || fs::create_dir_all(parent).is_ok(),
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// SettingsStore
// ---------------------------------------------------------------------------

/// Owner of the canonical settings record.
///
/// Constructed with defaults; call [`load`](Self::load) once at widget start
/// to merge any persisted record. Every mutation path returns the new
/// snapshot and persists it write-through.
#[derive(Debug)]
pub struct SettingsStore<S: StorageBackend> {
    backend: S,
    settings: Settings,
}

impl<S: StorageBackend> SettingsStore<S> {
    /// Create a store over `backend` with default settings (not yet loaded).
    #[must_use]
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            settings: Settings::default(),
        }
    }

    /// The current canonical snapshot.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Load the persisted record, merging it over defaults.
    ///
    /// Absence, corruption, and backend failure all yield defaults; the
    /// latter two are logged as warnings. Never panics, never propagates.
    pub fn load(&mut self) -> &Settings {
        self.settings = match self.backend.load() {
            Ok(Some(record)) => match serde_json::from_str::<Settings>(&record) {
                Ok(mut loaded) => {
                    loaded.validate();
                    loaded
                }
                Err(e) => {
                    tracing::warn!(backend = %self.backend.name(), error = %e,
                        "stored settings record is corrupt; using defaults");
                    Settings::default()
                }
            },
            Ok(None) => Settings::default(),
            Err(e) => {
                tracing::warn!(backend = %self.backend.name(), error = %e,
                    "could not load settings; using defaults");
                Settings::default()
            }
        };
        &self.settings
    }

    /// Persist the current record, best-effort. Failure is a warning only.
    pub fn save(&self) {
        let record = match serde_json::to_string(&self.settings) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "could not serialize settings");
                return;
            }
        };
        if let Err(e) = self.backend.store(&record) {
            tracing::warn!(backend = %self.backend.name(), error = %e,
                "could not save settings");
        }
    }

    /// Apply one mutation, persist, and return the new snapshot.
    pub fn update(&mut self, update: &SettingUpdate) -> &Settings {
        self.settings.apply_update(update);
        self.save();
        &self.settings
    }

    /// Return to the default record regardless of prior state, and persist.
    pub fn reset(&mut self) -> &Settings {
        self.settings = Settings::default();
        self.save();
        &self.settings
    }

    /// Backend name, for logging.
    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{NumericSetting, TextAlign, ToggleFeature};
    use pretty_assertions::assert_eq;

    #[test]
    fn load_without_stored_record_yields_defaults() {
        let mut store = SettingsStore::new(MemoryStorage::new());
        assert_eq!(store.load(), &Settings::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut store = SettingsStore::new(MemoryStorage::new());
        store.update(&SettingUpdate::Numeric(NumericSetting::FontSize, 130));
        store.update(&SettingUpdate::Toggle(ToggleFeature::DarkMode));
        store.update(&SettingUpdate::Align(TextAlign::Right));
        let expected = store.settings().clone();

        let loaded = store.load().clone();
        assert_eq!(loaded, expected);
    }

    #[test]
    fn corrupt_record_yields_defaults_without_panic() {
        let mut store = SettingsStore::new(MemoryStorage::with_record("{not json"));
        assert_eq!(store.load(), &Settings::default());
    }

    #[test]
    fn out_of_range_stored_values_are_reclamped_on_load() {
        let mut store =
            SettingsStore::new(MemoryStorage::with_record(r#"{"font_size": 5000}"#));
        assert_eq!(store.load().font_size, 150);
    }

    #[test]
    fn failing_backend_degrades_to_defaults() {
        let mut store = SettingsStore::new(UnavailableStorage);
        assert_eq!(store.load(), &Settings::default());
        // Saves must not panic either.
        store.update(&SettingUpdate::Toggle(ToggleFeature::HighContrast));
        assert!(store.settings().high_contrast);
    }

    #[test]
    fn update_clamps_and_persists() {
        let mut store = SettingsStore::new(MemoryStorage::new());
        let snapshot = store.update(&SettingUpdate::Numeric(NumericSetting::FontSize, 9999));
        assert_eq!(snapshot.font_size, 150);

        let mut reread = SettingsStore::new(MemoryStorage::with_record(
            serde_json::to_string(store.settings()).unwrap(),
        ));
        assert_eq!(reread.load().font_size, 150);
    }

    #[test]
    fn reset_is_independent_of_previous_state() {
        let mut store = SettingsStore::new(MemoryStorage::new());
        store.update(&SettingUpdate::Toggle(ToggleFeature::HideImages));
        store.update(&SettingUpdate::Numeric(NumericSetting::ColumnWidth, 900));
        assert_eq!(store.reset(), &Settings::default());
        assert_eq!(store.load(), &Settings::default());
    }
}
