#![forbid(unsafe_code)]

//! [`StorageBackend`] over `window.localStorage`.
//!
//! Storage may be absent (sandboxed frames, privacy modes) or refuse writes
//! (quota). Both map onto [`StorageError`] and degrade at the store
//! boundary; the widget itself never notices beyond a warning.

use visor_core::store::{StorageBackend, StorageError, StorageResult};
use wasm_bindgen::JsValue;

/// Default storage key for the serialized settings record.
pub const DEFAULT_STORAGE_KEY: &str = "visor-settings";

/// Settings persistence in `localStorage` under a single key.
pub struct LocalStorage {
    storage: Option<web_sys::Storage>,
    key: String,
}

impl LocalStorage {
    /// Bind to `window.localStorage` under `key`. An absent or inaccessible
    /// storage object is not an error here — the backend simply reports
    /// itself unavailable and every operation degrades.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        Self {
            storage,
            key: key.into(),
        }
    }

    fn storage(&self) -> StorageResult<&web_sys::Storage> {
        self.storage
            .as_ref()
            .ok_or_else(|| StorageError::Unavailable("localStorage is not accessible".into()))
    }

    fn describe(error: &JsValue) -> String {
        error
            .as_string()
            .unwrap_or_else(|| "host storage error".to_string())
    }
}

impl StorageBackend for LocalStorage {
    fn name(&self) -> &str {
        "LocalStorage"
    }

    fn load(&self) -> StorageResult<Option<String>> {
        self.storage()?
            .get_item(&self.key)
            .map_err(|e| StorageError::Backend(Self::describe(&e)))
    }

    fn store(&self, record: &str) -> StorageResult<()> {
        self.storage()?
            .set_item(&self.key, record)
            .map_err(|e| StorageError::Backend(Self::describe(&e)))
    }

    fn clear(&self) -> StorageResult<()> {
        self.storage()?
            .remove_item(&self.key)
            .map_err(|e| StorageError::Backend(Self::describe(&e)))
    }

    fn is_available(&self) -> bool {
        self.storage.is_some()
    }
}
