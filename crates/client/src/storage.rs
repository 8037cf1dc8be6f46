//! Cross-platform durable storage.
//!
//! Presence code reads the session record, the auth token and the client
//! identifier through [`DurableStore`]. Backends:
//! - Web: `localStorage`, shared by every tab of the browser profile
//! - Native: one file per key in the platform config directory:
//!   - Linux: `~/.config/opsdash/`
//!   - macOS: `~/Library/Application Support/opsdash/`
//!   - Windows: `%APPDATA%\opsdash\`
//! - [`MemoryStore`]: process-local, for embedding and tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use opsdash_shared::StorageError;

/// String key-value storage that outlives the page (or process).
pub trait DurableStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: DurableStore + ?Sized> DurableStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// Serialize `value` as JSON and store it under `key`.
pub fn save_json<S, T>(store: &S, key: &str, value: &T) -> Result<(), StorageError>
where
    S: DurableStore + ?Sized,
    T: serde::Serialize,
{
    let json = serde_json::to_string(value).map_err(|e| StorageError::Serialization {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.set(key, &json)
}

// =========================================
// In-memory implementation
// =========================================

/// Process-local store. Can be switched off to mimic disabled storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    disabled: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails with [`StorageError::Unavailable`].
    pub fn disabled() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            disabled: true,
        }
    }

    /// Drop every entry, like clearing site data.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        if self.disabled {
            return Err(StorageError::Unavailable("storage disabled".to_string()));
        }
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store poisoned".to_string()))
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

// =========================================
// Web (WASM) implementation
// =========================================

/// The browser's `localStorage`.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStore;

#[cfg(target_arch = "wasm32")]
impl LocalStore {
    pub fn new() -> Self {
        Self
    }

    fn storage() -> Result<web_sys::Storage, StorageError> {
        let window =
            web_sys::window().ok_or_else(|| StorageError::Unavailable("no window".to_string()))?;
        match window.local_storage() {
            Ok(Some(storage)) => Ok(storage),
            Ok(None) => Err(StorageError::Unavailable("localStorage missing".to_string())),
            Err(_) => Err(StorageError::Unavailable("localStorage denied".to_string())),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl DurableStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| StorageError::Io(format!("{:?}", e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // The only way `setItem` throws on a present store is QuotaExceededError.
        Self::storage()?
            .set_item(key, value)
            .map_err(|_| StorageError::QuotaExceeded {
                key: key.to_string(),
            })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| StorageError::Io(format!("{:?}", e)))
    }
}

/// Read a cookie by name from `document.cookie`.
#[cfg(target_arch = "wasm32")]
pub fn read_cookie(name: &str) -> Option<String> {
    use wasm_bindgen::JsCast;

    let document = web_sys::window()?.document()?;
    let cookies = document.dyn_into::<web_sys::HtmlDocument>().ok()?.cookie().ok()?;
    cookies.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name && !v.is_empty()).then(|| v.to_string())
    })
}

// =========================================
// Native implementation
// =========================================

/// Files under the platform config directory, one per key.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: Option<std::path::PathBuf>,
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl LocalStore {
    pub fn new() -> Self {
        Self {
            root: dirs::config_dir().map(|dir| dir.join("opsdash")),
        }
    }

    /// Store files under `root` instead of the config directory.
    pub fn at(root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn file_path(&self, key: &str) -> Result<std::path::PathBuf, StorageError> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| StorageError::Unavailable("no config directory".to_string()))?;
        // Sanitize key to be a valid filename
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        Ok(root.join(safe_key))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl DurableStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.file_path(key)?;
        match std::fs::read_to_string(path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.file_path(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        std::fs::write(path, value).map_err(|e| StorageError::Io(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.file_path(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }
}
