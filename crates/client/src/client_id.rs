//! Per-browser client identifier.
//!
//! Lets the backend tell apart heartbeats from different devices signed in to
//! the same account. One id per browser profile, not per tab.

use std::sync::Mutex;

use crate::storage::DurableStore;

pub struct ClientIdResolver<S> {
    store: S,
    key: String,
    /// Id used for the rest of this page's life once storage has failed.
    fallback: Mutex<Option<String>>,
}

impl<S: DurableStore> ClientIdResolver<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            fallback: Mutex::new(None),
        }
    }

    /// The stored identifier, creating and persisting one on first use.
    ///
    /// Never fails and never returns an empty string.
    pub fn resolve(&self) -> String {
        match self.store.get(&self.key) {
            Ok(Some(id)) if !id.trim().is_empty() => id,
            Ok(_) => {
                let id = generate_client_id();
                match self.store.set(&self.key, &id) {
                    Ok(()) => {
                        crate::log_info!("Generated client id {}", id);
                        id
                    }
                    Err(e) => {
                        crate::log_warn!("Client id not persisted: {}", e);
                        self.in_memory(|| id)
                    }
                }
            }
            Err(e) => {
                crate::log_debug!("Client id storage unavailable: {}", e);
                self.in_memory(fallback_client_id)
            }
        }
    }

    fn in_memory(&self, make: impl FnOnce() -> String) -> String {
        match self.fallback.lock() {
            Ok(mut slot) => slot.get_or_insert_with(make).clone(),
            Err(_) => make(),
        }
    }
}

/// A random UUID v4, or a timestamped id when the platform has no randomness.
pub fn generate_client_id() -> String {
    let mut bytes = [0u8; 16];
    match getrandom::getrandom(&mut bytes) {
        Ok(()) => uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .hyphenated()
            .to_string(),
        Err(e) => {
            crate::log_warn!("No secure randomness for client id: {}", e);
            fallback_client_id()
        }
    }
}

/// Lower-entropy id: a hashed fragment plus the current time in milliseconds.
pub fn fallback_client_id() -> String {
    use std::hash::{BuildHasher, Hasher};

    let now = chrono::Utc::now();
    let mut hasher = std::collections::hash_map::RandomState::new().build_hasher();
    hasher.write_i64(now.timestamp_nanos_opt().unwrap_or_default());
    let fragment = hasher.finish() as u32;
    format!("{:08x}-{}", fragment, now.timestamp_millis())
}
