//! Fakes shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use opsdash_shared::{PresenceReport, PresenceStatus, StorageError};

use crate::presence::Ticker;
use crate::storage::{DurableStore, MemoryStore};
use crate::transport::{Delivery, Transport};

/// Records every report instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<(PresenceReport, Delivery)>>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<(PresenceReport, Delivery)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<(String, PresenceStatus)> {
        self.sent()
            .into_iter()
            .map(|(report, _)| (report.name, report.status))
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn report(&self, report: PresenceReport, delivery: Delivery) {
        self.sent.lock().unwrap().push((report, delivery));
    }
}

/// Never fires on its own; counts how many timers were started and are still alive.
#[derive(Debug, Clone, Default)]
pub struct ManualTicker {
    started: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

impl ManualTicker {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

pub struct ManualGuard {
    live: Arc<AtomicUsize>,
}

impl Drop for ManualGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Ticker for ManualTicker {
    type Guard = ManualGuard;

    fn start(&self, _period: Duration) -> ManualGuard {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        ManualGuard {
            live: self.live.clone(),
        }
    }
}

/// A store holding a session record for `login` and an auth token.
pub fn signed_in_store(login: &str) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .set("opsdash_profile", &format!(r#"{{"loginId":"{}"}}"#, login))
        .unwrap();
    store.set("opsdash_token", "tok").unwrap();
    store
}

/// Reads succeed but every write fails, like a browser out of storage quota.
#[derive(Debug, Default)]
pub struct FullStore {
    inner: MemoryStore,
}

impl FullStore {
    /// A full store that already holds a session for `login` and a token.
    pub fn signed_in(login: &str) -> Arc<Self> {
        let inner = MemoryStore::new();
        inner
            .set("opsdash_profile", &format!(r#"{{"loginId":"{}"}}"#, login))
            .unwrap();
        inner.set("opsdash_token", "tok").unwrap();
        Arc::new(Self { inner })
    }
}

impl DurableStore for FullStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::QuotaExceeded {
            key: key.to_string(),
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

pub fn online(name: &str) -> (String, PresenceStatus) {
    (name.to_string(), PresenceStatus::Online)
}

pub fn offline(name: &str) -> (String, PresenceStatus) {
    (name.to_string(), PresenceStatus::Offline)
}
