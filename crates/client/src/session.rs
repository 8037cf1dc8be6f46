//! Read side of the session store.

use opsdash_shared::Session;

use crate::config::PresenceConfig;
use crate::storage::DurableStore;

/// Reads "who is signed in" and "may we report presence" from durable storage.
#[derive(Debug, Clone)]
pub struct SessionReader<S> {
    store: S,
    session_key: String,
    token_key: String,
}

impl<S: DurableStore> SessionReader<S> {
    pub fn new(store: S, config: &PresenceConfig) -> Self {
        Self {
            store,
            session_key: config.session_key.clone(),
            token_key: config.token_key.clone(),
        }
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    /// The stored session, if one exists and the auth token is present.
    pub fn load(&self) -> Option<Session> {
        if !self.token_present() {
            return None;
        }
        self.stored_session()
    }

    /// The stored session record regardless of the token gate.
    pub fn stored_session(&self) -> Option<Session> {
        match self.store.get(&self.session_key) {
            Ok(raw) => Session::from_json(raw.as_deref()),
            Err(e) => {
                crate::log_debug!("Session record unreadable, treating as signed out: {}", e);
                None
            }
        }
    }

    pub fn token_present(&self) -> bool {
        let stored = match self.store.get(&self.token_key) {
            Ok(token) => token.is_some_and(|t| !t.trim().is_empty()),
            Err(e) => {
                crate::log_debug!("Auth token unreadable: {}", e);
                false
            }
        };

        #[cfg(target_arch = "wasm32")]
        let stored = stored || crate::storage::read_cookie(&self.token_key).is_some();

        stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn reader(store: &Arc<MemoryStore>) -> SessionReader<Arc<MemoryStore>> {
        SessionReader::new(store.clone(), &PresenceConfig::default())
    }

    #[test]
    fn requires_both_session_and_token() {
        let store = Arc::new(MemoryStore::new());
        let sessions = reader(&store);
        assert_eq!(sessions.load(), None);

        store.set("opsdash_profile", r#"{"loginId":"alice"}"#).unwrap();
        assert_eq!(sessions.load(), None);
        assert!(sessions.stored_session().is_some());

        store.set("opsdash_token", "tok").unwrap();
        assert_eq!(sessions.load().map(|s| s.login_id), Some("alice".to_string()));
    }

    #[test]
    fn blank_token_does_not_count() {
        let store = Arc::new(MemoryStore::new());
        store.set("opsdash_profile", r#"{"loginId":"alice"}"#).unwrap();
        store.set("opsdash_token", "  ").unwrap();
        assert_eq!(reader(&store).load(), None);
    }

    #[test]
    fn malformed_record_is_no_session() {
        let store = Arc::new(MemoryStore::new());
        store.set("opsdash_profile", "{{{").unwrap();
        store.set("opsdash_token", "tok").unwrap();
        assert_eq!(reader(&store).load(), None);
    }

    #[test]
    fn unavailable_storage_is_no_session() {
        let sessions = SessionReader::new(MemoryStore::disabled(), &PresenceConfig::default());
        assert!(!sessions.token_present());
        assert_eq!(sessions.load(), None);
    }
}
