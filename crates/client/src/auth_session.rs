//! Authentication session management with localStorage persistence.
//!
//! Credentials are checked by the backend; this module only records the result
//! and tells the rest of the tab about it.

use dioxus::prelude::*;
use opsdash_shared::{ProfileChange, Session, PROFILE_CHANGED_EVENT, SESSION_KEY, TOKEN_KEY};
use wasm_bindgen::JsValue;
use web_sys::{CustomEvent, CustomEventInit};

use crate::config::PresenceConfig;
use crate::session::SessionReader;
use crate::storage::{save_json, DurableStore, LocalStore};

/// Authentication context provided to the app
#[derive(Clone, Copy, Debug)]
pub struct AuthContext {
    pub session: Signal<Option<Session>>,
}

/// Provider component that sets up auth context
#[component]
pub fn AuthProvider(children: Element) -> Element {
    let session =
        use_signal(|| SessionReader::new(LocalStore::new(), &PresenceConfig::default()).load());

    use_context_provider(|| AuthContext { session });

    children
}

impl AuthContext {
    /// Record a successful sign-in and announce it to this tab.
    pub fn login(&mut self, login_id: &str, token: &str) {
        let session = Session::new(login_id.trim());
        let store = LocalStore::new();
        // Token first: other tabs re-check the profile when the token lands.
        if let Err(e) = store.set(TOKEN_KEY, token) {
            crate::log_warn!("Auth token not persisted: {}", e);
        }
        if let Err(e) = save_json(&store, SESSION_KEY, &session) {
            crate::log_warn!("Session not persisted: {}", e);
        }
        self.session.set(Some(session.clone()));
        announce(&ProfileChange::login(session));
    }

    /// Logout and clear session
    pub fn logout(&mut self) {
        let store = LocalStore::new();
        let _ = store.remove(TOKEN_KEY);
        let _ = store.remove(SESSION_KEY);
        self.session.set(None);
        announce(&ProfileChange::logout());
    }

    /// Check if user is authenticated
    pub fn is_authenticated(&self) -> bool {
        self.session.read().is_some()
    }

    pub fn login_id(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.login_id.clone())
    }
}

/// Raise the same-tab profile event the presence agent listens for.
fn announce(change: &ProfileChange) {
    let Ok(detail) = serde_json::to_string(change) else {
        return;
    };
    let Some(window) = web_sys::window() else {
        return;
    };

    let init = CustomEventInit::new();
    init.set_detail(&JsValue::from_str(&detail));
    match CustomEvent::new_with_event_init_dict(PROFILE_CHANGED_EVENT, &init) {
        Ok(event) => {
            let _ = window.dispatch_event(&event);
        }
        Err(e) => crate::log_debug!("Profile event not raised: {:?}", e),
    }
}
