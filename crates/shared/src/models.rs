//! Shared data models for presence reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Identity ---

/// The record identifying which account is signed in on this browser.
///
/// Owned by the session store; presence code only ever holds a cached copy.
/// Extra fields written by the dashboard (display name, roles, ...) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Account name used for presence, distinct from any display name.
    pub login_id: String,
    /// Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_in_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(login_id: impl Into<String>) -> Self {
        Self {
            login_id: login_id.into(),
            signed_in_at: Some(Utc::now()),
        }
    }

    /// Parse a stored session record.
    ///
    /// Returns `None` for missing, malformed or blank-login records so callers
    /// can treat all of them as "nobody is signed in".
    pub fn from_json(raw: Option<&str>) -> Option<Self> {
        let raw = raw?.trim();
        if raw.is_empty() || raw == "null" {
            return None;
        }
        serde_json::from_str::<Session>(raw)
            .ok()
            .filter(Session::is_valid)
    }

    pub fn is_valid(&self) -> bool {
        !self.login_id.trim().is_empty()
    }
}

/// Same-tab notification raised by sign-in / sign-out logic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChange {
    pub profile: Option<Session>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl ProfileChange {
    pub fn login(session: Session) -> Self {
        Self {
            profile: Some(session),
            action: Some("login".to_string()),
        }
    }

    pub fn logout() -> Self {
        Self {
            profile: None,
            action: Some("logout".to_string()),
        }
    }
}

// --- Presence ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Online => "online",
            PresenceStatus::Offline => "offline",
        }
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST <presence-endpoint>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceReport {
    /// The session's `login_id`.
    pub name: String,
    pub status: PresenceStatus,
    pub client_id: String,
}
