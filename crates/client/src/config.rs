//! Presence reporter configuration.

use std::time::Duration;

use opsdash_shared::{
    CLIENT_ID_KEY, DEFAULT_HEARTBEAT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, PRESENCE_PATH,
    SESSION_KEY, TOKEN_KEY,
};

/// Endpoint used by the native agent when `OPSDASH_PRESENCE_ENDPOINT` is unset.
pub const DEFAULT_NATIVE_ENDPOINT: &str = "http://localhost:8080/api/presence";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceConfig {
    /// Where reports are POSTed. Relative paths resolve against the page origin.
    pub endpoint: String,
    pub heartbeat_interval: Duration,
    pub request_timeout: Duration,
    pub session_key: String,
    pub token_key: String,
    pub client_id_key: String,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            endpoint: PRESENCE_PATH.to_string(),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            session_key: SESSION_KEY.to_string(),
            token_key: TOKEN_KEY.to_string(),
            client_id_key: CLIENT_ID_KEY.to_string(),
        }
    }
}

impl PresenceConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// The heartbeat period to schedule; a zero interval falls back to the default.
    pub fn heartbeat_period(&self) -> Duration {
        if self.heartbeat_interval.is_zero() {
            crate::log_warn!(
                "Zero heartbeat interval configured, using {}s",
                DEFAULT_HEARTBEAT_SECS
            );
            return Duration::from_secs(DEFAULT_HEARTBEAT_SECS);
        }
        self.heartbeat_interval
    }

    /// Parse configuration from environment variables.
    ///
    /// Environment variables:
    /// - `OPSDASH_PRESENCE_ENDPOINT`: absolute URL (default: `http://localhost:8080/api/presence`)
    /// - `OPSDASH_HEARTBEAT_SECS`: heartbeat period in seconds (default: 30)
    /// - `OPSDASH_REQUEST_TIMEOUT_SECS`: per-report timeout in seconds (default: 10)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let endpoint = std::env::var("OPSDASH_PRESENCE_ENDPOINT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_NATIVE_ENDPOINT.to_string());

        Self {
            endpoint,
            heartbeat_interval: secs_from_env("OPSDASH_HEARTBEAT_SECS")
                .unwrap_or(defaults.heartbeat_interval),
            request_timeout: secs_from_env("OPSDASH_REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout),
            ..defaults
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn secs_from_env(name: &str) -> Option<Duration> {
    let raw = std::env::var(name).ok()?;
    let parsed = parse_secs(&raw);
    if parsed.is_none() {
        crate::log_warn!("Ignoring {}={:?}: expected a positive number of seconds", name, raw);
    }
    parsed
}

/// Positive whole seconds; zero and garbage are rejected.
pub fn parse_secs(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(secs) => Some(Duration::from_secs(secs)),
    }
}
