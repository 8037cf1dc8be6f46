//! Protocol constants shared between the dashboard client and the backend.

/// Path of the presence endpoint, relative to the backend origin.
pub const PRESENCE_PATH: &str = "/api/presence";

/// Heartbeat period used when nothing else is configured.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// Upper bound for a single foreground report.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Durable key holding the JSON session record.
pub const SESSION_KEY: &str = "opsdash_profile";

/// Durable key (or cookie) holding the auth token. Only its presence matters here.
pub const TOKEN_KEY: &str = "opsdash_token";

/// Durable key holding the per-browser client identifier.
pub const CLIENT_ID_KEY: &str = "opsdash_client_id";

/// Name of the same-tab `CustomEvent` raised on sign-in / sign-out.
pub const PROFILE_CHANGED_EVENT: &str = "opsdash:profile-changed";
