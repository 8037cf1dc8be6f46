//! opsdash client - operator presence reporting
//!
//! Keeps the backend informed whether the signed-in operator's dashboard is
//! open: `online` heartbeats while a session is active, a best-effort
//! `offline` when the session ends or the page goes away.

pub mod logging;

pub mod client_id;
pub mod config;
pub mod presence;
pub mod session;
pub mod storage;
pub mod transport;

#[cfg(target_arch = "wasm32")]
pub mod auth_session;

#[cfg(test)]
pub(crate) mod test_support;

pub use client_id::ClientIdResolver;
pub use config::PresenceConfig;
pub use presence::{PageEvent, PresenceAgent, PresenceReporter, PresenceState, Ticker};
pub use session::SessionReader;
pub use storage::{DurableStore, LocalStore, MemoryStore};
pub use transport::{Delivery, Transport};

#[cfg(target_arch = "wasm32")]
pub use auth_session::{AuthContext, AuthProvider};
#[cfg(target_arch = "wasm32")]
pub use presence::PresenceProvider;
#[cfg(target_arch = "wasm32")]
pub use transport::BeaconTransport;

#[cfg(not(target_arch = "wasm32"))]
pub use transport::HttpTransport;
