//! Presence tracking for the signed-in operator.
//!
//! This module provides:
//! - [`PresenceReporter`]: the Idle/Active state machine deciding when to
//!   report `online` / `offline`
//! - [`PageEvent`]: every input the state machine reacts to
//! - [`PresenceAgent`]: the platform dispatcher that owns a reporter, feeds it
//!   lifecycle events and drives its heartbeat
//!
//! # Architecture
//!
//! ```text
//!  page lifecycle ─┐
//!  storage events ─┼──► PresenceAgent ──► PresenceReporter ──► Transport
//!  profile events ─┤      (dispatcher)      (Idle / Active)      (KeepAlive / Beacon)
//!  heartbeat tick ─┘
//! ```
//!
//! The agent subscribes to its event sources when built and unsubscribes when
//! dropped or shut down, which also stops the heartbeat.

use std::time::Duration;

use opsdash_shared::ProfileChange;

mod reporter;

pub use reporter::{PresenceReporter, PresenceState};

/// Inputs to the presence state machine. All are edge-triggered.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// First load; reads the session from durable storage.
    Startup,
    VisibilityChanged { visible: bool },
    PageHide,
    BeforeUnload,
    /// Page shown again, possibly restored from the back/forward cache.
    PageShow { persisted: bool },
    /// Another tab changed durable storage. `key` is `None` when storage was cleared.
    StorageChanged {
        key: Option<String>,
        new_value: Option<String>,
    },
    /// Sign-in / sign-out in this tab.
    ProfileChanged(ProfileChange),
    /// Heartbeat timer fired.
    Tick,
    /// The owning agent or component is going away.
    Unmount,
}

/// Source of repeating heartbeat ticks.
pub trait Ticker {
    /// Keeps the timer running; dropping it cancels the timer.
    type Guard;

    fn start(&self, period: Duration) -> Self::Guard;
}

// Include platform-specific implementation
#[cfg(target_arch = "wasm32")]
mod agent_wasm;
#[cfg(target_arch = "wasm32")]
mod provider;
#[cfg(target_arch = "wasm32")]
pub use agent_wasm::{IntervalTicker, PresenceAgent};
#[cfg(target_arch = "wasm32")]
pub use provider::PresenceProvider;

#[cfg(not(target_arch = "wasm32"))]
mod agent_native;
#[cfg(not(target_arch = "wasm32"))]
pub use agent_native::{ChannelTicker, PresenceAgent, TickerGuard};
