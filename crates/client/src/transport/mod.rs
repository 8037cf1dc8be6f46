//! Delivery of presence reports to the backend.
//!
//! Reports are advisory telemetry: [`Transport::report`] has no result, callers
//! never wait on it, and implementations log failures and drop them. The next
//! heartbeat is the only retry.

use opsdash_shared::PresenceReport;

/// How hard the platform should try to get a report out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Normal request with a keep-alive hint, used while the page is alive.
    KeepAlive,
    /// Queue-and-forget delivery that survives page unload, used for the final
    /// offline report. Falls back to a plain request where unavailable.
    Beacon,
}

pub trait Transport {
    fn report(&self, report: PresenceReport, delivery: Delivery);
}

// Include platform-specific implementation
#[cfg(target_arch = "wasm32")]
mod transport_wasm;
#[cfg(target_arch = "wasm32")]
pub use transport_wasm::BeaconTransport;

#[cfg(not(target_arch = "wasm32"))]
mod transport_native;
#[cfg(not(target_arch = "wasm32"))]
pub use transport_native::HttpTransport;
