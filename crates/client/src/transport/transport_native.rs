//! Native transport using reqwest on the ambient tokio runtime.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use opsdash_shared::{PresenceReport, TransportError};
use reqwest::Client;
use tokio::task::JoinSet;
use url::Url;

use super::{Delivery, Transport};
use crate::config::PresenceConfig;

/// POSTs reports as JSON. Clones share the client and the in-flight set.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    /// Final reports a shutting-down process should wait for.
    in_flight: Arc<Mutex<JoinSet<()>>>,
}

impl HttpTransport {
    pub fn new(config: &PresenceConfig) -> Result<Self, TransportError> {
        let endpoint =
            Url::parse(&config.endpoint).map_err(|e| TransportError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                reason: e.to_string(),
            })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(TransportError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                reason: format!("unsupported scheme '{}'", endpoint.scheme()),
            });
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            in_flight: Arc::new(Mutex::new(JoinSet::new())),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Wait up to `timeout` for beacon-mode reports still in flight.
    ///
    /// Native stand-in for the browser keeping a beacon alive past unload:
    /// call it after the agent has shut down and before the runtime exits.
    pub async fn flush(&self, timeout: Duration) {
        let mut pending = match self.in_flight.lock() {
            Ok(mut set) => std::mem::take(&mut *set),
            Err(_) => return,
        };
        if pending.is_empty() {
            return;
        }

        let drained = tokio::time::timeout(timeout, async {
            while pending.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            crate::log_warn!("Gave up on {} presence report(s) after {:?}", pending.len(), timeout);
        }
    }
}

impl Transport for HttpTransport {
    fn report(&self, report: PresenceReport, delivery: Delivery) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            crate::log_warn!("No tokio runtime, dropping {} report for {}", report.status, report.name);
            return;
        };

        let task = deliver(self.client.clone(), self.endpoint.clone(), report);
        match delivery {
            Delivery::KeepAlive => {
                runtime.spawn(task);
            }
            Delivery::Beacon => match self.in_flight.lock() {
                Ok(mut set) => {
                    set.spawn_on(task, &runtime);
                }
                Err(_) => {
                    runtime.spawn(task);
                }
            },
        }
    }
}

async fn deliver(client: Client, endpoint: Url, report: PresenceReport) {
    match post(&client, endpoint, &report).await {
        Ok(()) => crate::log_debug!("Reported {} for {}", report.status, report.name),
        Err(e) => crate::log_debug!(
            "Presence report ({} for {}) dropped: {}",
            report.status,
            report.name,
            e
        ),
    }
}

async fn post(client: &Client, endpoint: Url, report: &PresenceReport) -> Result<(), TransportError> {
    let response = client
        .post(endpoint)
        .json(report)
        .send()
        .await
        .map_err(|e| TransportError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Http {
            status: status.as_u16(),
        });
    }
    Ok(())
}
