//! Browser transport: `fetch` with `keepalive`, `navigator.sendBeacon` on teardown.

use opsdash_shared::{PresenceReport, TransportError};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{js_sys, Blob, BlobPropertyBag, Headers, Request, RequestInit, Response};

use super::{Delivery, Transport};
use crate::config::PresenceConfig;

#[derive(Debug, Clone)]
pub struct BeaconTransport {
    endpoint: String,
}

impl BeaconTransport {
    pub fn new(config: &PresenceConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
        }
    }
}

impl Transport for BeaconTransport {
    fn report(&self, report: PresenceReport, delivery: Delivery) {
        let body = match serde_json::to_string(&report) {
            Ok(body) => body,
            Err(e) => {
                crate::log_debug!("Presence report not encodable: {}", e);
                return;
            }
        };

        if delivery == Delivery::Beacon {
            match send_beacon(&self.endpoint, &body) {
                Ok(()) => return,
                Err(e) => crate::log_debug!("{}, falling back to fetch", e),
            }
        }

        if let Err(e) = fetch_keepalive(&self.endpoint, &body) {
            crate::log_debug!("Presence report for {} dropped: {}", report.name, e);
        }
    }
}

fn js_error(e: JsValue) -> TransportError {
    TransportError::Rejected(format!("{:?}", e))
}

/// Queue `body` with the browser; it is dispatched even if the page unloads.
fn send_beacon(endpoint: &str, body: &str) -> Result<(), TransportError> {
    let window = web_sys::window().ok_or_else(|| TransportError::Rejected("no window".into()))?;

    let parts = js_sys::Array::of1(&JsValue::from_str(body));
    let options = BlobPropertyBag::new();
    options.set_type("application/json");
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options).map_err(js_error)?;

    match window.navigator().send_beacon_with_opt_blob(endpoint, Some(&blob)) {
        Ok(true) => Ok(()),
        Ok(false) => Err(TransportError::Rejected("beacon not queued".into())),
        Err(e) => Err(js_error(e)),
    }
}

/// Start a keep-alive `fetch` and forget it. The response is only logged.
fn fetch_keepalive(endpoint: &str, body: &str) -> Result<(), TransportError> {
    let window = web_sys::window().ok_or_else(|| TransportError::Rejected("no window".into()))?;

    let headers = Headers::new().map_err(js_error)?;
    headers
        .set("Content-Type", "application/json")
        .map_err(js_error)?;

    let init = RequestInit::new();
    init.set_method("POST");
    init.set_keepalive(true);
    init.set_headers(&headers);
    init.set_body(&JsValue::from_str(body));

    let request = Request::new_with_str_and_init(endpoint, &init).map_err(js_error)?;
    let pending = JsFuture::from(window.fetch_with_request(&request));

    spawn_local(async move {
        match pending.await {
            Ok(value) => {
                if let Ok(response) = value.dyn_into::<Response>() {
                    if !response.ok() {
                        crate::log_debug!(
                            "{}",
                            TransportError::Http {
                                status: response.status()
                            }
                        );
                    }
                }
            }
            Err(e) => crate::log_debug!("{}", TransportError::Network(format!("{:?}", e))),
        }
    });
    Ok(())
}
