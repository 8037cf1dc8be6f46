//! opsdash client - main entry point
//!
//! Web: a Dioxus app that keeps the operator's presence reported while open.
//! Native: a headless agent that reports presence for the stored session until
//! interrupted.

#![allow(non_snake_case)]

#[cfg(target_arch = "wasm32")]
use dioxus::prelude::*;
#[cfg(target_arch = "wasm32")]
use opsdash_client::{AuthContext, AuthProvider, PresenceProvider};

#[cfg(target_arch = "wasm32")]
fn main() {
    dioxus::launch(App);
}

#[cfg(target_arch = "wasm32")]
#[component]
fn App() -> Element {
    rsx! {
        AuthProvider {
            PresenceProvider {
                SessionBar {}
            }
        }
    }
}

/// Who is signed in, with sign-in / sign-out controls.
#[cfg(target_arch = "wasm32")]
#[component]
fn SessionBar() -> Element {
    let mut auth = use_context::<AuthContext>();
    let mut login_id = use_signal(String::new);
    let mut token = use_signal(String::new);

    match auth.login_id() {
        Some(id) => rsx! {
            div { class: "session-bar",
                span { "Signed in as {id}" }
                button { onclick: move |_| auth.logout(), "Sign out" }
            }
        },
        None => rsx! {
            form {
                class: "session-bar",
                onsubmit: move |evt| {
                    evt.prevent_default();
                    let id = login_id.read().trim().to_string();
                    if !id.is_empty() && !token.read().is_empty() {
                        auth.login(&id, &token.read());
                    }
                },
                input {
                    placeholder: "Login ID",
                    value: "{login_id}",
                    oninput: move |evt| login_id.set(evt.value()),
                }
                input {
                    r#type: "password",
                    placeholder: "Token",
                    value: "{token}",
                    oninput: move |evt| token.set(evt.value()),
                }
                button { r#type: "submit", "Sign in" }
            }
        },
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use std::time::Duration;

    use anyhow::Context;
    use opsdash_client::{HttpTransport, LocalStore, PresenceAgent, PresenceConfig};
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("opsdash_client=debug")),
        )
        .init();

    let config = PresenceConfig::from_env();
    let transport = HttpTransport::new(&config).context("presence transport")?;
    tracing::info!(
        "Reporting presence to {} every {:?}",
        transport.endpoint(),
        config.heartbeat_period()
    );

    let agent = PresenceAgent::spawn(&config, LocalStore::new(), transport.clone());

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;

    agent.shutdown().await;
    transport.flush(Duration::from_secs(2)).await;
    Ok(())
}
