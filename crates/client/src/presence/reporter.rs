//! The presence state machine.

use std::time::Duration;

use opsdash_shared::{PresenceReport, PresenceStatus, Session};

use super::{PageEvent, Ticker};
use crate::client_id::ClientIdResolver;
use crate::config::PresenceConfig;
use crate::session::SessionReader;
use crate::storage::DurableStore;
use crate::transport::{Delivery, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    /// No session cached, no heartbeat.
    Idle,
    /// Session cached and heartbeat running.
    Active,
}

/// Turns page lifecycle and session changes into presence reports.
///
/// One instance per tab. The cached session changes only through
/// [`PresenceReporter::handle`]. A session is cached exactly while a heartbeat
/// guard is held.
pub struct PresenceReporter<S, T, K: Ticker> {
    sessions: SessionReader<S>,
    client_ids: ClientIdResolver<S>,
    transport: T,
    ticker: K,
    interval: Duration,
    session: Option<Session>,
    heartbeat: Option<K::Guard>,
}

impl<S, T, K> PresenceReporter<S, T, K>
where
    S: DurableStore + Clone,
    T: Transport,
    K: Ticker,
{
    pub fn new(config: &PresenceConfig, store: S, transport: T, ticker: K) -> Self {
        Self {
            sessions: SessionReader::new(store.clone(), config),
            client_ids: ClientIdResolver::new(store, config.client_id_key.clone()),
            transport,
            ticker,
            interval: config.heartbeat_period(),
            session: None,
            heartbeat: None,
        }
    }

    pub fn state(&self) -> PresenceState {
        if self.heartbeat.is_some() {
            PresenceState::Active
        } else {
            PresenceState::Idle
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn handle(&mut self, event: PageEvent) {
        match event {
            PageEvent::Startup | PageEvent::PageShow { .. } => self.sync_from_storage(),
            PageEvent::VisibilityChanged { visible: true } => self.resend_online(),
            // Background tabs keep their heartbeat; only teardown ends presence.
            PageEvent::VisibilityChanged { visible: false } => {}
            PageEvent::PageHide | PageEvent::BeforeUnload | PageEvent::Unmount => {
                self.stop(Delivery::Beacon)
            }
            PageEvent::StorageChanged { key, new_value } => {
                self.on_storage_changed(key.as_deref(), new_value.as_deref())
            }
            PageEvent::ProfileChanged(change) => {
                self.apply(change.profile.filter(Session::is_valid))
            }
            PageEvent::Tick => {
                if self.heartbeat.is_some() {
                    self.resend_online();
                }
            }
        }
    }

    fn sync_from_storage(&mut self) {
        match self.sessions.load() {
            Some(session) => self.start(session),
            None => self.stop(Delivery::KeepAlive),
        }
    }

    fn on_storage_changed(&mut self, key: Option<&str>, new_value: Option<&str>) {
        match key {
            // storage.clear()
            None => self.apply(None),
            Some(key) if key == self.sessions.session_key() => {
                self.apply(Session::from_json(new_value))
            }
            Some(key) if key == self.sessions.token_key() => {
                let stored = self.sessions.stored_session();
                self.apply(stored)
            }
            Some(_) => {}
        }
    }

    /// Adopt `next` as the signed-in session, gated on the auth token.
    fn apply(&mut self, next: Option<Session>) {
        match next {
            Some(session) if self.sessions.token_present() => self.start(session),
            _ => self.stop(Delivery::KeepAlive),
        }
    }

    fn start(&mut self, session: Session) {
        let previous = self.session.replace(session.clone());

        if self.heartbeat.is_some() {
            if let Some(previous) = previous.filter(|p| p.login_id != session.login_id) {
                crate::log_info!(
                    "Presence switching from {} to {}",
                    previous.login_id,
                    session.login_id
                );
                self.send(&previous, PresenceStatus::Offline, Delivery::KeepAlive);
                self.send(&session, PresenceStatus::Online, Delivery::KeepAlive);
            }
            return;
        }

        crate::log_info!("Presence active for {}", session.login_id);
        self.send(&session, PresenceStatus::Online, Delivery::KeepAlive);
        self.heartbeat = Some(self.ticker.start(self.interval));
    }

    fn stop(&mut self, delivery: Delivery) {
        drop(self.heartbeat.take());
        if let Some(previous) = self.session.take() {
            crate::log_info!("Presence ended for {}", previous.login_id);
            self.send(&previous, PresenceStatus::Offline, delivery);
        }
    }

    fn resend_online(&self) {
        if let Some(session) = &self.session {
            self.send(session, PresenceStatus::Online, Delivery::KeepAlive);
        }
    }

    fn send(&self, session: &Session, status: PresenceStatus, delivery: Delivery) {
        let report = PresenceReport {
            name: session.login_id.clone(),
            status,
            client_id: self.client_ids.resolve(),
        };
        crate::log_debug!("Reporting {} for {} via {:?}", status, report.name, delivery);
        self.transport.report(report, delivery);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{offline, online, signed_in_store, ManualTicker, RecordingTransport};
    use crate::storage::MemoryStore;
    use opsdash_shared::ProfileChange;
    use std::sync::Arc;

    type TestReporter = PresenceReporter<Arc<MemoryStore>, RecordingTransport, ManualTicker>;

    fn reporter(store: &Arc<MemoryStore>) -> (TestReporter, RecordingTransport, ManualTicker) {
        let transport = RecordingTransport::default();
        let ticker = ManualTicker::default();
        let reporter = PresenceReporter::new(
            &PresenceConfig::default(),
            store.clone(),
            transport.clone(),
            ticker.clone(),
        );
        (reporter, transport, ticker)
    }

    fn active(login: &str) -> (TestReporter, RecordingTransport, ManualTicker, Arc<MemoryStore>) {
        let store = signed_in_store(login);
        let (mut reporter, transport, ticker) = reporter(&store);
        reporter.handle(PageEvent::Startup);
        assert_eq!(reporter.state(), PresenceState::Active);
        (reporter, transport, ticker, store)
    }

    #[test]
    fn startup_without_session_stays_idle() {
        let store = Arc::new(MemoryStore::new());
        let (mut reporter, transport, ticker) = reporter(&store);

        reporter.handle(PageEvent::Startup);
        reporter.handle(PageEvent::Tick);
        reporter.handle(PageEvent::VisibilityChanged { visible: true });

        assert_eq!(reporter.state(), PresenceState::Idle);
        assert!(transport.sent().is_empty());
        assert_eq!(ticker.started(), 0);
    }

    #[test]
    fn session_without_token_stays_idle() {
        let store = Arc::new(MemoryStore::new());
        store.set("opsdash_profile", r#"{"loginId":"alice"}"#).unwrap();
        let (mut reporter, transport, _) = reporter(&store);

        reporter.handle(PageEvent::Startup);
        assert_eq!(reporter.state(), PresenceState::Idle);
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn repeated_start_keeps_one_timer_and_one_immediate_send() {
        let (mut reporter, transport, ticker, _store) = active("alice");

        reporter.handle(PageEvent::Startup);
        reporter.handle(PageEvent::PageShow { persisted: true });
        reporter.handle(PageEvent::ProfileChanged(ProfileChange::login(Session::new("alice"))));

        assert_eq!(transport.statuses(), vec![online("alice")]);
        assert_eq!(ticker.started(), 1);
        assert_eq!(ticker.live(), 1);
    }

    #[test]
    fn page_hide_sends_one_beacon_offline_and_silences_heartbeat() {
        let (mut reporter, transport, ticker, _store) = active("alice");

        reporter.handle(PageEvent::PageHide);
        reporter.handle(PageEvent::BeforeUnload);
        reporter.handle(PageEvent::Tick);
        reporter.handle(PageEvent::VisibilityChanged { visible: true });

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].0.name, "alice");
        assert_eq!(sent[1].0.status, PresenceStatus::Offline);
        assert_eq!(sent[1].1, Delivery::Beacon);
        assert_eq!(reporter.state(), PresenceState::Idle);
        assert_eq!(ticker.live(), 0);
    }

    #[test]
    fn page_show_after_hide_resumes_from_storage() {
        let (mut reporter, transport, ticker, _store) = active("alice");

        reporter.handle(PageEvent::PageHide);
        reporter.handle(PageEvent::PageShow { persisted: true });

        assert_eq!(reporter.state(), PresenceState::Active);
        assert_eq!(
            transport.statuses(),
            vec![
                online("alice"),
                offline("alice"),
                online("alice"),
            ]
        );
        assert_eq!(ticker.started(), 2);
        assert_eq!(ticker.live(), 1);
    }

    #[test]
    fn visibility_resume_sends_extra_online_without_touching_timer() {
        let (mut reporter, transport, ticker, _store) = active("alice");

        reporter.handle(PageEvent::VisibilityChanged { visible: false });
        reporter.handle(PageEvent::VisibilityChanged { visible: true });

        assert_eq!(
            transport.statuses(),
            vec![
                online("alice"),
                online("alice"),
            ]
        );
        assert_eq!(ticker.started(), 1);
        assert_eq!(ticker.live(), 1);
        assert_eq!(reporter.state(), PresenceState::Active);
    }

    #[test]
    fn cross_tab_logout_reports_offline() {
        let (mut reporter, transport, ticker, store) = active("bob");

        store.remove("opsdash_token").unwrap();
        store.remove("opsdash_profile").unwrap();
        reporter.handle(PageEvent::StorageChanged {
            key: Some("opsdash_profile".into()),
            new_value: None,
        });

        assert_eq!(reporter.state(), PresenceState::Idle);
        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].0.name, "bob");
        assert_eq!(sent[1].0.status, PresenceStatus::Offline);
        assert_eq!(sent[1].1, Delivery::KeepAlive);
        assert_eq!(ticker.live(), 0);
    }

    #[test]
    fn token_removal_in_another_tab_ends_presence() {
        let (mut reporter, transport, _, store) = active("bob");

        store.remove("opsdash_token").unwrap();
        reporter.handle(PageEvent::StorageChanged {
            key: Some("opsdash_token".into()),
            new_value: None,
        });

        assert_eq!(reporter.state(), PresenceState::Idle);
        assert_eq!(transport.statuses().last(), Some(&offline("bob")));
    }

    #[test]
    fn storage_clear_ends_presence() {
        let (mut reporter, transport, _, store) = active("bob");

        store.clear();
        reporter.handle(PageEvent::StorageChanged {
            key: None,
            new_value: None,
        });

        assert_eq!(reporter.state(), PresenceState::Idle);
        assert_eq!(transport.sent().len(), 2);
    }

    #[test]
    fn unrelated_storage_keys_are_ignored() {
        let (mut reporter, transport, _, _store) = active("bob");

        reporter.handle(PageEvent::StorageChanged {
            key: Some("dashboard_layout".into()),
            new_value: None,
        });

        assert_eq!(reporter.state(), PresenceState::Active);
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn sign_in_from_another_tab_waits_for_token() {
        let store = Arc::new(MemoryStore::new());
        let (mut reporter, transport, _) = reporter(&store);
        reporter.handle(PageEvent::Startup);

        let record = r#"{"loginId":"carol"}"#;
        store.set("opsdash_profile", record).unwrap();
        reporter.handle(PageEvent::StorageChanged {
            key: Some("opsdash_profile".into()),
            new_value: Some(record.into()),
        });
        assert_eq!(reporter.state(), PresenceState::Idle);
        assert!(transport.sent().is_empty());

        store.set("opsdash_token", "tok").unwrap();
        reporter.handle(PageEvent::StorageChanged {
            key: Some("opsdash_token".into()),
            new_value: Some("tok".into()),
        });
        assert_eq!(reporter.state(), PresenceState::Active);
        assert_eq!(transport.statuses(), vec![online("carol")]);
    }

    #[test]
    fn same_tab_logout_reports_offline() {
        let (mut reporter, transport, _, store) = active("dave");

        store.remove("opsdash_token").unwrap();
        reporter.handle(PageEvent::ProfileChanged(ProfileChange::logout()));

        assert_eq!(reporter.state(), PresenceState::Idle);
        assert_eq!(transport.sent()[1].1, Delivery::KeepAlive);
        assert_eq!(transport.statuses()[1], offline("dave"));
    }

    #[test]
    fn account_switch_moves_presence_and_ticks_report_latest() {
        let (mut reporter, transport, ticker, _store) = active("alice");

        reporter.handle(PageEvent::ProfileChanged(ProfileChange::login(Session::new("bob"))));
        reporter.handle(PageEvent::Tick);

        assert_eq!(
            transport.statuses(),
            vec![
                online("alice"),
                offline("alice"),
                online("bob"),
                online("bob"),
            ]
        );
        assert_eq!(ticker.started(), 1);
        assert_eq!(reporter.session().map(|s| s.login_id.as_str()), Some("bob"));
    }

    #[test]
    fn blank_profile_is_treated_as_logout() {
        let (mut reporter, transport, _, _store) = active("alice");

        reporter.handle(PageEvent::ProfileChanged(ProfileChange {
            profile: Some(Session::new("  ")),
            action: Some("login".into()),
        }));

        assert_eq!(reporter.state(), PresenceState::Idle);
        assert_eq!(transport.statuses()[1], offline("alice"));
    }

    #[test]
    fn every_report_carries_the_same_client_id() {
        let (mut reporter, transport, _, store) = active("alice");

        reporter.handle(PageEvent::Tick);
        reporter.handle(PageEvent::Unmount);

        let stored = store.get("opsdash_client_id").unwrap().unwrap();
        let sent = transport.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|(report, _)| report.client_id == stored));
    }

    #[test]
    fn dropping_the_reporter_cancels_the_heartbeat() {
        let (reporter, _, ticker, _store) = active("alice");
        assert_eq!(ticker.live(), 1);
        drop(reporter);
        assert_eq!(ticker.live(), 0);
    }
}
