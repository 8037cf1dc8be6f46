//! Native presence agent: a tokio task that owns the reporter.

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedSender, WeakUnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{PageEvent, PresenceReporter, Ticker};
use crate::config::PresenceConfig;
use crate::storage::DurableStore;
use crate::transport::Transport;

/// Runs a [`PresenceReporter`] on a background task and feeds it events in order.
///
/// The task ends after `Unmount`, either explicit via [`PresenceAgent::shutdown`]
/// or implied when every handle has been dropped.
pub struct PresenceAgent {
    events: UnboundedSender<PageEvent>,
    task: JoinHandle<()>,
}

impl PresenceAgent {
    /// Start the agent on the current tokio runtime and process `Startup`.
    pub fn spawn<S, T>(config: &PresenceConfig, store: S, transport: T) -> Self
    where
        S: DurableStore + Clone + Send + 'static,
        T: Transport + Send + 'static,
    {
        let (events, mut inbox) = mpsc::unbounded_channel();
        let ticker = ChannelTicker {
            events: events.downgrade(),
        };
        let mut reporter = PresenceReporter::new(config, store, transport, ticker);

        let task = tokio::spawn(async move {
            reporter.handle(PageEvent::Startup);
            while let Some(event) = inbox.recv().await {
                if matches!(event, PageEvent::Unmount) {
                    break;
                }
                reporter.handle(event);
            }
            reporter.handle(PageEvent::Unmount);
            crate::log_debug!("Presence agent stopped");
        });

        Self { events, task }
    }

    pub fn dispatch(&self, event: PageEvent) {
        if self.events.send(event).is_err() {
            crate::log_debug!("Presence agent already stopped, event dropped");
        }
    }

    /// Report offline if a session is active, then wait for the task to finish.
    pub async fn shutdown(self) {
        let Self { events, task } = self;
        let _ = events.send(PageEvent::Unmount);
        drop(events);
        if let Err(e) = task.await {
            crate::log_warn!("Presence agent task failed: {}", e);
        }
    }
}

/// Heartbeat driven by a tokio interval that posts `Tick` into the agent's inbox.
///
/// Holds only a weak sender so a running heartbeat never keeps the agent alive.
pub struct ChannelTicker {
    events: WeakUnboundedSender<PageEvent>,
}

/// Aborts the interval task on drop.
pub struct TickerGuard(JoinHandle<()>);

impl Drop for TickerGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Ticker for ChannelTicker {
    type Guard = TickerGuard;

    fn start(&self, period: Duration) -> TickerGuard {
        let events = self.events.clone();
        TickerGuard(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(events) = events.upgrade() else {
                    break;
                };
                if events.send(PageEvent::Tick).is_err() {
                    break;
                }
            }
        }))
    }
}
