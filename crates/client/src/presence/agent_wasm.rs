//! Browser presence agent: DOM listeners calling the reporter synchronously.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use gloo_timers::callback::Interval;
use opsdash_shared::{ProfileChange, PROFILE_CHANGED_EVENT};
use wasm_bindgen::prelude::*;
use web_sys::{CustomEvent, Event, EventTarget, PageTransitionEvent, StorageEvent, VisibilityState};

use super::{PageEvent, PresenceReporter, Ticker};
use crate::config::PresenceConfig;
use crate::storage::LocalStore;
use crate::transport::BeaconTransport;

type WebReporter = PresenceReporter<LocalStore, BeaconTransport, IntervalTicker>;

/// Heartbeat backed by `setInterval`; dropping the `Interval` clears it.
pub struct IntervalTicker {
    reporter: Weak<RefCell<WebReporter>>,
}

impl Ticker for IntervalTicker {
    type Guard = Interval;

    fn start(&self, period: Duration) -> Interval {
        let reporter = self.reporter.clone();
        // Browsers treat delays above i32::MAX ms as zero.
        let millis = period.as_millis().min(i32::MAX as u128) as u32;
        Interval::new(millis, move || dispatch_to(&reporter, PageEvent::Tick))
    }
}

fn dispatch_to(reporter: &Weak<RefCell<WebReporter>>, event: PageEvent) {
    let Some(cell) = reporter.upgrade() else {
        return;
    };
    let Ok(mut reporter) = cell.try_borrow_mut() else {
        crate::log_debug!("Presence event {:?} arrived during another event, dropped", event);
        return;
    };
    reporter.handle(event);
}

/// A registered DOM listener, removed again on drop.
struct Listener {
    target: EventTarget,
    name: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.name, self.callback.as_ref().unchecked_ref());
    }
}

/// Owns the tab's reporter and the listeners feeding it.
///
/// Handlers run the state machine synchronously, so the final beacon is queued
/// before a `pagehide` / `beforeunload` handler returns.
pub struct PresenceAgent {
    reporter: Rc<RefCell<WebReporter>>,
    listeners: Vec<Listener>,
}

impl PresenceAgent {
    pub fn attach(config: &PresenceConfig) -> Self {
        let reporter = Rc::new_cyclic(|weak| {
            RefCell::new(PresenceReporter::new(
                config,
                LocalStore::new(),
                BeaconTransport::new(config),
                IntervalTicker {
                    reporter: weak.clone(),
                },
            ))
        });

        let mut agent = Self {
            reporter,
            listeners: Vec::new(),
        };
        agent.subscribe();
        agent.dispatch(PageEvent::Startup);
        agent
    }

    pub fn dispatch(&self, event: PageEvent) {
        dispatch_to(&Rc::downgrade(&self.reporter), event);
    }

    /// Unsubscribe from the page and report offline. Safe to call twice.
    pub fn shutdown(&mut self) {
        self.listeners.clear();
        self.dispatch(PageEvent::Unmount);
    }

    fn subscribe(&mut self) {
        let Some(window) = web_sys::window() else {
            crate::log_warn!("No window, presence agent not subscribed");
            return;
        };

        if let Some(document) = window.document() {
            let doc = document.clone();
            self.listen(document.into(), "visibilitychange", move |_| {
                Some(PageEvent::VisibilityChanged {
                    visible: doc.visibility_state() == VisibilityState::Visible,
                })
            });
        }

        let window: EventTarget = window.into();
        self.listen(window.clone(), "pagehide", |_| Some(PageEvent::PageHide));
        self.listen(window.clone(), "beforeunload", |_| Some(PageEvent::BeforeUnload));
        self.listen(window.clone(), "pageshow", |event| {
            let persisted = event
                .dyn_ref::<PageTransitionEvent>()
                .is_some_and(|e| e.persisted());
            Some(PageEvent::PageShow { persisted })
        });
        self.listen(window.clone(), "storage", |event| {
            let event = event.dyn_ref::<StorageEvent>()?;
            Some(PageEvent::StorageChanged {
                key: event.key(),
                new_value: event.new_value(),
            })
        });
        self.listen(window, PROFILE_CHANGED_EVENT, |event| {
            let detail = event.dyn_ref::<CustomEvent>()?.detail().as_string()?;
            match serde_json::from_str::<ProfileChange>(&detail) {
                Ok(change) => Some(PageEvent::ProfileChanged(change)),
                Err(e) => {
                    crate::log_debug!("Ignoring malformed profile event: {}", e);
                    None
                }
            }
        });
    }

    fn listen(
        &mut self,
        target: EventTarget,
        name: &'static str,
        to_event: impl Fn(&Event) -> Option<PageEvent> + 'static,
    ) {
        let reporter = Rc::downgrade(&self.reporter);
        let callback = Closure::wrap(Box::new(move |event: Event| {
            if let Some(page_event) = to_event(&event) {
                dispatch_to(&reporter, page_event);
            }
        }) as Box<dyn FnMut(Event)>);

        match target.add_event_listener_with_callback(name, callback.as_ref().unchecked_ref()) {
            Ok(()) => self.listeners.push(Listener {
                target,
                name,
                callback,
            }),
            Err(e) => crate::log_warn!("Could not listen for {}: {:?}", name, e),
        }
    }
}

impl Drop for PresenceAgent {
    fn drop(&mut self) {
        self.shutdown();
    }
}
