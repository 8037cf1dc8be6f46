use std::cell::RefCell;
use std::rc::Rc;

use dioxus::prelude::*;

use super::PresenceAgent;
use crate::config::PresenceConfig;

/// Reports the signed-in operator's presence for as long as it is mounted.
#[component]
pub fn PresenceProvider(children: Element) -> Element {
    let agent = use_hook(|| Rc::new(RefCell::new(PresenceAgent::attach(&PresenceConfig::default()))));

    use_drop({
        let agent = agent.clone();
        move || agent.borrow_mut().shutdown()
    });

    children
}
