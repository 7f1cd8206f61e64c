//! Handler registry keyed by event type.
//!
//! Handlers for one event type run in registration order. A handler may
//! subscribe or unsubscribe (itself or others) while a message is being
//! delivered; a handler removed mid-delivery is not called for that message.

use super::envelope::Envelope;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

type Handler = Rc<RefCell<dyn FnMut(&Value)>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<String, Vec<(u64, Handler)>>,
}

impl Registry {
    fn contains(&self, event_type: &str, id: u64) -> bool {
        self.handlers
            .get(event_type)
            .is_some_and(|list| list.iter().any(|(h, _)| *h == id))
    }

    fn remove(&mut self, event_type: &str, id: u64) -> bool {
        let Some(list) = self.handlers.get_mut(event_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|(h, _)| *h != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.handlers.remove(event_type);
        }
        removed
    }
}

/// Shared, single-threaded subscriber set. Clones refer to the same set.
#[derive(Clone, Default)]
pub struct SubscriptionHub {
    inner: Rc<RefCell<Registry>>,
}

/// Handle returned by [`SubscriptionHub::subscribe`]. Dropping it keeps
/// the handler registered; call [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<RefCell<Registry>>,
    event_type: String,
    id: u64,
}

impl Subscription {
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Remove exactly this handler. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.borrow_mut().remove(&self.event_type, self.id),
            None => false,
        }
    }
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, event_type: &str, handler: F) -> Subscription
    where
        F: FnMut(&Value) + 'static,
    {
        let mut registry = self.inner.borrow_mut();
        registry.next_id += 1;
        let id = registry.next_id;
        let handler: Handler = Rc::new(RefCell::new(handler));
        registry
            .handlers
            .entry(event_type.to_string())
            .or_default()
            .push((id, handler));
        log::debug!("[Realtime] subscribed #{} to '{}'", id, event_type);

        Subscription {
            registry: Rc::downgrade(&self.inner),
            event_type: event_type.to_string(),
            id,
        }
    }

    /// Deliver `envelope` to every handler of its type. Returns how many
    /// handlers ran.
    pub fn dispatch(&self, envelope: &Envelope) -> usize {
        let snapshot: Vec<(u64, Handler)> = match self.inner.borrow().handlers.get(&envelope.event_type) {
            Some(list) => list.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for (id, handler) in snapshot {
            if !self.inner.borrow().contains(&envelope.event_type, id) {
                continue;
            }
            match handler.try_borrow_mut() {
                Ok(mut callback) => {
                    (&mut *callback)(&envelope.payload);
                    delivered += 1;
                }
                Err(_) => log::warn!(
                    "[Realtime] handler #{} for '{}' re-entered, skipped",
                    id,
                    envelope.event_type
                ),
            }
        }
        delivered
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.inner
            .borrow()
            .handlers
            .get(event_type)
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().handlers.is_empty()
    }
}
