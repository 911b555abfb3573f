//! Multi-listener pub/sub for pipeline and task events.

use super::event::{EventKind, PipelineEvent};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A subscribed event handler.
///
/// Handlers are compared by `Arc` identity for removal, so keep the `Arc`
/// returned by [`EventEmitter::on_fn`] (or the one you registered) if you
/// intend to unsubscribe later.
pub type EventHandler = Arc<dyn Fn(&PipelineEvent) + Send + Sync>;

/// Per-kind ordered listener lists with synchronous delivery.
///
/// Delivery order is subscription order, and `emit` runs every handler on
/// the calling thread. Cross-task delivery is handled one level up by the
/// pipeline's [`EventBuffer`](super::EventBuffer).
#[derive(Default)]
pub struct EventEmitter {
    handlers: RwLock<HashMap<EventKind, Vec<EventHandler>>>,
}

impl EventEmitter {
    /// Creates an emitter with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a handler to one event kind. Handlers fire in
    /// subscription order.
    pub fn on(&self, kind: EventKind, handler: EventHandler) {
        self.handlers.write().entry(kind).or_default().push(handler);
    }

    /// Subscribes a closure and returns the handle needed to remove it.
    pub fn on_fn<F>(&self, kind: EventKind, f: F) -> EventHandler
    where
        F: Fn(&PipelineEvent) + Send + Sync + 'static,
    {
        let handler: EventHandler = Arc::new(f);
        self.on(kind, handler.clone());
        handler
    }

    /// Subscribes one handler to every event kind. Used to forward a
    /// task's whole stream to the pipeline emitter or a wave buffer.
    pub fn on_all(&self, handler: EventHandler) {
        for kind in EventKind::ALL {
            self.on(kind, handler.clone());
        }
    }

    /// Removes a handler by identity. Returns true if it was subscribed.
    pub fn remove_listener(&self, kind: EventKind, handler: &EventHandler) -> bool {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|h| !Arc::ptr_eq(h, handler));
        list.len() < before
    }

    /// Removes a handler from every kind it is subscribed to.
    pub fn remove_from_all(&self, handler: &EventHandler) {
        let mut handlers = self.handlers.write();
        for list in handlers.values_mut() {
            list.retain(|h| !Arc::ptr_eq(h, handler));
        }
    }

    /// Delivers an event synchronously to each subscriber of its kind, in
    /// subscription order.
    pub fn emit(&self, event: &PipelineEvent) {
        let subscribers: Vec<EventHandler> = {
            let handlers = self.handlers.read();
            handlers.get(&event.kind()).cloned().unwrap_or_default()
        };
        for handler in subscribers {
            handler(event);
        }
    }

    /// Returns the number of handlers subscribed to a kind.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.handlers
            .read()
            .get(&kind)
            .map_or(0, std::vec::Vec::len)
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let total: usize = handlers.values().map(Vec::len).sum();
        f.debug_struct("EventEmitter")
            .field("kinds", &handlers.len())
            .field("handlers", &total)
            .finish()
    }
}
