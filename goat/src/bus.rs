//! Synchronous publish/subscribe keyed by event name and subscriber id.
//!
//! Event names follow `{verb}.{name}` (`resize.sidebar`, `global.lang`).
//! Dispatch runs every subscriber of the name in subscription order on the
//! caller's thread. Subscribers are called on a snapshot taken before the
//! first callback, so a callback may subscribe or unsubscribe freely. A
//! panicking subscriber is logged and skipped; the others still run.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::container::ResizeInfo;

/// Typed payloads for the events this crate publishes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum Event {
    Resize(ResizeInfo),
    Ready { name: String },
    /// A global store key changed; `value` is None after removal
    Global { key: String, value: Option<Value> },
    Location {
        pathname: String,
        params: Map<String, Value>,
    },
    Update(Value),
    Custom(Value),
}

/// `{verb}.{name}`
pub fn event_name(verb: &str, name: &str) -> String {
    format!("{verb}.{name}")
}

pub type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

type Subscribers = HashMap<String, Vec<(String, Callback)>>;

/// Cheap to clone; clones share subscriptions.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self.lock();
        let mut names: Vec<(&String, usize)> = subscribers.iter().map(|(k, v)| (k, v.len())).collect();
        names.sort();
        f.debug_struct("EventBus").field("subscribers", &names).finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribe `id` to `event`. Subscribing the same pair again replaces the
    /// callback and keeps its position.
    pub fn subscribe<F>(&self, event: &str, id: &str, callback: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        let mut subscribers = self.lock();
        let list = subscribers.entry(event.to_string()).or_default();
        match list.iter_mut().find(|(existing, _)| existing == id) {
            Some(slot) => slot.1 = callback,
            None => list.push((id.to_string(), callback)),
        }
    }

    /// Remove the `(event, id)` subscription. Returns false when there was none.
    pub fn unsubscribe(&self, event: &str, id: &str) -> bool {
        let mut subscribers = self.lock();
        let Some(list) = subscribers.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            subscribers.remove(event);
        }
        removed
    }

    /// Deliver `payload` to every subscriber of `event`.
    pub fn dispatch(&self, event: &str, payload: &Event) {
        let snapshot: Vec<(String, Callback)> = match self.lock().get(event) {
            Some(list) => list.clone(),
            None => return,
        };
        debug!(event, subscribers = snapshot.len(), "dispatch");

        for (id, callback) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(payload))).is_err() {
                warn!(event, subscriber = %id, "subscriber panicked during dispatch");
            }
        }
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.lock().get(event).map_or(0, Vec::len)
    }

    pub fn is_subscribed(&self, event: &str, id: &str) -> bool {
        self.lock()
            .get(event)
            .is_some_and(|list| list.iter().any(|(existing, _)| existing == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Event) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move |_: &Event| {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_event_name() {
        assert_eq!(event_name("resize", "sidebar"), "resize.sidebar");
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for id in ["a", "b", "c"] {
            let seen = Arc::clone(&seen);
            bus.subscribe("update.x", id, move |_| seen.lock().unwrap().push(id));
        }
        bus.dispatch("update.x", &Event::Update(json!(1)));
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_resubscribe_replaces_in_place() {
        let bus = EventBus::new();
        let (first, cb1) = counter();
        let (second, cb2) = counter();
        bus.subscribe("e", "id", cb1);
        bus.subscribe("e", "id", cb2);
        assert_eq!(bus.subscriber_count("e"), 1);
        bus.dispatch("e", &Event::Custom(Value::Null));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_leaves_nothing_behind() {
        let bus = EventBus::new();
        let (count, cb) = counter();
        bus.subscribe("resize.a", "chart", cb);
        assert!(bus.unsubscribe("resize.a", "chart"));
        assert_eq!(bus.subscriber_count("resize.a"), 0);
        bus.dispatch("resize.a", &Event::Custom(Value::Null));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        assert!(!bus.unsubscribe("resize.a", "chart"));
        assert!(!bus.unsubscribe("never", "chart"));
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let bus = EventBus::new();
        let (count, cb) = counter();
        bus.subscribe("e", "bad", |_| panic!("boom"));
        bus.subscribe("e", "good", cb);
        bus.dispatch("e", &Event::Custom(Value::Null));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_during_dispatch() {
        let bus = EventBus::new();
        let (count, cb) = counter();
        let handle = bus.clone();
        bus.subscribe("e", "first", move |_| {
            handle.unsubscribe("e", "second");
        });
        bus.subscribe("e", "second", cb);
        bus.dispatch("e", &Event::Custom(Value::Null));
        // the snapshot was taken before the first callback ran
        assert_eq!(count.load(Ordering::SeqCst), 1);
        bus.dispatch("e", &Event::Custom(Value::Null));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = Event::Global { key: "lang".into(), value: Some(json!("es")) };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "global", "payload": {"key": "lang", "value": "es"}})
        );
    }
}
