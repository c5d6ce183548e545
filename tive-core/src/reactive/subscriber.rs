//! Subscriber types for the watcher.
//!
//! A Subscriber is a callback registered against a dependency key. Text
//! bindings, attribute handlers and structural directives all subscribe
//! through this one type.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::region::Region;
use crate::value::Value;

/// Unique identifier for a subscriber.
///
/// Every registration gets a fresh ID, even when the same callback is
/// registered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback invoked with the new value of the key it is registered under.
pub type Callback = Rc<dyn Fn(&Value)>;

/// A callback registered against a dependency key.
#[derive(Clone)]
pub struct Subscriber {
    id: SubscriberId,
    notify: Callback,
    owner: Option<Region>,
}

impl Subscriber {
    /// Create a new subscriber with the given notification callback.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn(&Value) + 'static,
    {
        Self {
            id: SubscriberId::new(),
            notify: Rc::new(notify),
            owner: None,
        }
    }

    /// A subscriber that goes quiet, and is dropped by the watcher, once
    /// `owner` is disposed.
    pub fn owned<F>(owner: &Region, notify: F) -> Self
    where
        F: Fn(&Value) + 'static,
    {
        Self {
            owner: Some(owner.clone()),
            ..Self::new(notify)
        }
    }

    /// Whether the subscriber's owner, if any, is still alive.
    pub fn is_live(&self) -> bool {
        self.owner.as_ref().map_or(true, Region::is_alive)
    }

    /// Get the subscriber's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Notify the subscriber that its key changed.
    pub fn notify(&self, value: &Value) {
        (self.notify)(value);
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscriber_notify_passes_value() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        let subscriber = Subscriber::new(move |value| {
            seen_clone.borrow_mut().push(value.clone());
        });

        assert!(seen.borrow().is_empty());
        subscriber.notify(&Value::from(7));
        assert_eq!(*seen.borrow(), vec![Value::from(7)]);
    }

    #[test]
    fn owned_subscriber_follows_its_region() {
        let region = Region::new("test");
        let subscriber = Subscriber::owned(&region, |_| {});
        assert!(subscriber.is_live());
        assert!(Subscriber::new(|_| {}).is_live());

        region.dispose();
        assert!(!subscriber.is_live());
    }
}
