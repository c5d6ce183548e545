//! Watcher
//!
//! The subscription registry: a map from dependency key to the ordered list
//! of callbacks that must run when that key changes. Every directive and
//! attribute handler goes through this single notification path.
//!
//! # Re-entrancy
//!
//! Callbacks routinely mutate the tree, and a callback that renders new
//! content registers that content's own subscriptions. Dispatch therefore
//! iterates a snapshot of the subscriber list taken before the first
//! callback runs:
//!
//! - registering during dispatch never panics;
//! - a subscriber added while key `k` is being dispatched first fires on the
//!   *next* `update(k, ..)`;
//! - no subscriber fires twice within one dispatch.
//!
//! There is no removal primitive. A subscriber registered with an owning
//! [`Region`] stops firing once that region is disposed, and the next
//! `update` of its key drops it from the registry.

use std::cell::RefCell;
use std::collections::HashMap;

use super::subscriber::{Subscriber, SubscriberId};
use crate::region::Region;
use crate::value::Value;

/// Dependency key → ordered subscribers.
#[derive(Default)]
pub struct Watcher {
    callbacks: RefCell<HashMap<String, Vec<Subscriber>>>,
}

impl Watcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `callback` to the subscribers of `key`.
    ///
    /// No deduplication is done: registering the same closure twice makes it
    /// fire twice.
    pub fn add_watch_listener<F>(&self, key: &str, callback: F) -> SubscriberId
    where
        F: Fn(&Value) + 'static,
    {
        self.add_subscriber(key, Subscriber::new(callback))
    }

    /// Append `callback` on behalf of `owner`. It is skipped and later
    /// dropped once `owner` is disposed.
    pub fn add_owned_listener<F>(&self, key: &str, owner: &Region, callback: F) -> SubscriberId
    where
        F: Fn(&Value) + 'static,
    {
        self.add_subscriber(key, Subscriber::owned(owner, callback))
    }

    /// Append an existing subscriber to the list for `key`.
    ///
    /// Dead subscribers of `key` are dropped whenever the list is about to
    /// grow, so keys that are never updated stay bounded too.
    pub fn add_subscriber(&self, key: &str, subscriber: Subscriber) -> SubscriberId {
        let id = subscriber.id();
        let mut callbacks = self.callbacks.borrow_mut();
        let subscribers = callbacks.entry(key.to_owned()).or_default();
        if subscribers.len() == subscribers.capacity() {
            subscribers.retain(Subscriber::is_live);
        }
        subscribers.push(subscriber);
        drop(callbacks);
        tracing::trace!(key, ?id, "watch listener added");
        id
    }

    /// Invoke every subscriber of `key` in registration order.
    ///
    /// Returns the number of subscribers notified. Unknown keys are a no-op.
    /// Subscribers whose owner is dead, including owners disposed by an
    /// earlier callback of this dispatch, are skipped and then dropped.
    pub fn update(&self, key: &str, value: &Value) -> usize {
        let snapshot = match self.callbacks.borrow().get(key) {
            Some(subscribers) => subscribers.clone(),
            None => return 0,
        };

        tracing::trace!(key, subscribers = snapshot.len(), "dispatching update");
        let mut notified = 0;
        for subscriber in &snapshot {
            if subscriber.is_live() {
                subscriber.notify(value);
                notified += 1;
            }
        }
        self.prune(key);
        notified
    }

    /// Drop the dead subscribers of `key`, and the key once it has none.
    fn prune(&self, key: &str) {
        let Ok(mut callbacks) = self.callbacks.try_borrow_mut() else {
            return;
        };
        let Some(subscribers) = callbacks.get_mut(key) else {
            return;
        };
        let before = subscribers.len();
        subscribers.retain(Subscriber::is_live);
        let dropped = before - subscribers.len();
        if subscribers.is_empty() {
            callbacks.remove(key);
        }
        if dropped > 0 {
            tracing::trace!(key, dropped, "dead subscribers dropped");
        }
    }

    /// Number of subscribers registered for `key`.
    pub fn listener_count(&self, key: &str) -> usize {
        self.callbacks.borrow().get(key).map_or(0, Vec::len)
    }

    /// Every key with at least one subscriber, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.callbacks.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher").field("keys", &self.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn update_without_subscribers_is_noop() {
        let watcher = Watcher::new();
        assert_eq!(watcher.update("missing", &Value::Null), 0);
    }

    #[test]
    fn callbacks_fire_in_registration_order() {
        let watcher = Watcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let log = log.clone();
            watcher.add_watch_listener("count", move |value| {
                log.borrow_mut().push(format!("{tag}:{value}"));
            });
        }

        assert_eq!(watcher.update("count", &Value::from(3)), 3);
        assert_eq!(*log.borrow(), vec!["first:3", "second:3", "third:3"]);
    }

    #[test]
    fn same_callback_twice_fires_twice() {
        let watcher = Watcher::new();
        let hits = Rc::new(Cell::new(0));
        let subscriber = {
            let hits = hits.clone();
            Subscriber::new(move |_| hits.set(hits.get() + 1))
        };
        watcher.add_subscriber("k", subscriber.clone());
        watcher.add_subscriber("k", subscriber);

        watcher.update("k", &Value::Null);
        assert_eq!(hits.get(), 2);
        assert_eq!(watcher.listener_count("k"), 2);
    }

    #[test]
    fn listeners_added_during_dispatch_wait_for_next_update() {
        let watcher = Rc::new(Watcher::new());
        let inner_hits = Rc::new(Cell::new(0));
        let outer_hits = Rc::new(Cell::new(0));

        {
            let watcher_ref = Rc::downgrade(&watcher);
            let inner_hits = inner_hits.clone();
            let outer_hits = outer_hits.clone();
            watcher.add_watch_listener("k", move |_| {
                outer_hits.set(outer_hits.get() + 1);
                if let Some(watcher) = watcher_ref.upgrade() {
                    let inner_hits = inner_hits.clone();
                    watcher.add_watch_listener("k", move |_| {
                        inner_hits.set(inner_hits.get() + 1);
                    });
                }
            });
        }

        watcher.update("k", &Value::Null);
        assert_eq!(outer_hits.get(), 1);
        assert_eq!(inner_hits.get(), 0);

        watcher.update("k", &Value::Null);
        assert_eq!(outer_hits.get(), 2);
        assert_eq!(inner_hits.get(), 1);
    }

    #[test]
    fn disposed_owners_are_skipped_and_dropped() {
        let watcher = Watcher::new();
        let kept = Region::new("kept");
        let gone = Region::new("gone");
        let hits = Rc::new(RefCell::new(Vec::new()));
        for (tag, region) in [("kept", &kept), ("gone", &gone)] {
            let hits = hits.clone();
            watcher.add_owned_listener("k", region, move |_| hits.borrow_mut().push(tag));
        }
        assert_eq!(watcher.listener_count("k"), 2);

        gone.dispose();
        assert_eq!(watcher.update("k", &Value::Null), 1);
        assert_eq!(*hits.borrow(), vec!["kept"]);
        assert_eq!(watcher.listener_count("k"), 1);

        kept.dispose();
        assert_eq!(watcher.update("k", &Value::Null), 0);
        assert!(watcher.keys().is_empty());
    }

    #[test]
    fn registration_drops_dead_subscribers_of_quiet_keys() {
        let watcher = Watcher::new();
        for _ in 0..100 {
            let region = Region::new("item");
            watcher.add_owned_listener("local", &region, |_| {});
            region.dispose();
        }
        let live = Region::new("live");
        watcher.add_owned_listener("local", &live, |_| {});
        assert!(watcher.listener_count("local") <= 8);
    }

    #[test]
    fn owner_disposed_mid_dispatch_is_skipped() {
        let watcher = Watcher::new();
        let region = Region::new("later");
        let hits = Rc::new(Cell::new(0));
        {
            let region = region.clone();
            watcher.add_watch_listener("k", move |_| region.dispose());
        }
        {
            let hits = hits.clone();
            watcher.add_owned_listener("k", &region, move |_| hits.set(hits.get() + 1));
        }

        assert_eq!(watcher.update("k", &Value::Null), 1);
        assert_eq!(hits.get(), 0);
        assert_eq!(watcher.listener_count("k"), 1);
    }

    #[test]
    fn keys_are_independent() {
        let watcher = Watcher::new();
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            watcher.add_watch_listener("a", move |_| hits.set(hits.get() + 1));
        }
        watcher.update("b", &Value::Null);
        assert_eq!(hits.get(), 0);
        assert_eq!(watcher.keys(), vec!["a".to_owned()]);
    }
}
