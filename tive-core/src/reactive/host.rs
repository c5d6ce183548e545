//! Host
//!
//! The live data model a template is bound to. A host owns its named fields,
//! the [`Watcher`] that fans field changes out to bindings, and the
//! [`FrameScheduler`] that drives deferred list mounting.
//!
//! Writes go through [`Host::set`], which stores the value first and then
//! notifies, so callbacks that re-evaluate expressions observe the new
//! value.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use super::scheduler::FrameScheduler;
use super::watcher::Watcher;
use crate::value::Value;

struct HostInner {
    fields: RefCell<IndexMap<String, Value>>,
    watcher: Watcher,
    frames: FrameScheduler,
}

/// Shared handle to a host object.
///
/// Cloning the handle shares fields and subscriptions.
#[derive(Clone)]
pub struct Host {
    inner: Rc<HostInner>,
}

impl Host {
    /// Create a host with no fields.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(HostInner {
                fields: Default::default(),
                watcher: Watcher::new(),
                frames: FrameScheduler::new(),
            }),
        }
    }

    /// Create a host seeded from a JSON object. Non-object input yields an
    /// empty host.
    pub fn from_json(fields: serde_json::Value) -> Self {
        let host = Self::new();
        if let Value::Object(map) = Value::from(fields) {
            *host.inner.fields.borrow_mut() = map;
        }
        host
    }

    /// Builder-style field initialisation. Does not notify.
    pub fn with_field(self, name: &str, value: impl Into<Value>) -> Self {
        self.inner
            .fields
            .borrow_mut()
            .insert(name.to_owned(), value.into());
        self
    }

    /// Read a field.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner.fields.borrow().get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner.fields.borrow().contains_key(name)
    }

    /// Field names in definition order.
    pub fn field_names(&self) -> Vec<String> {
        self.inner.fields.borrow().keys().cloned().collect()
    }

    /// Store `value` under `name`, then notify every subscriber of `name`.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        self.inner
            .fields
            .borrow_mut()
            .insert(name.to_owned(), value.clone());
        tracing::debug!(field = name, "host field set");
        self.inner.watcher.update(name, &value);
    }

    /// Re-broadcast the current value of `name` (or `Null` when unset).
    pub fn notify(&self, name: &str) {
        let value = self.get(name).unwrap_or_default();
        self.inner.watcher.update(name, &value);
    }

    pub fn watcher(&self) -> &Watcher {
        &self.inner.watcher
    }

    pub fn frames(&self) -> &FrameScheduler {
        &self.inner.frames
    }

    /// Run deferred frames until idle.
    pub fn flush(&self) -> usize {
        self.inner.frames.flush()
    }

    /// Whether two handles point to the same host.
    pub fn ptr_eq(&self, other: &Host) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("fields", &self.field_names())
            .field("watcher", &self.inner.watcher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    #[test]
    fn set_stores_before_notifying() {
        let host = Host::from_json(json!({ "count": 1 }));
        let observed = Rc::new(RefCell::new(Vec::new()));
        {
            let host_ref = host.clone();
            let observed = observed.clone();
            host.watcher().add_watch_listener("count", move |value| {
                observed
                    .borrow_mut()
                    .push((value.clone(), host_ref.get("count")));
            });
        }

        host.set("count", 2);
        let observed = observed.borrow();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0].0, Value::from(2));
        assert_eq!(observed[0].1, Some(Value::from(2)));
    }

    #[test]
    fn notify_rebroadcasts_current_value() {
        let host = Host::new().with_field("name", "a");
        let seen = Rc::new(RefCell::new(None));
        {
            let seen = seen.clone();
            host.watcher()
                .add_watch_listener("name", move |value| *seen.borrow_mut() = Some(value.clone()));
        }
        host.notify("name");
        assert_eq!(*seen.borrow(), Some(Value::from("a")));
    }

    #[test]
    fn clones_share_state() {
        let host = Host::new();
        let other = host.clone();
        host.set("x", true);
        assert_eq!(other.get("x"), Some(Value::from(true)));
        assert!(host.ptr_eq(&other));
        assert!(!host.ptr_eq(&Host::new()));
    }

    #[test]
    fn from_json_ignores_non_objects() {
        assert!(Host::from_json(json!([1, 2])).field_names().is_empty());
        let host = Host::from_json(json!({ "b": 1, "a": 2 }));
        assert_eq!(host.field_names().len(), 2);
        assert_eq!(host.get("a"), Some(Value::from(2)));
    }
}
