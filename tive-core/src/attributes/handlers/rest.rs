//! Rest-spread binding (`...`).

use indexmap::IndexMap;

use crate::attributes::{AttributeBinding, AttributeHandler};
use crate::value::Value;

/// Copies the keys of an object value onto the node as properties.
///
/// Each application is diffed against the previous object: only keys whose
/// value changed are written, and keys already resolved by another
/// attribute of the same element are skipped. A key that disappears is
/// written as `Null`.
#[derive(Debug)]
pub struct RestHandler {
    binding: AttributeBinding,
    prev: IndexMap<String, Value>,
}

impl RestHandler {
    /// The attribute name of the rest-spread.
    pub const NAME: &'static str = "...";

    pub fn new(binding: AttributeBinding) -> Self {
        Self {
            binding,
            prev: IndexMap::new(),
        }
    }

    fn apply(&mut self, value: &Value) {
        let Some(next) = value.as_object() else {
            tracing::warn!(value = ?value, "rest-spread value is not an object; ignored");
            return;
        };
        let b = &self.binding;
        let keys = self.prev.keys().chain(next.keys().filter(|k| !self.prev.contains_key(*k)));
        for key in keys {
            if b.resolved.contains(key) {
                continue;
            }
            let incoming = next.get(key).cloned().unwrap_or_default();
            if self.prev.get(key) != Some(&incoming) {
                tracing::trace!(key = key.as_str(), "rest-spread property changed");
                b.dom.set_property(b.node, key, incoming);
            }
        }
        self.prev = next.clone();
    }
}

impl AttributeHandler for RestHandler {
    fn init(&mut self) {
        self.binding.resolved.insert(Self::NAME);
        let value = self.binding.evaluated.value.clone();
        self.apply(&value);
        self.binding.dom.remove_attribute(self.binding.node, Self::NAME);
    }

    fn update(&mut self, value: &Value) {
        self.apply(value);
    }
}
