//! Plain attribute binding.

use crate::attributes::{AttributeBinding, AttributeHandler};
use crate::value::Value;

/// Writes the stringified value to the attribute of the same name.
///
/// Matches every name, so it is registered last as the fallback.
#[derive(Debug)]
pub struct PlainHandler {
    binding: AttributeBinding,
}

impl PlainHandler {
    pub fn new(binding: AttributeBinding) -> Self {
        Self { binding }
    }
}

impl AttributeHandler for PlainHandler {
    fn init(&mut self) {
        self.binding.resolved.insert(&self.binding.name);
        if self.binding.evaluated.is_static() {
            return;
        }
        let value = self.binding.evaluated.value.clone();
        self.update(&value);
    }

    fn update(&mut self, value: &Value) {
        let b = &self.binding;
        b.dom.set_attribute(b.node, &b.name, &value.to_string());
    }
}
