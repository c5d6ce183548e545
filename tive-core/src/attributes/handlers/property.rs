//! In-memory property binding (`.name`).

use crate::attributes::{AttributeBinding, AttributeHandler};
use crate::value::Value;

/// Assigns the value, uncoerced, to the node property `name`.
#[derive(Debug)]
pub struct PropertyHandler {
    binding: AttributeBinding,
    property: String,
}

impl PropertyHandler {
    pub fn new(binding: AttributeBinding) -> Self {
        let property = binding.surface_name().to_owned();
        Self { binding, property }
    }
}

impl AttributeHandler for PropertyHandler {
    fn init(&mut self) {
        let b = &self.binding;
        b.resolved.insert(&b.name);
        b.resolved.insert(&self.property);
        let value = b.evaluated.value.clone();
        self.update(&value);
        self.binding.dom.remove_attribute(self.binding.node, &self.binding.name);
    }

    fn update(&mut self, value: &Value) {
        let b = &self.binding;
        b.dom.set_property(b.node, &self.property, value.clone());
    }
}
