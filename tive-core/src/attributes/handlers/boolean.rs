//! Presence-only attribute binding (`?name`).

use crate::attributes::{AttributeBinding, AttributeHandler};
use crate::value::Value;

/// Truthy values set `name=""`; falsy values remove `name`.
#[derive(Debug)]
pub struct BooleanHandler {
    binding: AttributeBinding,
    target: String,
}

impl BooleanHandler {
    pub fn new(binding: AttributeBinding) -> Self {
        let target = binding.surface_name().to_owned();
        Self { binding, target }
    }
}

impl AttributeHandler for BooleanHandler {
    fn init(&mut self) {
        let b = &self.binding;
        b.resolved.insert(&b.name);
        b.resolved.insert(&self.target);
        if b.evaluated.is_static() && !b.evaluated.raw.trim().is_empty() {
            tracing::warn!(
                attribute = b.name.as_str(),
                "boolean attribute has a literal value; it is treated as truthy"
            );
        }
        let value = b.evaluated.value.clone();
        self.update(&value);
        self.binding.dom.remove_attribute(self.binding.node, &self.binding.name);
    }

    fn update(&mut self, value: &Value) {
        let b = &self.binding;
        if value.is_truthy() {
            b.dom.set_attribute(b.node, &self.target, "");
        } else {
            b.dom.remove_attribute(b.node, &self.target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::handlers::test_support::binding;
    use crate::reactive::Host;

    #[test]
    fn toggles_presence() {
        let host = Host::new().with_field("off", true);
        let (dom, node, binding) = binding(&host, "?disabled", "{{ off }}");
        let resolved = binding.resolved.clone();
        let mut handler = BooleanHandler::new(binding);

        handler.init();
        assert_eq!(dom.attribute(node, "disabled").as_deref(), Some(""));
        assert!(!dom.has_attribute(node, "?disabled"));
        assert!(resolved.contains("?disabled") && resolved.contains("disabled"));

        handler.update(&Value::from(0));
        assert!(!dom.has_attribute(node, "disabled"));
        handler.update(&Value::from("yes"));
        assert!(dom.has_attribute(node, "disabled"));
    }

    #[test]
    fn missing_field_is_falsy() {
        let (dom, node, binding) = binding(&Host::new(), "?hidden", "{{ nope }}");
        BooleanHandler::new(binding).init();
        assert!(!dom.has_attribute(node, "hidden"));
    }
}
