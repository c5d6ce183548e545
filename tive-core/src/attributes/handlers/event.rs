//! Event listener binding (`@name`).

use std::rc::Rc;

use crate::attributes::{AttributeBinding, AttributeHandler};
use crate::dom::{Event, ListenerId};
use crate::value::Value;

/// Attaches the bound function as a listener for the event `name`.
///
/// The function is resolved once at init. Later changes to the fields it
/// was read from do not rebind it.
#[derive(Debug)]
pub struct EventHandler {
    binding: AttributeBinding,
    event: String,
    listener: Option<ListenerId>,
}

impl EventHandler {
    pub fn new(binding: AttributeBinding) -> Self {
        let event = binding.surface_name().to_owned();
        Self {
            binding,
            event,
            listener: None,
        }
    }
}

impl AttributeHandler for EventHandler {
    fn init(&mut self) {
        let b = &self.binding;
        b.resolved.insert(&b.name);
        match b.evaluated.value.as_function() {
            Some(function) => {
                let function = function.clone();
                let host = b.scope.host().clone();
                let id = b.dom.add_event_listener(
                    b.node,
                    &self.event,
                    Rc::new(move |event: &Event| function.call(&host, event)),
                );
                self.listener = Some(id);
            }
            None => tracing::warn!(
                event = self.event.as_str(),
                raw = b.evaluated.raw.as_str(),
                "event binding did not evaluate to a function"
            ),
        }
        b.dom.remove_attribute(b.node, &b.name);
    }

    fn update(&mut self, _: &Value) {}

    fn destroy(&mut self) {
        if let Some(id) = self.listener.take() {
            self.binding.dom.remove_event_listener(self.binding.node, id);
        }
    }

    fn tracks_updates(&self) -> bool {
        false
    }
}
