//! Attribute Handlers
//!
//! Every attribute on a walked element is routed to exactly one handler.
//! Handlers come from an ordered list of [`HandlerFactory`]s; the first
//! factory whose predicate accepts the attribute name builds the handler.
//!
//! # Handler Lifecycle
//!
//! ```text
//! create(binding) -> init() -> update(value)* -> destroy()
//! ```
//!
//! `init` applies the initial value and claims the names it owns in the
//! element's [`Resolved`] set. `update` runs whenever a dependency of the
//! attribute's expression is notified. `destroy` runs when the region that
//! owns the handler is disposed.
//!
//! # Resolution
//!
//! Handlers that bind a surface name (`?hidden` owns `hidden`, `.value`
//! owns `value`) record both the raw and the surface name. A later
//! rest-spread never overwrites a resolved name.

mod handlers;
mod pattern;
mod registry;

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexSet;

use crate::dom::{Dom, NodeId};
use crate::expr::Evaluated;
use crate::reactive::Scope;
use crate::value::Value;

pub use handlers::{
    BooleanHandler, Builtin, EventHandler, PlainHandler, PropertyHandler, RestHandler,
};
pub use pattern::NamePattern;
pub use registry::{AttributeRegistry, AttributeTarget};

/// A live attribute binding.
pub trait AttributeHandler {
    /// Apply the initial value and claim resolved names.
    fn init(&mut self);

    /// Apply a re-evaluated value.
    fn update(&mut self, value: &Value);

    /// Release anything the handler attached to the node.
    fn destroy(&mut self) {}

    /// Whether the dispatcher should subscribe `update` to the expression's
    /// dependencies. Event bindings are evaluated once.
    fn tracks_updates(&self) -> bool {
        true
    }
}

/// Selects and builds handlers for attribute names.
pub trait HandlerFactory {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Whether this factory handles `attribute`.
    fn test(&self, attribute: &str) -> bool;

    fn create(&self, binding: AttributeBinding) -> Box<dyn AttributeHandler>;
}

/// Shared handle to a handler owned by a [`Region`](crate::Region).
pub type HandlerRef = Rc<RefCell<Box<dyn AttributeHandler>>>;

/// Names already claimed on one element, shared by all of its handlers.
#[derive(Debug, Clone, Default)]
pub struct Resolved(Rc<RefCell<IndexSet<String>>>);

impl Resolved {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str) {
        self.0.borrow_mut().insert(name.to_owned());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.borrow().contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// Everything a handler is constructed with.
#[derive(Debug, Clone)]
pub struct AttributeBinding {
    pub dom: Dom,
    pub node: NodeId,
    /// Raw attribute name, prefix included.
    pub name: String,
    pub evaluated: Evaluated,
    pub scope: Rc<Scope>,
    pub resolved: Resolved,
}

impl AttributeBinding {
    /// The attribute name without its one-character prefix.
    pub fn surface_name(&self) -> &str {
        let mut chars = self.name.chars();
        chars.next();
        chars.as_str()
    }
}
