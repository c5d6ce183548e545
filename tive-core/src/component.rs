//! Component Seam
//!
//! Custom elements are mounted by an outer layer. Before the engine binds an
//! element it offers the element to the [`ComponentHook`]; an element the
//! hook accepts is skipped entirely, attributes and subtree included.

use std::collections::HashMap;
use std::rc::Rc;

use crate::dom::{Dom, NodeId};
use crate::reactive::Scope;

/// Extension point for component mounting.
pub trait ComponentHook {
    /// Mount `node` as a component if its tag is one. Returns whether it
    /// did; `false` lets the engine walk the element as plain markup.
    fn mount_component(&self, dom: &Dom, node: NodeId, scope: &Rc<Scope>) -> bool;
}

type Mounter = Box<dyn Fn(&Dom, NodeId, &Rc<Scope>)>;

/// A tag-name keyed [`ComponentHook`].
#[derive(Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Mounter>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `mount` for `tag`, replacing any earlier definition.
    pub fn define<F>(mut self, tag: &str, mount: F) -> Self
    where
        F: Fn(&Dom, NodeId, &Rc<Scope>) + 'static,
    {
        self.components.insert(tag.to_ascii_lowercase(), Box::new(mount));
        self
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.components.contains_key(&tag.to_ascii_lowercase())
    }
}

impl ComponentHook for ComponentRegistry {
    fn mount_component(&self, dom: &Dom, node: NodeId, scope: &Rc<Scope>) -> bool {
        let Some(tag) = dom.tag(node) else {
            return false;
        };
        match self.components.get(&tag.to_ascii_lowercase()) {
            Some(mount) => {
                tracing::debug!(tag = tag.as_str(), "mounting component");
                mount(dom, node, scope);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<_> = self.components.keys().collect();
        tags.sort();
        f.debug_struct("ComponentRegistry").field("tags", &tags).finish()
    }
}
