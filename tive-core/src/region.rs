//! Regions
//!
//! A region owns what one walk of a fragment created: the attribute
//! handlers bound on its nodes and the nested regions of any structural
//! directives inside it. Structural rebuilds (a conditional turning false, a
//! list item being removed, raw markup being replaced) dispose the region of
//! the content they drop.
//!
//! Disposal runs every owned handler's `destroy`, recursively disposes
//! nested regions, and marks the region dead. Subscriptions registered on
//! behalf of a dead region stop firing, and the watcher drops them the next
//! time their key is updated.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::attributes::HandlerRef;

struct RegionInner {
    label: &'static str,
    alive: Cell<bool>,
    handlers: RefCell<Vec<HandlerRef>>,
    children: RefCell<Vec<Region>>,
}

/// Ownership scope for handlers and nested regions.
#[derive(Clone)]
pub struct Region {
    inner: Rc<RegionInner>,
}

impl Region {
    /// Create a top-level region.
    pub fn new(label: &'static str) -> Self {
        Self {
            inner: Rc::new(RegionInner {
                label,
                alive: Cell::new(true),
                handlers: RefCell::new(Vec::new()),
                children: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Create a region owned by this one. Disposed children are pruned.
    pub fn child(&self, label: &'static str) -> Region {
        let child = Region::new(label);
        if !self.is_alive() {
            child.inner.alive.set(false);
        }
        let mut children = self.inner.children.borrow_mut();
        children.retain(Region::is_alive);
        children.push(child.clone());
        child
    }

    pub fn label(&self) -> &'static str {
        self.inner.label
    }

    pub fn is_alive(&self) -> bool {
        self.inner.alive.get()
    }

    /// Record a handler so it is destroyed with the region.
    pub fn own_handler(&self, handler: HandlerRef) {
        self.inner.handlers.borrow_mut().push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handlers.borrow().len()
    }

    /// Number of live nested regions.
    pub fn child_count(&self) -> usize {
        self.inner
            .children
            .borrow()
            .iter()
            .filter(|c| c.is_alive())
            .count()
    }

    /// Destroy owned handlers and nested regions. Idempotent.
    pub fn dispose(&self) {
        if !self.inner.alive.replace(false) {
            return;
        }
        let handlers = std::mem::take(&mut *self.inner.handlers.borrow_mut());
        let children = std::mem::take(&mut *self.inner.children.borrow_mut());
        tracing::debug!(
            region = self.inner.label,
            handlers = handlers.len(),
            children = children.len(),
            "disposing region"
        );
        for handler in handlers {
            handler.borrow_mut().destroy();
        }
        for child in children {
            child.dispose();
        }
    }
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("label", &self.inner.label)
            .field("alive", &self.is_alive())
            .field("handlers", &self.handler_count())
            .field("children", &self.child_count())
            .finish()
    }
}
