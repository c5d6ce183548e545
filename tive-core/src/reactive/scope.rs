//! Binding Scopes
//!
//! A scope supplies named values to expressions. The root scope reads the
//! host directly; derived scopes (one per rendered list item) add loop-local
//! bindings and delegate every other lookup to their parent.
//!
//! # Ownership
//!
//! A child holds a strong reference to its parent. Subscription callbacks
//! created while walking an item's content capture the item scope and
//! outlive the walk itself, so the parent must stay alive at least as long
//! as any child built from it.

use std::rc::Rc;

use indexmap::IndexMap;

use super::host::Host;
use crate::value::Value;

/// A binding context.
pub struct Scope {
    host: Host,
    parent: Option<Rc<Scope>>,
    locals: IndexMap<String, Value>,
}

impl Scope {
    /// The root scope of `host`.
    pub fn root(host: &Host) -> Rc<Self> {
        Rc::new(Self {
            host: host.clone(),
            parent: None,
            locals: IndexMap::new(),
        })
    }

    /// A derived scope that adds `locals` on top of `parent`.
    pub fn child(parent: &Rc<Scope>, locals: IndexMap<String, Value>) -> Rc<Self> {
        Rc::new(Self {
            host: parent.host.clone(),
            parent: Some(Rc::clone(parent)),
            locals,
        })
    }

    /// Resolve `name`: local bindings first, then the parent chain, then the
    /// host.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.locals.get(name) {
            return Some(value.clone());
        }
        match &self.parent {
            Some(parent) => parent.lookup(name),
            None => self.host.get(name),
        }
    }

    /// A binding defined directly on this scope.
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    /// Every binding defined directly on this scope, in insertion order.
    pub fn locals(&self) -> &IndexMap<String, Value> {
        &self.locals
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn parent(&self) -> Option<&Rc<Scope>> {
        self.parent.as_ref()
    }

    /// Number of scopes between this one and the root.
    pub fn depth(&self) -> usize {
        self.parent.as_ref().map_or(0, |p| p.depth() + 1)
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("locals", &self.locals)
            .field("depth", &self.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    #[test]
    fn root_reads_host() {
        let host = Host::new().with_field("title", "hi");
        let root = Scope::root(&host);
        assert_eq!(root.lookup("title"), Some(Value::from("hi")));
        assert_eq!(root.lookup("missing"), None);
        assert_eq!(root.depth(), 0);
    }

    #[test]
    fn child_shadows_and_delegates() {
        let host = Host::new()
            .with_field("item", "host item")
            .with_field("title", "hi");
        let root = Scope::root(&host);
        let child = Scope::child(
            &root,
            indexmap! { "item".to_owned() => Value::from("local"), "index".to_owned() => Value::from(0) },
        );
        let grandchild = Scope::child(&child, indexmap! { "inner".to_owned() => Value::from(true) });

        assert_eq!(child.lookup("item"), Some(Value::from("local")));
        assert_eq!(child.lookup("title"), Some(Value::from("hi")));
        assert_eq!(grandchild.lookup("index"), Some(Value::from(0)));
        assert_eq!(grandchild.lookup("inner"), Some(Value::from(true)));
        assert_eq!(grandchild.local("item"), None);
        assert_eq!(grandchild.depth(), 2);
        assert_eq!(root.lookup("item"), Some(Value::from("host item")));
    }

    #[test]
    fn lookups_see_later_host_writes() {
        let host = Host::new();
        let child = Scope::child(&Scope::root(&host), IndexMap::new());
        assert_eq!(child.lookup("late"), None);
        host.set("late", 1);
        assert_eq!(child.lookup("late"), Some(Value::from(1)));
    }
}
