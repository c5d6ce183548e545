//! Retained Node Tree
//!
//! The tree the engine keeps in sync with the host. It is a small arena of
//! nodes addressed by [`NodeId`], shared through a cloneable [`Dom`] handle.
//!
//! # Design Decisions
//!
//! 1. Nodes live in a flat arena and are never freed. Detached nodes stay
//!    addressable, which keeps ids handed to closures valid for as long as
//!    the arena lives.
//!
//! 2. Every operation borrows the arena for the duration of the call only.
//!    Listeners are cloned out before they are invoked, so a listener may
//!    mutate the tree (directly or through the host) without re-entrancy
//!    panics.
//!
//! 3. Inserting a fragment moves its children, mirroring how document
//!    fragments behave in a browser.

mod html;
mod node;
mod parse;

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::Value;

pub use node::{Listener, ListenerId, NodeId, NodeKind};
pub use parse::ParseError;

use node::{ElementData, Node, NodeData};

/// An event delivered to listeners.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event name, e.g. `click`.
    pub name: String,
    /// The element the event was dispatched on.
    pub target: NodeId,
    /// Arbitrary payload supplied by the dispatcher.
    pub detail: Value,
}

struct Arena {
    nodes: Vec<Node>,
    next_listener: u64,
}

impl Arena {
    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.raw()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.raw()]
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|c| *c != id);
        }
    }

    fn insert_at(&mut self, parent: NodeId, child: NodeId, index: usize) {
        self.detach(child);
        let siblings = &mut self.node_mut(parent).children;
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        self.node_mut(child).parent = Some(parent);
    }

    fn clone_deep(&mut self, id: NodeId) -> NodeId {
        let (data, children) = {
            let node = self.node(id);
            let data = match &node.data {
                NodeData::Element(el) => {
                    let mut copy = ElementData::new(&el.tag);
                    copy.attributes = el.attributes.clone();
                    NodeData::Element(copy)
                }
                NodeData::Text(t) => NodeData::Text(t.clone()),
                NodeData::Comment(c) => NodeData::Comment(c.clone()),
                NodeData::Fragment => NodeData::Fragment,
            };
            (data, node.children.clone())
        };
        let content = self.node(id).element().and_then(|el| el.content);

        let copy = self.push(Node::new(data));
        for child in children {
            let child_copy = self.clone_deep(child);
            let len = self.node(copy).children.len();
            self.insert_at(copy, child_copy, len);
        }
        if let Some(content) = content {
            let content_copy = self.clone_deep(content);
            if let Some(el) = self.node_mut(copy).element_mut() {
                el.content = Some(content_copy);
            }
        }
        copy
    }
}

/// Shared handle to a node arena.
///
/// Cloning the handle shares the arena.
#[derive(Clone)]
pub struct Dom {
    arena: Rc<RefCell<Arena>>,
}

impl Dom {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            arena: Rc::new(RefCell::new(Arena {
                nodes: Vec::new(),
                next_listener: 0,
            })),
        }
    }

    /// Total number of nodes ever allocated.
    pub fn node_count(&self) -> usize {
        self.arena.borrow().nodes.len()
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Create a detached element. `template` elements get a content
    /// fragment.
    pub fn create_element(&self, tag: &str) -> NodeId {
        let mut arena = self.arena.borrow_mut();
        let content = (tag == "template").then(|| arena.push(Node::new(NodeData::Fragment)));
        let mut data = ElementData::new(tag);
        data.content = content;
        arena.push(Node::new(NodeData::Element(data)))
    }

    pub fn create_text(&self, text: &str) -> NodeId {
        self.arena
            .borrow_mut()
            .push(Node::new(NodeData::Text(text.to_owned())))
    }

    pub fn create_comment(&self, text: &str) -> NodeId {
        self.arena
            .borrow_mut()
            .push(Node::new(NodeData::Comment(text.to_owned())))
    }

    pub fn create_fragment(&self) -> NodeId {
        self.arena.borrow_mut().push(Node::new(NodeData::Fragment))
    }

    /// Parse markup into a fresh fragment.
    pub fn parse_fragment(&self, markup: &str) -> Result<NodeId, ParseError> {
        parse::parse_into(self, markup)
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.arena.borrow().node(id).kind()
    }

    pub fn tag(&self, id: NodeId) -> Option<String> {
        self.arena.borrow().node(id).element().map(|el| el.tag.clone())
    }

    /// Whether the node is a `<template>` element.
    pub fn is_template(&self, id: NodeId) -> bool {
        self.template_content(id).is_some()
    }

    /// The content fragment of a `<template>` element.
    pub fn template_content(&self, id: NodeId) -> Option<NodeId> {
        self.arena.borrow().node(id).element().and_then(|el| el.content)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.borrow().node(id).parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.arena.borrow().node(id).children.clone()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena.borrow().node(id).children.first().copied()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let arena = self.arena.borrow();
        let parent = arena.node(id).parent?;
        let siblings = &arena.node(parent).children;
        let index = siblings.iter().position(|c| *c == id)?;
        siblings.get(index + 1).copied()
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` before `reference` (or at the end when `None`).
    ///
    /// Fragments are unpacked: their children are moved in order and the
    /// fragment is left empty. A reference that is not a child of `parent`
    /// degrades to an append.
    pub fn insert_before(&self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if Some(child) == reference {
            return;
        }
        if self.kind(child) == NodeKind::Fragment {
            for moved in self.children(child) {
                self.insert_before(parent, moved, reference);
            }
            return;
        }

        let mut arena = self.arena.borrow_mut();
        arena.detach(child);
        let index = match reference {
            Some(reference) => match arena.node(parent).children.iter().position(|c| *c == reference) {
                Some(index) => index,
                None => {
                    tracing::warn!(?parent, ?reference, "insert reference is not a child; appending");
                    arena.node(parent).children.len()
                }
            },
            None => arena.node(parent).children.len(),
        };
        arena.insert_at(parent, child, index);
    }

    /// Detach a node from its parent. The node stays addressable.
    pub fn remove(&self, id: NodeId) {
        self.arena.borrow_mut().detach(id);
    }

    /// Replace `id` with `replacements` at the same position.
    ///
    /// Returns `false` (and does nothing) when `id` has no parent.
    pub fn replace_with(&self, id: NodeId, replacements: &[NodeId]) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        for replacement in replacements {
            self.insert_before(parent, *replacement, Some(id));
        }
        self.remove(id);
        true
    }

    /// Copy a node. Attributes, text and template content are copied;
    /// properties and listeners are not.
    pub fn clone_node(&self, id: NodeId) -> NodeId {
        self.arena.borrow_mut().clone_deep(id)
    }

    /// Clone the content of a `<template>` into a fresh fragment.
    pub fn clone_content(&self, template: NodeId) -> Option<NodeId> {
        let content = self.template_content(template)?;
        Some(self.clone_node(content))
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// Data of a text or comment node.
    pub fn text(&self, id: NodeId) -> Option<String> {
        match &self.arena.borrow().node(id).data {
            NodeData::Text(t) | NodeData::Comment(t) => Some(t.clone()),
            _ => None,
        }
    }

    pub fn set_text(&self, id: NodeId, text: &str) {
        match &mut self.arena.borrow_mut().node_mut(id).data {
            NodeData::Text(t) | NodeData::Comment(t) => {
                t.clear();
                t.push_str(text);
            }
            _ => tracing::warn!(?id, "set_text on a node without character data"),
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let arena = self.arena.borrow();
        let mut out = String::new();
        collect_text(&arena, id, &mut out);
        out
    }

    // ------------------------------------------------------------------
    // Attributes and properties
    // ------------------------------------------------------------------

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.arena
            .borrow()
            .node(id)
            .element()
            .and_then(|el| el.attributes.get(name).cloned())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Attributes in source order.
    pub fn attributes(&self, id: NodeId) -> Vec<(String, String)> {
        self.arena
            .borrow()
            .node(id)
            .element()
            .map(|el| {
                el.attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_attribute(&self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.arena.borrow_mut().node_mut(id).element_mut() {
            el.attributes.insert(name.to_owned(), value.to_owned());
        }
    }

    pub fn remove_attribute(&self, id: NodeId, name: &str) {
        if let Some(el) = self.arena.borrow_mut().node_mut(id).element_mut() {
            el.attributes.shift_remove(name);
        }
    }

    pub fn property(&self, id: NodeId, name: &str) -> Option<Value> {
        self.arena
            .borrow()
            .node(id)
            .element()
            .and_then(|el| el.properties.get(name).cloned())
    }

    pub fn set_property(&self, id: NodeId, name: &str, value: Value) {
        if let Some(el) = self.arena.borrow_mut().node_mut(id).element_mut() {
            el.properties.insert(name.to_owned(), value);
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener(&self, id: NodeId, name: &str, listener: Listener) -> ListenerId {
        let mut arena = self.arena.borrow_mut();
        let listener_id = ListenerId(arena.next_listener);
        arena.next_listener += 1;
        if let Some(el) = arena.node_mut(id).element_mut() {
            el.listeners.push((listener_id, name.to_owned(), listener));
        }
        listener_id
    }

    /// Remove a listener. Returns whether it was attached.
    pub fn remove_event_listener(&self, id: NodeId, listener: ListenerId) -> bool {
        let mut arena = self.arena.borrow_mut();
        let Some(el) = arena.node_mut(id).element_mut() else {
            return false;
        };
        let before = el.listeners.len();
        el.listeners.retain(|(l, _, _)| *l != listener);
        el.listeners.len() != before
    }

    pub fn listener_count(&self, id: NodeId, name: &str) -> usize {
        self.arena
            .borrow()
            .node(id)
            .element()
            .map(|el| el.listeners.iter().filter(|(_, n, _)| n == name).count())
            .unwrap_or(0)
    }

    /// Invoke every listener for `name` on `target`, in attach order.
    ///
    /// Returns the number of listeners invoked.
    pub fn dispatch_event(&self, target: NodeId, name: &str, detail: Value) -> usize {
        let listeners: Vec<Listener> = self
            .arena
            .borrow()
            .node(target)
            .element()
            .map(|el| {
                el.listeners
                    .iter()
                    .filter(|(_, n, _)| n == name)
                    .map(|(_, _, l)| Rc::clone(l))
                    .collect()
            })
            .unwrap_or_default();

        let event = Event {
            name: name.to_owned(),
            target,
            detail,
        };
        for listener in &listeners {
            listener(&event);
        }
        listeners.len()
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize a node and its subtree.
    pub fn to_html(&self, id: NodeId) -> String {
        let arena = self.arena.borrow();
        let mut out = String::new();
        html::write_node(&arena, id, &mut out);
        out
    }

    /// Serialize only the children of a node.
    pub fn inner_html(&self, id: NodeId) -> String {
        let arena = self.arena.borrow();
        let mut out = String::new();
        for child in &arena.node(id).children {
            html::write_node(&arena, *child, &mut out);
        }
        out
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dom")
            .field("node_count", &self.node_count())
            .finish()
    }
}

fn collect_text(arena: &Arena, id: NodeId, out: &mut String) {
    let node = arena.node(id);
    if let NodeData::Text(t) = &node.data {
        out.push_str(t);
    }
    for child in &node.children {
        collect_text(arena, *child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn list(dom: &Dom, names: &[&str]) -> (NodeId, Vec<NodeId>) {
        let parent = dom.create_element("ul");
        let items = names
            .iter()
            .map(|n| {
                let li = dom.create_element("li");
                let text = dom.create_text(n);
                dom.append_child(li, text);
                dom.append_child(parent, li);
                li
            })
            .collect();
        (parent, items)
    }

    #[test]
    fn insert_before_moves_existing_child() {
        let dom = Dom::new();
        let (ul, items) = list(&dom, &["a", "b", "c"]);

        dom.insert_before(ul, items[2], Some(items[0]));
        assert_eq!(dom.children(ul), vec![items[2], items[0], items[1]]);
        assert_eq!(dom.inner_html(ul), "<li>c</li><li>a</li><li>b</li>");
    }

    #[test]
    fn inserting_fragment_moves_children() {
        let dom = Dom::new();
        let (ul, items) = list(&dom, &["a"]);
        let frag = dom.create_fragment();
        let x = dom.create_text("x");
        let y = dom.create_text("y");
        dom.append_child(frag, x);
        dom.append_child(frag, y);

        dom.insert_before(ul, frag, Some(items[0]));
        assert_eq!(dom.children(ul), vec![x, y, items[0]]);
        assert!(dom.children(frag).is_empty());
        assert_eq!(dom.parent(x), Some(ul));
    }

    #[test]
    fn replace_with_keeps_position() {
        let dom = Dom::new();
        let (ul, items) = list(&dom, &["a", "b", "c"]);
        let start = dom.create_comment("");
        let end = dom.create_comment("");

        assert!(dom.replace_with(items[1], &[start, end]));
        assert_eq!(dom.children(ul), vec![items[0], start, end, items[2]]);
        assert_eq!(dom.parent(items[1]), None);
        assert!(!dom.replace_with(items[1], &[]));
    }

    #[test]
    fn next_sibling_walks_parent() {
        let dom = Dom::new();
        let (_, items) = list(&dom, &["a", "b"]);
        assert_eq!(dom.next_sibling(items[0]), Some(items[1]));
        assert_eq!(dom.next_sibling(items[1]), None);
    }

    #[test]
    fn clone_copies_attributes_and_template_content() {
        let dom = Dom::new();
        let frag = dom
            .parse_fragment(r#"<template if="{{ a }}"><b class="x">hi</b></template>"#)
            .unwrap();
        let template = dom.first_child(frag).unwrap();
        dom.set_property(template, "p", Value::from(1));

        let copy = dom.clone_node(template);
        assert_ne!(copy, template);
        assert_eq!(dom.to_html(copy), dom.to_html(template));
        assert_eq!(dom.property(copy, "p"), None);

        let original_content = dom.template_content(template).unwrap();
        let copied_content = dom.template_content(copy).unwrap();
        assert_ne!(original_content, copied_content);
    }

    #[test]
    fn dispatch_invokes_listeners_in_order_and_allows_mutation() {
        let dom = Dom::new();
        let button = dom.create_element("button");
        let hits = Rc::new(Cell::new(0));

        let first = {
            let hits = hits.clone();
            let tree = dom.clone();
            dom.add_event_listener(
                button,
                "click",
                Rc::new(move |event: &Event| {
                    hits.set(hits.get() + 1);
                    tree.set_attribute(event.target, "clicked", "");
                }),
            )
        };
        {
            let hits = hits.clone();
            dom.add_event_listener(
                button,
                "click",
                Rc::new(move |_: &Event| hits.set(hits.get() * 10)),
            );
        }

        assert_eq!(dom.dispatch_event(button, "click", Value::Null), 2);
        assert_eq!(hits.get(), 10);
        assert!(dom.has_attribute(button, "clicked"));

        assert!(dom.remove_event_listener(button, first));
        assert!(!dom.remove_event_listener(button, first));
        assert_eq!(dom.listener_count(button, "click"), 1);
    }

    #[test]
    fn attributes_keep_source_order() {
        let dom = Dom::new();
        let el = dom.create_element("div");
        dom.set_attribute(el, "b", "1");
        dom.set_attribute(el, "a", "2");
        dom.set_attribute(el, "c", "3");
        dom.remove_attribute(el, "a");
        let names: Vec<_> = dom.attributes(el).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "c"]);
    }
}
