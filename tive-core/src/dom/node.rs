//! Tree Nodes
//!
//! This module defines the node types that live in the retained tree arena.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::Event;
use crate::value::Value;

/// Identifier of a node in a [`Dom`](super::Dom) arena.
///
/// Ids are only meaningful for the arena that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the raw arena index.
    pub fn raw(&self) -> usize {
        self.0
    }
}

/// Identifier of an attached event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// A listener attached to an element.
pub type Listener = Rc<dyn Fn(&Event)>;

/// The kind of node in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    /// Comments double as region anchors.
    Comment,
    /// A parentless container whose children are moved out on insertion.
    Fragment,
}

/// Element-only state.
pub(crate) struct ElementData {
    pub(crate) tag: String,
    /// Surface attributes, in source order.
    pub(crate) attributes: IndexMap<String, String>,
    /// In-memory properties set by `.name` bindings and rest-spreads.
    pub(crate) properties: IndexMap<String, Value>,
    pub(crate) listeners: Vec<(ListenerId, String, Listener)>,
    /// Content fragment of a `<template>` element.
    pub(crate) content: Option<NodeId>,
}

impl ElementData {
    pub(crate) fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_owned(),
            attributes: IndexMap::new(),
            properties: IndexMap::new(),
            listeners: Vec::new(),
            content: None,
        }
    }
}

pub(crate) enum NodeData {
    Element(ElementData),
    Text(String),
    Comment(String),
    Fragment,
}

/// A node in the arena.
pub(crate) struct Node {
    pub(crate) data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Comment(_) => NodeKind::Comment,
            NodeData::Fragment => NodeKind::Fragment,
        }
    }

    pub(crate) fn element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Node");
        s.field("kind", &self.kind());
        if let Some(el) = self.element() {
            s.field("tag", &el.tag).field("attributes", &el.attributes);
        }
        s.field("parent", &self.parent)
            .field("children", &self.children)
            .finish()
    }
}
