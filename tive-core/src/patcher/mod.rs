//! Keyed List Patcher
//!
//! Reconciles a rendered list against a new ordered list of item contexts
//! with the fewest structural mutations.
//!
//! # Algorithm
//!
//! ```text
//! old order:  A B C D          source index of each new item:
//! new order:  A C B D E   ->   [0, 2, 1, 3, -]
//!
//! LIS over the source indices: positions {0, 2, 3} (A B D) stay put.
//! Walk back to front: E is inserted before the anchor, C is moved before B.
//! ```
//!
//! 1. Each new item's key is looked up in the current map. A hit reuses the
//!    existing [`NodeGroup`] and records its old position; a miss renders a
//!    new group.
//! 2. The longest increasing subsequence of old positions marks the reused
//!    groups that are already in relative order.
//! 3. Walking the new list from the back, every group that is new or not on
//!    that subsequence is inserted before the first node of the next placed
//!    group (or before the end anchor).
//! 4. Groups whose keys disappeared are detached and their regions disposed.
//!
//! # Design Decisions
//!
//! 1. Rendering happens before any mutation. A render error leaves the
//!    mounted list exactly as it was.
//!
//! 2. A duplicate key within one call keeps its first occurrence. The later
//!    ones are dropped with a warning rather than silently overwriting the
//!    first group.
//!
//! 3. Empty groups are legal. The insertion reference skips over them.
//!
//! 4. A group is moved and removed as the live sibling range from its first
//!    to its last rendered node. Nested regions inside an item add and drop
//!    nodes between their own anchors, which stay inside that range.

mod lis;

pub use lis::longest_increasing_subsequence;

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::dom::{Dom, NodeId};
use crate::error::{Result, TemplateError};
use crate::region::Region;
use crate::value::Value;

/// Item identity across patches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    /// Derive a key from an evaluated value. Integral numbers become
    /// [`Key::Int`], everything else is stringified.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Key::Int(*n as i64),
            other => Key::Str(other.to_string()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{n}"),
            Key::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<usize> for Key {
    fn from(n: usize) -> Self {
        Key::Int(n as i64)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

/// The nodes rendered for one list item, inserted and removed as a unit.
///
/// Only the top-level nodes present after rendering are recorded. The
/// group's extent is recomputed from them whenever it is moved or removed.
#[derive(Debug, Clone, Default)]
pub struct NodeGroup {
    nodes: SmallVec<[NodeId; 4]>,
    region: Option<Region>,
}

impl NodeGroup {
    pub fn new(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            region: None,
        }
    }

    /// A group whose bindings are owned by `region`.
    pub fn with_region(nodes: impl IntoIterator<Item = NodeId>, region: Region) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            region: Some(region),
        }
    }

    /// Top-level nodes as rendered.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Every node the group currently spans: the siblings from its first
    /// rendered node through its last. Groups whose nodes are not (yet)
    /// siblings fall back to the rendered list.
    pub fn span(&self, dom: &Dom) -> SmallVec<[NodeId; 4]> {
        let (Some(&first), Some(&last)) = (self.nodes.first(), self.nodes.last()) else {
            return SmallVec::new();
        };
        let mut span = SmallVec::new();
        let mut cursor = Some(first);
        while let Some(node) = cursor {
            span.push(node);
            if node == last {
                return span;
            }
            cursor = dom.next_sibling(node);
        }
        tracing::trace!(?first, ?last, "group nodes are not siblings; using rendered nodes");
        self.nodes.clone()
    }

    pub fn first(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Detach every node and dispose the owning region.
    pub fn teardown(self, dom: &Dom) {
        for node in self.span(dom) {
            dom.remove(node);
        }
        if let Some(region) = self.region {
            region.dispose();
        }
    }
}

/// What one [`KeyedListPatcher::patch`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    /// Newly rendered groups.
    pub inserted: usize,
    /// Reused groups that had to be repositioned.
    pub moved: usize,
    /// Groups whose keys disappeared.
    pub removed: usize,
    /// Groups carried over from the previous patch, moved or not.
    pub reused: usize,
}

impl PatchStats {
    /// Whether the patch touched the tree at all.
    pub fn is_noop(&self) -> bool {
        self.inserted == 0 && self.moved == 0 && self.removed == 0
    }
}

/// Renders one item context into a group.
pub type RenderFn<C> = Box<dyn FnMut(&C) -> Result<NodeGroup>>;
/// Extracts an item's key.
pub type KeyFn<C> = Box<dyn Fn(&C) -> Key>;

enum Planned {
    Reuse(usize),
    Fresh(NodeGroup),
}

/// Keyed reconciliation of a list region bounded by an end anchor.
pub struct KeyedListPatcher<C> {
    dom: Dom,
    render: RenderFn<C>,
    key: KeyFn<C>,
    mounted: Option<(NodeId, NodeId)>,
    current: IndexMap<Key, NodeGroup>,
}

impl<C> KeyedListPatcher<C> {
    pub fn new<R, K>(dom: Dom, render: R, key: K) -> Self
    where
        R: FnMut(&C) -> Result<NodeGroup> + 'static,
        K: Fn(&C) -> Key + 'static,
    {
        Self {
            dom,
            render: Box::new(render),
            key: Box::new(key),
            mounted: None,
            current: IndexMap::new(),
        }
    }

    /// Bind the patcher to `parent`. Groups are kept before `anchor`.
    pub fn mount(&mut self, parent: NodeId, anchor: NodeId) {
        tracing::debug!(?parent, ?anchor, "list patcher mounted");
        self.mounted = Some((parent, anchor));
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Keys in rendered order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.current.keys()
    }

    pub fn group(&self, key: &Key) -> Option<&NodeGroup> {
        self.current.get(key)
    }

    /// Reconcile the rendered list with `items`.
    pub fn patch(&mut self, items: &[C]) -> Result<PatchStats> {
        let (parent, anchor) = self.mounted.ok_or(TemplateError::NotMounted)?;
        if self.dom.parent(anchor) != Some(parent) {
            return Err(TemplateError::AnchorDetached(anchor));
        }

        let plan = self.plan(items)?;

        let (old_keys, mut slots): (Vec<Key>, Vec<Option<NodeGroup>>) =
            std::mem::take(&mut self.current)
                .into_iter()
                .map(|(key, group)| (key, Some(group)))
                .unzip();

        let mut stats = PatchStats::default();
        let mut sources = Vec::with_capacity(plan.len());
        let mut entries = Vec::with_capacity(plan.len());
        for (key, planned) in plan {
            match planned {
                Planned::Reuse(position) => {
                    sources.push(Some(position));
                    entries.push((key, slots[position].take().unwrap_or_default()));
                    stats.reused += 1;
                }
                Planned::Fresh(group) => {
                    sources.push(None);
                    entries.push((key, group));
                    stats.inserted += 1;
                }
            }
        }

        let stable = longest_increasing_subsequence(&sources);
        let mut stable = stable.iter().rev().peekable();
        let mut next_ref = anchor;
        for (position, (key, group)) in entries.iter().enumerate().rev() {
            let in_place = sources[position].is_some() && stable.peek() == Some(&&position);
            if in_place {
                stable.next();
            } else {
                tracing::trace!(%key, fresh = sources[position].is_none(), "placing group");
                for node in group.span(&self.dom) {
                    self.dom.insert_before(parent, node, Some(next_ref));
                }
                if sources[position].is_some() {
                    stats.moved += 1;
                }
            }
            if let Some(first) = group.first() {
                next_ref = first;
            }
        }

        for (key, group) in old_keys.iter().zip(slots) {
            if let Some(group) = group {
                tracing::trace!(%key, "removing group");
                group.teardown(&self.dom);
                stats.removed += 1;
            }
        }

        self.current = entries.into_iter().collect();
        tracing::trace!(?stats, len = self.current.len(), "list patched");
        Ok(stats)
    }

    /// Match keys and render misses without touching the tree.
    fn plan(&mut self, items: &[C]) -> Result<Vec<(Key, Planned)>> {
        let mut seen = HashSet::with_capacity(items.len());
        let mut plan = Vec::with_capacity(items.len());
        for item in items {
            let key = (self.key)(item);
            if !seen.insert(key.clone()) {
                tracing::warn!(%key, "duplicate key in list; later occurrence dropped");
                continue;
            }
            let planned = match self.current.get_index_of(&key) {
                Some(position) => Planned::Reuse(position),
                None => match (self.render)(item) {
                    Ok(group) => Planned::Fresh(group),
                    Err(err) => {
                        for (_, planned) in plan {
                            if let Planned::Fresh(group) = planned {
                                group.teardown(&self.dom);
                            }
                        }
                        return Err(err);
                    }
                },
            };
            plan.push((key, planned));
        }
        Ok(plan)
    }
}

impl<C> fmt::Debug for KeyedListPatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedListPatcher")
            .field("mounted", &self.mounted)
            .field("keys", &self.current.keys().collect::<Vec<_>>())
            .finish()
    }
}
