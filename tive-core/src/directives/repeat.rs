//! `for` regions.
//!
//! ```text
//! for="{{ item of items }}"   locals: item, index        key: `key` attr, else the item
//! for="{{ name in object }}"  locals: name, value, index key: `key` attr, else property name
//! for="{{ numbers }}"         locals: value, index       key: `key` attr, else position
//! ```
//!
//! Every update of the source recomputes the whole item list and hands it to
//! a [`KeyedListPatcher`]. Reused items keep the scope they were rendered
//! with. Without a `key` attribute, repeated default keys are told apart by
//! occurrence (`a`, `a#1`, `a#2`).

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use super::{Anchors, Engine};
use crate::dom::{Dom, NodeId};
use crate::error::{Result, TemplateError};
use crate::expr::{extract_expression, Evaluator};
use crate::patcher::{Key, KeyedListPatcher, NodeGroup};
use crate::reactive::Scope;
use crate::region::Region;
use crate::value::Value;

/// The three loop forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopSyntax {
    /// `item of source`
    Of { item: String, source: String },
    /// `key in source`
    In { key: String, source: String },
    /// `source`, drained as an iterator
    Bare { source: String },
}

impl LoopSyntax {
    /// Parse the expression of a `for` attribute (delimiters stripped).
    pub fn parse(expression: &str) -> Self {
        let expression = expression.trim();
        for keyword in [" of ", " in "] {
            if let Some((binding, source)) = expression.split_once(keyword) {
                let binding = binding.trim();
                if is_identifier(binding) {
                    let binding = binding.to_owned();
                    let source = source.trim().to_owned();
                    return if keyword == " of " {
                        LoopSyntax::Of { item: binding, source }
                    } else {
                        LoopSyntax::In { key: binding, source }
                    };
                }
            }
        }
        LoopSyntax::Bare {
            source: expression.to_owned(),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            LoopSyntax::Of { source, .. }
            | LoopSyntax::In { source, .. }
            | LoopSyntax::Bare { source } => source,
        }
    }

    /// Expand a source value into loop-local bindings, one map per item.
    pub fn bindings(&self, source: Value) -> Vec<IndexMap<String, Value>> {
        let index = |i: usize| ("index".to_owned(), Value::from(i as f64));
        match self {
            LoopSyntax::Of { item, .. } => sequence(source)
                .into_iter()
                .enumerate()
                .map(|(i, value)| IndexMap::from([(item.clone(), value), index(i)]))
                .collect(),
            LoopSyntax::In { key, .. } => entries(source)
                .into_iter()
                .enumerate()
                .map(|(i, (name, value))| {
                    IndexMap::from([
                        (key.clone(), Value::String(name)),
                        ("value".to_owned(), value),
                        index(i),
                    ])
                })
                .collect(),
            LoopSyntax::Bare { .. } => sequence(source)
                .into_iter()
                .enumerate()
                .map(|(i, value)| IndexMap::from([("value".to_owned(), value), index(i)]))
                .collect(),
        }
    }

    /// The key of an item when no `key` attribute is given.
    fn default_key(&self, position: usize, locals: &IndexMap<String, Value>) -> Key {
        let bound = match self {
            LoopSyntax::Of { item, .. } => locals.get(item),
            LoopSyntax::In { key, .. } => locals.get(key),
            LoopSyntax::Bare { .. } => None,
        };
        bound.map(Key::from_value).unwrap_or(Key::from(position))
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn sequence(source: Value) -> Vec<Value> {
    match source {
        Value::Array(items) => items,
        Value::Iter(generator) => generator.drain(),
        Value::Null => Vec::new(),
        other => {
            tracing::warn!(value = ?other, "for source is not iterable");
            Vec::new()
        }
    }
}

fn entries(source: Value) -> Vec<(String, Value)> {
    match source {
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        Value::Null => Vec::new(),
        other => {
            tracing::warn!(value = ?other, "for-in source is not an object");
            Vec::new()
        }
    }
}

/// One list item as the patcher sees it.
struct Item {
    key: Key,
    scope: Rc<Scope>,
}

struct Repeat {
    dom: Dom,
    anchors: Anchors,
    scope: Rc<Scope>,
    owner: Region,
    syntax: LoopSyntax,
    key: Option<String>,
    evaluator: Rc<dyn Evaluator>,
    patcher: RefCell<KeyedListPatcher<Item>>,
    mounted: Cell<bool>,
}

impl Repeat {
    fn items(&self) -> Vec<Item> {
        let source = self.evaluator.eval(self.syntax.source(), &self.scope);
        let mut occurrences: HashMap<Key, usize> = HashMap::new();
        self.syntax
            .bindings(source)
            .into_iter()
            .enumerate()
            .map(|(position, locals)| {
                let scope = Scope::child(&self.scope, locals);
                let key = match &self.key {
                    Some(expression) => Key::from_value(&self.evaluator.eval(expression, &scope)),
                    None => {
                        let key = self.syntax.default_key(position, scope.locals());
                        let seen = occurrences.entry(key.clone()).or_default();
                        *seen += 1;
                        match *seen {
                            1 => key,
                            n => Key::Str(format!("{key}#{}", n - 1)),
                        }
                    }
                };
                Item { key, scope }
            })
            .collect()
    }

    /// Patch the list against the current source value.
    fn refresh(&self) -> Result<()> {
        let parent = self.anchors.parent(&self.dom)?;
        let items = self.items();
        let Ok(mut patcher) = self.patcher.try_borrow_mut() else {
            tracing::error!(anchor = ?self.anchors.end, "for region refreshed during its own patch; skipped");
            return Ok(());
        };
        // A fragment insert moves the anchors along with their content.
        patcher.mount(parent, self.anchors.end);
        let stats = patcher.patch(&items)?;
        tracing::trace!(?stats, anchor = ?self.anchors.end, "for region patched");
        Ok(())
    }

    fn mount_and_refresh(&self) {
        if !self.owner.is_alive() {
            return;
        }
        self.mounted.set(true);
        if let Err(err) = self.refresh() {
            tracing::error!(error = %err, "for region mount failed");
        }
    }
}

pub(super) fn mount(
    engine: &Engine,
    dom: &Dom,
    template: NodeId,
    raw: &str,
    anchors: Anchors,
    scope: &Rc<Scope>,
    region: &Region,
) -> Result<()> {
    let Some(expression) = extract_expression(raw) else {
        tracing::warn!(raw, "for directive without an expression; region left empty");
        return Ok(());
    };
    let syntax = LoopSyntax::parse(expression);
    let key = dom
        .attribute(template, "key")
        .and_then(|raw| extract_expression(&raw).map(str::to_owned));
    if key.is_none() && matches!(syntax, LoopSyntax::Of { .. }) {
        tracing::debug!(expression, "for-of without a key attribute; items are keyed by value");
    }

    let render = {
        let engine = engine.clone();
        let dom = dom.clone();
        let owner = region.clone();
        move |item: &Item| -> Result<NodeGroup> {
            let content = dom
                .clone_content(template)
                .ok_or(TemplateError::NotATemplate(template))?;
            let item_region = owner.child("for-item");
            if let Err(err) = engine.walk_children(&dom, content, &item.scope, &item_region) {
                item_region.dispose();
                return Err(err);
            }
            Ok(NodeGroup::with_region(dom.children(content), item_region))
        }
    };
    let state = Rc::new(Repeat {
        dom: dom.clone(),
        anchors,
        scope: Rc::clone(scope),
        owner: region.clone(),
        syntax,
        key,
        evaluator: Rc::clone(engine.evaluator()),
        patcher: RefCell::new(KeyedListPatcher::new(dom.clone(), render, |item: &Item| {
            item.key.clone()
        })),
        mounted: Cell::new(false),
    });

    let host = scope.host();
    for dep in engine.evaluator().dependencies(state.syntax.source()) {
        let owner = state.owner.clone();
        let state = Rc::clone(&state);
        host.watcher().add_owned_listener(&dep, &owner, move |_| {
            if !state.mounted.get() {
                tracing::trace!("for source changed before mount; the first patch will read it");
                return;
            }
            if let Err(err) = state.refresh() {
                tracing::error!(error = %err, "for region update failed");
            }
        });
    }

    if engine.config().defer_list_mount {
        let state = Rc::clone(&state);
        host.frames().request_frame(move || state.mount_and_refresh());
        Ok(())
    } else {
        state.mounted.set(true);
        state.refresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Host;
    use crate::value::Generator;
    use serde_json::json;

    #[test]
    fn parses_loop_forms() {
        assert_eq!(
            LoopSyntax::parse("todo of todos"),
            LoopSyntax::Of {
                item: "todo".into(),
                source: "todos".into()
            }
        );
        assert_eq!(
            LoopSyntax::parse(" k in user.meta "),
            LoopSyntax::In {
                key: "k".into(),
                source: "user.meta".into()
            }
        );
        assert_eq!(
            LoopSyntax::parse("numbers"),
            LoopSyntax::Bare {
                source: "numbers".into()
            }
        );
        assert_eq!(
            LoopSyntax::parse("'a of b'"),
            LoopSyntax::Bare {
                source: "'a of b'".into()
            }
        );
    }

    #[test]
    fn expands_bindings() {
        let of = LoopSyntax::parse("x of xs").bindings(Value::from(json!(["a", "b"])));
        assert_eq!(of[1].get("x"), Some(&Value::from("b")));
        assert_eq!(of[1].get("index"), Some(&Value::from(1)));

        let within = LoopSyntax::parse("k in obj").bindings(Value::from(json!({ "a": 1 })));
        assert_eq!(within[0].get("k"), Some(&Value::from("a")));
        assert_eq!(within[0].get("value"), Some(&Value::from(1)));

        let bare = LoopSyntax::parse("gen")
            .bindings(Value::from(Generator::new((1..=3).map(Value::from))));
        assert_eq!(bare.len(), 3);
        assert_eq!(bare[2].get("value"), Some(&Value::from(3)));

        assert!(LoopSyntax::parse("x of xs").bindings(Value::from(5)).is_empty());
    }

    fn mount_list(markup: &str, host: &Host) -> (Dom, NodeId) {
        let dom = Dom::new();
        let root = dom.parse_fragment(markup).unwrap();
        let template = dom.first_child(root).unwrap();
        let container = dom.create_element("ul");
        Engine::new().mount(&dom, host, template, container).unwrap();
        (dom, container)
    }

    #[test]
    fn first_patch_waits_for_a_frame() {
        let host = Host::from_json(json!({ "todos": [{ "id": 1, "t": "a" }, { "id": 2, "t": "b" }] }));
        let (dom, ul) = mount_list(
            r#"<template><template for="{{ todo of todos }}" key="{{ todo.id }}"><li>{{ index }}:{{ todo.t }}</li></template></template>"#,
            &host,
        );
        assert_eq!(dom.inner_html(ul), "<!--for--><!--/for-->");

        host.set("todos", Value::from(json!([{ "id": 2, "t": "b" }])));
        assert_eq!(dom.inner_html(ul), "<!--for--><!--/for-->");

        host.flush();
        assert_eq!(dom.inner_html(ul), "<!--for--><li>0:b</li><!--/for-->");
    }

    #[test]
    fn keyed_updates_reuse_items() {
        let host = Host::from_json(json!({ "todos": [{ "id": 1, "t": "a" }, { "id": 2, "t": "b" }] }));
        let (dom, ul) = mount_list(
            r#"<template><template for="{{ todo of todos }}" key="{{ todo.id }}"><li>{{ todo.t }}</li></template></template>"#,
            &host,
        );
        host.flush();
        let second = dom.children(ul)[2];

        host.set(
            "todos",
            Value::from(json!([{ "id": 2, "t": "b" }, { "id": 3, "t": "c" }, { "id": 1, "t": "a" }])),
        );
        assert_eq!(
            dom.inner_html(ul),
            "<!--for--><li>b</li><li>c</li><li>a</li><!--/for-->"
        );
        assert_eq!(dom.children(ul)[1], second);
    }

    #[test]
    fn unkeyed_of_loops_follow_item_values() {
        let host = Host::from_json(json!({ "xs": ["a", "b"] }));
        let (dom, ul) = mount_list(
            r#"<template><template for="{{ x of xs }}"><i>{{ x }}</i></template></template>"#,
            &host,
        );
        host.flush();
        let b = dom.children(ul)[2];

        host.set("xs", Value::from(json!(["c", "d"])));
        assert_eq!(dom.inner_html(ul), "<!--for--><i>c</i><i>d</i><!--/for-->");

        host.set("xs", Value::from(json!(["b", "c", "c"])));
        assert_eq!(dom.inner_html(ul), "<!--for--><i>b</i><i>c</i><i>c</i><!--/for-->");
        assert_ne!(dom.children(ul)[1], b);

        host.set("xs", Value::from(json!(["c", "c", "b"])));
        assert_eq!(dom.inner_html(ul), "<!--for--><i>c</i><i>c</i><i>b</i><!--/for-->");
    }

    #[test]
    fn for_in_and_iterator_modes() {
        let host = Host::from_json(json!({ "meta": { "a": 1, "b": 2 } }))
            .with_field("gen", Generator::new((0..2).map(|n| Value::from(n * 10))));
        let (dom, ul) = mount_list(
            r#"<template><template for="{{ k in meta }}"><i>{{ k }}={{ value }}</i></template><template for="{{ gen }}"><b>{{ index }}/{{ value }}</b></template></template>"#,
            &host,
        );
        host.flush();
        assert_eq!(
            dom.inner_html(ul),
            "<!--for--><i>a=1</i><i>b=2</i><!--/for--><!--for--><b>0/0</b><b>1/10</b><!--/for-->"
        );
    }

    #[test]
    fn synchronous_mount_when_deferral_is_disabled() {
        let host = Host::from_json(json!({ "xs": [1, 2] }));
        let dom = Dom::new();
        let root = dom
            .parse_fragment(r#"<template><template for="{{ x of xs }}" key="{{ x }}"><b>{{ x }}</b></template></template>"#)
            .unwrap();
        let template = dom.first_child(root).unwrap();
        let container = dom.create_element("div");
        let engine = Engine::builder()
            .config(crate::config::EngineConfig {
                defer_list_mount: false,
                ..Default::default()
            })
            .build();
        engine.mount(&dom, &host, template, container).unwrap();
        assert_eq!(host.frames().pending(), 0);
        assert_eq!(dom.inner_html(container), "<!--for--><b>1</b><b>2</b><!--/for-->");

        host.set("xs", Value::from(json!([2])));
        assert_eq!(dom.inner_html(container), "<!--for--><b>2</b><!--/for-->");
    }
}
