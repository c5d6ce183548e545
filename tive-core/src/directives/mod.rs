//! Directive Engine
//!
//! Walks a template once, wiring every dynamic point to the host's watcher.
//!
//! # Walk
//!
//! ```text
//! text node      -> one subscription per {{ }} binding
//! <template>     -> structural directive (if / for / html), or left alone
//! component tag  -> handed to the ComponentHook, subtree skipped
//! element        -> attribute handlers, then children in order
//! ```
//!
//! Structural directives replace their `<template>` with a pair of comment
//! anchors and manage the content between them. Each instantiation of a
//! template's content is walked into its own [`Region`], so a rebuild
//! disposes exactly the bindings it created.
//!
//! # Design Decisions
//!
//! 1. Children are snapshotted before they are walked. Directives replace
//!    their template node during the walk.
//!
//! 2. Errors raised while walking propagate to the caller of [`Engine::mount`].
//!    Errors raised inside a subscription have no caller and are logged.
//!
//! 3. Anchors travel with their fragment. Regions resolve their parent from
//!    the end anchor at the time they mutate, not at the time they were
//!    walked.

mod conditional;
mod markup;
mod repeat;

use std::rc::Rc;

use crate::attributes::{AttributeRegistry, AttributeTarget, Resolved, RestHandler};
use crate::component::ComponentHook;
use crate::config::EngineConfig;
use crate::dom::{Dom, NodeId, NodeKind};
use crate::error::{Result, TemplateError};
use crate::expr::{split_bindings, Evaluator, PathEvaluator, TextPart};
use crate::reactive::{Host, Scope};
use crate::region::Region;

pub use repeat::LoopSyntax;

/// Structural directives recognized on `<template>` elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    If,
    For,
    Html,
}

impl Directive {
    pub fn from_attribute(name: &str) -> Option<Self> {
        match name {
            "if" => Some(Directive::If),
            "for" => Some(Directive::For),
            "html" => Some(Directive::Html),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Directive::If => "if",
            Directive::For => "for",
            Directive::Html => "html",
        }
    }
}

struct EngineInner {
    registry: AttributeRegistry,
    evaluator: Rc<dyn Evaluator>,
    components: Option<Box<dyn ComponentHook>>,
    config: EngineConfig,
}

/// The template walker. Cheap to clone.
#[derive(Clone)]
pub struct Engine {
    inner: Rc<EngineInner>,
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    registry: AttributeRegistry,
    evaluator: Rc<dyn Evaluator>,
    components: Option<Box<dyn ComponentHook>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn registry(mut self, registry: AttributeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluator = Rc::new(evaluator);
        self
    }

    pub fn components(mut self, hook: impl ComponentHook + 'static) -> Self {
        self.components = Some(Box::new(hook));
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            inner: Rc::new(EngineInner {
                registry: self.registry,
                evaluator: self.evaluator,
                components: self.components,
                config: self.config,
            }),
        }
    }
}

impl Engine {
    /// An engine with the built-in handlers, the path evaluator and the
    /// default configuration.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder {
            registry: AttributeRegistry::builtin(),
            evaluator: Rc::new(PathEvaluator),
            components: None,
            config: EngineConfig::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn evaluator(&self) -> &Rc<dyn Evaluator> {
        &self.inner.evaluator
    }

    pub fn registry(&self) -> &AttributeRegistry {
        &self.inner.registry
    }

    /// Instantiate `template` for `host` and append it to `container`.
    ///
    /// The template's content is cloned, walked in the host's root scope and
    /// appended. `for` regions finish mounting on the next frame of
    /// [`Host::frames`] unless list deferral is disabled. The returned region
    /// owns every binding; disposing it silences them.
    pub fn mount(&self, dom: &Dom, host: &Host, template: NodeId, container: NodeId) -> Result<Region> {
        let content = dom
            .clone_content(template)
            .ok_or(TemplateError::NotATemplate(template))?;
        let region = Region::new("root");
        let scope = Scope::root(host);
        if let Err(err) = self.walk_children(dom, content, &scope, &region) {
            region.dispose();
            return Err(err);
        }
        dom.append_child(container, content);
        tracing::debug!(
            ?template,
            ?container,
            handlers = region.handler_count(),
            regions = region.child_count(),
            "template mounted"
        );
        Ok(region)
    }

    /// Walk `node` and its subtree.
    pub fn walk(&self, dom: &Dom, node: NodeId, scope: &Rc<Scope>, region: &Region) -> Result<()> {
        match dom.kind(node) {
            NodeKind::Text => self.bind_text(dom, node, scope, region),
            NodeKind::Comment => Ok(()),
            NodeKind::Fragment => self.walk_children(dom, node, scope, region),
            NodeKind::Element if dom.is_template(node) => {
                self.walk_template(dom, node, scope, region)
            }
            NodeKind::Element => self.walk_element(dom, node, scope, region),
        }
    }

    /// Walk every current child of `parent`.
    pub fn walk_children(
        &self,
        dom: &Dom,
        parent: NodeId,
        scope: &Rc<Scope>,
        region: &Region,
    ) -> Result<()> {
        for child in dom.children(parent) {
            self.walk(dom, child, scope, region)?;
        }
        Ok(())
    }

    fn walk_element(&self, dom: &Dom, node: NodeId, scope: &Rc<Scope>, region: &Region) -> Result<()> {
        if let Some(hook) = &self.inner.components {
            if hook.mount_component(dom, node, scope) {
                return Ok(());
            }
        }
        self.bind_attributes(dom, node, scope, region)?;
        self.walk_children(dom, node, scope, region)
    }

    fn bind_attributes(
        &self,
        dom: &Dom,
        node: NodeId,
        scope: &Rc<Scope>,
        region: &Region,
    ) -> Result<()> {
        let attributes = dom.attributes(node);
        if let Some(position) = attributes
            .iter()
            .position(|(name, _)| name == RestHandler::NAME)
        {
            if position + 1 != attributes.len() {
                return Err(TemplateError::RestNotLast {
                    tag: dom.tag(node).unwrap_or_default(),
                    position: position + 1,
                });
            }
        }

        let resolved = Resolved::new();
        for (name, raw) in &attributes {
            let target = AttributeTarget {
                dom,
                node,
                name,
                raw,
                scope,
                resolved: &resolved,
            };
            let bound = self
                .inner
                .registry
                .apply(&self.inner.evaluator, region, target);
            if bound.is_none() && self.inner.config.warn_unhandled_attributes && !resolved.contains(name) {
                tracing::warn!(
                    attribute = name.as_str(),
                    tag = dom.tag(node).unwrap_or_default().as_str(),
                    "no handler matched attribute"
                );
            }
        }
        Ok(())
    }

    fn bind_text(&self, dom: &Dom, node: NodeId, scope: &Rc<Scope>, region: &Region) -> Result<()> {
        let text = dom.text(node).unwrap_or_default();
        let parts = split_bindings(&text);
        if !parts.iter().any(|p| matches!(p, TextPart::Binding(_))) {
            return Ok(());
        }

        let targets: Vec<(NodeId, &TextPart<'_>)> = if parts.len() == 1 {
            vec![(node, &parts[0])]
        } else {
            let targets: Vec<_> = parts
                .iter()
                .map(|part| {
                    let literal = match part {
                        TextPart::Static(s) => *s,
                        TextPart::Binding(_) => "",
                    };
                    (dom.create_text(literal), part)
                })
                .collect();
            let nodes: Vec<NodeId> = targets.iter().map(|(n, _)| *n).collect();
            if !dom.replace_with(node, &nodes) {
                tracing::warn!(?node, "cannot split a detached text node; bindings skipped");
                return Ok(());
            }
            targets
        };

        for (target, part) in targets {
            if let TextPart::Binding(expression) = part {
                self.bind_text_part(dom, target, expression, scope, region);
            }
        }
        Ok(())
    }

    fn bind_text_part(&self, dom: &Dom, node: NodeId, expression: &str, scope: &Rc<Scope>, region: &Region) {
        let evaluator = &self.inner.evaluator;
        dom.set_text(node, &evaluator.eval(expression, scope).to_string());
        let watcher = scope.host().watcher();
        for dep in evaluator.dependencies(expression) {
            let dom = dom.clone();
            let evaluator = Rc::clone(evaluator);
            let scope = Rc::clone(scope);
            let expression = expression.to_owned();
            watcher.add_owned_listener(&dep, region, move |_| {
                dom.set_text(node, &evaluator.eval(&expression, &scope).to_string());
            });
        }
    }

    fn walk_template(&self, dom: &Dom, node: NodeId, scope: &Rc<Scope>, region: &Region) -> Result<()> {
        let mut directives = dom
            .attributes(node)
            .into_iter()
            .filter_map(|(name, raw)| Directive::from_attribute(&name).map(|d| (d, raw)));
        let Some((directive, raw)) = directives.next() else {
            return Ok(());
        };
        for (ignored, _) in directives {
            tracing::warn!(
                directive = directive.as_str(),
                ignored = ignored.as_str(),
                "only one structural directive is allowed per template"
            );
        }

        let Some(anchors) = Anchors::place(dom, node, directive) else {
            tracing::warn!(?node, "template has no parent; directive skipped");
            return Ok(());
        };
        match directive {
            Directive::If => conditional::mount(self, dom, node, &raw, anchors, scope, region),
            Directive::For => repeat::mount(self, dom, node, &raw, anchors, scope, region),
            Directive::Html => markup::mount(self, dom, &raw, anchors, scope, region),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.inner.registry)
            .field("config", &self.inner.config)
            .field("components", &self.inner.components.is_some())
            .finish()
    }
}

/// The comment pair bounding a directive's region.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Anchors {
    pub start: NodeId,
    pub end: NodeId,
}

impl Anchors {
    /// Replace `template` with a start and end anchor.
    fn place(dom: &Dom, template: NodeId, directive: Directive) -> Option<Self> {
        let start = dom.create_comment(directive.as_str());
        let end = dom.create_comment(&format!("/{}", directive.as_str()));
        dom.replace_with(template, &[start, end])
            .then_some(Self { start, end })
    }

    /// The anchors' current parent.
    fn parent(&self, dom: &Dom) -> Result<NodeId> {
        dom.parent(self.end).ok_or(TemplateError::AnchorDetached(self.end))
    }

    /// Insert `content` (a node or fragment) just before the end anchor.
    fn insert(&self, dom: &Dom, content: NodeId) -> Result<()> {
        let parent = self.parent(dom)?;
        dom.insert_before(parent, content, Some(self.end));
        Ok(())
    }

    /// Detach every node strictly between the anchors.
    fn clear(&self, dom: &Dom) -> usize {
        let mut removed = 0;
        while let Some(next) = dom.next_sibling(self.start) {
            if next == self.end {
                break;
            }
            dom.remove(next);
            removed += 1;
        }
        removed
    }
}
