//! Ordered handler dispatch.

use std::cell::RefCell;
use std::rc::Rc;

use super::{AttributeBinding, Builtin, HandlerFactory, HandlerRef, Resolved};
use crate::dom::{Dom, NodeId};
use crate::expr::Evaluator;
use crate::reactive::Scope;
use crate::region::Region;

/// One attribute occurrence to bind.
#[derive(Debug, Clone, Copy)]
pub struct AttributeTarget<'a> {
    pub dom: &'a Dom,
    pub node: NodeId,
    pub name: &'a str,
    pub raw: &'a str,
    pub scope: &'a Rc<Scope>,
    pub resolved: &'a Resolved,
}

/// First-match registry of handler factories.
pub struct AttributeRegistry {
    factories: Vec<Box<dyn HandlerFactory>>,
}

impl AttributeRegistry {
    /// An empty registry. Nothing matches until factories are registered.
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// The built-in families in their default order.
    pub fn builtin() -> Self {
        Builtin::ALL
            .into_iter()
            .fold(Self::new(), |registry, builtin| registry.register(builtin))
    }

    /// Append a factory. Factories are tested in registration order.
    pub fn register(mut self, factory: impl HandlerFactory + 'static) -> Self {
        self.factories.push(Box::new(factory));
        self
    }

    /// Insert a factory ahead of every registered one.
    pub fn register_first(mut self, factory: impl HandlerFactory + 'static) -> Self {
        self.factories.insert(0, Box::new(factory));
        self
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// The factory that would handle `attribute`.
    pub fn select(&self, attribute: &str) -> Option<&dyn HandlerFactory> {
        self.factories
            .iter()
            .find(|f| f.test(attribute))
            .map(|f| f.as_ref())
    }

    /// Bind one attribute.
    ///
    /// Evaluates the raw value, builds the selected handler, runs `init`,
    /// hands the handler to `region`, and subscribes `update` to every
    /// dependency of the expression. Returns `None` when no factory matches.
    pub fn apply(
        &self,
        evaluator: &Rc<dyn Evaluator>,
        region: &Region,
        target: AttributeTarget<'_>,
    ) -> Option<HandlerRef> {
        let factory = self.select(target.name)?;
        let evaluated = evaluator.evaluate(target.raw, target.scope);
        let expression = evaluated.expression.clone();
        let deps = evaluated.deps.clone();
        tracing::trace!(
            attribute = target.name,
            handler = factory.name(),
            "binding attribute"
        );

        let mut handler = factory.create(AttributeBinding {
            dom: target.dom.clone(),
            node: target.node,
            name: target.name.to_owned(),
            evaluated,
            scope: Rc::clone(target.scope),
            resolved: target.resolved.clone(),
        });
        handler.init();
        let tracks_updates = handler.tracks_updates();
        let handler: HandlerRef = Rc::new(RefCell::new(handler));
        region.own_handler(Rc::clone(&handler));

        let Some(expression) = expression.filter(|_| tracks_updates) else {
            return Some(handler);
        };
        let watcher = target.scope.host().watcher();
        for dep in &deps {
            let handler = Rc::clone(&handler);
            let evaluator = Rc::clone(evaluator);
            let scope = Rc::clone(target.scope);
            let expression = expression.clone();
            let attribute = target.name.to_owned();
            watcher.add_owned_listener(dep, region, move |_| {
                let value = evaluator.eval(&expression, &scope);
                match handler.try_borrow_mut() {
                    Ok(mut handler) => handler.update(&value),
                    Err(_) => tracing::error!(
                        attribute = attribute.as_str(),
                        "attribute handler re-entered during its own update; update dropped"
                    ),
                }
            });
        }
        Some(handler)
    }
}

impl Default for AttributeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for AttributeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.factories.iter().map(|factory| factory.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{AttributeHandler, NamePattern};
    use crate::expr::PathEvaluator;
    use crate::reactive::Host;
    use crate::value::Value;

    fn target<'a>(
        dom: &'a Dom,
        node: NodeId,
        name: &'a str,
        raw: &'a str,
        scope: &'a Rc<Scope>,
        resolved: &'a Resolved,
    ) -> AttributeTarget<'a> {
        AttributeTarget {
            dom,
            node,
            name,
            raw,
            scope,
            resolved,
        }
    }

    #[test]
    fn first_match_wins() {
        let registry = AttributeRegistry::new()
            .register(Builtin::Boolean)
            .register(Builtin::Event)
            .register(Builtin::Property)
            .register(Builtin::Plain);
        assert_eq!(registry.select("?disabled").map(|f| f.name()), Some("boolean"));
        assert_eq!(registry.select("@click").map(|f| f.name()), Some("event"));
        assert_eq!(registry.select("title").map(|f| f.name()), Some("plain"));
        assert!(AttributeRegistry::new().select("title").is_none());
        assert_eq!(format!("{:?}", AttributeRegistry::builtin()), r#"["boolean", "event", "property", "rest", "plain"]"#);
    }

    #[test]
    fn subscribes_updates_to_dependencies() {
        let host = Host::new().with_field("open", false);
        let dom = Dom::new();
        let node = dom.create_element("details");
        let scope = Scope::root(&host);
        let resolved = Resolved::new();
        let region = Region::new("test");
        let evaluator: Rc<dyn Evaluator> = Rc::new(PathEvaluator);

        let handler = AttributeRegistry::builtin().apply(
            &evaluator,
            &region,
            target(&dom, node, "?open", "{{ open }}", &scope, &resolved),
        );
        assert!(handler.is_some());
        assert_eq!(region.handler_count(), 1);
        assert!(!dom.has_attribute(node, "open"));

        host.set("open", true);
        assert!(dom.has_attribute(node, "open"));

        region.dispose();
        host.set("open", false);
        assert!(dom.has_attribute(node, "open"));
    }

    #[test]
    fn custom_factories_can_take_precedence() {
        struct Upper(crate::attributes::AttributeBinding);
        impl AttributeHandler for Upper {
            fn init(&mut self) {
                let value = self.0.evaluated.value.clone();
                self.update(&value);
            }
            fn update(&mut self, value: &Value) {
                let text = value.to_string().to_uppercase();
                self.0.dom.set_attribute(self.0.node, &self.0.name, &text);
            }
        }
        struct UpperFactory(NamePattern);
        impl HandlerFactory for UpperFactory {
            fn name(&self) -> &str {
                "upper"
            }
            fn test(&self, attribute: &str) -> bool {
                self.0.matches(attribute)
            }
            fn create(&self, binding: AttributeBinding) -> Box<dyn AttributeHandler> {
                Box::new(Upper(binding))
            }
        }

        let registry =
            AttributeRegistry::builtin().register_first(UpperFactory(NamePattern::suffix("-upper")));
        let host = Host::new().with_field("name", "ada");
        let dom = Dom::new();
        let node = dom.create_element("span");
        let scope = Scope::root(&host);
        let resolved = Resolved::new();
        let evaluator: Rc<dyn Evaluator> = Rc::new(PathEvaluator);
        registry.apply(
            &evaluator,
            &Region::new("test"),
            target(&dom, node, "name-upper", "{{ name }}", &scope, &resolved),
        );
        assert_eq!(dom.attribute(node, "name-upper").as_deref(), Some("ADA"));
        host.set("name", "grace");
        assert_eq!(dom.attribute(node, "name-upper").as_deref(), Some("GRACE"));
    }
}
