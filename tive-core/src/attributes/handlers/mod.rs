//! Built-in attribute handlers.

mod boolean;
mod event;
mod plain;
mod property;
mod rest;

pub use boolean::BooleanHandler;
pub use event::EventHandler;
pub use plain::PlainHandler;
pub use property::PropertyHandler;
pub use rest::RestHandler;

use super::{AttributeBinding, AttributeHandler, HandlerFactory, NamePattern};

/// The built-in handler families.
///
/// [`Builtin::ALL`] is the default registration order. `Plain` accepts every
/// name and must stay last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `?name`
    Boolean,
    /// `@name`
    Event,
    /// `.name`
    Property,
    /// `...`
    Rest,
    Plain,
}

impl Builtin {
    pub const ALL: [Builtin; 5] = [
        Builtin::Boolean,
        Builtin::Event,
        Builtin::Property,
        Builtin::Rest,
        Builtin::Plain,
    ];

    fn pattern(self) -> NamePattern {
        match self {
            Builtin::Boolean => NamePattern::prefix("?"),
            Builtin::Event => NamePattern::prefix("@"),
            Builtin::Property => NamePattern::prefix("."),
            Builtin::Rest => NamePattern::exact(RestHandler::NAME),
            Builtin::Plain => NamePattern::Any,
        }
    }
}

impl HandlerFactory for Builtin {
    fn name(&self) -> &str {
        match self {
            Builtin::Boolean => "boolean",
            Builtin::Event => "event",
            Builtin::Property => "property",
            Builtin::Rest => "rest",
            Builtin::Plain => "plain",
        }
    }

    fn test(&self, attribute: &str) -> bool {
        match self {
            Builtin::Property => {
                self.pattern().matches(attribute) && attribute != RestHandler::NAME
            }
            _ => self.pattern().matches(attribute),
        }
    }

    fn create(&self, binding: AttributeBinding) -> Box<dyn AttributeHandler> {
        match self {
            Builtin::Boolean => Box::new(BooleanHandler::new(binding)),
            Builtin::Event => Box::new(EventHandler::new(binding)),
            Builtin::Property => Box::new(PropertyHandler::new(binding)),
            Builtin::Rest => Box::new(RestHandler::new(binding)),
            Builtin::Plain => Box::new(PlainHandler::new(binding)),
        }
    }
}
