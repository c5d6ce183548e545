//! Values
//!
//! Everything a template can read from a host is a [`Value`]. The model
//! mirrors what the template language needs rather than any one host type
//! system: JSON-like data plus two runtime-only kinds, event callbacks
//! ([`Function`]) and lazily produced sequences ([`Generator`]).
//!
//! Values convert from `serde_json::Value`, which makes seeding a host with
//! `json!` literals cheap, and serialize back with serde. Runtime-only kinds
//! serialize as `null`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::dom::Event;
use crate::reactive::Host;

/// A dynamically typed template value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent or unset. Stringifies as the empty string.
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    /// An event callback. Bound to the host when attached as a listener.
    Function(Function),
    /// A sequence drained eagerly by iterator-mode `for` regions.
    Iter(Generator),
}

impl Value {
    /// Truthiness as the template language sees it.
    ///
    /// `null`, `false`, `0`, `NaN` and the empty string are falsy; every
    /// other value, including empty arrays and objects, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Iter(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Look up a single path segment on this value.
    ///
    /// Objects are indexed by key, arrays by numeric segment, and arrays and
    /// strings expose `length`. Anything else yields `None`.
    pub fn member(&self, segment: &str) -> Option<Value> {
        match self {
            Value::Object(map) => map.get(segment).cloned(),
            Value::Array(items) => {
                if segment == "length" {
                    return Some(Value::Number(items.len() as f64));
                }
                segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index).cloned())
            }
            Value::String(s) if segment == "length" => {
                Some(Value::Number(s.chars().count() as f64))
            }
            _ => None,
        }
    }

    /// Convert to a `serde_json::Value`. Runtime-only kinds become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null | Value::Function(_) | Value::Iter(_) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// Stringification used for attribute values and text bindings.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Object(_) => write!(f, "{}", self.to_json()),
            Value::Function(_) => f.write_str("[function]"),
            Value::Iter(_) => f.write_str("[iterator]"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Object(map) => f.debug_tuple("Object").field(map).finish(),
            Value::Function(_) => f.write_str("Function(..)"),
            Value::Iter(_) => f.write_str("Iter(..)"),
        }
    }
}

/// Structural equality. Functions and iterators compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Iter(a), Value::Iter(b)) => Rc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null | Value::Function(_) | Value::Iter(_) => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Generator> for Value {
    fn from(g: Generator) -> Self {
        Value::Iter(g)
    }
}

/// An event callback stored in a host field.
///
/// The callback receives the host it is bound to, so handlers can read and
/// write fields without capturing the host themselves.
#[derive(Clone)]
pub struct Function(Rc<dyn Fn(&Host, &Event)>);

impl Function {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Host, &Event) + 'static,
    {
        Self(Rc::new(f))
    }

    pub fn call(&self, host: &Host, event: &Event) {
        (self.0)(host, event);
    }
}

/// A lazily produced sequence of values.
///
/// Cloning shares the underlying iterator; draining consumes it for every
/// clone.
#[derive(Clone)]
pub struct Generator(Rc<RefCell<Box<dyn Iterator<Item = Value>>>>);

impl Generator {
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Value> + 'static,
    {
        Self(Rc::new(RefCell::new(Box::new(iter))))
    }

    /// Pull every remaining item out of the iterator.
    pub fn drain(&self) -> Vec<Value> {
        let mut iter = self.0.borrow_mut();
        iter.by_ref().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_follows_template_rules() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(false).is_truthy());

        assert!(Value::from("0").is_truthy());
        assert!(Value::from(-1).is_truthy());
        assert!(Value::Array(Vec::new()).is_truthy());
        assert!(Value::from(json!({})).is_truthy());
    }

    #[test]
    fn display_renders_null_as_empty() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::from(3).to_string(), "3");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from(json!([1, "a", true])).to_string(), "1,a,true");
    }

    #[test]
    fn member_lookup() {
        let value = Value::from(json!({ "user": { "tags": ["a", "b"] } }));
        let tags = value.member("user").and_then(|u| u.member("tags")).unwrap();
        assert_eq!(tags.member("1"), Some(Value::from("b")));
        assert_eq!(tags.member("length"), Some(Value::from(2)));
        assert_eq!(tags.member("9"), None);
        assert_eq!(Value::from(1).member("x"), None);
    }

    #[test]
    fn functions_compare_by_identity() {
        let f = Function::new(|_, _| {});
        let a = Value::from(f.clone());
        let b = Value::from(f);
        let c = Value::from(Function::new(|_, _| {}));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn generator_drains_once() {
        let g = Generator::new((0..3).map(Value::from));
        let clone = g.clone();
        assert_eq!(g.drain().len(), 3);
        assert!(clone.drain().is_empty());
    }

    #[test]
    fn serializes_through_serde() {
        let value = Value::from(json!({ "a": [1, null], "b": "x" }));
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(text, r#"{"a":[1.0,null],"b":"x"}"#);
        assert_eq!(value.to_json(), json!({ "a": [1.0, null], "b": "x" }));
    }
}
