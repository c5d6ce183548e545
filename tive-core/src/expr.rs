//! Expression Evaluation
//!
//! Templates embed expressions between `{{` and `}}`. This module finds
//! them, works out which dependency keys they subscribe to, and evaluates
//! them against a [`Scope`].
//!
//! Evaluation is pluggable through the [`Evaluator`] trait. The crate ships
//! [`PathEvaluator`], which covers what templates need for data binding:
//! dotted and indexed paths, negation, and literals. It is not a general
//! expression language.
//!
//! Evaluation never fails. Anything that cannot be resolved becomes
//! [`Value::Null`] and is reported at debug level.

use smallvec::{smallvec, SmallVec};

use crate::reactive::Scope;
use crate::value::Value;

/// Dependency keys of an expression. Almost always one or two.
pub type Deps = SmallVec<[String; 2]>;

/// The result of evaluating a bound value at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    /// The raw attribute or text value, delimiters included.
    pub raw: String,
    /// The expression between the delimiters, if any.
    pub expression: Option<String>,
    pub value: Value,
    /// Keys whose notification should trigger re-evaluation. Empty for
    /// static values.
    pub deps: Deps,
}

impl Evaluated {
    /// Whether the value is a literal that never updates.
    pub fn is_static(&self) -> bool {
        self.expression.is_none()
    }
}

/// Extract the expression of a bound value.
///
/// The expression is the trimmed text between the first `{{` and the first
/// `}}` after it. Returns `None` when there is no such pair or the
/// expression is blank.
pub fn extract_expression(raw: &str) -> Option<&str> {
    let start = raw.find("{{")? + 2;
    let len = raw[start..].find("}}")?;
    let expression = raw[start..start + len].trim();
    (!expression.is_empty()).then_some(expression)
}

/// A piece of a text node's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextPart<'a> {
    Static(&'a str),
    Binding(&'a str),
}

/// Split text into literal runs and `{{ }}` bindings, in order.
///
/// Unterminated or blank delimiters are kept as literal text.
pub fn split_bindings(raw: &str) -> Vec<TextPart<'_>> {
    let mut parts = Vec::new();
    let mut rest = raw;
    while let Some(open) = rest.find("{{") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            break;
        };
        let expression = after[..close].trim();
        if expression.is_empty() {
            parts.push(TextPart::Static(&rest[..open + 2 + close + 2]));
        } else {
            if open > 0 {
                parts.push(TextPart::Static(&rest[..open]));
            }
            parts.push(TextPart::Binding(expression));
        }
        rest = &after[close + 2..];
    }
    if !rest.is_empty() {
        parts.push(TextPart::Static(rest));
    }
    parts
}

/// Pluggable expression evaluation.
pub trait Evaluator {
    /// Evaluate a bare expression (no delimiters) against `scope`.
    fn eval(&self, expression: &str, scope: &Scope) -> Value;

    /// Keys whose change should re-run `expression`.
    ///
    /// The default subscribes to the whole expression text, which is
    /// correct whenever the expression is a plain field name.
    fn dependencies(&self, expression: &str) -> Deps {
        smallvec![expression.to_owned()]
    }

    /// Evaluate a raw bound value.
    ///
    /// Values without an expression are static: the trimmed literal text,
    /// with no dependencies.
    fn evaluate(&self, raw: &str, scope: &Scope) -> Evaluated {
        match extract_expression(raw) {
            Some(expression) => Evaluated {
                raw: raw.to_owned(),
                expression: Some(expression.to_owned()),
                value: self.eval(expression, scope),
                deps: self.dependencies(expression),
            },
            None => Evaluated {
                raw: raw.to_owned(),
                expression: None,
                value: Value::String(raw.trim().to_owned()),
                deps: Deps::new(),
            },
        }
    }
}

/// Path-and-literal evaluator.
///
/// Supported forms:
///
/// - `name`, `user.name`, `items[0]`, `items.length`, `map["key"]`
/// - `!expr`
/// - `true`, `false`, `null`, numbers, `'text'` and `"text"`
#[derive(Debug, Default, Clone, Copy)]
pub struct PathEvaluator;

impl Evaluator for PathEvaluator {
    fn eval(&self, expression: &str, scope: &Scope) -> Value {
        let expression = expression.trim();
        if let Some(rest) = expression.strip_prefix('!') {
            return Value::Bool(!self.eval(rest, scope).is_truthy());
        }
        if let Some(literal) = parse_literal(expression) {
            return literal;
        }

        let Some((root, segments)) = parse_path(expression) else {
            tracing::debug!(expression, "unsupported expression");
            return Value::Null;
        };
        let Some(mut value) = scope.lookup(root) else {
            tracing::debug!(expression, root, "unresolved identifier");
            return Value::Null;
        };
        for segment in &segments {
            match value.member(segment) {
                Some(next) => value = next,
                None => {
                    tracing::debug!(expression, segment = segment.as_str(), "unresolved path segment");
                    return Value::Null;
                }
            }
        }
        value
    }

    fn dependencies(&self, expression: &str) -> Deps {
        let expression = expression.trim();
        let mut deps: Deps = smallvec![expression.to_owned()];
        let bare = expression.trim_start_matches('!').trim();
        if parse_literal(bare).is_some() {
            return deps;
        }
        if let Some((root, _)) = parse_path(bare) {
            if root != expression {
                deps.push(root.to_owned());
            }
        }
        deps
    }
}

fn parse_literal(expression: &str) -> Option<Value> {
    match expression {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        "null" | "undefined" => return Some(Value::Null),
        _ => {}
    }
    let first = expression.chars().next()?;
    if first == '\'' || first == '"' {
        let inner = expression.strip_prefix(first)?.strip_suffix(first)?;
        return Some(Value::String(inner.to_owned()));
    }
    if first.is_ascii_digit() || first == '-' || first == '.' {
        return expression.parse::<f64>().ok().map(Value::Number);
    }
    None
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Split `a.b[0]["c"]` into its root identifier and member segments.
fn parse_path(expression: &str) -> Option<(&str, Vec<String>)> {
    let mut chars = expression.char_indices().peekable();
    let (_, first) = chars.next()?;
    if !is_ident_start(first) {
        return None;
    }
    let mut root_end = expression.len();
    while let Some(&(i, c)) = chars.peek() {
        if !is_ident_char(c) {
            root_end = i;
            break;
        }
        chars.next();
    }
    let root = &expression[..root_end];

    let mut segments = Vec::new();
    let mut rest = &expression[root_end..];
    while !rest.is_empty() {
        if let Some(after_dot) = rest.strip_prefix('.') {
            let len = after_dot
                .find(|c: char| !is_ident_char(c))
                .unwrap_or(after_dot.len());
            if len == 0 {
                return None;
            }
            segments.push(after_dot[..len].to_owned());
            rest = &after_dot[len..];
        } else if let Some(after_bracket) = rest.strip_prefix('[') {
            let close = after_bracket.find(']')?;
            let inner = after_bracket[..close].trim();
            let segment = match parse_literal(inner)? {
                Value::String(s) => s,
                Value::Number(n) if n >= 0.0 && n.fract() == 0.0 => (n as usize).to_string(),
                _ => return None,
            };
            segments.push(segment);
            rest = &after_bracket[close + 1..];
        } else {
            return None;
        }
    }
    Some((root, segments))
}
