//! Tive Core
//!
//! This crate provides the binding and reconciliation engine of the Tive
//! templating library. It implements:
//!
//! - A watcher that wires every `{{ expression }}` in a template to the host
//!   fields it reads, walked once at mount
//! - Attribute handlers for plain, `?boolean`, `.property`, `@event` and
//!   `...` rest-spread bindings
//! - Structural `if`, `for` and `html` regions
//! - A keyed list patcher that moves the fewest nodes, using a longest
//!   increasing subsequence
//!
//! # Architecture
//!
//! - `dom`: the retained node tree the engine mutates
//! - `reactive`: host, scopes, watcher and frame scheduler
//! - `expr`: expression extraction and evaluation
//! - `attributes`: handler family and first-match dispatch
//! - `patcher`: keyed reconciliation
//! - `directives`: the tree walker and structural regions
//! - `region`: ownership and disposal of bindings
//!
//! # Example
//!
//! ```rust
//! use tive_core::{Dom, Engine, Host};
//! use serde_json::json;
//!
//! let dom = Dom::new();
//! let root = dom
//!     .parse_fragment(r#"<template><h1 ?hidden="{{ !title }}">{{ title }}</h1></template>"#)
//!     .unwrap();
//! let template = dom.first_child(root).unwrap();
//! let container = dom.create_element("main");
//!
//! let host = Host::from_json(json!({ "title": "Hello" }));
//! Engine::new().mount(&dom, &host, template, container).unwrap();
//! assert_eq!(dom.inner_html(container), "<h1>Hello</h1>");
//!
//! host.set("title", "");
//! assert_eq!(dom.inner_html(container), "<h1 hidden></h1>");
//! ```

pub mod attributes;
pub mod component;
pub mod config;
pub mod directives;
pub mod dom;
pub mod error;
pub mod expr;
pub mod patcher;
pub mod reactive;
pub mod region;
pub mod value;

pub use attributes::{AttributeHandler, AttributeRegistry, Builtin, HandlerFactory, NamePattern};
pub use component::{ComponentHook, ComponentRegistry};
pub use config::EngineConfig;
pub use directives::{Engine, EngineBuilder};
pub use dom::{Dom, Event, NodeId, NodeKind};
pub use error::{Result, TemplateError};
pub use expr::{Evaluated, Evaluator, PathEvaluator};
pub use patcher::{Key, KeyedListPatcher, NodeGroup, PatchStats};
pub use reactive::{Host, Scope, Watcher};
pub use region::Region;
pub use value::{Function, Generator, Value};
