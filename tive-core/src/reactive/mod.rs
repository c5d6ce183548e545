//! Reactive Plumbing
//!
//! This module holds the pieces that connect a host's data to the tree:
//! the host itself, binding scopes, the watcher that fans changes out to
//! subscribers, and the frame scheduler behind the engine's single yield
//! point.
//!
//! # Concepts
//!
//! ## Host
//!
//! The data model. Fields are read by name; [`Host::set`] stores a value and
//! then calls [`Watcher::update`] for that field.
//!
//! ## Watcher
//!
//! A map from dependency key to an ordered list of [`Subscriber`]s. Walking a
//! template registers one subscriber per dynamic point; nothing is ever
//! re-walked unless a structural directive rebuilds its region.
//!
//! ## Scope
//!
//! The binding context expressions are evaluated against. Loop items get a
//! derived scope chained to their parent.
//!
//! # Implementation Notes
//!
//! Dependencies are declared up front by the evaluator rather than tracked
//! at read time. A binding subscribes to the keys its expression names and
//! re-evaluates its whole expression whenever one of them fires.

mod host;
mod scheduler;
mod scope;
mod subscriber;
mod watcher;

pub use host::Host;
pub use scheduler::FrameScheduler;
pub use scope::Scope;
pub use subscriber::{Callback, Subscriber, SubscriberId};
pub use watcher::Watcher;
