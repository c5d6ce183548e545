//! Error Types
//!
//! Usage errors raised by the engine. These indicate a template-authoring
//! defect (a rest-spread in the wrong position, a list region patched before
//! it was mounted) rather than a runtime data condition, so they are never
//! retried.
//!
//! Missing values are not errors: expressions that reference an unset field
//! evaluate to [`Value::Null`](crate::Value::Null).

use thiserror::Error;

use crate::dom::{NodeId, ParseError};

/// Errors produced while walking, mounting or patching a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// `patch` was called on a list region that was never mounted.
    #[error("patcher is not mounted")]
    NotMounted,

    /// The list region's end anchor is no longer attached to the parent it
    /// was mounted under.
    #[error("list anchor {0:?} is detached from its region")]
    AnchorDetached(NodeId),

    /// A `...` attribute appeared before the last attribute of an element.
    #[error("rest properties directive must be the last attribute (<{tag}> attribute #{position})")]
    RestNotLast { tag: String, position: usize },

    /// Markup handed to the parser was malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// `mount` was given a node that has no template content.
    #[error("node {0:?} is not a template")]
    NotATemplate(NodeId),

    /// Engine configuration could not be decoded.
    #[error("invalid engine configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Convenience alias used across the crate.
pub type Result<T, E = TemplateError> = std::result::Result<T, E>;
