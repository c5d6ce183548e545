//! Engine Configuration
//!
//! Knobs that change how the engine wires a template. Every field has a
//! default, so partial JSON documents are accepted.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Options for [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Mount `for` regions and run their first patch on the next frame of
    /// the host's scheduler instead of during the walk.
    pub defer_list_mount: bool,

    /// Log a warning for attributes no handler accepted.
    pub warn_unhandled_attributes: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            defer_list_mount: true,
            warn_unhandled_attributes: true,
        }
    }
}

impl EngineConfig {
    /// Decode a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateError;

    #[test]
    fn partial_documents_keep_defaults() {
        let config = EngineConfig::from_json(r#"{ "defer_list_mount": false }"#).unwrap();
        assert!(!config.defer_list_mount);
        assert!(config.warn_unhandled_attributes);
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn malformed_documents_are_config_errors() {
        assert!(matches!(
            EngineConfig::from_json(r#"{ "defer_list_mount": "yes" }"#),
            Err(TemplateError::Config(_))
        ));
    }
}
