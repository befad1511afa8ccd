//! Engine configuration
//!
//! Both structs deserialize with per-field defaults so hosts can supply a
//! partial table (the CLI reads one from `config.toml`).

use serde::{Deserialize, Serialize};

use crate::model::HighlightColor;

/// How highlight wrappers and containers are recognised in markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Element name used for highlight wrappers
    pub wrapper_tag: String,
    /// CSS class prefix for highlights
    pub class_prefix: String,
    /// Data attribute carrying the annotation id
    pub id_attribute: String,
    /// Data attribute carrying the color name
    pub color_attribute: String,
    /// Attribute the host uses to mark a container
    pub container_attribute: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            wrapper_tag: "mark".to_string(),
            class_prefix: "ink-highlight".to_string(),
            id_attribute: "data-highlight-id".to_string(),
            color_attribute: "data-highlight-color".to_string(),
            container_attribute: "data-container-id".to_string(),
        }
    }
}

impl HighlightConfig {
    /// Class list for a wrapper of the given color
    pub fn class_for(&self, color: HighlightColor) -> String {
        format!("{} {}-{}", self.class_prefix, self.class_prefix, color.as_str())
    }
}

/// Session persistence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Prefix prepended to the session key in the backing store
    pub key_prefix: String,
    /// Active color for sessions with no persisted record
    pub default_color: HighlightColor,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key_prefix: "inkmark:".to_string(),
            default_color: HighlightColor::Yellow,
        }
    }
}

impl SessionConfig {
    pub fn store_key(&self, session_key: &str) -> String {
        format!("{}{}", self.key_prefix, session_key)
    }
}
