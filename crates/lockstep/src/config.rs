//! Configuration types for change-log application.
//!
//! All types implement [`serde::Deserialize`] for loading from TOML.
//!
//! # Overview
//!
//! - [`SyncConfig`] - Top-level configuration combining rules and properties.
//! - [`RuleConfig`] - Which admission rules are evaluated, in order.
//! - [`Properties`] - String-keyed settings that rules read lazily.
//!
//! # Example
//!
//! ```
//! # use lockstep::config::{RuleKind, SyncConfig};
//! let config: SyncConfig = toml::from_str(r#"
//!     [rules]
//!     enabled = ["maximum-lifelines", "maximum-messages"]
//!
//!     [properties]
//!     "lifeline.max" = "4"
//!     "message.max" = "40"
//! "#).unwrap();
//!
//! assert_eq!(config.rules().enabled(), &[RuleKind::MaximumLifelines, RuleKind::MaximumMessages]);
//! assert_eq!(config.properties().get("lifeline.max"), Some("4"));
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default for `lifeline.max` when no properties are configured.
const DEFAULT_LIFELINE_MAX: &str = "10";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Admission rules section.
    #[serde(default)]
    rules: RuleConfig,

    /// Rule settings section.
    #[serde(default = "default_properties")]
    properties: Properties,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            rules: RuleConfig::default(),
            properties: default_properties(),
        }
    }
}

impl SyncConfig {
    /// Creates a new [`SyncConfig`] from its sections.
    pub fn new(rules: RuleConfig, properties: Properties) -> Self {
        Self { rules, properties }
    }

    /// Returns the rule configuration.
    pub fn rules(&self) -> &RuleConfig {
        &self.rules
    }

    /// Returns the rule settings.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

fn default_properties() -> Properties {
    Properties::new().with("lifeline.max", DEFAULT_LIFELINE_MAX)
}

/// Available admission rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    /// Caps the number of lifelines, reads `lifeline.max`.
    MaximumLifelines,
    /// Caps the number of messages, reads `message.max`.
    MaximumMessages,
}

/// Ordered list of enabled admission rules.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    #[serde(default = "default_rules")]
    enabled: Vec<RuleKind>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            enabled: default_rules(),
        }
    }
}

impl RuleConfig {
    pub fn new(enabled: Vec<RuleKind>) -> Self {
        Self { enabled }
    }

    /// Enabled rules, in evaluation order.
    pub fn enabled(&self) -> &[RuleKind] {
        &self.enabled
    }
}

fn default_rules() -> Vec<RuleKind> {
    vec![RuleKind::MaximumLifelines]
}

/// String-keyed rule settings, kept in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(IndexMap<String, String>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a property (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw value of a property.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.rules().enabled(), &[RuleKind::MaximumLifelines]);
        assert_eq!(config.properties().get("lifeline.max"), Some("10"));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: SyncConfig = toml::from_str("").unwrap();
        assert_eq!(config.rules().enabled(), &[RuleKind::MaximumLifelines]);
        assert_eq!(config.properties().get("lifeline.max"), Some("10"));
    }

    #[test]
    fn test_explicit_properties_replace_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            [properties]
            "message.max" = "5"
            "#,
        )
        .unwrap();
        assert_eq!(config.properties().get("lifeline.max"), None);
        assert_eq!(config.properties().get("message.max"), Some("5"));
    }

    #[test]
    fn test_rules_can_be_disabled() {
        let config: SyncConfig = toml::from_str(
            r#"
            [rules]
            enabled = []
            "#,
        )
        .unwrap();
        assert!(config.rules().enabled().is_empty());
    }

    #[test]
    fn test_unknown_rule_is_rejected() {
        let result: Result<SyncConfig, _> = toml::from_str(
            r#"
            [rules]
            enabled = ["maximum-everything"]
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_properties_builder() {
        let properties = Properties::new().with("a", "1").with("b", "2").with("a", "3");
        assert_eq!(properties.len(), 2);
        assert_eq!(properties.get("a"), Some("3"));
        assert!(!properties.is_empty());
    }
}
