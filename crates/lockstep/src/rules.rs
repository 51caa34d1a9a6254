//! Admission control.
//!
//! Before a change is applied, every enabled [`Rule`] that applies to its
//! kind is asked whether the change may go through. The answer is the logical
//! AND of the rules, evaluated in order; the first rejection wins. A rejection
//! only skips that change. A rule that cannot reach a verdict returns a
//! [`RuleError`] instead.

mod lifeline;
mod message;

use log::debug;
use thiserror::Error;

use lockstep_core::{
    change::{Change, ChangeCounts, ChangeKind, GraphStats},
    tree::NodeTree,
};

use crate::config::{Properties, RuleConfig, RuleKind};

pub use lifeline::MaximumLifelineRule;
pub use message::MaximumMessageRule;

/// A rule could not evaluate a change.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("rule `{rule}` cannot use property `{key}`: {reason}")]
    Configuration {
        rule: &'static str,
        key: &'static str,
        reason: String,
    },

    #[error("rule `{rule}` failed: {reason}")]
    Evaluation { rule: &'static str, reason: String },
}

/// Read-only counts a rule decides on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// The diagram before the batch.
    pub diagram: GraphStats,
    /// Changes already reflected in the diagram, including those admitted
    /// earlier in the running batch.
    pub reflected: ChangeCounts,
}

/// An admission rule. Rules must not have side effects.
pub trait Rule {
    /// Identifies the rule in logs and errors.
    fn name(&self) -> &'static str;

    /// Whether the rule has an opinion on changes of `kind`.
    fn applies_to(&self, kind: ChangeKind) -> bool;

    /// Returns `Ok(false)` to reject `change`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] when the change cannot be evaluated, for
    /// example because a property the rule reads is missing.
    fn validate(
        &self,
        change: &Change,
        graph: &NodeTree,
        stats: &StatsSnapshot,
        properties: &Properties,
    ) -> Result<bool, RuleError>;
}

/// Ordered set of rules evaluated with short-circuit AND.
#[derive(Default)]
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleEngine {
    /// Creates an engine that admits everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with the rules enabled in `config`, in order.
    pub fn from_config(config: &RuleConfig) -> Self {
        config
            .enabled()
            .iter()
            .fold(Self::new(), |engine, kind| match kind {
                RuleKind::MaximumLifelines => engine.with_rule(MaximumLifelineRule),
                RuleKind::MaximumMessages => engine.with_rule(MaximumMessageRule),
            })
    }

    /// Appends a rule (builder style).
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Names of the rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Decides whether `change` may be applied.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuleError`] raised by an applicable rule.
    pub fn admit(
        &self,
        change: &Change,
        graph: &NodeTree,
        stats: &StatsSnapshot,
        properties: &Properties,
    ) -> Result<bool, RuleError> {
        for rule in self
            .rules
            .iter()
            .filter(|rule| rule.applies_to(change.kind()))
        {
            if !rule.validate(change, graph, stats, properties)? {
                debug!(rule = rule.name(), change_kind:? = change.kind(); "Change rejected by rule");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Reads `key` from `properties` as a count.
fn threshold(rule: &'static str, properties: &Properties, key: &'static str) -> Result<i64, RuleError> {
    let raw = properties.get(key).ok_or_else(|| RuleError::Configuration {
        rule,
        key,
        reason: "property is not set".to_string(),
    })?;
    raw.trim().parse().map_err(|err| RuleError::Configuration {
        rule,
        key,
        reason: format!("`{raw}` is not a number: {err}"),
    })
}

fn count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use lockstep_core::tree::EdgeKind;

    use super::*;

    struct RejectAll;

    impl Rule for RejectAll {
        fn name(&self) -> &'static str {
            "reject-all"
        }

        fn applies_to(&self, _kind: ChangeKind) -> bool {
            true
        }

        fn validate(&self, _: &Change, _: &NodeTree, _: &StatsSnapshot, _: &Properties) -> Result<bool, RuleError> {
            Ok(false)
        }
    }

    struct Failing;

    impl Rule for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn applies_to(&self, _kind: ChangeKind) -> bool {
            true
        }

        fn validate(&self, _: &Change, _: &NodeTree, _: &StatsSnapshot, _: &Properties) -> Result<bool, RuleError> {
            Err(RuleError::Evaluation {
                rule: "failing",
                reason: "boom".to_string(),
            })
        }
    }

    fn lifeline_change() -> (NodeTree, Change) {
        let mut tree = NodeTree::new("main", "main");
        let root = tree.root();
        let load = tree.add_call(root, "B", "load", EdgeKind::Normal);
        (tree, Change::new(ChangeKind::LifelineAdd, load))
    }

    #[test]
    fn test_empty_engine_admits() {
        let (tree, change) = lifeline_change();
        let engine = RuleEngine::new();
        assert_eq!(
            engine.admit(&change, &tree, &StatsSnapshot::default(), &Properties::new()),
            Ok(true)
        );
    }

    #[test]
    fn test_first_rejection_short_circuits() {
        let (tree, change) = lifeline_change();
        let engine = RuleEngine::new().with_rule(RejectAll).with_rule(Failing);
        assert_eq!(
            engine.admit(&change, &tree, &StatsSnapshot::default(), &Properties::new()),
            Ok(false)
        );
    }

    #[test]
    fn test_rule_error_propagates() {
        let (tree, change) = lifeline_change();
        let engine = RuleEngine::new().with_rule(Failing).with_rule(RejectAll);
        assert!(matches!(
            engine.admit(&change, &tree, &StatsSnapshot::default(), &Properties::new()),
            Err(RuleError::Evaluation { rule: "failing", .. })
        ));
    }

    #[test]
    fn test_from_config_keeps_order() {
        let config = RuleConfig::new(vec![RuleKind::MaximumMessages, RuleKind::MaximumLifelines]);
        let engine = RuleEngine::from_config(&config);
        assert_eq!(engine.rule_names(), vec!["maximum-messages", "maximum-lifelines"]);
    }

    #[test]
    fn test_threshold_errors() {
        let properties = Properties::new().with("lifeline.max", "many");
        assert!(matches!(
            threshold("test", &properties, "lifeline.max"),
            Err(RuleError::Configuration { key: "lifeline.max", .. })
        ));
        assert!(matches!(
            threshold("test", &properties, "message.max"),
            Err(RuleError::Configuration { key: "message.max", .. })
        ));
        assert_eq!(threshold("test", &Properties::new().with("message.max", " 7 "), "message.max"), Ok(7));
    }
}
