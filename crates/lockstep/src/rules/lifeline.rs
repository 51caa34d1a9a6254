use log::debug;

use lockstep_core::{
    change::{Change, ChangeKind},
    tree::NodeTree,
};

use super::{count, threshold, Rule, RuleError, StatsSnapshot};
use crate::config::Properties;

const MAX_KEY: &str = "lifeline.max";

/// Rejects a lifeline addition that would take the diagram past
/// `lifeline.max` lifelines.
///
/// The limit is read on every evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaximumLifelineRule;

impl Rule for MaximumLifelineRule {
    fn name(&self) -> &'static str {
        "maximum-lifelines"
    }

    fn applies_to(&self, kind: ChangeKind) -> bool {
        kind == ChangeKind::LifelineAdd
    }

    fn validate(
        &self,
        change: &Change,
        graph: &NodeTree,
        stats: &StatsSnapshot,
        properties: &Properties,
    ) -> Result<bool, RuleError> {
        let lifeline = graph
            .get(change.new_value())
            .map(|node| node.name())
            .ok_or_else(|| RuleError::Evaluation {
                rule: self.name(),
                reason: format!("node {} is not part of the graph", change.new_value()),
            })?;
        let max = threshold(self.name(), properties, MAX_KEY)?;

        let total = count(stats.diagram.lifelines) + count(stats.reflected.lifeline_additions) + 1
            - count(stats.reflected.lifeline_removals);

        debug!(
            lifeline,
            current = stats.diagram.lifelines,
            added = stats.reflected.lifeline_additions,
            removed = stats.reflected.lifeline_removals,
            total,
            max;
            "Validating lifeline count"
        );

        if total > max {
            debug!(lifeline, max; "Diagram holds the maximum number of lifelines, addition ignored");
            return Ok(false);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use lockstep_core::{
        change::{ChangeCounts, GraphStats},
        tree::{EdgeKind, NodeId},
    };

    use super::*;

    fn graph() -> (NodeTree, NodeId) {
        let mut tree = NodeTree::new("main", "main");
        let root = tree.root();
        let load = tree.add_call(root, "C", "load", EdgeKind::Normal);
        (tree, load)
    }

    fn stats(current: usize, added: usize) -> StatsSnapshot {
        StatsSnapshot {
            diagram: GraphStats::new(current, 0),
            reflected: ChangeCounts {
                lifeline_additions: added,
                ..ChangeCounts::default()
            },
        }
    }

    #[test]
    fn test_admits_up_to_max() {
        let (tree, node) = graph();
        let change = Change::new(ChangeKind::LifelineAdd, node);
        let properties = Properties::new().with("lifeline.max", "3");

        assert_eq!(MaximumLifelineRule.validate(&change, &tree, &stats(2, 0), &properties), Ok(true));
        assert_eq!(MaximumLifelineRule.validate(&change, &tree, &stats(2, 1), &properties), Ok(false));
    }

    #[test]
    fn test_removals_free_room() {
        let (tree, node) = graph();
        let change = Change::new(ChangeKind::LifelineAdd, node);
        let properties = Properties::new().with("lifeline.max", "3");
        let mut snapshot = stats(3, 1);
        snapshot.reflected.lifeline_removals = 2;

        assert_eq!(MaximumLifelineRule.validate(&change, &tree, &snapshot, &properties), Ok(true));
    }

    #[test]
    fn test_missing_threshold_is_configuration_error() {
        let (tree, node) = graph();
        let change = Change::new(ChangeKind::LifelineAdd, node);
        let result = MaximumLifelineRule.validate(&change, &tree, &stats(0, 0), &Properties::new());
        assert!(matches!(
            result,
            Err(RuleError::Configuration {
                rule: "maximum-lifelines",
                key: "lifeline.max",
                ..
            })
        ));
    }

    #[test]
    fn test_non_numeric_threshold_is_configuration_error() {
        let (tree, node) = graph();
        let change = Change::new(ChangeKind::LifelineAdd, node);
        let properties = Properties::new().with("lifeline.max", "three");
        let result = MaximumLifelineRule.validate(&change, &tree, &stats(0, 0), &properties);
        assert!(matches!(result, Err(RuleError::Configuration { .. })));
    }

    #[test]
    fn test_only_lifeline_additions() {
        assert!(MaximumLifelineRule.applies_to(ChangeKind::LifelineAdd));
        assert!(!MaximumLifelineRule.applies_to(ChangeKind::LifelineRemove));
        assert!(!MaximumLifelineRule.applies_to(ChangeKind::MessageAdd));
    }
}
