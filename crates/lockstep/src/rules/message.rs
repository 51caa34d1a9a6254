use log::debug;

use lockstep_core::{
    change::{Change, ChangeKind},
    tree::NodeTree,
};

use super::{count, threshold, Rule, RuleError, StatsSnapshot};
use crate::config::Properties;

const MAX_KEY: &str = "message.max";

/// Rejects a message addition that would take the diagram past
/// `message.max` call messages. Replies are never counted.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaximumMessageRule;

impl Rule for MaximumMessageRule {
    fn name(&self) -> &'static str {
        "maximum-messages"
    }

    fn applies_to(&self, kind: ChangeKind) -> bool {
        kind == ChangeKind::MessageAdd
    }

    fn validate(
        &self,
        change: &Change,
        graph: &NodeTree,
        stats: &StatsSnapshot,
        properties: &Properties,
    ) -> Result<bool, RuleError> {
        let node = graph
            .get(change.new_value())
            .ok_or_else(|| RuleError::Evaluation {
                rule: self.name(),
                reason: format!("node {} is not part of the graph", change.new_value()),
            })?;
        if node.edge().is_return() {
            return Ok(true);
        }
        let max = threshold(self.name(), properties, MAX_KEY)?;

        let total = count(stats.diagram.messages) + count(stats.reflected.message_additions) + 1
            - count(stats.reflected.message_removals);
        debug!(message = node.edge().name(), total, max; "Validating message count");

        Ok(total <= max)
    }
}

#[cfg(test)]
mod tests {
    use lockstep_core::{
        change::{ChangeCounts, GraphStats},
        tree::EdgeKind,
    };

    use super::*;

    #[test]
    fn test_message_limit() {
        let mut tree = NodeTree::new("main", "main");
        let root = tree.root();
        let load = tree.add_call(root, "B", "load", EdgeKind::Normal);
        let change = Change::new(ChangeKind::MessageAdd, load);
        let properties = Properties::new().with("message.max", "2");

        let mut stats = StatsSnapshot {
            diagram: GraphStats::new(2, 1),
            ..StatsSnapshot::default()
        };
        assert_eq!(MaximumMessageRule.validate(&change, &tree, &stats, &properties), Ok(true));

        stats.reflected = ChangeCounts {
            message_additions: 1,
            ..ChangeCounts::default()
        };
        assert_eq!(MaximumMessageRule.validate(&change, &tree, &stats, &properties), Ok(false));
    }

    #[test]
    fn test_replies_are_admitted_without_threshold() {
        let mut tree = NodeTree::new("main", "main");
        let root = tree.root();
        let load = tree.add_call(root, "B", "load", EdgeKind::Normal);
        let reply = tree.add_reply(load, "loadReturn");
        let change = Change::new(ChangeKind::MessageAdd, reply);

        assert_eq!(
            MaximumMessageRule.validate(&change, &tree, &StatsSnapshot::default(), &Properties::new()),
            Ok(true)
        );
    }

    #[test]
    fn test_unknown_node_is_evaluation_error() {
        let tree = NodeTree::new("main", "main");
        let mut other = NodeTree::new("main", "main");
        let root = other.root();
        let stray = other.add_call(root, "B", "load", EdgeKind::Normal);
        let change = Change::new(ChangeKind::MessageAdd, stray);

        assert!(matches!(
            MaximumMessageRule.validate(&change, &tree, &StatsSnapshot::default(), &Properties::new()),
            Err(RuleError::Evaluation { rule: "maximum-messages", .. })
        ));
    }
}
