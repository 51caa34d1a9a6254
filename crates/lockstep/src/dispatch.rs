//! Application order of a change log.
//!
//! A log is applied in five passes, one per change kind, in a fixed priority
//! order. Message removals run first and last-to-first, so that every removal
//! still finds the sibling and parent executions it is positioned against.
//! All other passes run in detection order.
//!
//! ```text
//! MESSAGE_REMOVE (reverse) -> LIFELINE_ADD -> MESSAGE_ADD -> MESSAGE_MODIFY -> LIFELINE_REMOVE
//! ```

use log::{debug, info};

use lockstep_core::{
    change::{Change, ChangeCounts, ChangeKind, ChangeLog},
    tree::NodeTree,
};

use crate::{
    config::{Properties, SyncConfig},
    error::SyncError,
    interpreter::Interpreter,
    rules::{RuleEngine, StatsSnapshot},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Traversal {
    Forward,
    Reverse,
}

const PASSES: [(ChangeKind, Traversal); 5] = [
    (ChangeKind::MessageRemove, Traversal::Reverse),
    (ChangeKind::LifelineAdd, Traversal::Forward),
    (ChangeKind::MessageAdd, Traversal::Forward),
    (ChangeKind::MessageModify, Traversal::Forward),
    (ChangeKind::LifelineRemove, Traversal::Forward),
];

/// Outcome of a successfully applied batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    applied: usize,
    rejected: usize,
}

impl BatchReport {
    /// Changes handed to the interpreters.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Changes skipped by admission control.
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

/// Drives interpreters through a change log.
pub struct ChangeDispatcher {
    rules: RuleEngine,
    properties: Properties,
}

impl ChangeDispatcher {
    /// Creates a dispatcher evaluating the rules enabled in `config`.
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            rules: RuleEngine::from_config(config.rules()),
            properties: config.properties().clone(),
        }
    }

    /// Replaces the admission rules.
    pub fn with_rules(mut self, rules: RuleEngine) -> Self {
        self.rules = rules;
        self
    }

    /// Applies `log` through every interpreter, then finalizes them.
    ///
    /// Each admitted change is given to the interpreters in slice order. A
    /// rejected change is skipped. Changes applied before an error are not
    /// rolled back.
    ///
    /// # Errors
    ///
    /// Returns the first interpreter or rule error; the remaining changes
    /// are not applied and no interpreter is finalized.
    pub fn apply(
        &self,
        log: &ChangeLog,
        interpreters: &mut [&mut dyn Interpreter],
    ) -> Result<BatchReport, SyncError> {
        info!(changes = log.len(), interpreters = interpreters.len(); "Applying change log");

        let diagram = interpreters
            .iter()
            .find_map(|interpreter| interpreter.diagram_stats())
            .unwrap_or_else(|| log.diagram_stats());
        debug!(lifelines = diagram.lifelines, messages = diagram.messages; "Diagram counts before the batch");

        let mut admitted = ChangeCounts::default();
        let mut report = BatchReport::default();

        for (kind, traversal) in PASSES {
            let graph = log.graph_for(kind);
            let mut changes: Vec<&Change> = log
                .changes()
                .iter()
                .filter(|change| change.kind() == kind)
                .collect();
            if traversal == Traversal::Reverse {
                changes.reverse();
            }

            for change in changes {
                let stats = StatsSnapshot {
                    diagram,
                    reflected: log.stats().reflected().combined(admitted),
                };
                if !self.rules.admit(change, graph, &stats, &self.properties)? {
                    info!(change_kind:% = kind, node:% = change.new_value(); "Change rejected, skipping");
                    report.rejected += 1;
                    continue;
                }

                debug!(change_kind:% = kind, node:% = change.new_value(); "Interpreting change");
                for interpreter in interpreters.iter_mut() {
                    interpreter.interpret(change, graph)?;
                }
                if counts_towards_stats(change, graph) {
                    admitted.record(kind);
                }
                report.applied += 1;
            }
        }

        for interpreter in interpreters.iter_mut() {
            debug!(interpreter = interpreter.name(); "Finalizing interpreter");
            interpreter.finalize()?;
        }

        info!(applied = report.applied, rejected = report.rejected; "Change log applied");
        Ok(report)
    }
}

/// Return edges are applied as part of their call and do not count.
fn counts_towards_stats(change: &Change, graph: &NodeTree) -> bool {
    change.kind().is_lifeline()
        || graph
            .get(change.new_value())
            .is_some_and(|node| !node.edge().is_return())
}
