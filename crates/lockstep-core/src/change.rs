//! Detected differences and the change log that carries them.
//!
//! A [`ChangeLog`] is produced by diagram comparison and is read-only from
//! here on. Its order is the detection order; the dispatcher decides the
//! application order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tree::{NodeId, NodeTree};

/// Kind of a detected difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    MessageAdd,
    MessageRemove,
    MessageModify,
    LifelineAdd,
    LifelineRemove,
}

impl ChangeKind {
    /// Stable code of the kind, as written in change logs and journals.
    pub fn code(self) -> &'static str {
        match self {
            Self::MessageAdd => "MESSAGE_ADD",
            Self::MessageRemove => "MESSAGE_REMOVE",
            Self::MessageModify => "MESSAGE_MODIFY",
            Self::LifelineAdd => "LIFELINE_ADD",
            Self::LifelineRemove => "LIFELINE_REMOVE",
        }
    }

    /// Returns `true` for the two lifeline kinds.
    pub fn is_lifeline(self) -> bool {
        matches!(self, Self::LifelineAdd | Self::LifelineRemove)
    }

    /// Returns `true` for the kinds whose value is an element of the
    /// current diagram rather than of the reference graph.
    pub fn is_removal(self) -> bool {
        matches!(self, Self::MessageRemove | Self::LifelineRemove)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One detected difference.
///
/// The new value of a removal is a node of the diagram graph, every other
/// new value a node of the reference graph (see [`ChangeLog::graph_for`]).
/// An old value always belongs to the diagram graph. For lifeline changes
/// the node's name is the lifeline descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    kind: ChangeKind,
    old_value: Option<NodeId>,
    new_value: NodeId,
}

impl Change {
    pub fn new(kind: ChangeKind, new_value: NodeId) -> Self {
        Self {
            kind,
            old_value: None,
            new_value,
        }
    }

    /// Sets the value this change replaces.
    pub fn with_old_value(mut self, old_value: NodeId) -> Self {
        self.old_value = Some(old_value);
        self
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn old_value(&self) -> Option<NodeId> {
        self.old_value
    }

    pub fn new_value(&self) -> NodeId {
        self.new_value
    }
}

/// Additions and removals, per element kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeCounts {
    pub lifeline_additions: usize,
    pub lifeline_removals: usize,
    pub message_additions: usize,
    pub message_removals: usize,
}

impl ChangeCounts {
    /// Counts one change of `kind`. Modifications are not counted.
    pub fn record(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::LifelineAdd => self.lifeline_additions += 1,
            ChangeKind::LifelineRemove => self.lifeline_removals += 1,
            ChangeKind::MessageAdd => self.message_additions += 1,
            ChangeKind::MessageRemove => self.message_removals += 1,
            ChangeKind::MessageModify => {}
        }
    }

    /// Field-wise sum.
    pub fn combined(self, other: ChangeCounts) -> ChangeCounts {
        ChangeCounts {
            lifeline_additions: self.lifeline_additions + other.lifeline_additions,
            lifeline_removals: self.lifeline_removals + other.lifeline_removals,
            message_additions: self.message_additions + other.message_additions,
            message_removals: self.message_removals + other.message_removals,
        }
    }
}

/// Aggregate statistics of a change log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeLogStats {
    pending: ChangeCounts,
    reflected: ChangeCounts,
}

impl ChangeLogStats {
    pub fn new(pending: ChangeCounts, reflected: ChangeCounts) -> Self {
        Self { pending, reflected }
    }

    /// Changes in the log that are still to be applied.
    pub fn pending(&self) -> ChangeCounts {
        self.pending
    }

    /// Changes that are already reflected in the diagram.
    pub fn reflected(&self) -> ChangeCounts {
        self.reflected
    }
}

/// Counts of the diagram graph before the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphStats {
    pub lifelines: usize,
    pub messages: usize,
}

impl GraphStats {
    pub fn new(lifelines: usize, messages: usize) -> Self {
        Self {
            lifelines,
            messages,
        }
    }

    /// Distinct lifelines and calls of `graph`.
    pub fn of(graph: &NodeTree) -> Self {
        Self::new(graph.lifeline_names().len(), graph.call_count())
    }
}

/// Ordered changes over a reference graph, plus their statistics.
///
/// Additions are detected in the reference graph. Removals are detected in
/// the diagram graph, the call tree of the diagram as it stands before the
/// batch; without one, removals point into the reference graph as well.
///
/// # Examples
///
/// ```
/// # use lockstep_core::change::{Change, ChangeKind, ChangeLog};
/// # use lockstep_core::tree::{EdgeKind, NodeTree};
/// let mut graph = NodeTree::new("main", "main");
/// let root = graph.root();
/// let load = graph.add_call(root, "B", "load", EdgeKind::Normal);
/// graph.add_reply(load, "loadReturn");
///
/// let log = ChangeLog::new(graph, vec![Change::new(ChangeKind::MessageAdd, load)]);
/// assert_eq!(log.stats().pending().message_additions, 1);
/// ```
#[derive(Debug, Clone)]
pub struct ChangeLog {
    graph: NodeTree,
    diagram_graph: Option<NodeTree>,
    changes: Vec<Change>,
    stats: ChangeLogStats,
    diagram_stats: Option<GraphStats>,
}

impl ChangeLog {
    /// Creates a change log. Pending counts are taken from `changes`.
    pub fn new(graph: NodeTree, changes: Vec<Change>) -> Self {
        let mut pending = ChangeCounts::default();
        for change in &changes {
            pending.record(change.kind());
        }
        Self {
            graph,
            diagram_graph: None,
            changes,
            stats: ChangeLogStats::new(pending, ChangeCounts::default()),
            diagram_stats: None,
        }
    }

    /// Sets the counts of changes already reflected in the diagram.
    pub fn with_reflected(mut self, reflected: ChangeCounts) -> Self {
        self.stats = ChangeLogStats::new(self.stats.pending(), reflected);
        self
    }

    /// Sets the statistics of the diagram the changes were detected against.
    pub fn with_diagram_stats(mut self, diagram_stats: GraphStats) -> Self {
        self.diagram_stats = Some(diagram_stats);
        self
    }

    /// Sets the graph removal values point into.
    pub fn with_diagram_graph(mut self, diagram_graph: NodeTree) -> Self {
        self.diagram_graph = Some(diagram_graph);
        self
    }

    /// The reference graph additions point into.
    pub fn graph(&self) -> &NodeTree {
        &self.graph
    }

    pub fn diagram_graph(&self) -> Option<&NodeTree> {
        self.diagram_graph.as_ref()
    }

    /// The graph the values of a `kind` change are nodes of.
    pub fn graph_for(&self, kind: ChangeKind) -> &NodeTree {
        match &self.diagram_graph {
            Some(diagram_graph) if kind.is_removal() => diagram_graph,
            _ => &self.graph,
        }
    }

    /// Changes in detection order.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn stats(&self) -> ChangeLogStats {
        self.stats
    }

    /// Statistics of the diagram before the batch: the ones set explicitly,
    /// else those of the diagram graph, else empty.
    pub fn diagram_stats(&self) -> GraphStats {
        self.diagram_stats
            .or_else(|| self.diagram_graph.as_ref().map(GraphStats::of))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
