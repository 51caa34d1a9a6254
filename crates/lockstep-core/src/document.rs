//! Serialized form of a change log.
//!
//! Change logs handed over by the comparison step are stored as TOML: the
//! reference graph as a nested [`NodeSpec`], optionally the diagram graph
//! the removals were detected in, and the changes referring to nodes by
//! message name or lifeline name.
//!
//! ```toml
//! [graph]
//! lifeline = "main"
//! message = "main"
//!
//! [[graph.calls]]
//! lifeline = "B"
//! message = "fetch"
//! reply = "fetchReturn"
//!
//! [diagram_graph]
//! lifeline = "main"
//! message = "main"
//!
//! [[diagram_graph.calls]]
//! lifeline = "B"
//! message = "load"
//! reply = "loadReturn"
//!
//! [[changes]]
//! kind = "MESSAGE_REMOVE"
//! message = "load"
//!
//! [[changes]]
//! kind = "MESSAGE_ADD"
//! message = "fetch"
//! ```
//!
//! Removals resolve against `diagram_graph` when it is present, everything
//! else against `graph`. A `[diagram]` table overrides the statistics that
//! would otherwise be counted from `diagram_graph`.

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    change::{Change, ChangeCounts, ChangeKind, ChangeLog, GraphStats},
    tree::{NodeId, NodeSpec, NodeTree},
};

/// Errors raised while turning a [`ChangeLogDocument`] into a [`ChangeLog`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("change #{index} ({kind}) names no message or lifeline")]
    MissingSubject { index: usize, kind: ChangeKind },

    #[error("change #{index} refers to unknown message `{message}`")]
    UnknownMessage { index: usize, message: String },

    #[error("change #{index} refers to unknown lifeline `{lifeline}`")]
    UnknownLifeline { index: usize, lifeline: String },
}

/// One change as written in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifeline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_message: Option<String>,
}

/// A change log as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogDocument {
    pub graph: NodeSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram_graph: Option<NodeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram: Option<GraphStats>,
    #[serde(default)]
    pub reflected: ChangeCounts,
    #[serde(default)]
    pub changes: Vec<ChangeEntry>,
}

impl ChangeLogDocument {
    /// Resolves every entry against the graph and builds the change log.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] when an entry has no subject or names a
    /// message or lifeline that is not part of the graph.
    pub fn into_change_log(self) -> Result<ChangeLog, DocumentError> {
        let graph = NodeTree::from_spec(&self.graph);
        let diagram_graph = self.diagram_graph.as_ref().map(NodeTree::from_spec);
        let removal_graph = diagram_graph.as_ref().unwrap_or(&graph);

        let changes = self
            .changes
            .iter()
            .enumerate()
            .map(|(index, entry)| resolve_entry(&graph, removal_graph, index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            changes = changes.len(),
            nodes = graph.len(),
            diagram_nodes = diagram_graph.as_ref().map(NodeTree::len);
            "Change log document resolved"
        );

        let mut log = ChangeLog::new(graph, changes).with_reflected(self.reflected);
        if let Some(diagram_graph) = diagram_graph {
            log = log.with_diagram_graph(diagram_graph);
        }
        if let Some(diagram) = self.diagram {
            log = log.with_diagram_stats(diagram);
        }
        Ok(log)
    }
}

fn resolve_entry(
    graph: &NodeTree,
    removal_graph: &NodeTree,
    index: usize,
    entry: &ChangeEntry,
) -> Result<Change, DocumentError> {
    let graph = if entry.kind.is_removal() { removal_graph } else { graph };
    let new_value = match (&entry.message, &entry.lifeline) {
        (Some(message), _) => resolve_message(graph, index, message)?,
        (None, Some(lifeline)) => {
            graph
                .find_lifeline(lifeline)
                .ok_or_else(|| DocumentError::UnknownLifeline {
                    index,
                    lifeline: lifeline.clone(),
                })?
        }
        (None, None) => {
            return Err(DocumentError::MissingSubject {
                index,
                kind: entry.kind,
            });
        }
    };

    let mut change = Change::new(entry.kind, new_value);
    if let Some(old_message) = &entry.old_message {
        change = change.with_old_value(resolve_message(removal_graph, index, old_message)?);
    }
    Ok(change)
}

/// Calls are preferred; a reply is only picked when no call has the name.
fn resolve_message(graph: &NodeTree, index: usize, message: &str) -> Result<NodeId, DocumentError> {
    graph
        .find_call(message)
        .or_else(|| graph.ids().find(|&id| graph.node(id).edge().name() == message))
        .ok_or_else(|| DocumentError::UnknownMessage {
            index,
            message: message.to_string(),
        })
}
