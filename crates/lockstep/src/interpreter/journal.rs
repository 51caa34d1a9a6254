use log::{debug, trace};
use serde::{Deserialize, Serialize};

use lockstep_core::{
    change::{Change, ChangeKind},
    tree::NodeTree,
};

use crate::{error::SyncError, interpreter::Interpreter, resource::Resource};

/// One applied change, as recorded in the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub kind: ChangeKind,
    /// Lifeline name for lifeline changes, message name otherwise.
    pub subject: String,
}

#[derive(Serialize)]
struct JournalDocument<'a> {
    entries: &'a [JournalEntry],
}

/// Records every admitted change and writes the list out when the batch is
/// finalized.
pub struct ChangeJournal {
    entries: Vec<JournalEntry>,
    resource: Box<dyn Resource>,
}

impl ChangeJournal {
    pub fn new(resource: Box<dyn Resource>) -> Self {
        Self {
            entries: Vec::new(),
            resource,
        }
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }
}

impl Interpreter for ChangeJournal {
    fn name(&self) -> &str {
        "journal"
    }

    fn interpret(&mut self, change: &Change, graph: &NodeTree) -> Result<(), SyncError> {
        let node = graph
            .get(change.new_value())
            .ok_or(SyncError::UnknownNode(change.new_value()))?;
        let subject = if change.kind().is_lifeline() {
            node.name()
        } else {
            node.edge().name()
        };
        trace!(change_kind:? = change.kind(), subject; "Journaling change");
        self.entries.push(JournalEntry {
            kind: change.kind(),
            subject: subject.to_string(),
        });
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SyncError> {
        let document = JournalDocument {
            entries: &self.entries,
        };
        let contents = toml::to_string(&document)
            .map_err(|source| SyncError::persistence(self.resource.name(), source))?;
        self.resource
            .save(&contents)
            .map_err(|source| SyncError::persistence(self.resource.name(), source))?;
        debug!(entries = self.entries.len(), resource = self.resource.name(); "Journal written");
        Ok(())
    }
}
