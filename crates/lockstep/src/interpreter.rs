//! Consumers of admitted changes.
//!
//! The dispatcher hands every admitted change to each registered
//! [`Interpreter`] in turn and calls [`Interpreter::finalize`] once the whole
//! log has been processed. [`ModelInterpreter`] keeps the semantic and
//! notation models in lockstep; [`ChangeJournal`] records what was applied.

mod journal;
mod model;

use lockstep_core::{
    change::{Change, GraphStats},
    tree::NodeTree,
};

use crate::error::SyncError;

pub use journal::{ChangeJournal, JournalEntry};
pub use model::ModelInterpreter;

/// Applies changes to some target.
pub trait Interpreter {
    /// Identifies the interpreter in logs.
    fn name(&self) -> &str;

    /// Applies one admitted change. `graph` is the reference graph the
    /// change's nodes belong to.
    ///
    /// # Errors
    ///
    /// Any error aborts the remaining batch.
    fn interpret(&mut self, change: &Change, graph: &NodeTree) -> Result<(), SyncError>;

    /// Counts of the diagram this interpreter writes to, if it holds one.
    ///
    /// The dispatcher reads this once before the first change so admission
    /// rules see the saved diagram rather than the change log's claim.
    fn diagram_stats(&self) -> Option<GraphStats> {
        None
    }

    /// Called once after the last change of the batch.
    ///
    /// # Errors
    ///
    /// Returns an error when the final state cannot be persisted.
    fn finalize(&mut self) -> Result<(), SyncError>;
}
