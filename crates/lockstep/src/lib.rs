//! Lockstep - keeps the semantic and notation models of a sequence diagram
//! synchronized while a change log is applied.
//!
//! A change log lists the differences detected between a diagram and its
//! reference call graph. Applying it adds and removes lifelines and message
//! pairs in the semantic model, and the matching views in the notation model,
//! laying out every new execution incrementally. Admission rules may veto
//! individual changes.

pub mod config;
pub mod dispatch;
pub mod interpreter;
pub mod layout;
pub mod notation;
pub mod resource;
pub mod rules;
pub mod semantic;

mod error;

pub use lockstep_core::{change, document, geometry, tree};

pub use error::SyncError;

use log::{debug, info};

use lockstep_core::{change::ChangeLog, document::ChangeLogDocument};

use config::SyncConfig;
use dispatch::{BatchReport, ChangeDispatcher};
use interpreter::Interpreter;

/// Entry point for parsing and applying change logs.
///
/// # Examples
///
/// ```rust
/// use lockstep::{
///     Synchronizer,
///     interpreter::ModelInterpreter,
///     notation::{NotationDiagram, NotationManager},
///     resource::MemoryResource,
///     semantic::{Interaction, SemanticManager},
/// };
///
/// let source = r#"
///     [graph]
///     lifeline = "main"
///     message = "main"
///
///     [[graph.calls]]
///     lifeline = "B"
///     message = "load"
///     reply = "loadReturn"
///
///     [[changes]]
///     kind = "LIFELINE_ADD"
///     lifeline = "main"
///
///     [[changes]]
///     kind = "LIFELINE_ADD"
///     lifeline = "B"
///
///     [[changes]]
///     kind = "MESSAGE_ADD"
///     message = "load"
/// "#;
///
/// let synchronizer = Synchronizer::default();
/// let log = synchronizer.parse(source).expect("Failed to parse change log");
///
/// let mut models = ModelInterpreter::new(
///     SemanticManager::new(Interaction::new("demo"), Box::new(MemoryResource::new("model"))),
///     NotationManager::new(NotationDiagram::new("demo"), Box::new(MemoryResource::new("notation"))),
/// );
/// let report = synchronizer
///     .apply(&log, &mut [&mut models])
///     .expect("Failed to apply change log");
///
/// assert_eq!(report.applied(), 3);
/// assert_eq!(models.semantic().interaction().messages().len(), 2);
/// ```
#[derive(Default)]
pub struct Synchronizer {
    config: SyncConfig,
}

impl Synchronizer {
    /// Create a new synchronizer with the given configuration.
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Parse a TOML change-log document.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` when the source is not valid TOML, or when a change
    /// refers to a message or lifeline missing from the graph.
    pub fn parse(&self, source: &str) -> Result<ChangeLog, SyncError> {
        info!("Parsing change log");
        let document: ChangeLogDocument = toml::from_str(source)?;
        let log = document.into_change_log()?;
        debug!(changes = log.len(), nodes = log.graph().len(); "Change log parsed successfully");
        Ok(log)
    }

    /// Apply `log` through `interpreters` with the configured rules.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a rule or an interpreter. Changes
    /// applied before it are kept.
    pub fn apply(
        &self,
        log: &ChangeLog,
        interpreters: &mut [&mut dyn Interpreter],
    ) -> Result<BatchReport, SyncError> {
        ChangeDispatcher::new(&self.config).apply(log, interpreters)
    }
}
