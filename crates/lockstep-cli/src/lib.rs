//! CLI logic for the Lockstep synchronizer.
//!
//! This module contains the core CLI logic: it applies one change log to a
//! semantic model file and a notation model file, optionally journaling the
//! applied changes.

pub mod error_adapter;

mod args;
mod config;
mod resource;

pub use args::Args;
pub use resource::FileResource;

use std::{fs, path::Path};

use log::info;

use lockstep::{
    SyncError, Synchronizer,
    dispatch::BatchReport,
    interpreter::{ChangeJournal, ModelInterpreter},
    notation::{NotationDiagram, NotationManager},
    semantic::{Interaction, SemanticManager},
};

/// Run the Lockstep CLI application
///
/// This function reads the change log, loads the saved models (or starts
/// from empty ones) and applies the log to them. The model files are
/// rewritten after every applied change and once more at the end.
///
/// # Errors
///
/// Returns `SyncError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Change-log parsing errors
/// - Interpretation and layout errors
/// - Rule evaluation errors
pub fn run(args: &Args) -> Result<BatchReport, SyncError> {
    info!(
        input_path = args.input,
        model_path = args.model,
        notation_path = args.notation;
        "Applying change log"
    );

    let config = config::load_config(args.config.as_ref())?;
    let source = fs::read_to_string(&args.input)?;

    let synchronizer = Synchronizer::new(config);
    let log = synchronizer.parse(&source)?;

    let name = diagram_name(&args.input);
    let interaction = resource::load_or_else(Path::new(&args.model), || Interaction::new(name))?;
    let diagram = resource::load_or_else(Path::new(&args.notation), || NotationDiagram::new(name))?;

    let mut models = ModelInterpreter::new(
        SemanticManager::new(interaction, Box::new(FileResource::new("model", &args.model))),
        NotationManager::new(diagram, Box::new(FileResource::new("notation", &args.notation))),
    );
    let mut journal = args
        .journal
        .as_ref()
        .map(|path| ChangeJournal::new(Box::new(FileResource::new("journal", path))));

    let report = match journal.as_mut() {
        Some(journal) => synchronizer.apply(&log, &mut [&mut models, journal])?,
        None => synchronizer.apply(&log, &mut [&mut models])?,
    };

    info!(
        applied = report.applied(),
        rejected = report.rejected(),
        model_path = args.model;
        "Models synchronized"
    );

    Ok(report)
}

/// The input file's stem, used to name models that do not exist yet.
fn diagram_name(input: &str) -> &str {
    Path::new(input)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("diagram")
}
