//! Error types for Lockstep operations.
//!
//! This module provides the main error type [`SyncError`]. Structural and
//! persistence errors abort a batch; a rule rejecting a change is not an
//! error at all.

use std::io;

use thiserror::Error;

use lockstep_core::{document::DocumentError, tree::NodeId};

use crate::{layout::LayoutError, resource::PersistError, rules::RuleError};

/// The main error type for Lockstep operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unable to interpret message `{message}` because it does not contain a return message")]
    MissingReturnMessage { message: String },

    #[error("change refers to node {0}, which is not part of the reference graph")]
    UnknownNode(NodeId),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("unable to update {resource} resource: {source}")]
    Persistence {
        resource: String,
        #[source]
        source: PersistError,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Create a new `Persistence` error for the named resource.
    pub fn persistence(resource: impl Into<String>, source: impl Into<PersistError>) -> Self {
        Self::Persistence {
            resource: resource.into(),
            source: source.into(),
        }
    }
}
