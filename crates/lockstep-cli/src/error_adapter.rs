//! Error adapter for converting SyncError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI.
//!
//! # Error chains
//!
//! A persistence error and the I/O or serialization failure behind it are
//! rendered as one report; miette walks the `source` chain itself.

use std::fmt;

use miette::Diagnostic as MietteDiagnostic;

use lockstep::SyncError;

/// Adapter for a [`SyncError`].
///
/// Assigns each variant a stable diagnostic code and, where the fix is
/// usually the same, a help line.
pub struct ErrorAdapter<'a>(pub &'a SyncError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(self.0)
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            SyncError::MissingReturnMessage { .. } => "lockstep::missing_return",
            SyncError::UnknownNode(_) => "lockstep::unknown_node",
            SyncError::Layout(_) => "lockstep::layout",
            SyncError::Rule(_) => "lockstep::rule",
            SyncError::Persistence { .. } => "lockstep::persistence",
            SyncError::Parse(_) => "lockstep::parse",
            SyncError::Document(_) => "lockstep::document",
            SyncError::Io(_) => "lockstep::io",
            SyncError::Config(_) => "lockstep::config",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            SyncError::MissingReturnMessage { .. } => {
                "every call in the reference graph needs a `reply` message"
            }
            SyncError::Layout(_) => {
                "the notation file may be out of date with the model file; changes applied before this one were kept"
            }
            SyncError::Rule(_) => "check the rule properties in the configuration file",
            SyncError::Document(_) => {
                "changes must name a message or lifeline present in the change log's graph"
            }
            SyncError::UnknownNode(_)
            | SyncError::Persistence { .. }
            | SyncError::Parse(_)
            | SyncError::Io(_)
            | SyncError::Config(_) => return None,
        };
        Some(Box::new(help))
    }
}

/// Convert a [`SyncError`] into the list of reports to render.
pub fn to_reportables(err: &SyncError) -> Vec<ErrorAdapter<'_>> {
    vec![ErrorAdapter(err)]
}
