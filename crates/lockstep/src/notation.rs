//! Notation model of the sequence diagram.
//!
//! The [`NotationDiagram`] is a tree of views carrying bounds. The
//! [`NotationManager`] mutates it and leaves every geometric decision to
//! [`crate::layout`].

mod diagram;
mod manager;

pub use diagram::{DiagramError, NotationDiagram, View, ViewElement, ViewId};
pub use manager::{NotationManager, RemovalContext};
