//! Semantic model of the sequence diagram.
//!
//! The [`Interaction`] holds lifelines, messages, execution specifications
//! and combined fragments. Only the [`SemanticManager`] mutates it while a
//! batch is applied.

mod interaction;
mod manager;

pub use interaction::{
    CombinedFragment, ExecutionSpecification, Interaction, Lifeline, Message, MessageKind,
};
pub use manager::{MessageSet, SemanticManager};
