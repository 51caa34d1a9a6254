//! Lockstep Core Types
//!
//! This crate provides the value types shared by the Lockstep engine and its
//! command-line front end:
//!
//! - **Geometry**: Integer view bounds and the fixed layout constants ([`geometry`] module)
//! - **Tree**: The call tree of the reference graph, stored in an arena ([`tree`] module)
//! - **Changes**: Detected differences and change-log statistics ([`change`] module)
//! - **Documents**: The serialized form of a change log ([`document`] module)

pub mod change;
pub mod document;
pub mod geometry;
pub mod tree;
