//! Shared utilities for the depgraph workspace.
//!
//! This crate provides the cross-cutting concerns used by the other depgraph
//! crates: the unified error type and a handful of filesystem helpers.

pub mod errors;
pub mod fs;
