//! Core data types for depgraph.
//!
//! This crate defines the vocabulary shared by the graph builder and the
//! resolution service adapters: Maven coordinates and dependency declarations,
//! the dependency node tree returned by a resolution service, the dependency
//! graph handed to callers, repositories, traversal modes and sessions, the
//! [`resolution::ResolutionService`] port, and global configuration.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod config;
pub mod dependency;
pub mod graph;
pub mod node;
pub mod problem;
pub mod repository;
pub mod resolution;
pub mod session;
