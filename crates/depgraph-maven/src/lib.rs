//! Maven-backed resolution service for depgraph.
//!
//! [`MavenResolutionService`] implements the
//! [`ResolutionService`](depgraph_core::resolution::ResolutionService) port:
//! it reads POMs (with parents, properties and BOM imports), collects the
//! dependency tree breadth-first according to the session's traversal mode,
//! and downloads every artifact in the tree into the session's local
//! repository.

pub mod artifact;
pub mod auth;
pub mod checksum;
pub mod collector;
pub mod descriptor;
pub mod download;
pub mod local_repository;
pub mod pom;
pub mod service;

pub use service::MavenResolutionService;
