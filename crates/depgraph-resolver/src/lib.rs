//! Dependency graph builder: turns top-level artifacts or a single root
//! dependency into a mediated or full dependency graph, delegating the
//! resolution itself to a [`ResolutionService`](depgraph_core::resolution::ResolutionService).

pub mod builder;
pub mod normalizer;
pub mod session;

pub use builder::DependencyGraphBuilder;
