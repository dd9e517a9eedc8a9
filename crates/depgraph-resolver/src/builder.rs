//! Builds mediated and full dependency graphs through a resolution service.
//!
//! A *mediated* graph is the tree `mvn dependency:tree` shows:
//!
//! - at most one node per `group:artifact` (nearest wins);
//! - transitive scopes narrow according to the parent's scope;
//! - provided and optional dependencies of transitive nodes are left out.
//!
//! A *full* graph resolves every node's dependencies recursively:
//!
//! - the same `group:artifact` may appear many times, at different versions;
//! - a node's scope does not affect its children's;
//! - provided and optional dependencies are treated like any other.
//!
//! Missing artifacts, unreachable repositories and similar resolution
//! problems never fail a build: the graph is returned with whatever was
//! resolved, and each unresolved artifact is recorded on it.

use std::path::PathBuf;
use std::sync::Arc;

use depgraph_core::config::GlobalConfig;
use depgraph_core::dependency::{Dependency, MavenCoordinate};
use depgraph_core::graph::DependencyGraph;
use depgraph_core::node::DependencyNode;
use depgraph_core::repository::RepositoryRegistry;
use depgraph_core::resolution::{
    CollectRequest, DependencyRequest, DependencyResult, ResolutionFailure, ResolutionService,
};
use depgraph_core::session::TraversalMode;
use depgraph_util::errors::DepGraphError;

use crate::normalizer;
use crate::session::SessionFactory;

/// Builds dependency graphs for Maven artifacts.
pub struct DependencyGraphBuilder {
    service: Arc<dyn ResolutionService>,
    repositories: RepositoryRegistry,
    sessions: SessionFactory,
    local_repository: Option<PathBuf>,
}

impl DependencyGraphBuilder {
    /// A builder that searches Maven Central only.
    pub fn new(service: Arc<dyn ResolutionService>) -> Self {
        Self {
            service,
            repositories: RepositoryRegistry::default(),
            sessions: SessionFactory::default(),
            local_repository: None,
        }
    }

    /// A builder that searches `urls`, in order.
    ///
    /// Fails with [`DepGraphError::InvalidRepository`] if a URL is malformed
    /// or does not use an allowed scheme.
    pub fn with_repositories<I, S>(
        service: Arc<dyn ResolutionService>,
        urls: I,
    ) -> Result<Self, DepGraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            repositories: RepositoryRegistry::new(urls)?,
            ..Self::new(service)
        })
    }

    /// A builder using the repositories and local repository from `config`.
    pub fn from_config(
        service: Arc<dyn ResolutionService>,
        config: &GlobalConfig,
    ) -> Result<Self, DepGraphError> {
        let repositories = if config.repositories.is_empty() {
            RepositoryRegistry::default()
        } else {
            RepositoryRegistry::new(&config.repositories)?
        };
        Ok(Self {
            service,
            repositories,
            sessions: SessionFactory::from_config(config),
            local_repository: None,
        })
    }

    pub fn repositories(&self) -> &RepositoryRegistry {
        &self.repositories
    }

    /// Store downloads in `path` instead of the default local repository.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn set_local_repository(&mut self, path: impl Into<PathBuf>) {
        self.local_repository = Some(path.into());
    }

    /// The full compile-time dependency graph of `artifacts`, including
    /// duplicates, conflicting versions, and provided and optional
    /// dependencies.
    ///
    /// Artifacts that cannot be resolved are recorded on the returned graph.
    pub fn build_full_graph(
        &self,
        artifacts: &[MavenCoordinate],
    ) -> miette::Result<DependencyGraph> {
        let nodes: Vec<DependencyNode> = artifacts
            .iter()
            .cloned()
            .map(DependencyNode::from_artifact)
            .collect();
        self.build_graph(&nodes, TraversalMode::Full)
    }

    /// The dependency graph of `dependency` as Maven sees it: no duplicates,
    /// conflicting versions resolved in favor of the nearest one.
    ///
    /// Artifacts that cannot be resolved are recorded on the returned graph.
    pub fn build_mediated_graph(
        &self,
        dependency: &Dependency,
    ) -> miette::Result<DependencyGraph> {
        let nodes = [DependencyNode::from_dependency(dependency.clone())];
        self.build_graph(&nodes, TraversalMode::Mediated)
    }

    fn build_graph(
        &self,
        nodes: &[DependencyNode],
        mode: TraversalMode,
    ) -> miette::Result<DependencyGraph> {
        match self.resolve_compile_time_dependencies(nodes, mode)? {
            Ok(result) => Ok(DependencyGraph::from_node(&result.root)),
            Err(ResolutionFailure::Incomplete { result, message }) => {
                tracing::warn!("Returning partial {mode} graph: {message}");
                Ok(partial_graph(&result))
            }
            Err(ResolutionFailure::Fatal(report)) => Err(report),
        }
    }

    /// Outer error: the session could not be opened. Inner result: what the
    /// resolution service reported.
    fn resolve_compile_time_dependencies(
        &self,
        nodes: &[DependencyNode],
        mode: TraversalMode,
    ) -> miette::Result<Result<DependencyResult, ResolutionFailure>> {
        let root = normalizer::normalize(nodes);
        let session = self
            .sessions
            .new_session(mode, self.local_repository.as_deref())?;

        let request = DependencyRequest {
            collect: CollectRequest {
                root,
                repositories: self.repositories.repositories().to_vec(),
            },
        };
        tracing::debug!(
            "Resolving {} top-level declaration(s) in {mode} mode against {} repositories",
            request.collect.root.declarations().len(),
            request.collect.repositories.len()
        );

        Ok(self.service.resolve_dependencies(&session, &request))
    }
}

/// A graph from a partial tree, with one problem per unresolved artifact.
fn partial_graph(result: &DependencyResult) -> DependencyGraph {
    let mut graph = DependencyGraph::from_node(&result.root);
    for artifact_result in &result.artifact_results {
        if artifact_result.artifact.is_none() {
            let reason = if artifact_result.exceptions.is_empty() {
                "artifact could not be resolved".to_string()
            } else {
                artifact_result.exceptions.join("; ")
            };
            graph.add_unresolvable_artifact_problem(
                artifact_result.request.artifact.clone(),
                reason,
            );
        }
    }
    graph
}
