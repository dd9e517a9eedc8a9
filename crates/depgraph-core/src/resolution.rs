//! The resolution service port and its request/result types.
//!
//! A resolution service collects the dependency tree for a request and
//! materializes every artifact in it. It is expensive to construct, so one
//! instance is built up front and shared as `Arc<dyn ResolutionService>`.

use std::fmt;
use std::path::PathBuf;

use crate::dependency::{Dependency, MavenCoordinate};
use crate::node::DependencyNode;
use crate::repository::RemoteRepository;
use crate::session::Session;

/// What to collect: a single root, or sibling top-level dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectRoot {
    /// A true root. Its own optional and provided dependencies are kept.
    Root(Dependency),
    /// Co-equal dependencies under a synthetic root.
    Dependencies(Vec<Dependency>),
}

impl CollectRoot {
    /// The declarations at the top of the request.
    pub fn declarations(&self) -> Vec<&Dependency> {
        match self {
            CollectRoot::Root(dep) => vec![dep],
            CollectRoot::Dependencies(deps) => deps.iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectRequest {
    pub root: CollectRoot,
    pub repositories: Vec<RemoteRepository>,
}

/// Collect the tree, then resolve every artifact in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRequest {
    pub collect: CollectRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequest {
    pub artifact: MavenCoordinate,
}

/// An artifact file present in the local repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub coordinate: MavenCoordinate,
    pub file: PathBuf,
    /// Id of the repository it came from, or `local` when already cached.
    pub repository: String,
}

/// Outcome of one artifact resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactResult {
    pub request: ArtifactRequest,
    /// `None` when the artifact could not be resolved.
    pub artifact: Option<ResolvedArtifact>,
    pub exceptions: Vec<String>,
}

impl ArtifactResult {
    pub fn is_resolved(&self) -> bool {
        self.artifact.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyResult {
    /// The collected tree; an empty synthetic root when nothing was collected.
    pub root: DependencyNode,
    pub artifact_results: Vec<ArtifactResult>,
    /// Problems met while building the tree (unreadable descriptors, etc.).
    pub collect_exceptions: Vec<String>,
}

/// Why a resolution did not complete.
#[derive(Debug)]
pub enum ResolutionFailure {
    /// Some artifacts could not be collected or resolved; `result` holds
    /// everything that was.
    Incomplete {
        result: DependencyResult,
        message: String,
    },
    /// Configuration or I/O failure outside the resolution protocol.
    Fatal(miette::Report),
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionFailure::Incomplete { message, .. } => {
                write!(f, "incomplete resolution: {message}")
            }
            ResolutionFailure::Fatal(report) => write!(f, "{report}"),
        }
    }
}

/// External collaborator that collects and resolves dependency trees.
pub trait ResolutionService: Send + Sync {
    /// Collect the tree for `request` and resolve every artifact in it.
    ///
    /// Blocks until done.
    fn resolve_dependencies(
        &self,
        session: &Session,
        request: &DependencyRequest,
    ) -> Result<DependencyResult, ResolutionFailure>;
}
