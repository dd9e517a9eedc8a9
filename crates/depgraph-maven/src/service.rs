//! The default [`ResolutionService`]: collects trees from Maven repositories
//! and downloads their artifacts into the session's local repository.

use std::sync::{Arc, OnceLock};

use depgraph_core::config::{GlobalConfig, NetworkConfig};
use depgraph_core::repository::RemoteRepository;
use depgraph_core::resolution::{
    DependencyRequest, DependencyResult, ResolutionFailure, ResolutionService,
};
use depgraph_core::session::Session;
use depgraph_util::errors::DepGraphError;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

use crate::artifact::ArtifactResolver;
use crate::collector::Collector;
use crate::descriptor::DescriptorReader;
use crate::download::Transport;
use crate::local_repository::LocalRepository;

static SHARED: OnceLock<Arc<MavenResolutionService>> = OnceLock::new();

/// Resolves dependency requests against Maven repositories.
///
/// Owns a tokio runtime and an HTTP client; build one and share it.
///
/// Calls block. From inside a multi-threaded tokio runtime they run through
/// [`tokio::task::block_in_place`]; from a current-thread runtime they fail
/// with [`ResolutionFailure::Fatal`].
pub struct MavenResolutionService {
    /// Always `Some` until the service is dropped.
    runtime: Option<Runtime>,
    transport: Transport,
    network: NetworkConfig,
}

impl MavenResolutionService {
    /// A service configured from `~/.depgraph/config.toml`.
    pub fn new() -> miette::Result<Self> {
        Self::with_config(&GlobalConfig::load()?)
    }

    pub fn with_config(config: &GlobalConfig) -> miette::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("depgraph-resolver")
            .build()
            .map_err(DepGraphError::Io)?;
        Ok(Self {
            runtime: Some(runtime),
            transport: Transport::new(&config.network)?,
            network: config.network.clone(),
        })
    }

    /// The process-wide service, created on first use.
    pub fn shared() -> miette::Result<Arc<Self>> {
        if let Some(service) = SHARED.get() {
            return Ok(Arc::clone(service));
        }
        let service = Arc::new(Self::new()?);
        Ok(Arc::clone(SHARED.get_or_init(|| service)))
    }

    async fn resolve(
        &self,
        session: &Session,
        request: &DependencyRequest,
    ) -> Result<DependencyResult, ResolutionFailure> {
        let local =
            LocalRepository::open(&session.local_repository).map_err(ResolutionFailure::Fatal)?;
        let repositories: Arc<[RemoteRepository]> = request.collect.repositories.clone().into();

        let reader = DescriptorReader::new(
            self.transport.clone(),
            local.clone(),
            Arc::clone(&repositories),
        );
        let collection = Collector::new(session, &reader, self.network.max_concurrent_fetches)
            .collect(&request.collect.root)
            .await;
        if let Some(report) = collection.fatal {
            return Err(ResolutionFailure::Fatal(report));
        }

        let artifacts = ArtifactResolver::new(
            self.transport.clone(),
            local,
            repositories,
            self.network.verify_checksums,
        );
        let artifact_results = artifacts
            .resolve_tree(
                &collection.root,
                &collection.packaging,
                self.network.max_concurrent_fetches,
            )
            .await
            .map_err(ResolutionFailure::Fatal)?;

        let unresolved = artifact_results.iter().filter(|r| !r.is_resolved()).count();
        let result = DependencyResult {
            root: collection.root,
            artifact_results,
            collect_exceptions: collection.exceptions,
        };
        tracing::info!(
            "Resolved {} artifact(s) in {} mode, {unresolved} unresolved",
            result.artifact_results.len() - unresolved,
            session.mode
        );

        if unresolved == 0 && result.collect_exceptions.is_empty() {
            return Ok(result);
        }
        let message = format!(
            "{unresolved} artifact(s) could not be resolved, {} collection problem(s)",
            result.collect_exceptions.len()
        );
        Err(ResolutionFailure::Incomplete { result, message })
    }
}

impl ResolutionService for MavenResolutionService {
    fn resolve_dependencies(
        &self,
        session: &Session,
        request: &DependencyRequest,
    ) -> Result<DependencyResult, ResolutionFailure> {
        let Some(runtime) = self.runtime.as_ref() else {
            return Err(fatal("resolution service is shut down"));
        };
        let resolve = || runtime.block_on(self.resolve(session, request));
        match Handle::try_current() {
            Err(_) => resolve(),
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(resolve)
            }
            Ok(_) => Err(fatal(
                "cannot resolve dependencies from a current-thread tokio runtime; \
                 use a multi-threaded runtime or spawn_blocking",
            )),
        }
    }
}

impl Drop for MavenResolutionService {
    fn drop(&mut self) {
        // Dropping a runtime blocks, which is not allowed inside another runtime.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

fn fatal(message: &str) -> ResolutionFailure {
    ResolutionFailure::Fatal(
        DepGraphError::Generic {
            message: message.to_string(),
        }
        .into(),
    )
}
