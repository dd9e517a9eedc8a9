//! Reading effective POMs: local repository first, then each remote
//! repository in order, with parents and BOM imports applied.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use depgraph_core::dependency::MavenCoordinate;
use depgraph_core::repository::RemoteRepository;
use depgraph_util::errors::DepGraphError;

use crate::download::Transport;
use crate::local_repository::{is_local_repository_failure, LocalRepository};
use crate::pom::{self, Pom};

/// Parent and BOM import chains longer than this are treated as cycles.
const MAX_MODEL_DEPTH: usize = 16;

type PomFuture<'a> = Pin<Box<dyn Future<Output = miette::Result<Arc<Pom>>> + Send + 'a>>;

/// Reads and caches effective POMs for one resolution. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DescriptorReader {
    transport: Transport,
    local: LocalRepository,
    repositories: Arc<[RemoteRepository]>,
    effective: Arc<Mutex<HashMap<MavenCoordinate, Arc<Pom>>>>,
}

impl DescriptorReader {
    pub fn new(
        transport: Transport,
        local: LocalRepository,
        repositories: Arc<[RemoteRepository]>,
    ) -> Self {
        Self {
            transport,
            local,
            repositories,
            effective: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The effective POM of `coordinate`.
    pub async fn read(&self, coordinate: &MavenCoordinate) -> miette::Result<Arc<Pom>> {
        self.effective_pom(coordinate.clone(), 0).await
    }

    fn effective_pom(&self, coordinate: MavenCoordinate, depth: usize) -> PomFuture<'_> {
        Box::pin(async move {
            if let Some(pom) = self.cached(&coordinate) {
                return Ok(pom);
            }
            if depth > MAX_MODEL_DEPTH {
                return Err(DepGraphError::Pom {
                    message: format!("parent or import chain too deep at {coordinate}"),
                }
                .into());
            }

            let mut pom = self.raw_pom(&coordinate).await?;
            if let Some(parent) = pom.parent.as_ref().map(|p| p.coordinate()) {
                let parent_pom = self
                    .effective_pom(parent.clone(), depth + 1)
                    .await
                    .map_err(|e| context(e, format!("parent {parent} of {coordinate}")))?;
                pom.apply_parent(&parent_pom);
            }
            pom.resolve_properties();

            let mut boms = Vec::new();
            for bom in pom.bom_imports() {
                let bom_pom = self
                    .effective_pom(bom.clone(), depth + 1)
                    .await
                    .map_err(|e| context(e, format!("BOM {bom} imported by {coordinate}")))?;
                boms.push(Pom::clone(&bom_pom));
            }
            pom.import_management(&boms);

            let pom = Arc::new(pom);
            self.effective
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(coordinate, Arc::clone(&pom));
            Ok(pom)
        })
    }

    fn cached(&self, coordinate: &MavenCoordinate) -> Option<Arc<Pom>> {
        self.effective
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(coordinate)
            .cloned()
    }

    /// The POM as published, stored in the local repository on first fetch.
    async fn raw_pom(&self, coordinate: &MavenCoordinate) -> miette::Result<Pom> {
        if let Some(pom) = self.local.get_pom(coordinate) {
            return Ok(pom);
        }

        let relative = RemoteRepository::pom_path(coordinate);
        let mut failures = Vec::new();
        for repo in self.repositories.iter() {
            match self.transport.fetch_text(repo, &relative).await {
                Ok(Some(xml)) => {
                    let pom = pom::parse_pom(&xml)?;
                    self.local.put_pom(coordinate, &xml)?;
                    tracing::debug!("Fetched POM for {coordinate} from {}", repo.id);
                    return Ok(pom);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!("Fetching POM for {coordinate} from {} failed: {e}", repo.id);
                    failures.push(format!("{}: {e}", repo.id));
                }
            }
        }

        let message = if failures.is_empty() {
            format!(
                "POM for {coordinate} not found in {} repositories",
                self.repositories.len()
            )
        } else {
            format!("POM for {coordinate} could not be fetched ({})", failures.join("; "))
        };
        Err(DepGraphError::Resolution { message }.into())
    }
}

/// Prefix a failed parent or import read with where it came from.
fn context(report: miette::Report, origin: String) -> miette::Report {
    if is_local_repository_failure(&report) {
        return report;
    }
    DepGraphError::Pom {
        message: format!("{origin}: {report}"),
    }
    .into()
}
