//! Resolving artifact files into the local repository.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use depgraph_core::dependency::MavenCoordinate;
use depgraph_core::node::DependencyNode;
use depgraph_core::repository::RemoteRepository;
use depgraph_core::resolution::{ArtifactRequest, ArtifactResult, ResolvedArtifact};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::checksum;
use crate::download::Transport;
use crate::local_repository::{is_local_repository_failure, LocalRepository};

/// File extension of the main artifact for a POM packaging.
pub fn extension_for(packaging: &str) -> &str {
    match packaging {
        "pom" => "pom",
        "" | "jar" | "bundle" | "maven-plugin" | "eclipse-plugin" | "ejb" | "test-jar" => "jar",
        other => other,
    }
}

/// Downloads artifacts from remote repositories. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    transport: Transport,
    local: LocalRepository,
    repositories: Arc<[RemoteRepository]>,
    verify_checksums: bool,
}

impl ArtifactResolver {
    pub fn new(
        transport: Transport,
        local: LocalRepository,
        repositories: Arc<[RemoteRepository]>,
        verify_checksums: bool,
    ) -> Self {
        Self {
            transport,
            local,
            repositories,
            verify_checksums,
        }
    }

    /// Resolve every distinct artifact in the tree, in pre-order.
    ///
    /// Fails only when a downloaded file cannot be stored locally.
    pub async fn resolve_tree(
        &self,
        root: &DependencyNode,
        packaging: &HashMap<MavenCoordinate, String>,
        max_concurrent: usize,
    ) -> miette::Result<Vec<ArtifactResult>> {
        let mut seen = HashSet::new();
        let coordinates: Vec<MavenCoordinate> = root
            .artifacts()
            .into_iter()
            .filter(|c| seen.insert(*c))
            .cloned()
            .collect();

        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
        let mut join_set = JoinSet::new();
        for (position, coordinate) in coordinates.iter().cloned().enumerate() {
            let resolver = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let packaging = packaging
                .get(&coordinate)
                .cloned()
                .unwrap_or_else(|| "jar".to_string());
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (position, resolver.resolve(&coordinate, &packaging).await)
            });
        }

        let mut results: Vec<Option<ArtifactResult>> = vec![None; coordinates.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((position, Ok(result))) => results[position] = Some(result),
                Ok((_, Err(e))) => return Err(e),
                Err(e) => tracing::error!("Artifact task failed: {e}"),
            }
        }

        Ok(results
            .into_iter()
            .zip(coordinates)
            .map(|(result, coordinate)| {
                result.unwrap_or_else(|| ArtifactResult {
                    request: ArtifactRequest {
                        artifact: coordinate,
                    },
                    artifact: None,
                    exceptions: vec!["artifact resolution task aborted".to_string()],
                })
            })
            .collect())
    }

    /// Resolve one artifact: the local repository first, then each remote
    /// repository in order.
    pub async fn resolve(
        &self,
        coordinate: &MavenCoordinate,
        packaging: &str,
    ) -> miette::Result<ArtifactResult> {
        let extension = extension_for(packaging);
        let request = ArtifactRequest {
            artifact: coordinate.clone(),
        };
        let resolved = |file: PathBuf, repository: &str| ResolvedArtifact {
            coordinate: coordinate.clone(),
            file,
            repository: repository.to_string(),
        };

        if let Some(file) = self.local.artifact_file(coordinate, extension) {
            return Ok(ArtifactResult {
                request,
                artifact: Some(resolved(file, "local")),
                exceptions: Vec::new(),
            });
        }

        let relative = RemoteRepository::artifact_path(coordinate, extension);
        let mut exceptions = Vec::new();
        for repo in self.repositories.iter() {
            match self.fetch_from(repo, coordinate, extension, &relative).await {
                Ok(Some(file)) => {
                    tracing::debug!("Resolved {coordinate} from {}", repo.id);
                    return Ok(ArtifactResult {
                        request,
                        artifact: Some(resolved(file, &repo.id)),
                        exceptions,
                    });
                }
                Ok(None) => {
                    exceptions.push(format!(
                        "{coordinate} not found in {} ({})",
                        repo.id, repo.url
                    ));
                }
                Err(e) if is_local_repository_failure(&e) => return Err(e),
                Err(e) => {
                    exceptions.push(format!(
                        "{coordinate} could not be downloaded from {}: {e}",
                        repo.id
                    ));
                }
            }
        }
        if self.repositories.is_empty() {
            exceptions.push(format!(
                "{coordinate} is not in the local repository and no remote repositories are configured"
            ));
        }

        tracing::warn!("Could not resolve {coordinate}");
        Ok(ArtifactResult {
            request,
            artifact: None,
            exceptions,
        })
    }

    async fn fetch_from(
        &self,
        repo: &RemoteRepository,
        coordinate: &MavenCoordinate,
        extension: &str,
        relative: &str,
    ) -> miette::Result<Option<PathBuf>> {
        let Some(data) = self.transport.fetch(repo, relative).await? else {
            return Ok(None);
        };
        if self.verify_checksums {
            checksum::verify(&self.transport, repo, relative, &data).await?;
        }
        self.local.put_artifact(coordinate, extension, &data).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_follows_packaging() {
        assert_eq!(extension_for("jar"), "jar");
        assert_eq!(extension_for("bundle"), "jar");
        assert_eq!(extension_for("maven-plugin"), "jar");
        assert_eq!(extension_for("pom"), "pom");
        assert_eq!(extension_for("war"), "war");
        assert_eq!(extension_for("aar"), "aar");
    }
}
