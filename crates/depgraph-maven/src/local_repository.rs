//! The session's local repository, laid out like a Maven repository.

use std::fs;
use std::path::{Path, PathBuf};

use depgraph_core::dependency::MavenCoordinate;
use depgraph_core::repository::RemoteRepository;
use depgraph_util::errors::DepGraphError;

use crate::pom::{self, Pom};

/// Downloaded POMs and artifacts under `<root>/<group path>/<artifact>/<version>/`.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    /// Open the repository at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> miette::Result<Self> {
        let root = root.into();
        if let Err(source) = fs::create_dir_all(&root) {
            return Err(DepGraphError::LocalRepository { path: root, source }.into());
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Path of the main artifact file with `extension`, if it is present.
    pub fn artifact_file(&self, coordinate: &MavenCoordinate, extension: &str) -> Option<PathBuf> {
        let path = self.path_of(&RemoteRepository::artifact_path(coordinate, extension));
        path.is_file().then_some(path)
    }

    /// Raw XML of a stored POM.
    pub fn get_pom_xml(&self, coordinate: &MavenCoordinate) -> Option<String> {
        fs::read_to_string(self.path_of(&RemoteRepository::pom_path(coordinate))).ok()
    }

    /// A stored POM, parsed. Unparsable files count as absent.
    pub fn get_pom(&self, coordinate: &MavenCoordinate) -> Option<Pom> {
        let xml = self.get_pom_xml(coordinate)?;
        match pom::parse_pom(&xml) {
            Ok(pom) => Some(pom),
            Err(e) => {
                tracing::warn!("Ignoring unreadable POM for {coordinate} in local repository: {e}");
                None
            }
        }
    }

    /// Store a repository-relative file, creating directories as needed.
    pub fn put(&self, relative: &str, data: &[u8]) -> miette::Result<PathBuf> {
        let path = self.path_of(relative);
        let failed = |source: std::io::Error| DepGraphError::LocalRepository {
            path: path.clone(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(failed)?;
        }
        fs::write(&path, data).map_err(failed)?;
        Ok(path)
    }

    pub fn put_pom(&self, coordinate: &MavenCoordinate, xml: &str) -> miette::Result<PathBuf> {
        self.put(&RemoteRepository::pom_path(coordinate), xml.as_bytes())
    }

    pub fn put_artifact(
        &self,
        coordinate: &MavenCoordinate,
        extension: &str,
        data: &[u8],
    ) -> miette::Result<PathBuf> {
        self.put(&RemoteRepository::artifact_path(coordinate, extension), data)
    }
}

/// Whether `report` is a failure to write the local repository.
///
/// Such failures end a resolution instead of degrading it to a partial graph.
pub fn is_local_repository_failure(report: &miette::Report) -> bool {
    matches!(
        report.downcast_ref::<DepGraphError>(),
        Some(DepGraphError::LocalRepository { .. })
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(s: &str) -> MavenCoordinate {
        MavenCoordinate::parse(s).unwrap()
    }

    #[test]
    fn open_creates_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("nested/repository");
        let repo = LocalRepository::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(repo.root(), root);
    }

    #[test]
    fn open_fails_under_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("plain-file");
        std::fs::write(&file, b"x").unwrap();
        let err = LocalRepository::open(file.join("repository")).unwrap_err();
        assert!(is_local_repository_failure(&err));
    }

    #[test]
    fn blocked_write_is_a_local_repository_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = LocalRepository::open(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("org"), b"x").unwrap();

        let err = repo
            .put_artifact(&coord("org.example:lib:1.0"), "jar", b"x")
            .unwrap_err();
        assert!(is_local_repository_failure(&err));
        assert!(err.to_string().contains("Local repository error"));
    }

    #[test]
    fn layout_mirrors_maven() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = LocalRepository::open(tmp.path()).unwrap();
        let kotlin = coord("org.jetbrains.kotlin:kotlin-stdlib:2.0.0");
        repo.put_artifact(&kotlin, "jar", b"x").unwrap();

        let expected = tmp
            .path()
            .join("org/jetbrains/kotlin/kotlin-stdlib/2.0.0/kotlin-stdlib-2.0.0.jar");
        assert!(expected.is_file());
        assert_eq!(repo.artifact_file(&kotlin, "jar"), Some(expected));
        assert_eq!(repo.artifact_file(&kotlin, "aar"), None);
    }

    #[test]
    fn pom_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = LocalRepository::open(tmp.path()).unwrap();
        let lib = coord("org.example:lib:1.0");
        repo.put_pom(
            &lib,
            "<project><groupId>org.example</groupId><artifactId>lib</artifactId><version>1.0</version></project>",
        )
        .unwrap();

        let pom = repo.get_pom(&lib).unwrap();
        assert_eq!(pom.artifact_id.as_deref(), Some("lib"));
        assert!(repo.get_pom(&coord("org.example:lib:2.0")).is_none());
    }

    #[test]
    fn unparsable_pom_counts_as_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = LocalRepository::open(tmp.path()).unwrap();
        let lib = coord("org.example:broken:1.0");
        repo.put_pom(&lib, "<project><oops></project>").unwrap();
        assert!(repo.get_pom_xml(&lib).is_some());
        assert!(repo.get_pom(&lib).is_none());
    }
}
