//! Resolution session factory.

use std::path::{Path, PathBuf};

use depgraph_core::config::{default_local_repository, GlobalConfig};
use depgraph_core::session::{Session, TraversalMode};
use depgraph_util::errors::DepGraphError;
use depgraph_util::fs::{absolute, ensure_dir};

/// Produces sessions bound to a local repository directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFactory {
    default_local_repository: PathBuf,
}

impl SessionFactory {
    pub fn new(default_local_repository: impl Into<PathBuf>) -> Self {
        Self {
            default_local_repository: default_local_repository.into(),
        }
    }

    pub fn from_config(config: &GlobalConfig) -> Self {
        Self::new(config.local_repository_path())
    }

    pub fn default_local_repository(&self) -> &Path {
        &self.default_local_repository
    }

    /// A session for `mode`, stored in `local_override` when given.
    ///
    /// The directory is created if missing; failing to do so is fatal.
    pub fn new_session(
        &self,
        mode: TraversalMode,
        local_override: Option<&Path>,
    ) -> miette::Result<Session> {
        let dir = local_override.unwrap_or(self.default_local_repository.as_path());
        let dir = absolute(dir).map_err(DepGraphError::Io)?;
        ensure_dir(&dir).map_err(DepGraphError::Io)?;
        tracing::debug!("Opened {mode} session at {}", dir.display());
        Ok(Session::new(mode, dir))
    }
}

impl Default for SessionFactory {
    fn default() -> Self {
        Self::new(default_local_repository())
    }
}
