use std::path::PathBuf;

use depgraph_util::errors::DepGraphError;
use depgraph_util::fs::{expand_home, home_dir};
use serde::{Deserialize, Serialize};

use crate::repository::MAVEN_CENTRAL_URL;

/// Global user configuration loaded from `~/.depgraph/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalConfig {
    /// Repositories searched, in order.
    #[serde(default = "default_repositories")]
    pub repositories: Vec<String>,

    /// Where downloaded artifacts are stored. `~/` is expanded.
    #[serde(default)]
    pub local_repository: Option<String>,

    #[serde(default)]
    pub network: NetworkConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            repositories: default_repositories(),
            local_repository: None,
            network: NetworkConfig::default(),
        }
    }
}

fn default_repositories() -> Vec<String> {
    vec![MAVEN_CENTRAL_URL.to_string()]
}

/// HTTP settings from `[network]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    #[serde(default = "default_verify_checksums")]
    pub verify_checksums: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            verify_checksums: default_verify_checksums(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_retries() -> u32 {
    3
}

fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_verify_checksums() -> bool {
    true
}

impl GlobalConfig {
    /// Load the global configuration, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        let path = Self::default_path();
        if path.is_file() {
            tracing::debug!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(&path).map_err(|e| DepGraphError::Config {
                message: format!("Failed to read {}: {e}", path.display()),
            })?;
            Self::parse(&content)
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            DepGraphError::Config {
                message: format!("Failed to parse global config: {e}"),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// The configured local repository, defaulting to `~/.m2/repository`.
    pub fn local_repository_path(&self) -> PathBuf {
        match self.local_repository.as_deref() {
            Some(p) => expand_home(p),
            None => default_local_repository(),
        }
    }
}

/// Returns the path to the depgraph data directory (`~/.depgraph/`).
pub fn dirs_path() -> PathBuf {
    home_dir().join(".depgraph")
}

/// Maven's conventional local repository location.
pub fn default_local_repository() -> PathBuf {
    home_dir().join(".m2").join("repository")
}
