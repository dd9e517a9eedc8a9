//! Traversal modes and the session configuration each one selects.

use std::fmt;
use std::path::PathBuf;

/// How conflicting versions of one `group:artifact` are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictStrategy {
    /// Keep the occurrence nearest to the root; ties go to the first declared.
    NearestWins,
    /// Keep every version encountered.
    KeepAll,
}

/// Which dependencies of transitive nodes are dropped during collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitiveFilter {
    pub skip_optional: bool,
    pub skip_provided: bool,
}

/// Resolution policy handed to a resolution service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub conflict_strategy: ConflictStrategy,
    /// Apply dependency management from the top of the tree to transitive versions.
    pub manage_versions: bool,
    /// Narrow transitive scopes from their parent's scope.
    pub derive_scopes: bool,
    pub transitive_filter: TransitiveFilter,
}

/// The two graph shapes a build tool needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalMode {
    /// One version per `group:artifact`, as used at compile time.
    Mediated,
    /// Every version encountered, duplicates and conflicts included.
    Full,
}

impl TraversalMode {
    pub fn session_config(self) -> SessionConfig {
        match self {
            TraversalMode::Mediated => SessionConfig {
                conflict_strategy: ConflictStrategy::NearestWins,
                manage_versions: true,
                derive_scopes: true,
                transitive_filter: TransitiveFilter {
                    skip_optional: true,
                    skip_provided: true,
                },
            },
            TraversalMode::Full => SessionConfig {
                conflict_strategy: ConflictStrategy::KeepAll,
                manage_versions: false,
                derive_scopes: false,
                transitive_filter: TransitiveFilter::default(),
            },
        }
    }
}

impl fmt::Display for TraversalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraversalMode::Mediated => f.write_str("mediated"),
            TraversalMode::Full => f.write_str("full"),
        }
    }
}

/// A configured resolution session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub mode: TraversalMode,
    pub config: SessionConfig,
    /// Absolute path of the local repository downloads are stored in.
    pub local_repository: PathBuf,
}

impl Session {
    pub fn new(mode: TraversalMode, local_repository: PathBuf) -> Self {
        Self {
            mode,
            config: mode.session_config(),
            local_repository,
        }
    }
}
