use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all depgraph operations.
#[derive(Debug, Error, Diagnostic)]
pub enum DepGraphError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The local repository could not be created or written.
    #[error("Local repository error at {}: {source}", .path.display())]
    #[diagnostic(help("Check that the local repository directory is writable"))]
    LocalRepository {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A repository URL is malformed or uses a scheme that is not allowed.
    #[error("Invalid repository URL '{url}': {reason}")]
    #[diagnostic(help("Repository URLs must be absolute and use the file, http or https scheme"))]
    InvalidRepository { url: String, reason: String },

    /// Invalid or unreadable configuration file.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check ~/.depgraph/config.toml for syntax errors"))]
    Config { message: String },

    /// A POM could not be parsed.
    #[error("POM error: {message}")]
    Pom { message: String },

    /// Dependency resolution failed (missing artifacts, unreadable descriptors, etc.).
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// Network request or download failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type DepGraphResult<T> = miette::Result<T>;
