//! Artifact checksum verification against repository sidecar files.

use depgraph_core::repository::RemoteRepository;
use depgraph_util::errors::DepGraphError;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::download::Transport;

/// A sidecar algorithm, in the order sidecars are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Sha256,
    Sha1,
    Md5,
}

impl Algorithm {
    pub const PREFERENCE: [Algorithm; 3] = [Algorithm::Sha256, Algorithm::Sha1, Algorithm::Md5];

    pub fn extension(self) -> &'static str {
        match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha1 => "sha1",
            Algorithm::Md5 => "md5",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Sha256 => "SHA-256",
            Algorithm::Sha1 => "SHA-1",
            Algorithm::Md5 => "MD5",
        }
    }

    /// Lowercase hex digest of `data`.
    pub fn digest(self, data: &[u8]) -> String {
        match self {
            Algorithm::Sha256 => format!("{:x}", Sha256::digest(data)),
            Algorithm::Sha1 => format!("{:x}", Sha1::digest(data)),
            Algorithm::Md5 => format!("{:x}", Md5::digest(data)),
        }
    }
}

/// Verify `data` fetched from `relative` in `repo` against the first
/// checksum sidecar the repository has.
///
/// A missing sidecar is logged and accepted.
pub async fn verify(
    transport: &Transport,
    repo: &RemoteRepository,
    relative: &str,
    data: &[u8],
) -> miette::Result<()> {
    for algo in Algorithm::PREFERENCE {
        let sidecar = format!("{relative}.{}", algo.extension());
        if let Some(expected) = transport.fetch_text(repo, &sidecar).await? {
            return check(&algo.digest(data), extract_hash(&expected), algo, relative);
        }
    }

    tracing::warn!("No checksum sidecar found for {relative} in {}", repo.id);
    Ok(())
}

fn check(actual: &str, expected: &str, algo: Algorithm, path: &str) -> miette::Result<()> {
    if actual.eq_ignore_ascii_case(expected) {
        tracing::debug!("{} ok for {path}", algo.name());
        Ok(())
    } else {
        Err(DepGraphError::Resolution {
            message: format!(
                "{} mismatch for {path}: expected {expected}, got {actual}",
                algo.name()
            ),
        }
        .into())
    }
}

/// The hex hash from a checksum file, which may be `hash` or `hash  filename`.
fn extract_hash(content: &str) -> &str {
    content.split_whitespace().next().unwrap_or("")
}
