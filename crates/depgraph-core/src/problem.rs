//! Problems recorded against a dependency graph after a partial resolution.

use std::fmt;

use crate::dependency::MavenCoordinate;

/// An artifact the resolution service could not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvableArtifactProblem {
    /// The coordinate that was originally requested.
    pub artifact: MavenCoordinate,
    pub reason: String,
    /// First dependency path from the top of the graph to the artifact, if
    /// the artifact appears in the graph at all.
    pub path: Vec<MavenCoordinate>,
}

impl fmt::Display for UnresolvableArtifactProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} was not resolved: {}", self.artifact, self.reason)?;
        if !self.path.is_empty() {
            let path: Vec<String> = self.path.iter().map(|c| c.to_string()).collect();
            write!(f, ". Dependency path: {}", path.join(" > "))?;
        }
        Ok(())
    }
}
