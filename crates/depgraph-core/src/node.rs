//! The dependency node tree produced by a resolution service.

use crate::dependency::{Dependency, MavenCoordinate};

/// A node in a resolution service's output tree.
///
/// A synthetic root (the parent of sibling top-level dependencies) carries
/// neither an artifact nor a declaration. A bare top-level artifact carries
/// an artifact but no declaration yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyNode {
    pub artifact: Option<MavenCoordinate>,
    pub dependency: Option<Dependency>,
    pub children: Vec<DependencyNode>,
}

impl DependencyNode {
    /// An empty synthetic root.
    pub fn synthetic_root() -> Self {
        Self::default()
    }

    /// A node for an artifact with no declaration attached.
    pub fn from_artifact(artifact: MavenCoordinate) -> Self {
        Self {
            artifact: Some(artifact),
            dependency: None,
            children: Vec::new(),
        }
    }

    /// A node for a declared dependency.
    pub fn from_dependency(dependency: Dependency) -> Self {
        Self {
            artifact: Some(dependency.artifact.clone()),
            dependency: Some(dependency),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<DependencyNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is_synthetic(&self) -> bool {
        self.artifact.is_none()
    }

    /// All artifacts in the subtree rooted here, in pre-order.
    pub fn artifacts(&self) -> Vec<&MavenCoordinate> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let Some(ref a) = node.artifact {
                out.push(a);
            }
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Number of nodes carrying an artifact in the subtree rooted here.
    pub fn artifact_count(&self) -> usize {
        self.artifacts().len()
    }
}
