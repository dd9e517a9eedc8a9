//! Turns heterogeneous inputs into a uniform collect root.

use depgraph_core::dependency::{Dependency, Scope};
use depgraph_core::node::DependencyNode;
use depgraph_core::resolution::CollectRoot;

/// One compile-scope declaration per input node.
///
/// A node that already carries a declaration keeps its exclusions and
/// optional flag; a bare artifact gets a fresh declaration.
pub fn compile_declarations(nodes: &[DependencyNode]) -> Vec<Dependency> {
    let mut declarations = Vec::with_capacity(nodes.len());
    for node in nodes {
        match (&node.dependency, &node.artifact) {
            (Some(dependency), _) => declarations.push(dependency.with_scope(Scope::Compile)),
            (None, Some(artifact)) => {
                declarations.push(Dependency::new(artifact.clone(), Scope::Compile))
            }
            (None, None) => {
                tracing::warn!("Skipping request node with neither artifact nor dependency");
            }
        }
    }
    declarations
}

/// A single declaration becomes the request root; any other count is a
/// list of siblings.
///
/// The root's own optional and provided dependencies survive collection,
/// while siblings' do not, so this choice is observable in the result.
pub fn collect_root(mut declarations: Vec<Dependency>) -> CollectRoot {
    if declarations.len() == 1 {
        if let Some(root) = declarations.pop() {
            return CollectRoot::Root(root);
        }
    }
    CollectRoot::Dependencies(declarations)
}

/// Normalize request nodes in one step.
pub fn normalize(nodes: &[DependencyNode]) -> CollectRoot {
    collect_root(compile_declarations(nodes))
}
