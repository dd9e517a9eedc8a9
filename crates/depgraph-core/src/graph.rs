//! Dependency graph construction and traversal.

use std::collections::VecDeque;
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::dependency::{MavenCoordinate, Scope};
use crate::node::DependencyNode;
use crate::problem::UnresolvableArtifactProblem;

/// A node in the dependency graph.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ResolvedNode {
    pub coordinate: MavenCoordinate,
    pub scope: Scope,
    pub optional: bool,
}

impl ResolvedNode {
    /// `group:artifact` identifier (without version).
    pub fn key(&self) -> String {
        self.coordinate.key()
    }
}

impl fmt::Display for ResolvedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.coordinate)?;
        if self.scope != Scope::Compile {
            write!(f, " ({})", self.scope)?;
        }
        if self.optional {
            f.write_str(" (optional)")?;
        }
        Ok(())
    }
}

/// Edge label in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepEdge {
    pub scope: Scope,
    pub optional: bool,
}

/// A dependency graph mirroring a resolution service's node tree.
///
/// Every occurrence in the tree becomes its own graph node, so a graph built
/// from a full traversal keeps duplicates and conflicting versions. Problems
/// found while resolving are attached to the graph rather than reported as
/// errors.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<ResolvedNode, DepEdge>,
    /// `None` when the tree had a synthetic root.
    root: Option<NodeIndex>,
    /// Children of the root, or the sibling dependencies under a synthetic root.
    top_level: Vec<NodeIndex>,
    problems: Vec<UnresolvableArtifactProblem>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a dependency node tree, level by level.
    ///
    /// Nodes without an artifact are transparent: their children attach to
    /// the nearest ancestor that has one.
    pub fn from_node(root: &DependencyNode) -> Self {
        let mut g = Self::new();
        let mut queue: VecDeque<(&DependencyNode, Option<NodeIndex>)> = VecDeque::new();
        queue.push_back((root, None));

        while let Some((node, parent)) = queue.pop_front() {
            let Some(ref coordinate) = node.artifact else {
                for child in &node.children {
                    queue.push_back((child, parent));
                }
                continue;
            };

            let (scope, optional) = node
                .dependency
                .as_ref()
                .map(|d| (d.scope, d.optional))
                .unwrap_or((Scope::Compile, false));
            let idx = g.graph.add_node(ResolvedNode {
                coordinate: coordinate.clone(),
                scope,
                optional,
            });

            match parent {
                Some(p) => {
                    g.graph.add_edge(p, idx, DepEdge { scope, optional });
                    if Some(p) == g.root {
                        g.top_level.push(idx);
                    }
                }
                None if std::ptr::eq(node, root) => g.root = Some(idx),
                None => g.top_level.push(idx),
            }

            for child in &node.children {
                queue.push_back((child, Some(idx)));
            }
        }

        g
    }

    /// The root node index, if the tree had a real root artifact.
    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    pub fn root_node(&self) -> Option<&ResolvedNode> {
        self.root.map(|idx| &self.graph[idx])
    }

    /// Direct dependencies: the root's children, or the sibling list.
    pub fn top_level(&self) -> &[NodeIndex] {
        &self.top_level
    }

    /// Get the node data for an index.
    pub fn node(&self, idx: NodeIndex) -> &ResolvedNode {
        &self.graph[idx]
    }

    /// Direct dependencies of a node, in declaration order.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        let mut deps: Vec<(NodeIndex, &DepEdge)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
            .collect();
        // Level-order insertion gives siblings increasing indices.
        deps.sort_by_key(|(idx, _)| *idx);
        deps
    }

    /// The node that declared this one, if any.
    pub fn parent_of(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| e.source())
            .next()
    }

    /// All node indices in level order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// All nodes, root included, in level order.
    pub fn nodes(&self) -> Vec<&ResolvedNode> {
        self.graph
            .node_indices()
            .map(|idx| &self.graph[idx])
            .collect()
    }

    /// Every node whose `group:artifact` equals `key`, in level order.
    pub fn find_all(&self, key: &str) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph[idx].key() == key)
            .collect()
    }

    /// The nearest node for an exact coordinate.
    pub fn find_coordinate(&self, coordinate: &MavenCoordinate) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&idx| &self.graph[idx].coordinate == coordinate)
    }

    /// Path from the top of the graph down to `idx`, both ends included.
    pub fn path_to(&self, idx: NodeIndex) -> Vec<&ResolvedNode> {
        let mut path = vec![&self.graph[idx]];
        let mut current = idx;
        while let Some(parent) = self.parent_of(current) {
            path.push(&self.graph[parent]);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Record an artifact that could not be resolved.
    pub fn add_unresolvable_artifact_problem(
        &mut self,
        artifact: MavenCoordinate,
        reason: impl Into<String>,
    ) {
        let path = self
            .find_coordinate(&artifact)
            .map(|idx| {
                self.path_to(idx)
                    .into_iter()
                    .map(|n| n.coordinate.clone())
                    .collect()
            })
            .unwrap_or_default();
        self.problems.push(UnresolvableArtifactProblem {
            artifact,
            reason: reason.into(),
            path,
        });
    }

    pub fn unresolvable_artifact_problems(&self) -> &[UnresolvableArtifactProblem] {
        &self.problems
    }

    /// Whether resolution finished without any unresolvable artifacts.
    pub fn is_complete(&self) -> bool {
        self.problems.is_empty()
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Render the graph in `mvn dependency:tree` style.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        if let Some(root) = self.root {
            output.push_str(&format!("{}\n", self.graph[root]));
        }

        let count = self.top_level.len();
        for (i, idx) in self.top_level.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(&mut output, *idx, "", is_last, 1, max_depth);
        }

        if !self.problems.is_empty() {
            output.push_str(&format!("\n{} unresolved:\n", self.problems.len()));
            for problem in &self.problems {
                output.push_str(&format!("  {}\n", problem.artifact));
            }
        }

        output
    }

    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        output.push_str(&format!("{prefix}{connector}{node}\n"));

        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, (child, _)) in deps.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(output, *child, &child_prefix, is_last, depth + 1, max_depth);
        }
    }
}
