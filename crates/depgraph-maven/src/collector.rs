//! Breadth-first collection of the dependency tree.
//!
//! The tree is grown one depth level at a time. Before a level is expanded,
//! the POMs of all its nodes are read concurrently; expansion itself then runs
//! in declaration order, which keeps the result deterministic.
//!
//! With [`ConflictStrategy::NearestWins`] a `group:artifact` enters the tree
//! once, at the nearest depth; with [`ConflictStrategy::KeepAll`] only a
//! dependency already on its own ancestor path is cut, to stop cycles.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use depgraph_core::dependency::{Dependency, Exclusion, MavenCoordinate, Scope};
use depgraph_core::node::DependencyNode;
use depgraph_core::resolution::CollectRoot;
use depgraph_core::session::{ConflictStrategy, Session};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::descriptor::DescriptorReader;
use crate::local_repository::is_local_repository_failure;
use crate::pom::Pom;

/// The collected tree and what was learned while building it.
#[derive(Debug, Default)]
pub struct Collection {
    pub root: DependencyNode,
    /// Packaging of every node whose POM could be read.
    pub packaging: HashMap<MavenCoordinate, String>,
    pub exceptions: Vec<String>,
    /// Set when a POM could not be stored in the local repository; collection
    /// stops at the level where it happened.
    pub fatal: Option<miette::Report>,
}

/// A tree node under construction.
#[derive(Debug)]
struct Slot {
    dependency: Option<Dependency>,
    depth: usize,
    parent: Option<usize>,
    children: Vec<usize>,
    /// Exclusions of every ancestor declaration plus this one's own.
    exclusions: Vec<Exclusion>,
    /// Managed versions, by `group:artifact`, applied to this node's children.
    managed: Arc<HashMap<String, String>>,
}

pub struct Collector<'a> {
    session: &'a Session,
    reader: &'a DescriptorReader,
    max_concurrent: usize,
    arena: Vec<Slot>,
    seen: HashSet<String>,
    descriptors: HashMap<MavenCoordinate, Result<Arc<Pom>, String>>,
    reported: HashSet<MavenCoordinate>,
    exceptions: Vec<String>,
    fatal: Option<miette::Report>,
}

impl<'a> Collector<'a> {
    pub fn new(session: &'a Session, reader: &'a DescriptorReader, max_concurrent: usize) -> Self {
        Self {
            session,
            reader,
            max_concurrent: max_concurrent.max(1),
            arena: Vec::new(),
            seen: HashSet::new(),
            descriptors: HashMap::new(),
            reported: HashSet::new(),
            exceptions: Vec::new(),
            fatal: None,
        }
    }

    /// Collect the tree below `root`.
    ///
    /// Unreadable POMs leave their node as a leaf and are reported in
    /// [`Collection::exceptions`]; collection itself never fails.
    pub async fn collect(mut self, root: &CollectRoot) -> Collection {
        let mut level: Vec<usize> = match root {
            CollectRoot::Root(dependency) => {
                self.seen.insert(dependency.artifact.key());
                self.arena.push(Slot {
                    dependency: Some(dependency.clone()),
                    depth: 0,
                    parent: None,
                    children: Vec::new(),
                    exclusions: dependency.exclusions.clone(),
                    managed: Arc::default(),
                });
                vec![0]
            }
            CollectRoot::Dependencies(dependencies) => {
                self.arena.push(Slot {
                    dependency: None,
                    depth: 0,
                    parent: None,
                    children: Vec::new(),
                    exclusions: Vec::new(),
                    managed: Arc::default(),
                });
                dependencies
                    .iter()
                    .filter_map(|d| self.admit(0, d.clone()))
                    .collect()
            }
        };

        while !level.is_empty() {
            self.prefetch(&level).await;
            if self.fatal.is_some() {
                break;
            }

            let mut next = Vec::new();
            for idx in level {
                let Some(coordinate) = self.arena[idx]
                    .dependency
                    .as_ref()
                    .map(|d| d.artifact.clone())
                else {
                    continue;
                };
                match self.descriptors.get(&coordinate).cloned() {
                    Some(Ok(pom)) => next.extend(self.expand(idx, &pom)),
                    Some(Err(message)) => {
                        if self.reported.insert(coordinate) {
                            self.exceptions.push(message);
                        }
                    }
                    None => {}
                }
            }
            tracing::trace!("Collected level with {} new node(s)", next.len());
            level = next;
        }

        self.finish()
    }

    /// Read the POMs of every node in `level` not read yet.
    async fn prefetch(&mut self, level: &[usize]) {
        let pending: HashSet<MavenCoordinate> = level
            .iter()
            .filter_map(|&idx| self.arena[idx].dependency.as_ref())
            .map(|d| d.artifact.clone())
            .filter(|c| !self.descriptors.contains_key(c))
            .collect();
        if pending.is_empty() {
            return;
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut join_set = JoinSet::new();
        for coordinate in pending.iter().cloned() {
            let reader = self.reader.clone();
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = reader.read(&coordinate).await;
                (coordinate, result)
            });
        }
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((coordinate, Ok(pom))) => {
                    self.descriptors.insert(coordinate, Ok(pom));
                }
                Ok((coordinate, Err(e))) => {
                    let message = format!("Failed to read descriptor for {coordinate}: {e}");
                    if self.fatal.is_none() && is_local_repository_failure(&e) {
                        self.fatal = Some(e);
                    }
                    self.descriptors.insert(coordinate, Err(message));
                }
                Err(e) => tracing::error!("Descriptor task failed: {e}"),
            }
        }
        for coordinate in pending {
            self.descriptors.entry(coordinate).or_insert_with_key(|c| {
                Err(format!("Failed to read descriptor for {c}: task aborted"))
            });
        }
    }

    /// Attach the dependencies declared by `pom` under node `idx`.
    fn expand(&mut self, idx: usize, pom: &Pom) -> Vec<usize> {
        let config = self.session.config;
        let depth = self.arena[idx].depth;
        let child_depth = depth + 1;
        let Some(parent) = self.arena[idx].dependency.clone() else {
            return Vec::new();
        };

        // Management is gathered from the root and the top level only.
        if config.manage_versions && depth <= 1 {
            let mut managed = HashMap::clone(&self.arena[idx].managed);
            for (key, version) in pom.managed_versions() {
                managed.entry(key).or_insert_with(|| version.to_string());
            }
            self.arena[idx].managed = Arc::new(managed);
        }

        let mut added = Vec::new();
        for declared in &pom.dependencies {
            let scope = Scope::parse(declared.scope.as_deref());
            if matches!(scope, Scope::Test | Scope::System | Scope::Import) {
                continue;
            }
            if child_depth >= 2 {
                let filter = config.transitive_filter;
                if (filter.skip_optional && declared.optional)
                    || (filter.skip_provided && scope == Scope::Provided)
                {
                    continue;
                }
            }

            let managed = (config.manage_versions && child_depth >= 2)
                .then(|| self.arena[idx].managed.get(&declared.key()).cloned())
                .flatten();
            let version = managed.or_else(|| {
                declared
                    .version
                    .clone()
                    .filter(|v| !v.is_empty())
                    .or_else(|| {
                        pom.managed_version(&declared.group_id, &declared.artifact_id)
                            .map(str::to_string)
                    })
            });
            let Some(version) = version else {
                self.exceptions.push(format!(
                    "No version for {} declared by {}",
                    declared.key(),
                    parent.artifact
                ));
                continue;
            };

            let artifact = MavenCoordinate::new(&declared.group_id, &declared.artifact_id, version);
            if self.arena[idx].exclusions.iter().any(|e| e.matches(&artifact)) {
                tracing::trace!("{artifact} excluded below {}", parent.artifact);
                continue;
            }

            let scope = if config.derive_scopes && child_depth >= 2 {
                Scope::derive(parent.scope, scope)
            } else {
                scope
            };
            let dependency = Dependency::new(artifact, scope)
                .with_optional(declared.optional)
                .with_exclusions(declared.exclusions.clone());
            added.extend(self.admit(idx, dependency));
        }
        added
    }

    /// Add `dependency` under `parent` unless the conflict strategy rejects it.
    fn admit(&mut self, parent: usize, dependency: Dependency) -> Option<usize> {
        let key = dependency.artifact.key();
        let rejected = match self.session.config.conflict_strategy {
            ConflictStrategy::NearestWins => !self.seen.insert(key),
            ConflictStrategy::KeepAll => self.on_path(parent, &key),
        };
        if rejected {
            tracing::trace!("Skipping {} below node {parent}", dependency.artifact);
            return None;
        }

        let mut exclusions = self.arena[parent].exclusions.clone();
        exclusions.extend(dependency.exclusions.iter().cloned());
        let slot = Slot {
            depth: self.arena[parent].depth + 1,
            parent: Some(parent),
            children: Vec::new(),
            exclusions,
            managed: Arc::clone(&self.arena[parent].managed),
            dependency: Some(dependency),
        };
        let idx = self.arena.len();
        self.arena.push(slot);
        self.arena[parent].children.push(idx);
        Some(idx)
    }

    /// Whether `key` is node `idx` or one of its ancestors.
    fn on_path(&self, idx: usize, key: &str) -> bool {
        let mut current = Some(idx);
        while let Some(i) = current {
            let slot = &self.arena[i];
            if slot.dependency.as_ref().is_some_and(|d| d.artifact.key() == key) {
                return true;
            }
            current = slot.parent;
        }
        false
    }

    fn finish(self) -> Collection {
        let packaging = self
            .descriptors
            .iter()
            .filter_map(|(c, pom)| Some((c.clone(), pom.as_ref().ok()?.packaging().to_string())))
            .collect();
        let root = if self.arena.is_empty() {
            DependencyNode::synthetic_root()
        } else {
            build_node(&self.arena, 0)
        };
        Collection {
            root,
            packaging,
            exceptions: self.exceptions,
            fatal: self.fatal,
        }
    }
}

fn build_node(arena: &[Slot], idx: usize) -> DependencyNode {
    let slot = &arena[idx];
    let node = match &slot.dependency {
        Some(dependency) => DependencyNode::from_dependency(dependency.clone()),
        None => DependencyNode::synthetic_root(),
    };
    node.with_children(slot.children.iter().map(|&c| build_node(arena, c)).collect())
}
