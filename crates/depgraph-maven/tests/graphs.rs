//! End-to-end graph builds against `file:` fixture repositories.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use depgraph_core::config::{GlobalConfig, NetworkConfig};
use depgraph_core::dependency::{Dependency, Exclusion, MavenCoordinate, Scope};
use depgraph_core::graph::DependencyGraph;
use depgraph_core::repository::RemoteRepository;
use depgraph_maven::MavenResolutionService;
use depgraph_resolver::DependencyGraphBuilder;
use petgraph::graph::NodeIndex;
use tempfile::TempDir;

fn coord(s: &str) -> MavenCoordinate {
    MavenCoordinate::parse(s).unwrap()
}

/// `<dependency>` element; `extra` is appended inside it.
fn dep(coordinate: &str, extra: &str) -> String {
    let c = coord(coordinate);
    format!(
        "<dependency><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version>{extra}</dependency>",
        c.group_id, c.artifact_id, c.version
    )
}

/// `<dependency>` element without a version.
fn unversioned(key: &str) -> String {
    let (group, artifact) = key.split_once(':').unwrap();
    format!("<dependency><groupId>{group}</groupId><artifactId>{artifact}</artifactId></dependency>")
}

/// A remote repository and a local repository, both in temp directories.
struct Fixture {
    remote: TempDir,
    local: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            remote: tempfile::tempdir().unwrap(),
            local: tempfile::tempdir().unwrap(),
        }
    }

    fn url(&self) -> String {
        format!("file://{}", self.remote.path().display())
    }

    /// Publish a jar and its POM.
    fn publish(&self, coordinate: &str, dependencies: &[String]) {
        self.publish_pom(coordinate, "", dependencies);
        self.publish_jar(coordinate, format!("jar of {coordinate}").as_bytes());
    }

    fn publish_pom(&self, coordinate: &str, extra: &str, dependencies: &[String]) {
        let c = coord(coordinate);
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>{}</groupId>
  <artifactId>{}</artifactId>
  <version>{}</version>
  {extra}
  <dependencies>{}</dependencies>
</project>"#,
            c.group_id,
            c.artifact_id,
            c.version,
            dependencies.concat()
        );
        write(self.remote.path(), &RemoteRepository::pom_path(&c), xml.as_bytes());
    }

    fn publish_jar(&self, coordinate: &str, data: &[u8]) {
        write(
            self.remote.path(),
            &RemoteRepository::artifact_path(&coord(coordinate), "jar"),
            data,
        );
    }

    fn config(&self, repositories: Vec<String>) -> GlobalConfig {
        GlobalConfig {
            repositories,
            local_repository: Some(self.local.path().display().to_string()),
            network: NetworkConfig {
                timeout_secs: 5,
                retries: 1,
                ..NetworkConfig::default()
            },
        }
    }

    fn builder(&self) -> DependencyGraphBuilder {
        self.builder_with(vec![self.url()])
    }

    fn builder_with(&self, repositories: Vec<String>) -> DependencyGraphBuilder {
        let config = self.config(repositories);
        let service = MavenResolutionService::with_config(&config).unwrap();
        DependencyGraphBuilder::from_config(Arc::new(service), &config).unwrap()
    }
}

fn write(root: &Path, relative: &str, data: &[u8]) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
}

fn children(graph: &DependencyGraph, idx: NodeIndex) -> Vec<String> {
    graph
        .dependencies_of(idx)
        .into_iter()
        .map(|(child, _)| graph.node(child).coordinate.to_string())
        .collect()
}

fn child(graph: &DependencyGraph, idx: NodeIndex, coordinate: &str) -> NodeIndex {
    graph
        .dependencies_of(idx)
        .into_iter()
        .map(|(child, _)| child)
        .find(|&child| graph.node(child).coordinate.to_string() == coordinate)
        .unwrap_or_else(|| panic!("{coordinate} is not a child of {}", graph.node(idx)))
}

fn versions(graph: &DependencyGraph, key: &str) -> Vec<String> {
    graph
        .find_all(key)
        .into_iter()
        .map(|idx| graph.node(idx).coordinate.version.clone())
        .collect()
}

fn compile(coordinate: &str) -> Dependency {
    Dependency::new(coord(coordinate), Scope::Compile)
}

/// app -> b:1, c:1 -> b:2
fn conflicting_versions(fixture: &Fixture) {
    fixture.publish(
        "org.app:app:1.0",
        &[dep("org.lib:b:1.0", ""), dep("org.lib:c:1.0", "")],
    );
    fixture.publish("org.lib:b:1.0", &[]);
    fixture.publish("org.lib:b:2.0", &[]);
    fixture.publish("org.lib:c:1.0", &[dep("org.lib:b:2.0", "")]);
}

#[test]
fn mediated_graph_keeps_the_nearest_version() {
    let fixture = Fixture::new();
    conflicting_versions(&fixture);

    let graph = fixture
        .builder()
        .build_mediated_graph(&compile("org.app:app:1.0"))
        .unwrap();

    assert!(graph.is_complete());
    let root = graph.root().unwrap();
    assert_eq!(graph.node(root).coordinate, coord("org.app:app:1.0"));
    assert_eq!(children(&graph, root), vec!["org.lib:b:1.0", "org.lib:c:1.0"]);
    assert_eq!(versions(&graph, "org.lib:b"), vec!["1.0"]);
    assert!(children(&graph, child(&graph, root, "org.lib:c:1.0")).is_empty());
}

#[test]
fn full_graph_keeps_every_version() {
    let fixture = Fixture::new();
    conflicting_versions(&fixture);

    let graph = fixture
        .builder()
        .build_full_graph(&[coord("org.app:app:1.0")])
        .unwrap();

    assert!(graph.is_complete());
    let root = graph.root().unwrap();
    let c = child(&graph, root, "org.lib:c:1.0");
    assert_eq!(children(&graph, c), vec!["org.lib:b:2.0"]);
    assert_eq!(versions(&graph, "org.lib:b"), vec!["1.0", "2.0"]);
}

#[test]
fn full_graph_of_several_artifacts_has_sibling_top_level() {
    let fixture = Fixture::new();
    conflicting_versions(&fixture);
    fixture.publish("org.other:other:3.0", &[dep("org.lib:b:1.0", "")]);

    let graph = fixture
        .builder()
        .build_full_graph(&[coord("org.app:app:1.0"), coord("org.other:other:3.0")])
        .unwrap();

    assert!(graph.root().is_none());
    let top: Vec<String> = graph
        .top_level()
        .iter()
        .map(|&idx| graph.node(idx).coordinate.to_string())
        .collect();
    assert_eq!(top, vec!["org.app:app:1.0", "org.other:other:3.0"]);
    assert_eq!(versions(&graph, "org.lib:b"), vec!["1.0", "1.0", "2.0"]);
}

#[test]
fn mediated_graph_has_one_node_per_group_and_artifact() {
    let fixture = Fixture::new();
    fixture.publish(
        "org.app:app:1.0",
        &[dep("org.lib:a:1.0", ""), dep("org.lib:b:1.0", "")],
    );
    fixture.publish("org.lib:a:1.0", &[dep("org.lib:shared:1.0", "")]);
    fixture.publish(
        "org.lib:b:1.0",
        &[dep("org.lib:shared:2.0", ""), dep("org.lib:a:0.9", "")],
    );
    fixture.publish("org.lib:shared:1.0", &[dep("org.app:app:1.0", "")]);

    let graph = fixture
        .builder()
        .build_mediated_graph(&compile("org.app:app:1.0"))
        .unwrap();

    let keys: Vec<String> = graph.nodes().iter().map(|n| n.key()).collect();
    let unique: HashSet<&String> = keys.iter().collect();
    assert_eq!(keys.len(), unique.len());
    assert_eq!(graph.len(), 4);
    assert_eq!(versions(&graph, "org.lib:shared"), vec!["1.0"]);
}

#[test]
fn full_graph_cuts_cycles() {
    let fixture = Fixture::new();
    fixture.publish("org.cycle:a:1.0", &[dep("org.cycle:b:1.0", "")]);
    fixture.publish("org.cycle:b:1.0", &[dep("org.cycle:a:2.0", "")]);

    let graph = fixture
        .builder()
        .build_full_graph(&[coord("org.cycle:a:1.0")])
        .unwrap();

    assert!(graph.is_complete());
    assert_eq!(graph.len(), 2);
}

#[test]
fn missing_artifact_yields_partial_graph_with_one_problem() {
    let fixture = Fixture::new();
    fixture.publish(
        "org.app:app:1.0",
        &[dep("org.gone:x:1.0", ""), dep("org.lib:b:1.0", "")],
    );
    fixture.publish("org.lib:b:1.0", &[dep("org.lib:c:1.0", "")]);
    fixture.publish("org.lib:c:1.0", &[]);

    let graph = fixture
        .builder()
        .build_mediated_graph(&compile("org.app:app:1.0"))
        .unwrap();

    let root = graph.root().unwrap();
    assert_eq!(graph.node(root).coordinate, coord("org.app:app:1.0"));
    assert_eq!(children(&graph, root), vec!["org.gone:x:1.0", "org.lib:b:1.0"]);
    assert_eq!(
        children(&graph, child(&graph, root, "org.lib:b:1.0")),
        vec!["org.lib:c:1.0"]
    );

    let problems = graph.unresolvable_artifact_problems();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].artifact, coord("org.gone:x:1.0"));
    assert!(problems[0].reason.contains("not found"));
    assert_eq!(
        problems[0].path,
        vec![coord("org.app:app:1.0"), coord("org.gone:x:1.0")]
    );
}

#[test]
fn unreachable_repository_degrades_to_problems() {
    let fixture = Fixture::new();
    let graph = fixture
        .builder_with(vec!["http://127.0.0.1:9/maven2".to_string()])
        .build_full_graph(&[coord("org.app:app:1.0"), coord("org.lib:b:1.0")])
        .unwrap();

    assert!(graph.is_empty() || graph.root().is_none());
    let unresolved: Vec<String> = graph
        .unresolvable_artifact_problems()
        .iter()
        .map(|p| p.artifact.to_string())
        .collect();
    assert_eq!(unresolved, vec!["org.app:app:1.0", "org.lib:b:1.0"]);
}

#[test]
fn root_keeps_optional_and_provided_but_transitive_nodes_do_not() {
    let fixture = Fixture::new();
    fixture.publish(
        "org.app:app:1.0",
        &[
            dep("org.lib:opt:1.0", "<optional>true</optional>"),
            dep("org.lib:prov:1.0", "<scope>provided</scope>"),
            dep("org.lib:lib:1.0", ""),
            dep("org.lib:tst:1.0", "<scope>test</scope>"),
        ],
    );
    fixture.publish("org.lib:opt:1.0", &[]);
    fixture.publish("org.lib:prov:1.0", &[]);
    fixture.publish("org.lib:tst:1.0", &[]);
    fixture.publish(
        "org.lib:lib:1.0",
        &[
            dep("org.lib:lib-opt:1.0", "<optional>true</optional>"),
            dep("org.lib:lib-prov:1.0", "<scope>provided</scope>"),
            dep("org.lib:lib-run:1.0", "<scope>runtime</scope>"),
        ],
    );
    fixture.publish("org.lib:lib-opt:1.0", &[]);
    fixture.publish("org.lib:lib-prov:1.0", &[]);
    fixture.publish("org.lib:lib-run:1.0", &[]);

    let builder = fixture.builder();

    let mediated = builder
        .build_mediated_graph(&compile("org.app:app:1.0"))
        .unwrap();
    assert!(mediated.is_complete());
    let root = mediated.root().unwrap();
    assert_eq!(
        children(&mediated, root),
        vec!["org.lib:opt:1.0", "org.lib:prov:1.0", "org.lib:lib:1.0"]
    );
    let opt = child(&mediated, root, "org.lib:opt:1.0");
    assert!(mediated.node(opt).optional);
    let prov = child(&mediated, root, "org.lib:prov:1.0");
    assert_eq!(mediated.node(prov).scope, Scope::Provided);
    let lib = child(&mediated, root, "org.lib:lib:1.0");
    assert_eq!(children(&mediated, lib), vec!["org.lib:lib-run:1.0"]);

    let full = builder.build_full_graph(&[coord("org.app:app:1.0")]).unwrap();
    let root = full.root().unwrap();
    let lib = child(&full, root, "org.lib:lib:1.0");
    assert_eq!(
        children(&full, lib),
        vec!["org.lib:lib-opt:1.0", "org.lib:lib-prov:1.0", "org.lib:lib-run:1.0"]
    );
    assert!(full.find_all("org.lib:tst").is_empty());
}

#[test]
fn mediated_scopes_narrow_along_the_path() {
    let fixture = Fixture::new();
    fixture.publish(
        "org.app:app:1.0",
        &[dep("org.lib:r:1.0", "<scope>runtime</scope>")],
    );
    fixture.publish("org.lib:r:1.0", &[dep("org.lib:s:1.0", "")]);
    fixture.publish("org.lib:s:1.0", &[]);

    let builder = fixture.builder();
    let mediated = builder
        .build_mediated_graph(&compile("org.app:app:1.0"))
        .unwrap();
    let s = mediated.find_coordinate(&coord("org.lib:s:1.0")).unwrap();
    assert_eq!(mediated.node(s).scope, Scope::Runtime);

    let full = builder.build_full_graph(&[coord("org.app:app:1.0")]).unwrap();
    let s = full.find_coordinate(&coord("org.lib:s:1.0")).unwrap();
    assert_eq!(full.node(s).scope, Scope::Compile);
}

#[test]
fn root_management_overrides_transitive_versions_in_mediated_mode() {
    let fixture = Fixture::new();
    fixture.publish_pom(
        "org.app:app:1.0",
        &format!(
            "<dependencyManagement><dependencies>{}</dependencies></dependencyManagement>",
            dep("org.lib:b:3.0", "")
        ),
        &[dep("org.lib:c:1.0", "")],
    );
    fixture.publish_jar("org.app:app:1.0", b"app");
    fixture.publish("org.lib:c:1.0", &[dep("org.lib:b:2.0", "")]);
    fixture.publish("org.lib:b:2.0", &[]);
    fixture.publish("org.lib:b:3.0", &[]);

    let builder = fixture.builder();
    let mediated = builder
        .build_mediated_graph(&compile("org.app:app:1.0"))
        .unwrap();
    assert!(mediated.is_complete());
    assert_eq!(versions(&mediated, "org.lib:b"), vec!["3.0"]);

    let full = builder.build_full_graph(&[coord("org.app:app:1.0")]).unwrap();
    assert_eq!(versions(&full, "org.lib:b"), vec!["2.0"]);
}

#[test]
fn versions_from_dependency_management_fill_unversioned_declarations() {
    let fixture = Fixture::new();
    fixture.publish_pom(
        "org.app:app:1.0",
        &format!(
            "<dependencyManagement><dependencies>{}</dependencies></dependencyManagement>",
            dep("org.lib:b:1.5", "")
        ),
        &[unversioned("org.lib:b"), unversioned("org.lib:nowhere")],
    );
    fixture.publish_jar("org.app:app:1.0", b"app");
    fixture.publish("org.lib:b:1.5", &[]);

    let graph = fixture
        .builder()
        .build_mediated_graph(&compile("org.app:app:1.0"))
        .unwrap();
    let root = graph.root().unwrap();
    assert_eq!(children(&graph, root), vec!["org.lib:b:1.5"]);
    assert!(graph.is_complete());
}

#[test]
fn exclusions_prune_the_subtree() {
    let fixture = Fixture::new();
    fixture.publish(
        "org.app:app:1.0",
        &[dep(
            "org.lib:a:1.0",
            "<exclusions><exclusion><groupId>org.noise</groupId></exclusion></exclusions>",
        )],
    );
    fixture.publish(
        "org.lib:a:1.0",
        &[dep("org.noise:n:1.0", ""), dep("org.lib:b:1.0", "")],
    );
    fixture.publish("org.lib:b:1.0", &[dep("org.noise:m:1.0", "")]);
    fixture.publish("org.noise:n:1.0", &[]);
    fixture.publish("org.noise:m:1.0", &[]);
    fixture.publish("org.lib:quiet:1.0", &[dep("org.lib:b:1.0", "")]);

    let graph = fixture
        .builder()
        .build_mediated_graph(&compile("org.app:app:1.0"))
        .unwrap();
    assert!(graph.find_all("org.noise:n").is_empty());
    assert!(graph.find_all("org.noise:m").is_empty());
    assert_eq!(versions(&graph, "org.lib:b"), vec!["1.0"]);

    let excluding_root = compile("org.lib:quiet:1.0")
        .with_exclusions(vec![Exclusion::new("org.lib", Some("b".to_string()))]);
    let graph = fixture
        .builder()
        .build_mediated_graph(&excluding_root)
        .unwrap();
    assert_eq!(graph.len(), 1);
}

#[test]
fn repeated_builds_are_identical() {
    let fixture = Fixture::new();
    conflicting_versions(&fixture);
    fixture.publish("org.app:broken:1.0", &[dep("org.gone:x:1.0", "")]);

    let builder = fixture.builder();
    let request = [coord("org.app:app:1.0"), coord("org.app:broken:1.0")];
    let first = builder.build_full_graph(&request).unwrap();
    let second = builder.build_full_graph(&request).unwrap();

    assert_eq!(first.print_tree(None), second.print_tree(None));
    assert_eq!(
        first.unresolvable_artifact_problems(),
        second.unresolvable_artifact_problems()
    );
    assert_eq!(first.unresolvable_artifact_problems().len(), 1);
}

#[test]
fn artifacts_land_in_the_local_repository() {
    let fixture = Fixture::new();
    conflicting_versions(&fixture);

    fixture
        .builder()
        .build_mediated_graph(&compile("org.app:app:1.0"))
        .unwrap();

    let jar = fixture.local.path().join("org/lib/c/1.0/c-1.0.jar");
    assert_eq!(std::fs::read(jar).unwrap(), b"jar of org.lib:c:1.0");
    assert!(fixture.local.path().join("org/lib/c/1.0/c-1.0.pom").is_file());
}

#[test]
fn local_repository_override_is_used() {
    let fixture = Fixture::new();
    conflicting_versions(&fixture);
    let elsewhere = tempfile::tempdir().unwrap();

    let mut builder = fixture.builder();
    builder.set_local_repository(elsewhere.path());
    builder
        .build_mediated_graph(&compile("org.app:app:1.0"))
        .unwrap();

    assert!(elsewhere.path().join("org/lib/c/1.0/c-1.0.jar").is_file());
    assert!(!fixture.local.path().join("org/lib/c").exists());
}

#[test]
fn later_repositories_are_searched_in_order() {
    let fixture = Fixture::new();
    let empty = tempfile::tempdir().unwrap();
    fixture.publish("org.lib:b:1.0", &[]);

    let graph = fixture
        .builder_with(vec![format!("file://{}", empty.path().display()), fixture.url()])
        .build_mediated_graph(&compile("org.lib:b:1.0"))
        .unwrap();
    assert!(graph.is_complete());
    assert_eq!(graph.len(), 1);
}

#[test]
fn checksum_mismatch_is_an_unresolved_artifact() {
    let fixture = Fixture::new();
    fixture.publish("org.app:app:1.0", &[dep("org.lib:b:1.0", "")]);
    fixture.publish("org.lib:b:1.0", &[]);
    write(
        fixture.remote.path(),
        "org/lib/b/1.0/b-1.0.jar.sha1",
        b"0000000000000000000000000000000000000000",
    );

    let graph = fixture
        .builder()
        .build_mediated_graph(&compile("org.app:app:1.0"))
        .unwrap();
    let problems = graph.unresolvable_artifact_problems();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].artifact, coord("org.lib:b:1.0"));
    assert!(problems[0].reason.contains("SHA-1 mismatch"));
}
