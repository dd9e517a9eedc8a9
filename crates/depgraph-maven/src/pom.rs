//! POM model: coordinates, parent reference, properties, dependencies and
//! dependency management, with parent inheritance, `${...}` interpolation and
//! BOM imports.

use std::collections::BTreeMap;

use depgraph_core::dependency::{Exclusion, MavenCoordinate};
use depgraph_util::errors::DepGraphError;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Substitution passes before interpolation gives up on a value.
const MAX_INTERPOLATION_PASSES: usize = 20;

/// The parts of a POM that dependency collection reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<ParentRef>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<PomDependency>,
    pub dependency_management: Vec<PomDependency>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl ParentRef {
    pub fn coordinate(&self) -> MavenCoordinate {
        MavenCoordinate::new(&self.group_id, &self.artifact_id, &self.version)
    }
}

/// A `<dependency>` element, as written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub type_: Option<String>,
    pub optional: bool,
    pub exclusions: Vec<Exclusion>,
}

impl PomDependency {
    /// `group:artifact` identifier.
    pub fn key(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    fn is_bom_import(&self) -> bool {
        self.scope.as_deref() == Some("import") && self.type_.as_deref() == Some("pom")
    }
}

impl Pom {
    /// Effective group ID (falls back to parent).
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or(self.parent.as_ref().map(|p| p.group_id.as_str()))
    }

    /// Effective version (falls back to parent).
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or(self.parent.as_ref().map(|p| p.version.as_str()))
    }

    /// Packaging, defaulting to `jar`.
    pub fn packaging(&self) -> &str {
        self.packaging.as_deref().unwrap_or("jar")
    }

    /// Resolve `${...}` references from POM properties and `project.*` values.
    ///
    /// Unknown references are left as written.
    pub fn interpolate(&self, input: &str) -> String {
        let mut result = input.to_string();
        for _ in 0..MAX_INTERPOLATION_PASSES {
            let next = self.substitute(&result);
            if next == result {
                break;
            }
            result = next;
        }
        result
    }

    /// One substitution pass over every `${...}` in `input`.
    fn substitute(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(open) = rest.find("${") {
            let Some(len) = rest[open..].find('}') else {
                break;
            };
            let close = open + len;
            out.push_str(&rest[..open]);
            match self.property(&rest[open + 2..close]) {
                Some(value) => out.push_str(&value),
                None => out.push_str(&rest[open..=close]),
            }
            rest = &rest[close + 1..];
        }
        out.push_str(rest);
        out
    }

    fn property(&self, key: &str) -> Option<String> {
        let key = key.trim();
        match key.strip_prefix("project.").or(key.strip_prefix("pom.")) {
            Some("groupId") => self.effective_group_id().map(str::to_string),
            Some("artifactId") => self.artifact_id.clone(),
            Some("version") => self.effective_version().map(str::to_string),
            Some("packaging") => Some(self.packaging().to_string()),
            Some("parent.groupId") => self.parent.as_ref().map(|p| p.group_id.clone()),
            Some("parent.artifactId") => self.parent.as_ref().map(|p| p.artifact_id.clone()),
            Some("parent.version") => self.parent.as_ref().map(|p| p.version.clone()),
            _ => self.properties.get(key).cloned(),
        }
    }

    /// Interpolate coordinates of every dependency and managed dependency.
    pub fn resolve_properties(&mut self) {
        let snapshot = self.clone();
        let interpolate = |dep: &mut PomDependency| {
            dep.group_id = snapshot.interpolate(&dep.group_id);
            dep.artifact_id = snapshot.interpolate(&dep.artifact_id);
            dep.version = dep.version.as_deref().map(|v| snapshot.interpolate(v));
            dep.scope = dep.scope.as_deref().map(|s| snapshot.interpolate(s));
        };
        self.dependencies.iter_mut().for_each(interpolate);
        self.dependency_management.iter_mut().for_each(interpolate);
    }

    /// Inherit from an already effective parent POM.
    ///
    /// The child's own properties, managed dependencies and dependencies win
    /// over the parent's.
    pub fn apply_parent(&mut self, parent: &Pom) {
        for (k, v) in &parent.properties {
            self.properties
                .entry(k.clone())
                .or_insert_with(|| v.clone());
        }
        if self.group_id.is_none() {
            self.group_id = parent.effective_group_id().map(str::to_string);
        }
        if self.version.is_none() {
            self.version = parent.effective_version().map(str::to_string);
        }
        merge_missing(&mut self.dependency_management, &parent.dependency_management);
        merge_missing(&mut self.dependencies, &parent.dependencies);
    }

    /// Look up a version from dependency management for a given group:artifact.
    pub fn managed_version(&self, group_id: &str, artifact_id: &str) -> Option<&str> {
        self.dependency_management
            .iter()
            .filter(|d| !d.is_bom_import())
            .find(|d| d.group_id == group_id && d.artifact_id == artifact_id)
            .and_then(|d| d.version.as_deref())
    }

    /// BOMs imported by dependency management (`scope=import`, `type=pom`).
    pub fn bom_imports(&self) -> Vec<MavenCoordinate> {
        self.dependency_management
            .iter()
            .filter(|d| d.is_bom_import())
            .filter_map(|d| {
                let version = d.version.as_deref()?;
                Some(MavenCoordinate::new(&d.group_id, &d.artifact_id, version))
            })
            .collect()
    }

    /// Replace BOM import entries with the managed dependencies of `boms`.
    ///
    /// Entries declared directly in this POM win; earlier BOMs win over later ones.
    pub fn import_management(&mut self, boms: &[Pom]) {
        self.dependency_management.retain(|d| !d.is_bom_import());
        for bom in boms {
            let imported: Vec<PomDependency> = bom
                .dependency_management
                .iter()
                .filter(|d| !d.is_bom_import())
                .cloned()
                .collect();
            merge_missing(&mut self.dependency_management, &imported);
        }
    }

    /// Versions managed by this POM, keyed by `group:artifact`.
    pub fn managed_versions(&self) -> impl Iterator<Item = (String, &str)> {
        self.dependency_management
            .iter()
            .filter(|d| !d.is_bom_import())
            .filter_map(|d| Some((d.key(), d.version.as_deref()?)))
    }
}

/// Append entries from `from` whose `group:artifact` is not in `into` yet.
fn merge_missing(into: &mut Vec<PomDependency>, from: &[PomDependency]) {
    for dep in from {
        let present = into
            .iter()
            .any(|d| d.group_id == dep.group_id && d.artifact_id == dep.artifact_id);
        if !present {
            into.push(dep.clone());
        }
    }
}

/// Which list a `<dependency>` element belongs to.
#[derive(Clone, Copy, PartialEq, Eq)]
enum DependencyList {
    Dependencies,
    Management,
}

/// Parse POM XML.
pub fn parse_pom(xml: &str) -> miette::Result<Pom> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pom = Pom::default();
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut dependency: Option<(DependencyList, PomDependency)> = None;
    let mut exclusion: Option<Exclusion> = None;
    let mut saw_project = false;

    loop {
        let event = reader.read_event().map_err(|e| DepGraphError::Pom {
            message: format!("malformed XML at byte {}: {e}", reader.buffer_position()),
        })?;
        match event {
            Event::Start(e) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                text.clear();
                saw_project |= path.len() == 1 && path[0] == "project";
                match path_str(&path).as_str() {
                    "project>dependencies>dependency" => {
                        dependency = Some((DependencyList::Dependencies, PomDependency::default()));
                    }
                    "project>dependencyManagement>dependencies>dependency" => {
                        dependency = Some((DependencyList::Management, PomDependency::default()));
                    }
                    "project>parent" => pom.parent = Some(ParentRef::default()),
                    ctx if ctx.ends_with(">dependency>exclusions>exclusion") => {
                        exclusion = Some(Exclusion::new("", None));
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                text = e
                    .unescape()
                    .map_err(|err| DepGraphError::Pom {
                        message: format!("bad text content: {err}"),
                    })?
                    .into_owned();
            }
            Event::End(_) => {
                end_element(&path, &text, &mut pom, &mut dependency, &mut exclusion);
                path.pop();
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_project {
        return Err(DepGraphError::Pom {
            message: "document has no <project> element".to_string(),
        }
        .into());
    }
    Ok(pom)
}

fn end_element(
    path: &[String],
    text: &str,
    pom: &mut Pom,
    dependency: &mut Option<(DependencyList, PomDependency)>,
    exclusion: &mut Option<Exclusion>,
) {
    let ctx = path_str(path);
    let leaf = path.last().map(String::as_str).unwrap_or_default();
    let value = || text.trim().to_string();

    if let Some(excl) = exclusion.as_mut() {
        match leaf {
            "groupId" => excl.group = value(),
            "artifactId" => excl.artifact = Some(value()),
            "exclusion" => {
                if let (Some(excl), Some((_, dep))) = (exclusion.take(), dependency.as_mut()) {
                    dep.exclusions.push(excl);
                }
            }
            _ => {}
        }
        return;
    }

    if let Some((list, dep)) = dependency.as_mut() {
        match leaf {
            "groupId" => dep.group_id = value(),
            "artifactId" => dep.artifact_id = value(),
            "version" => dep.version = Some(value()),
            "scope" => dep.scope = Some(value()),
            "type" => dep.type_ = Some(value()),
            "optional" => dep.optional = text.trim() == "true",
            "dependency" => {
                let list = *list;
                if let Some((_, dep)) = dependency.take() {
                    match list {
                        DependencyList::Dependencies => pom.dependencies.push(dep),
                        DependencyList::Management => pom.dependency_management.push(dep),
                    }
                }
            }
            _ => {}
        }
        return;
    }

    let in_parent = path.len() == 3 && path[1] == "parent";
    if let Some(parent) = pom.parent.as_mut().filter(|_| in_parent) {
        match leaf {
            "groupId" => parent.group_id = value(),
            "artifactId" => parent.artifact_id = value(),
            "version" => parent.version = value(),
            _ => {}
        }
        return;
    }

    if path.len() == 3 && path[1] == "properties" {
        pom.properties.insert(leaf.to_string(), value());
        return;
    }

    if path.len() == 2 {
        match ctx.as_str() {
            "project>groupId" => pom.group_id = Some(value()),
            "project>artifactId" => pom.artifact_id = Some(value()),
            "project>version" => pom.version = Some(value()),
            "project>packaging" => pom.packaging = Some(value()),
            _ => {}
        }
    }
}

fn path_str(path: &[String]) -> String {
    path.join(">")
}
