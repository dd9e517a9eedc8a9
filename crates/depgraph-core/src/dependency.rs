use std::fmt;

use serde::{Deserialize, Serialize};

/// Maven dependency scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Compile,
    Runtime,
    Provided,
    Test,
    System,
    Import,
}

impl Scope {
    /// Parse a scope as written in a POM. Missing or unknown values mean `compile`.
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some("runtime") => Self::Runtime,
            Some("provided") => Self::Provided,
            Some("test") => Self::Test,
            Some("system") => Self::System,
            Some("import") => Self::Import,
            _ => Self::Compile,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Runtime => "runtime",
            Self::Provided => "provided",
            Self::Test => "test",
            Self::System => "system",
            Self::Import => "import",
        }
    }

    /// Scope of a transitive dependency declared as `declared` by a parent
    /// whose own (already derived) scope is `parent`.
    pub fn derive(parent: Scope, declared: Scope) -> Scope {
        match (parent, declared) {
            (Scope::Test, _) | (_, Scope::Test) => Scope::Test,
            (_, Scope::Provided) | (Scope::Provided, _) => Scope::Provided,
            (Scope::Runtime, Scope::Compile) => Scope::Runtime,
            (_, Scope::Runtime) => Scope::Runtime,
            (_, Scope::System) => Scope::System,
            _ => Scope::Compile,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maven coordinates: `group:artifact:version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MavenCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl MavenCoordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    /// Parse `"group:artifact:version"` into coordinates.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [g, a, v] if !g.is_empty() && !a.is_empty() && !v.is_empty() => {
                Some(Self::new(*g, *a, *v))
            }
            _ => None,
        }
    }

    /// `group:artifact` identifier (without version).
    pub fn key(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }
}

impl fmt::Display for MavenCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// A transitive dependency to exclude.
///
/// An absent artifact (or `*`) excludes every artifact of the group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exclusion {
    pub group: String,
    #[serde(default)]
    pub artifact: Option<String>,
}

impl Exclusion {
    pub fn new(group: impl Into<String>, artifact: Option<String>) -> Self {
        Self {
            group: group.into(),
            artifact,
        }
    }

    pub fn matches(&self, coordinate: &MavenCoordinate) -> bool {
        let group_matches = self.group == "*" || self.group == coordinate.group_id;
        let artifact_matches = match self.artifact.as_deref() {
            None | Some("*") => true,
            Some(a) => a == coordinate.artifact_id,
        };
        group_matches && artifact_matches
    }
}

/// A dependency declaration: coordinates plus how they are used.
///
/// Declarations are per occurrence and are never deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub artifact: MavenCoordinate,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub exclusions: Vec<Exclusion>,
}

impl Dependency {
    pub fn new(artifact: MavenCoordinate, scope: Scope) -> Self {
        Self {
            artifact,
            scope,
            optional: false,
            exclusions: Vec::new(),
        }
    }

    /// Copy of this declaration with a different scope; everything else is kept.
    pub fn with_scope(&self, scope: Scope) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_exclusions(mut self, exclusions: Vec<Exclusion>) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Whether any of this declaration's exclusions rules out `coordinate`.
    pub fn excludes(&self, coordinate: &MavenCoordinate) -> bool {
        self.exclusions.iter().any(|e| e.matches(coordinate))
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.artifact, self.scope)?;
        if self.optional {
            f.write_str(", optional")?;
        }
        f.write_str(")")
    }
}
