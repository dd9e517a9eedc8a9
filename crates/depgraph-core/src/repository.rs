//! Remote repositories and the registry of repositories used for every request.

use std::path::PathBuf;

use depgraph_util::errors::DepGraphError;
use url::Url;

use crate::dependency::MavenCoordinate;

/// Maven Central base URL.
pub const MAVEN_CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2";

/// URL schemes a repository may use.
pub const ALLOWED_SCHEMES: [&str; 3] = ["file", "http", "https"];

/// A remote Maven repository with optional credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepository {
    pub id: String,
    /// Base URL without credentials or trailing slash.
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl RemoteRepository {
    /// Parse and validate a repository URL.
    ///
    /// Credentials given as URL userinfo are moved into `username`/`password`.
    pub fn from_url(raw: &str) -> Result<Self, DepGraphError> {
        let invalid = |reason: String| DepGraphError::InvalidRepository {
            url: raw.to_string(),
            reason,
        };

        let mut parsed =
            Url::parse(raw.trim()).map_err(|e| invalid(format!("malformed URL: {e}")))?;
        let scheme = parsed.scheme().to_string();
        if !ALLOWED_SCHEMES.contains(&scheme.as_str()) {
            return Err(invalid(format!(
                "scheme '{scheme}' is not one of {}",
                ALLOWED_SCHEMES.join(", ")
            )));
        }

        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(invalid("query strings and fragments are not allowed".to_string()));
        }

        let host = parsed.host_str().unwrap_or_default().to_string();
        if scheme != "file" && host.is_empty() {
            return Err(invalid("missing host".to_string()));
        }

        let username = Some(parsed.username().to_string()).filter(|u| !u.is_empty());
        let password = parsed.password().map(str::to_string);
        if username.is_some() || password.is_some() {
            parsed
                .set_username("")
                .and_then(|_| parsed.set_password(None))
                .map_err(|_| invalid("cannot strip credentials".to_string()))?;
        }

        let url = parsed.as_str().trim_end_matches('/').to_string();
        let id = if url == MAVEN_CENTRAL_URL {
            "central".to_string()
        } else if scheme == "file" {
            "local".to_string()
        } else {
            host
        };

        Ok(Self {
            id,
            url,
            username,
            password,
        })
    }

    /// Construct the default Maven Central repository.
    pub fn maven_central() -> Self {
        Self {
            id: "central".to_string(),
            url: MAVEN_CENTRAL_URL.to_string(),
            username: None,
            password: None,
        }
    }

    /// Filesystem directory backing a `file:` repository.
    pub fn local_path(&self) -> Option<PathBuf> {
        let url = Url::parse(&self.url).ok()?;
        if url.scheme() != "file" {
            return None;
        }
        url.to_file_path().ok()
    }

    /// Whether this repository has authentication configured.
    pub fn has_auth(&self) -> bool {
        self.username.is_some() || self.password.is_some()
    }

    /// Standard Maven layout path for a given coordinate.
    ///
    /// `org.jetbrains.kotlinx:kotlinx-coroutines-core:1.8.0` becomes
    /// `org/jetbrains/kotlinx/kotlinx-coroutines-core/1.8.0`
    pub fn coordinate_path(coordinate: &MavenCoordinate) -> String {
        format!(
            "{}/{}/{}",
            coordinate.group_id.replace('.', "/"),
            coordinate.artifact_id,
            coordinate.version
        )
    }

    /// Repository-relative path of the POM for a coordinate.
    pub fn pom_path(coordinate: &MavenCoordinate) -> String {
        Self::artifact_path(coordinate, "pom")
    }

    /// Repository-relative path of the main artifact file with `extension`.
    pub fn artifact_path(coordinate: &MavenCoordinate, extension: &str) -> String {
        format!(
            "{}/{}-{}.{extension}",
            Self::coordinate_path(coordinate),
            coordinate.artifact_id,
            coordinate.version
        )
    }

    /// Full URL of a repository-relative path.
    pub fn url_for(&self, relative: &str) -> String {
        format!("{}/{}", self.url, relative)
    }
}

/// The ordered, immutable list of repositories attached to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRegistry {
    repositories: Vec<RemoteRepository>,
}

impl RepositoryRegistry {
    /// Validate `urls` in order, failing on the first invalid one.
    pub fn new<I, S>(urls: I) -> Result<Self, DepGraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let repositories = urls
            .into_iter()
            .map(|u| RemoteRepository::from_url(u.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { repositories })
    }

    pub fn repositories(&self) -> &[RemoteRepository] {
        &self.repositories
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RemoteRepository> {
        self.repositories.iter()
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self {
            repositories: vec![RemoteRepository::maven_central()],
        }
    }
}
