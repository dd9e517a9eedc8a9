//! Fetching repository files over HTTP(S) or from `file:` repositories.

use std::time::Duration;

use depgraph_core::config::NetworkConfig;
use depgraph_core::repository::RemoteRepository;
use depgraph_util::errors::DepGraphError;
use reqwest::Client;

use crate::auth;

const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Shared HTTP client plus retry policy. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    retries: u32,
}

impl Transport {
    pub fn new(network: &NetworkConfig) -> miette::Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_secs(network.timeout_secs))?,
            retries: network.retries.max(1),
        })
    }

    /// Fetch a repository-relative path.
    ///
    /// Returns `Ok(None)` when the repository does not have the file.
    pub async fn fetch(
        &self,
        repo: &RemoteRepository,
        relative: &str,
    ) -> miette::Result<Option<Vec<u8>>> {
        match repo.local_path() {
            Some(dir) => read_local(&dir.join(relative)).await,
            None => download_bytes(&self.client, repo, &repo.url_for(relative), self.retries).await,
        }
    }

    /// Fetch a text file (POM, checksum sidecar).
    pub async fn fetch_text(
        &self,
        repo: &RemoteRepository,
        relative: &str,
    ) -> miette::Result<Option<String>> {
        Ok(self
            .fetch(repo, relative)
            .await?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }
}

/// Build a reqwest client for repository downloads.
pub fn build_client(timeout: Duration) -> miette::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("depgraph/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            DepGraphError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            }
            .into()
        })
}

async fn read_local(path: &std::path::Path) -> miette::Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DepGraphError::Io(e).into()),
    }
}

/// Download raw bytes from a URL, with authentication and retries.
///
/// Timeouts, connection failures and 5xx responses are retried up to
/// `attempts` times. Returns `Ok(None)` for 404.
pub async fn download_bytes(
    client: &Client,
    repo: &RemoteRepository,
    url: &str,
    attempts: u32,
) -> miette::Result<Option<Vec<u8>>> {
    let mut last_err = String::new();

    for attempt in 0..attempts {
        if attempt > 0 {
            tracing::debug!("Retrying {url} (attempt {})", attempt + 1);
            tokio::time::sleep(RETRY_DELAY * attempt).await;
        }

        let request = auth::apply_auth(client.get(url), repo);
        match request.send().await {
            Ok(resp) => {
                let status = resp.status();
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                if status.is_server_error() {
                    last_err = format!("HTTP {status} from {url}");
                    continue;
                }
                if !status.is_success() {
                    return Err(DepGraphError::Network {
                        message: format!("HTTP {status} fetching {url}"),
                    }
                    .into());
                }

                let bytes = resp.bytes().await.map_err(|e| DepGraphError::Network {
                    message: format!("Failed to read response from {url}: {e}"),
                })?;
                return Ok(Some(bytes.to_vec()));
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                last_err = e.to_string();
                continue;
            }
            Err(e) => {
                return Err(DepGraphError::Network {
                    message: format!("Request to {url} failed: {e}"),
                }
                .into());
            }
        }
    }

    Err(DepGraphError::Network {
        message: format!("Failed after {attempts} attempts for {url}: {last_err}"),
    }
    .into())
}
