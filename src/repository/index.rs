//! Remote index servers using the Maven 2 repository layout.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode, Url};

use super::adapter::{Candidate, ContentHash, ContentLocation, Lookup, RepositoryAdapter};
use crate::coordinate::{ArtifactVersion, Coordinate};
use crate::defaults;
use crate::error::{Error, Result};

const METADATA_FILE: &str = "maven-metadata.xml";
const SHA1_SUFFIX: &str = ".sha1";

/// Adapter for an HTTP(S) index server such as Maven Central.
#[derive(Debug, Clone)]
pub struct IndexServerAdapter {
    base: String,
    client: Client,
    timeout: Duration,
}

impl IndexServerAdapter {
    /// Create an adapter for the server rooted at `base_url`.
    pub fn new(name: &str, base_url: &str) -> Result<Self> {
        Self::with_timeout(name, base_url, defaults::query_timeout())
    }

    /// Create an adapter whose requests give up after `timeout`.
    pub fn with_timeout(name: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(base_url.trim()).map_err(|e| Error::InvalidAddress {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidAddress {
                name: name.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self {
            base: url.as_str().trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn request_failed(&self, e: reqwest::Error) -> Lookup {
        if e.is_timeout() {
            Lookup::Unreachable(format!("timed out after {:?}", self.timeout))
        } else {
            Lookup::Unreachable(e.to_string())
        }
    }

    fn artifact_dir_url(&self, coordinate: &Coordinate) -> String {
        format!(
            "{}/{}/{}",
            self.base,
            coordinate.group_path(),
            coordinate.artifact()
        )
    }

    pub fn artifact_url(&self, coordinate: &Coordinate, version: &ArtifactVersion) -> String {
        format!(
            "{}/{}/{}",
            self.artifact_dir_url(coordinate),
            version,
            coordinate.file_name(version)
        )
    }

    pub fn metadata_url(&self, coordinate: &Coordinate) -> String {
        format!("{}/{}", self.artifact_dir_url(coordinate), METADATA_FILE)
    }

    async fn probe(&self, coordinate: &Coordinate, version: &ArtifactVersion) -> Lookup {
        let url = self.artifact_url(coordinate, version);
        log::debug!("HEAD {}", url);

        let response = match self.client.head(&url).send().await {
            Ok(response) => response,
            Err(e) => return self.request_failed(e),
        };

        match classify(response.status()) {
            Some(failure) => failure,
            None => Lookup::Match(vec![Candidate {
                version: version.clone(),
                location: ContentLocation::Url(url),
            }]),
        }
    }

    async fn list(&self, coordinate: &Coordinate) -> Lookup {
        let url = self.metadata_url(coordinate);
        log::debug!("GET {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return self.request_failed(e),
        };
        if let Some(failure) = classify(response.status()) {
            return failure;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return self.request_failed(e),
        };
        let versions = match parse_metadata_versions(&body) {
            Ok(versions) => versions,
            Err(reason) => return Lookup::Malformed(reason),
        };

        let candidates: Vec<Candidate> = versions
            .into_iter()
            .filter(|v| coordinate.version().matches(v))
            .map(|version| Candidate {
                location: ContentLocation::Url(self.artifact_url(coordinate, &version)),
                version,
            })
            .collect();

        if candidates.is_empty() {
            Lookup::NoMatch
        } else {
            Lookup::Match(candidates)
        }
    }
}

/// `None` for a success status, otherwise the lookup it stands for.
fn classify(status: StatusCode) -> Option<Lookup> {
    if status.is_success() {
        None
    } else if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        Some(Lookup::NoMatch)
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Some(Lookup::Unreachable(format!("HTTP {}", status)))
    } else {
        Some(Lookup::Malformed(format!("HTTP {}", status)))
    }
}

fn version_tag() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r"<version>\s*([^<\s]+)\s*</version>").expect("version pattern is valid")
    })
}

/// Versions listed in a `maven-metadata.xml` document.
pub(crate) fn parse_metadata_versions(body: &str) -> std::result::Result<Vec<ArtifactVersion>, String> {
    if !body.contains("<metadata") {
        return Err("response is not repository metadata".into());
    }
    let Some(start) = body.find("<versions>") else {
        return Ok(Vec::new());
    };
    let end = body[start..]
        .find("</versions>")
        .map(|offset| start + offset)
        .ok_or_else(|| "unterminated <versions> element".to_string())?;

    Ok(version_tag()
        .captures_iter(&body[start..end])
        .filter_map(|caps| caps.get(1))
        .map(|m| ArtifactVersion::parse(m.as_str()))
        .collect())
}

#[async_trait]
impl RepositoryAdapter for IndexServerAdapter {
    async fn lookup(&self, coordinate: &Coordinate) -> Lookup {
        match coordinate.version().exact() {
            Some(version) => self.probe(coordinate, version).await,
            None => self.list(coordinate).await,
        }
    }

    async fn digest(&self, candidate: &Candidate) -> Option<ContentHash> {
        let ContentLocation::Url(url) = &candidate.location else {
            return None;
        };
        let response = self
            .client
            .get(format!("{}{}", url, SHA1_SUFFIX))
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }

        let body = response.text().await.ok()?;
        let hex = body.split_whitespace().next()?.to_ascii_lowercase();
        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            log::warn!("Ignoring malformed checksum at {}{}", url, SHA1_SUFFIX);
            return None;
        }

        Some(ContentHash {
            algorithm: "sha1".into(),
            hex,
        })
    }
}
