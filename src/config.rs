//! Repository and dependency declarations.
//!
//! A configuration names repositories in priority order and the
//! dependencies to resolve against them, for the project itself and
//! optionally for the build script's plugin classpath:
//!
//! ```json
//! {
//!   "query_timeout_secs": 30,
//!   "buildscript": {
//!     "repositories": [{ "name": "google" }, { "name": "mavenCentral" }],
//!     "dependencies": ["com.android.tools.build:gradle:8.7.0"]
//!   },
//!   "repositories": [
//!     { "name": "google" },
//!     { "name": "mavenCentral" },
//!     { "name": "jcenter", "kind": "index-server", "address": "https://jcenter.bintray.com" },
//!     { "name": "mavenLocal" }
//!   ],
//!   "dependencies": ["androidx.core:core:1.13.0@aar"]
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::defaults;
use crate::error::{Error, Result};
use crate::repository::{EndpointKind, Repository, RepositorySet};
use crate::resolve::{ResolutionSession, Resolver};

/// Well-known repository shorthands usable by name alone.
const WELL_KNOWN: &[(&str, EndpointKind, &str)] = &[
    ("google", EndpointKind::IndexServer, defaults::GOOGLE_URL),
    ("mavenCentral", EndpointKind::IndexServer, defaults::MAVEN_CENTRAL_URL),
    ("jcenter", EndpointKind::IndexServer, defaults::JCENTER_URL),
];

const MAVEN_LOCAL: &str = "mavenLocal";

/// Which dependency graph a declaration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionScope {
    /// Plugins on the build script's classpath
    Buildscript,
    /// The project's own dependencies
    Project,
}

/// One repository declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EndpointKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl RepositoryDecl {
    /// Declaration relying on a well-known shorthand.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: None,
            address: None,
        }
    }

    /// Build the repository; index servers give up on a request after
    /// `query_timeout`.
    pub fn to_repository(&self, query_timeout: Duration) -> Result<Repository> {
        let (kind, address) = self.endpoint()?;
        match kind {
            EndpointKind::IndexServer => {
                Repository::index_server(&self.name, &address, query_timeout)
            }
            EndpointKind::LocalPath => Ok(Repository::local_path(&self.name, address)),
        }
    }

    fn endpoint(&self) -> Result<(EndpointKind, String)> {
        if let Some(address) = &self.address {
            if address.trim().is_empty() {
                return Err(Error::InvalidAddress {
                    name: self.name.clone(),
                    reason: "address is empty".into(),
                });
            }
            let kind = self.kind.unwrap_or_else(|| infer_kind(address));
            return Ok((kind, address.trim().to_string()));
        }

        if self.name == MAVEN_LOCAL {
            return Ok((
                EndpointKind::LocalPath,
                defaults::maven_local_path().display().to_string(),
            ));
        }

        WELL_KNOWN
            .iter()
            .find(|(name, _, _)| *name == self.name)
            .map(|(_, kind, url)| (*kind, url.to_string()))
            .ok_or_else(|| Error::UnknownRepository(self.name.clone()))
    }
}

fn infer_kind(address: &str) -> EndpointKind {
    if address.starts_with("http://") || address.starts_with("https://") {
        EndpointKind::IndexServer
    } else {
        EndpointKind::LocalPath
    }
}

/// Repositories and dependencies of one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeConfig {
    #[serde(default)]
    pub repositories: Vec<RepositoryDecl>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl ScopeConfig {
    /// Build the repository set in declaration order.
    pub fn repository_set(&self, query_timeout: Duration) -> Result<RepositorySet> {
        if self.repositories.is_empty() {
            return Err(Error::EmptyRepositorySet);
        }
        let mut set = RepositorySet::new();
        for decl in &self.repositories {
            set.append(decl.to_repository(query_timeout)?)?;
        }
        Ok(set)
    }

    /// Parse every dependency; the first malformed one is an error.
    pub fn coordinates(&self) -> Result<Vec<Coordinate>> {
        self.dependencies
            .iter()
            .map(|d| Coordinate::parse(d))
            .collect()
    }
}

/// Top-level resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Upper bound on each repository query
    #[serde(default = "defaults::query_timeout_secs")]
    pub query_timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buildscript: Option<ScopeConfig>,
    #[serde(flatten)]
    pub project: ScopeConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            query_timeout_secs: defaults::query_timeout_secs(),
            buildscript: None,
            project: ScopeConfig::default(),
        }
    }
}

impl ResolverConfig {
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(Error::from)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Declarations of a scope. A missing `buildscript` section is empty.
    pub fn scope(&self, scope: ResolutionScope) -> ScopeConfig {
        match scope {
            ResolutionScope::Buildscript => self.buildscript.clone().unwrap_or_default(),
            ResolutionScope::Project => self.project.clone(),
        }
    }

    pub fn repository_set(&self, scope: ResolutionScope) -> Result<RepositorySet> {
        self.scope(scope).repository_set(self.query_timeout())
    }

    pub fn coordinates(&self, scope: ResolutionScope) -> Result<Vec<Coordinate>> {
        self.scope(scope).coordinates()
    }

    /// Fresh resolution session for a scope.
    pub fn session(&self, scope: ResolutionScope) -> Result<ResolutionSession> {
        let set = self.repository_set(scope)?;
        let resolver = Resolver::with_timeout(&set, self.query_timeout())?;
        Ok(ResolutionSession::new(resolver))
    }
}
