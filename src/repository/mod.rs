//! Repositories and the ordered set they are declared in.

pub mod adapter;
pub mod index;
pub mod local;

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use adapter::{Candidate, ContentHash, ContentLocation, Lookup, RepositoryAdapter};
pub use index::IndexServerAdapter;
pub use local::LocalPathAdapter;

use crate::error::{Error, Result};

/// Kind of endpoint a repository is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndpointKind {
    IndexServer,
    LocalPath,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexServer => write!(f, "index-server"),
            Self::LocalPath => write!(f, "local-path"),
        }
    }
}

/// A named source of artifacts.
pub struct Repository {
    name: String,
    kind: EndpointKind,
    address: String,
    priority: usize,
    adapter: Arc<dyn RepositoryAdapter>,
}

impl Repository {
    /// Remote index server at `url`; each request gives up after
    /// `query_timeout`.
    pub fn index_server(name: &str, url: &str, query_timeout: Duration) -> Result<Self> {
        let adapter = IndexServerAdapter::with_timeout(name, url, query_timeout)?;
        Ok(Self::with_adapter(
            name,
            EndpointKind::IndexServer,
            adapter.base_url().to_string(),
            Arc::new(adapter),
        ))
    }

    /// Directory on the local filesystem.
    pub fn local_path(name: &str, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let address = path.display().to_string();
        Self::with_adapter(
            name,
            EndpointKind::LocalPath,
            address,
            Arc::new(LocalPathAdapter::new(path)),
        )
    }

    /// Repository backed by a caller-supplied adapter.
    pub fn with_adapter(
        name: &str,
        kind: EndpointKind,
        address: impl Into<String>,
        adapter: Arc<dyn RepositoryAdapter>,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            address: address.into(),
            priority: 0,
            adapter,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Position in the declaring set; 0 is the most authoritative.
    pub fn priority(&self) -> usize {
        self.priority
    }

    pub fn adapter(&self) -> &dyn RepositoryAdapter {
        self.adapter.as_ref()
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("address", &self.address)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Ordered, write-once collection of repositories.
///
/// Declaration order is priority order. Once a resolver has been built from
/// the set it is frozen and further appends fail.
#[derive(Debug, Default)]
pub struct RepositorySet {
    repositories: Vec<Arc<Repository>>,
    frozen: AtomicBool,
}

impl RepositorySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a repository behind every repository already declared.
    pub fn append(&mut self, mut repository: Repository) -> Result<()> {
        if self.is_frozen() {
            return Err(Error::ConfigurationFrozen);
        }
        if self.contains(repository.name()) {
            return Err(Error::DuplicateRepository(repository.name));
        }

        repository.priority = self.repositories.len();
        log::debug!(
            "Declared repository '{}' ({} {}) at priority {}",
            repository.name,
            repository.kind,
            repository.address,
            repository.priority
        );
        self.repositories.push(Arc::new(repository));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Repository> {
        self.repositories
            .iter()
            .find(|r| r.name == name)
            .map(Arc::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Repository> {
        self.repositories.iter().map(Arc::as_ref)
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(Repository::name).collect()
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Freeze the set and hand out its repositories in priority order.
    pub(crate) fn freeze(&self) -> Vec<Arc<Repository>> {
        self.frozen.store(true, Ordering::Release);
        self.repositories.clone()
    }
}
