//! Query contract implemented once per endpoint kind.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::coordinate::{ArtifactVersion, Coordinate};

/// Where the bytes of a resolved artifact live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentLocation {
    Url(String),
    Path(PathBuf),
}

impl fmt::Display for ContentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{}", url),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Digest of artifact content, e.g. `sha256:9f86d0...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHash {
    pub algorithm: String,
    pub hex: String,
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

/// One published version a repository offers for a coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub version: ArtifactVersion,
    pub location: ContentLocation,
}

/// Result of asking a single repository about a coordinate.
#[derive(Debug, Clone)]
pub enum Lookup {
    /// Repository answered and has nothing for the coordinate
    NoMatch,
    /// Versions satisfying the coordinate's constraint
    Match(Vec<Candidate>),
    /// Network or filesystem failure; the repository could not be asked
    Unreachable(String),
    /// Repository answered with something that cannot be interpreted
    Malformed(String),
}

/// Capability of a repository endpoint.
///
/// Adapters report per-query problems through [`Lookup`] and never fail the
/// whole resolution.
#[async_trait]
pub trait RepositoryAdapter: Send + Sync {
    /// List the versions of `coordinate` this repository can serve.
    async fn lookup(&self, coordinate: &Coordinate) -> Lookup;

    /// Content digest of a candidate returned by [`lookup`](Self::lookup).
    async fn digest(&self, _candidate: &Candidate) -> Option<ContentHash> {
        None
    }
}
