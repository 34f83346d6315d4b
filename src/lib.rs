//! Depot - dependency resolution against priority-ordered artifact repositories.

mod defaults;
pub mod error;

pub mod config;
pub mod coordinate;
pub mod repository;
pub mod resolve;

pub use error::{Error, Result};

pub use config::{RepositoryDecl, ResolutionScope, ResolverConfig, ScopeConfig};
pub use coordinate::{ArtifactVersion, Coordinate, VersionConstraint, VersionRange};
pub use repository::{
    Candidate, ContentHash, ContentLocation, EndpointKind, IndexServerAdapter, LocalPathAdapter,
    Lookup, Repository, RepositoryAdapter, RepositorySet,
};
pub use resolve::{
    Attempt, AttemptOutcome, EntryState, Reachability, Resolution, ResolutionFailure,
    ResolutionSession, ResolvedArtifact, Resolver,
};

pub use defaults::{MAVEN_LOCAL_ENV, QUERY_TIMEOUT_SECS};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
