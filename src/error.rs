//! Error types for depot.

use thiserror::Error;

use crate::resolve::ResolutionFailure;

/// Depot error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Coordinate has an empty field or a disallowed character
    #[error("Malformed coordinate '{input}': {reason}")]
    MalformedCoordinate { input: String, reason: String },

    /// Resolver or configuration built from zero repositories
    #[error("Repository set is empty")]
    EmptyRepositorySet,

    /// Repository set already handed to a resolver
    #[error("Repository set is frozen")]
    ConfigurationFrozen,

    /// Two repositories declared under the same name
    #[error("Duplicate repository name: {0}")]
    DuplicateRepository(String),

    /// Declaration without kind/address that is not a well-known shorthand
    #[error("Unknown repository '{0}': declare a kind and address")]
    UnknownRepository(String),

    /// Endpoint address that cannot be used for its kind
    #[error("Invalid address for repository '{name}': {reason}")]
    InvalidAddress { name: String, reason: String },

    /// Every repository was attempted without producing the artifact
    #[error(transparent)]
    Unresolved(#[from] ResolutionFailure),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedCoordinate {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for depot operations.
pub type Result<T> = std::result::Result<T, Error>;
