//! Resolution of coordinates against repositories.
//!
//! This module provides:
//! - Priority-ordered repository walks (`resolver`)
//! - Per-session memoization with single-flight deduplication (`session`)

pub mod resolver;
pub mod session;

pub use resolver::{
    Attempt, AttemptOutcome, Reachability, ResolutionFailure, ResolvedArtifact, Resolver,
};
pub use session::{EntryState, Resolution, ResolutionSession};
