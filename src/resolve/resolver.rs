//! Priority-ordered resolution of a coordinate against a repository set.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coordinate::{ArtifactVersion, Coordinate};
use crate::defaults;
use crate::error::{Error, Result};
use crate::repository::{Candidate, ContentHash, ContentLocation, Lookup, Repository, RepositorySet};

/// Whether a repository answered during this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    Unknown,
    Reachable,
    Unreachable,
}

impl Reachability {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Reachable,
            2 => Self::Unreachable,
            _ => Self::Unknown,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Reachable => 1,
            Self::Unreachable => 2,
        }
    }
}

impl fmt::Display for Reachability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::Reachable => write!(f, "REACHABLE"),
            Self::Unreachable => write!(f, "UNREACHABLE"),
        }
    }
}

/// What happened when one repository was asked for a coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    NoMatch,
    Unreachable(String),
    Malformed(String),
    /// Several distinct artifacts claim the same version
    Conflict(String),
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::NoMatch => write!(f, "no-match"),
            Self::Unreachable(reason) => write!(f, "unreachable ({})", reason),
            Self::Malformed(reason) => write!(f, "malformed-response ({})", reason),
            Self::Conflict(reason) => write!(f, "conflict ({})", reason),
        }
    }
}

/// One entry of the diagnostic trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub repository: String,
    pub outcome: AttemptOutcome,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.repository, self.outcome)
    }
}

/// A coordinate pinned to the artifact that satisfies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedArtifact {
    pub coordinate: Coordinate,
    pub version: ArtifactVersion,
    pub repository: String,
    pub location: ContentLocation,
    pub content_hash: Option<ContentHash>,
    /// Repositories asked, in order, ending with the one that answered
    pub attempts: Vec<Attempt>,
}

/// Every repository was tried and none produced the artifact, or the first
/// repository to answer offered conflicting artifacts.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("Could not resolve {coordinate}: {}", summarize(.attempts))]
pub struct ResolutionFailure {
    pub coordinate: Coordinate,
    pub attempts: Vec<Attempt>,
}

fn summarize(attempts: &[Attempt]) -> String {
    attempts
        .iter()
        .map(Attempt::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

enum Selection {
    Chosen(Candidate),
    Conflict(String),
    Empty,
}

struct RepositorySlot {
    repository: Arc<Repository>,
    reachability: AtomicU8,
}

impl RepositorySlot {
    fn reachability(&self) -> Reachability {
        Reachability::from_u8(self.reachability.load(Ordering::Acquire))
    }

    fn mark(&self, state: Reachability) {
        let previous = self.reachability.swap(state.as_u8(), Ordering::AcqRel);
        if state == Reachability::Unreachable && previous != state.as_u8() {
            log::warn!(
                "Repository '{}' is unreachable; skipping it for the rest of the session",
                self.repository.name()
            );
        }
    }
}

/// Resolves coordinates by walking repositories in declaration order.
///
/// The first repository that offers a matching version wins and later
/// repositories are not consulted. Reachability learned during a walk is
/// kept for the lifetime of the resolver.
pub struct Resolver {
    slots: Vec<RepositorySlot>,
    query_timeout: Duration,
}

impl Resolver {
    /// Create a resolver with the default per-query timeout.
    pub fn new(repositories: &RepositorySet) -> Result<Self> {
        Self::with_timeout(repositories, defaults::query_timeout())
    }

    /// Create a resolver; freezes `repositories`.
    pub fn with_timeout(repositories: &RepositorySet, query_timeout: Duration) -> Result<Self> {
        if repositories.is_empty() {
            return Err(Error::EmptyRepositorySet);
        }

        let slots = repositories
            .freeze()
            .into_iter()
            .map(|repository| RepositorySlot {
                repository,
                reachability: AtomicU8::new(Reachability::Unknown.as_u8()),
            })
            .collect();

        Ok(Self {
            slots,
            query_timeout,
        })
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub fn repositories(&self) -> impl Iterator<Item = &Repository> {
        self.slots.iter().map(|slot| slot.repository.as_ref())
    }

    /// Reachability of the named repository as seen by this resolver.
    pub fn reachability(&self, name: &str) -> Option<Reachability> {
        self.slots
            .iter()
            .find(|slot| slot.repository.name() == name)
            .map(RepositorySlot::reachability)
    }

    /// Forget what was learned about reachability.
    pub fn reset_reachability(&self) {
        for slot in &self.slots {
            slot.reachability
                .store(Reachability::Unknown.as_u8(), Ordering::Release);
        }
    }

    /// Parse and resolve a coordinate string.
    pub async fn resolve_str(&self, coordinate: &str) -> Result<ResolvedArtifact> {
        let coordinate = Coordinate::parse(coordinate)?;
        Ok(self.resolve(&coordinate).await?)
    }

    /// Resolve a coordinate.
    pub async fn resolve(
        &self,
        coordinate: &Coordinate,
    ) -> std::result::Result<ResolvedArtifact, ResolutionFailure> {
        let mut attempts = Vec::with_capacity(self.slots.len());

        for slot in &self.slots {
            let name = slot.repository.name().to_string();

            if slot.reachability() == Reachability::Unreachable {
                log::debug!("Skipping unreachable repository '{}' for {}", name, coordinate);
                attempts.push(Attempt {
                    repository: name,
                    outcome: AttemptOutcome::Unreachable("marked unreachable earlier in session".into()),
                });
                continue;
            }

            let lookup = self.query(slot, coordinate).await;
            let candidates = match lookup {
                Lookup::NoMatch => {
                    slot.mark(Reachability::Reachable);
                    attempts.push(Attempt {
                        repository: name,
                        outcome: AttemptOutcome::NoMatch,
                    });
                    continue;
                }
                Lookup::Unreachable(reason) => {
                    slot.mark(Reachability::Unreachable);
                    attempts.push(Attempt {
                        repository: name,
                        outcome: AttemptOutcome::Unreachable(reason),
                    });
                    continue;
                }
                Lookup::Malformed(reason) => {
                    slot.mark(Reachability::Reachable);
                    log::warn!(
                        "Repository '{}' returned a malformed response for {}: {}",
                        name,
                        coordinate,
                        reason
                    );
                    attempts.push(Attempt {
                        repository: name,
                        outcome: AttemptOutcome::Malformed(reason),
                    });
                    continue;
                }
                Lookup::Match(candidates) => {
                    slot.mark(Reachability::Reachable);
                    candidates
                }
            };

            match select(coordinate, candidates) {
                Selection::Empty => {
                    attempts.push(Attempt {
                        repository: name,
                        outcome: AttemptOutcome::NoMatch,
                    });
                }
                Selection::Conflict(reason) => {
                    log::warn!(
                        "Repository '{}' offered conflicting artifacts for {}: {}",
                        name,
                        coordinate,
                        reason
                    );
                    attempts.push(Attempt {
                        repository: name,
                        outcome: AttemptOutcome::Conflict(reason),
                    });
                    return Err(ResolutionFailure {
                        coordinate: coordinate.clone(),
                        attempts,
                    });
                }
                Selection::Chosen(candidate) => {
                    let content_hash =
                        tokio::time::timeout(self.query_timeout, slot.repository.adapter().digest(&candidate))
                            .await
                            .unwrap_or(None);

                    log::info!(
                        "Resolved {} to {} from '{}'",
                        coordinate,
                        candidate.version,
                        name
                    );
                    attempts.push(Attempt {
                        repository: name.clone(),
                        outcome: AttemptOutcome::Success,
                    });
                    return Ok(ResolvedArtifact {
                        coordinate: coordinate.clone(),
                        version: candidate.version,
                        repository: name,
                        location: candidate.location,
                        content_hash,
                        attempts,
                    });
                }
            }
        }

        log::debug!("Exhausted {} repositories for {}", attempts.len(), coordinate);
        Err(ResolutionFailure {
            coordinate: coordinate.clone(),
            attempts,
        })
    }

    async fn query(&self, slot: &RepositorySlot, coordinate: &Coordinate) -> Lookup {
        log::debug!("Querying '{}' for {}", slot.repository.name(), coordinate);
        match tokio::time::timeout(self.query_timeout, slot.repository.adapter().lookup(coordinate)).await {
            Ok(lookup) => lookup,
            Err(_) => Lookup::Unreachable(format!("timed out after {:?}", self.query_timeout)),
        }
    }
}

/// Pick the highest matching version; ties go to the greater pinned
/// coordinate string.
fn select(coordinate: &Coordinate, candidates: Vec<Candidate>) -> Selection {
    let mut matching: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !coordinate.version().matches(&candidate.version) {
            continue;
        }
        match matching
            .iter()
            .find(|seen| seen.version.as_str() == candidate.version.as_str())
        {
            Some(seen) if seen.location == candidate.location => {}
            Some(seen) => {
                return Selection::Conflict(format!(
                    "version {} offered at {} and {}",
                    candidate.version, seen.location, candidate.location
                ))
            }
            None => matching.push(candidate),
        }
    }

    matching
        .into_iter()
        .max_by(|a, b| {
            a.version
                .cmp(&b.version)
                .then_with(|| coordinate.pinned(&a.version).cmp(&coordinate.pinned(&b.version)))
        })
        .map(Selection::Chosen)
        .unwrap_or(Selection::Empty)
}
