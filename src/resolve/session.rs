//! Memoized, single-flight resolution for one session.
//!
//! Provides a state machine per coordinate:
//! IDLE -> RESOLVING -> RESOLVED | FAILED
//!
//! The first caller for a coordinate spawns the repository walk; everyone
//! else, concurrent or later, receives the same outcome. Outcomes, failures
//! included, stay cached until invalidated.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::resolver::{ResolutionFailure, ResolvedArtifact, Resolver};
use crate::coordinate::Coordinate;
use crate::error::Result;

/// Outcome of resolving one coordinate, shared by every caller that asked.
pub type Resolution = std::result::Result<Arc<ResolvedArtifact>, Arc<ResolutionFailure>>;

/// Resolution state of a coordinate within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryState {
    /// Not yet requested (or invalidated)
    Idle,
    /// Repository walk in progress
    Resolving,
    /// Resolved to an artifact
    Resolved,
    /// Resolution failed; cached until invalidated
    Failed,
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Resolving => write!(f, "RESOLVING"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

enum SlotState {
    InFlight(watch::Receiver<Option<Resolution>>),
    Done(Resolution),
}

/// Cache entry. `generation` tells a finishing walk whether the slot it
/// was started for is still the one in the map.
struct Slot {
    generation: u64,
    state: SlotState,
}

enum Pending {
    Ready(Resolution),
    Waiting(u64, watch::Receiver<Option<Resolution>>),
}

/// Cache layer over a [`Resolver`].
///
/// Cloning is cheap; clones share the same cache and resolver.
#[derive(Clone)]
pub struct ResolutionSession {
    resolver: Arc<Resolver>,
    entries: Arc<DashMap<Coordinate, Slot>>,
    generation: Arc<AtomicU64>,
}

impl ResolutionSession {
    pub fn new(resolver: Resolver) -> Self {
        Self::with_shared(Arc::new(resolver))
    }

    pub fn with_shared(resolver: Arc<Resolver>) -> Self {
        Self {
            resolver,
            entries: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Resolve a coordinate, reusing a cached or in-flight outcome.
    ///
    /// Dropping the returned future only stops this caller from waiting;
    /// the walk carries on for other waiters and still fills the cache.
    pub async fn resolve(&self, coordinate: &Coordinate) -> Resolution {
        loop {
            match self.attach(coordinate) {
                Pending::Ready(outcome) => return outcome,
                Pending::Waiting(generation, rx) => {
                    if let Some(outcome) = wait(rx).await {
                        return outcome;
                    }
                    // The walk ended without reporting; drop its slot and retry.
                    log::warn!("Resolution of {} was interrupted; retrying", coordinate);
                    self.entries
                        .remove_if(coordinate, |_, slot| slot.generation == generation);
                }
            }
        }
    }

    /// Parse and resolve a coordinate string.
    pub async fn resolve_str(&self, coordinate: &str) -> Result<Arc<ResolvedArtifact>> {
        let coordinate = Coordinate::parse(coordinate)?;
        self.resolve(&coordinate)
            .await
            .map_err(|failure| ResolutionFailure::clone(&failure).into())
    }

    /// Resolve several coordinates concurrently. Outcomes are returned in
    /// request order.
    pub async fn resolve_all(&self, coordinates: &[Coordinate]) -> Vec<Resolution> {
        let pending: Vec<Pending> = coordinates.iter().map(|c| self.attach(c)).collect();

        let mut outcomes = Vec::with_capacity(pending.len());
        for (coordinate, pending) in coordinates.iter().zip(pending) {
            let outcome = match pending {
                Pending::Ready(outcome) => outcome,
                Pending::Waiting(_, rx) => match wait(rx).await {
                    Some(outcome) => outcome,
                    None => self.resolve(coordinate).await,
                },
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Drop the cached outcome for a coordinate so the next request walks
    /// the repositories again. Returns whether anything was cached.
    ///
    /// Repositories the resolver has marked unreachable stay skipped on
    /// that walk; call [`Resolver::reset_reachability`] first to query them
    /// again.
    pub fn invalidate(&self, coordinate: &Coordinate) -> bool {
        let removed = self.entries.remove(coordinate).is_some();
        if removed {
            log::debug!("Invalidated {}", coordinate);
        }
        removed
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    pub fn status(&self, coordinate: &Coordinate) -> EntryState {
        match self.entries.get(coordinate) {
            None => EntryState::Idle,
            Some(slot) => match &slot.state {
                SlotState::InFlight(_) => EntryState::Resolving,
                SlotState::Done(Ok(_)) => EntryState::Resolved,
                SlotState::Done(Err(_)) => EntryState::Failed,
            },
        }
    }

    /// Cached outcome, if the coordinate has finished resolving.
    pub fn cached(&self, coordinate: &Coordinate) -> Option<Resolution> {
        self.entries.get(coordinate).and_then(|slot| match &slot.state {
            SlotState::Done(outcome) => Some(outcome.clone()),
            SlotState::InFlight(_) => None,
        })
    }

    /// Number of coordinates resolved or resolving.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Join the cached or in-flight outcome, or start a new walk.
    fn attach(&self, coordinate: &Coordinate) -> Pending {
        let (generation, tx, rx) = match self.entries.entry(coordinate.clone()) {
            Entry::Occupied(entry) => {
                let slot = entry.get();
                return match &slot.state {
                    SlotState::Done(outcome) => {
                        log::debug!("Cache hit for {}", coordinate);
                        Pending::Ready(outcome.clone())
                    }
                    SlotState::InFlight(rx) => {
                        log::debug!("Joining in-flight resolution of {}", coordinate);
                        Pending::Waiting(slot.generation, rx.clone())
                    }
                };
            }
            Entry::Vacant(entry) => {
                let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = watch::channel(None);
                entry.insert(Slot {
                    generation,
                    state: SlotState::InFlight(rx.clone()),
                });
                (generation, tx, rx)
            }
        };

        // Spawned only once the shard lock above is released.
        self.spawn_walk(coordinate.clone(), generation, tx);
        Pending::Waiting(generation, rx)
    }

    fn spawn_walk(
        &self,
        coordinate: Coordinate,
        generation: u64,
        tx: watch::Sender<Option<Resolution>>,
    ) {
        let resolver = Arc::clone(&self.resolver);
        let entries = Arc::clone(&self.entries);

        tokio::spawn(async move {
            let outcome: Resolution = resolver
                .resolve(&coordinate)
                .await
                .map(Arc::new)
                .map_err(Arc::new);

            if let Some(mut slot) = entries.get_mut(&coordinate) {
                if slot.generation == generation {
                    slot.state = SlotState::Done(outcome.clone());
                }
            }
            // Nobody left waiting is fine; the cache already holds the outcome.
            let _ = tx.send(Some(outcome));
        });
    }
}

async fn wait(mut rx: watch::Receiver<Option<Resolution>>) -> Option<Resolution> {
    let outcome = match rx.wait_for(Option::is_some).await {
        Ok(outcome) => outcome.clone(),
        Err(_) => None,
    };
    outcome
}
