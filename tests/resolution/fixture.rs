use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use depot::{
    ArtifactVersion, Candidate, ContentLocation, Coordinate, EndpointKind, Lookup, Repository,
    RepositoryAdapter, RepositorySet,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behavior {
    Serve,
    Unreachable,
    Malformed,
    Hang,
}

/// In-memory repository that counts how often it is asked.
pub(crate) struct ScriptedAdapter {
    name: String,
    behavior: Behavior,
    published: HashMap<String, Vec<String>>,
    delay: Option<Duration>,
    queries: AtomicUsize,
    duplicate_locations: bool,
}

impl ScriptedAdapter {
    fn with_behavior(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            published: HashMap::new(),
            delay: None,
            queries: AtomicUsize::new(0),
            duplicate_locations: false,
        }
    }

    /// Repository publishing `group:artifact:version` entries.
    pub(crate) fn serving(name: &str, artifacts: &[&str]) -> Self {
        let mut adapter = Self::with_behavior(name, Behavior::Serve);
        for artifact in artifacts {
            let (key, version) = artifact.rsplit_once(':').unwrap();
            adapter
                .published
                .entry(key.to_string())
                .or_default()
                .push(version.to_string());
        }
        adapter
    }

    pub(crate) fn unreachable(name: &str) -> Self {
        Self::with_behavior(name, Behavior::Unreachable)
    }

    pub(crate) fn malformed(name: &str) -> Self {
        Self::with_behavior(name, Behavior::Malformed)
    }

    pub(crate) fn hanging(name: &str) -> Self {
        Self::with_behavior(name, Behavior::Hang)
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Offer every version twice under different locations.
    pub(crate) fn conflicting(mut self) -> Self {
        self.duplicate_locations = true;
        self
    }

    pub(crate) fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn location(&self, key: &str, version: &str, copy: usize) -> ContentLocation {
        ContentLocation::Url(format!("mem://{}/{}/{}/{}", self.name, key, version, copy))
    }
}

#[async_trait]
impl RepositoryAdapter for ScriptedAdapter {
    async fn lookup(&self, coordinate: &Coordinate) -> Lookup {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.behavior {
            Behavior::Unreachable => return Lookup::Unreachable("connection refused".into()),
            Behavior::Malformed => return Lookup::Malformed("truncated metadata".into()),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                return Lookup::NoMatch;
            }
            Behavior::Serve => {}
        }

        let key = format!("{}:{}", coordinate.group(), coordinate.artifact());
        let Some(versions) = self.published.get(&key) else {
            return Lookup::NoMatch;
        };

        let copies = if self.duplicate_locations { 2 } else { 1 };
        let candidates: Vec<Candidate> = versions
            .iter()
            .map(|v| ArtifactVersion::parse(v))
            .filter(|v| coordinate.version().matches(v))
            .flat_map(|version| {
                (0..copies).map(move |copy| (version.clone(), copy))
            })
            .map(|(version, copy)| Candidate {
                location: self.location(&key, version.as_str(), copy),
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

/// Repository set in the given priority order.
pub(crate) fn repository_set(adapters: &[(&str, Arc<ScriptedAdapter>)]) -> RepositorySet {
    let mut set = RepositorySet::new();
    for (name, adapter) in adapters {
        let adapter: Arc<dyn RepositoryAdapter> = adapter.clone();
        set.append(Repository::with_adapter(
            name,
            EndpointKind::IndexServer,
            format!("mem://{}", name),
            adapter,
        ))
        .unwrap();
    }
    set
}

/// Write an artifact file into a local repository layout.
pub(crate) fn publish_local(root: &Path, coordinate: &str, body: &[u8]) {
    let coord = Coordinate::parse(coordinate).unwrap();
    let version = coord.version().exact().unwrap().clone();
    let dir = root
        .join(coord.group_path())
        .join(coord.artifact())
        .join(version.as_str());
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(coord.file_name(&version)), body).unwrap();
}
