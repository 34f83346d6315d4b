//! Local filesystem repositories laid out as `group/artifact/version/file`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::adapter::{Candidate, ContentHash, ContentLocation, Lookup, RepositoryAdapter};
use crate::coordinate::{ArtifactVersion, Coordinate};

/// Adapter for a directory on disk such as `~/.m2/repository`.
#[derive(Debug, Clone)]
pub struct LocalPathAdapter {
    root: PathBuf,
}

impl LocalPathAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_dir(&self, coordinate: &Coordinate) -> PathBuf {
        let mut dir = self.root.clone();
        for segment in coordinate.group().split('.') {
            dir.push(segment);
        }
        dir.join(coordinate.artifact())
    }

    fn artifact_file(&self, coordinate: &Coordinate, version: &ArtifactVersion) -> PathBuf {
        self.artifact_dir(coordinate)
            .join(version.as_str())
            .join(coordinate.file_name(version))
    }

    async fn candidate_at(
        &self,
        coordinate: &Coordinate,
        version: ArtifactVersion,
    ) -> std::io::Result<Option<Candidate>> {
        let file = self.artifact_file(coordinate, &version);
        match tokio::fs::metadata(&file).await {
            Ok(meta) if meta.is_file() => Ok(Some(Candidate {
                version,
                location: ContentLocation::Path(file),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn scan(&self, coordinate: &Coordinate) -> std::io::Result<Vec<Candidate>> {
        if let Some(version) = coordinate.version().exact() {
            return Ok(self
                .candidate_at(coordinate, version.clone())
                .await?
                .into_iter()
                .collect());
        }

        let mut entries = match tokio::fs::read_dir(self.artifact_dir(coordinate)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let version = ArtifactVersion::parse(name);
            if !coordinate.version().matches(&version) {
                continue;
            }
            if let Some(candidate) = self.candidate_at(coordinate, version).await? {
                candidates.push(candidate);
            }
        }
        Ok(candidates)
    }
}

#[async_trait]
impl RepositoryAdapter for LocalPathAdapter {
    async fn lookup(&self, coordinate: &Coordinate) -> Lookup {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Lookup::Unreachable(format!("{} is not a directory", self.root.display()))
            }
            Err(e) => return Lookup::Unreachable(format!("{}: {}", self.root.display(), e)),
        }

        match self.scan(coordinate).await {
            Ok(candidates) if candidates.is_empty() => Lookup::NoMatch,
            Ok(candidates) => Lookup::Match(candidates),
            Err(e) => Lookup::Unreachable(e.to_string()),
        }
    }

    async fn digest(&self, candidate: &Candidate) -> Option<ContentHash> {
        let ContentLocation::Path(path) = &candidate.location else {
            return None;
        };
        match tokio::fs::read(path).await {
            Ok(content) => Some(ContentHash {
                algorithm: "sha256".into(),
                hex: hex::encode(Sha256::digest(&content)),
            }),
            Err(e) => {
                log::warn!("Failed to hash {}: {}", path.display(), e);
                None
            }
        }
    }
}
