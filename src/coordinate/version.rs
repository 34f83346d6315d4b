//! Artifact versions and version constraints.
//!
//! Constraints use the bracket notation of Maven-style repositories:
//! - Exact: `1.2.0` or `[1.2.0]`
//! - Ranges: `[1.0,2.0)`, `(,2.0]`, `[1.5,)` and unions `[1,2),[3,4)`
//! - Dynamic prefixes: `1.+`, `+`

use std::cmp::Ordering;
use std::fmt;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

/// A concrete version as published by a repository.
///
/// Release parts are padded to three and compared as semantic versions, so
/// `1.2` and `1.2.0` order equal. Versions that cannot be read that way sort
/// below every readable one and compare lexically among themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ArtifactVersion {
    raw: String,
    semantic: Option<semver::Version>,
}

impl ArtifactVersion {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_string();
        let semantic = Self::to_semantic(&raw);
        Self { raw, semantic }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the version carries a pre-release qualifier such as `-alpha`.
    pub fn is_prerelease(&self) -> bool {
        self.semantic
            .as_ref()
            .map(|v| !v.pre.is_empty())
            .unwrap_or(false)
    }

    fn to_semantic(raw: &str) -> Option<semver::Version> {
        let (release, qualifier) = match raw.split_once('-') {
            Some((release, qualifier)) => (release, Some(qualifier)),
            None => (raw, None),
        };

        let parts: Vec<&str> = release.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return None;
        }
        if parts
            .iter()
            .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
        {
            return None;
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().ok()?;
        }

        let mut version = semver::Version::new(numbers[0], numbers[1], numbers[2]);
        if let Some(qualifier) = qualifier {
            version.pre = semver::Prerelease::new(qualifier).ok()?;
        }
        Some(version)
    }
}

impl Ord for ArtifactVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.semantic, &other.semantic) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

impl PartialOrd for ArtifactVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ArtifactVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ArtifactVersion {}

impl fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl From<String> for ArtifactVersion {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<ArtifactVersion> for String {
    fn from(version: ArtifactVersion) -> Self {
        version.raw
    }
}

/// One interval of a range constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub lower: Bound<ArtifactVersion>,
    pub upper: Bound<ArtifactVersion>,
}

impl VersionRange {
    pub fn contains(&self, version: &ArtifactVersion) -> bool {
        let above = match &self.lower {
            Bound::Included(v) => version >= v,
            Bound::Excluded(v) => version > v,
            Bound::Unbounded => true,
        };
        let below = match &self.upper {
            Bound::Included(v) => version <= v,
            Bound::Excluded(v) => version < v,
            Bound::Unbounded => true,
        };
        above && below
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lower {
            Bound::Included(v) => write!(f, "[{}", v)?,
            Bound::Excluded(v) => write!(f, "({}", v)?,
            Bound::Unbounded => write!(f, "(")?,
        }
        write!(f, ",")?;
        match &self.upper {
            Bound::Included(v) => write!(f, "{}]", v),
            Bound::Excluded(v) => write!(f, "{})", v),
            Bound::Unbounded => write!(f, ")"),
        }
    }
}

/// What versions of an artifact a coordinate accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// A single version.
    Exact(ArtifactVersion),
    /// Union of intervals; a version matches if any interval contains it.
    Ranges(Vec<VersionRange>),
    /// Any version whose text starts with the prefix (`1.+`, `+`).
    Dynamic(String),
}

impl VersionConstraint {
    /// Parse a constraint. The error is a human-readable reason.
    pub fn parse(input: &str) -> Result<Self, String> {
        let spec = input.trim();
        if spec.is_empty() {
            return Err("version is empty".into());
        }

        if spec.starts_with('[') || spec.starts_with('(') {
            return Self::parse_ranges(spec);
        }

        if let Some(prefix) = spec.strip_suffix('+') {
            if prefix.contains(['[', ']', '(', ')', ',', '+']) {
                return Err(format!("invalid dynamic version '{}'", spec));
            }
            return Ok(Self::Dynamic(prefix.to_string()));
        }

        if spec.contains(['[', ']', '(', ')', ',', '+']) {
            return Err(format!("unexpected range character in version '{}'", spec));
        }

        Ok(Self::Exact(ArtifactVersion::parse(spec)))
    }

    fn parse_ranges(spec: &str) -> Result<Self, String> {
        let mut ranges = Vec::new();
        let mut rest = spec;

        loop {
            let open = rest
                .chars()
                .next()
                .ok_or_else(|| format!("dangling separator in range '{}'", spec))?;
            if open != '[' && open != '(' {
                return Err(format!("expected '[' or '(' in range '{}'", spec));
            }

            let close_at = rest
                .find([']', ')'])
                .ok_or_else(|| format!("unterminated range '{}'", spec))?;
            let close = &rest[close_at..close_at + 1];
            let body = &rest[1..close_at];
            let bounds: Vec<&str> = body.split(',').map(str::trim).collect();

            let range = match bounds.as_slice() {
                [single] => {
                    if open != '[' || close != "]" || single.is_empty() {
                        return Err(format!("single-version range must be '[v]' in '{}'", spec));
                    }
                    let version = ArtifactVersion::parse(single);
                    VersionRange {
                        lower: Bound::Included(version.clone()),
                        upper: Bound::Included(version),
                    }
                }
                [low, high] => {
                    if low.is_empty() && high.is_empty() {
                        return Err(format!("range without bounds in '{}'", spec));
                    }
                    let lower = match (*low, open) {
                        ("", _) => Bound::Unbounded,
                        (v, '[') => Bound::Included(ArtifactVersion::parse(v)),
                        (v, _) => Bound::Excluded(ArtifactVersion::parse(v)),
                    };
                    let upper = match (*high, close) {
                        ("", _) => Bound::Unbounded,
                        (v, "]") => Bound::Included(ArtifactVersion::parse(v)),
                        (v, _) => Bound::Excluded(ArtifactVersion::parse(v)),
                    };
                    if let (
                        Bound::Included(l) | Bound::Excluded(l),
                        Bound::Included(h) | Bound::Excluded(h),
                    ) = (&lower, &upper)
                    {
                        if l > h {
                            return Err(format!("lower bound above upper bound in '{}'", spec));
                        }
                    }
                    VersionRange { lower, upper }
                }
                _ => return Err(format!("too many bounds in range '{}'", spec)),
            };
            ranges.push(range);

            rest = rest[close_at + 1..].trim_start();
            if rest.is_empty() {
                break;
            }
            rest = rest
                .strip_prefix(',')
                .ok_or_else(|| format!("expected ',' between ranges in '{}'", spec))?
                .trim_start();
        }

        if let [only] = ranges.as_slice() {
            if let (Bound::Included(l), Bound::Included(h)) = (&only.lower, &only.upper) {
                if l.as_str() == h.as_str() {
                    return Ok(Self::Exact(l.clone()));
                }
            }
        }

        Ok(Self::Ranges(ranges))
    }

    pub fn matches(&self, version: &ArtifactVersion) -> bool {
        match self {
            Self::Exact(v) => v.as_str() == version.as_str(),
            Self::Ranges(ranges) => ranges.iter().any(|r| r.contains(version)),
            Self::Dynamic(prefix) => version.as_str().starts_with(prefix.as_str()),
        }
    }

    /// The pinned version, if the constraint allows exactly one.
    pub fn exact(&self) -> Option<&ArtifactVersion> {
        match self {
            Self::Exact(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "{}", v),
            Self::Ranges(ranges) => {
                for (i, range) in ranges.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", range)?;
                }
                Ok(())
            }
            Self::Dynamic(prefix) => write!(f, "{}+", prefix),
        }
    }
}
