//! Dependency coordinates.
//!
//! A coordinate is written `group:artifact:version[:classifier][@extension]`,
//! e.g. `org.jetbrains.kotlin:kotlin-gradle-plugin:2.0.20`.

pub mod version;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use version::{ArtifactVersion, VersionConstraint, VersionRange};

use crate::defaults;
use crate::error::{Error, Result};

const RANGE_CHARS: [char; 6] = ['[', ']', '(', ')', ',', '+'];

/// Identifier of a dependency. Equality and hashing use the normalized
/// string form, so `lib:core:[1.0, 2.0)` and `lib:core:[1.0,2.0)` are the
/// same key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coordinate {
    group: String,
    artifact: String,
    version: VersionConstraint,
    version_spec: String,
    classifier: Option<String>,
    extension: String,
}

impl Coordinate {
    /// Build a coordinate from its three required parts.
    pub fn new(group: &str, artifact: &str, version: &str) -> Result<Self> {
        let input = format!("{}:{}:{}", group, artifact, version);
        Self::build(&input, group, artifact, version, None, None)
    }

    /// Parse `group:artifact:version[:classifier][@extension]`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let (body, extension) = match trimmed.rsplit_once('@') {
            Some((body, ext)) => (body, Some(ext)),
            None => (trimmed, None),
        };

        let parts: Vec<&str> = body.split(':').collect();
        match parts.as_slice() {
            [group, artifact, version] => {
                Self::build(input, group, artifact, version, None, extension)
            }
            [group, artifact, version, classifier] => {
                Self::build(input, group, artifact, version, Some(*classifier), extension)
            }
            _ => Err(Error::malformed(
                input,
                "expected group:artifact:version[:classifier][@extension]",
            )),
        }
    }

    fn build(
        input: &str,
        group: &str,
        artifact: &str,
        version: &str,
        classifier: Option<&str>,
        extension: Option<&str>,
    ) -> Result<Self> {
        let group = validate_field(input, "group", group, false)?;
        let artifact = validate_field(input, "artifact", artifact, false)?;
        let version_text = validate_field(input, "version", version, true)?;
        let classifier = classifier
            .map(|c| validate_field(input, "classifier", c, false))
            .transpose()?;
        let extension = match extension {
            Some(ext) => validate_field(input, "extension", ext, false)?,
            None => defaults::extension(),
        };

        let version =
            VersionConstraint::parse(&version_text).map_err(|reason| Error::malformed(input, reason))?;
        let version_spec = version.to_string();

        Ok(Self {
            group,
            artifact,
            version,
            version_spec,
            classifier,
            extension,
        })
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn version(&self) -> &VersionConstraint {
        &self.version
    }

    /// Normalized version constraint text.
    pub fn version_spec(&self) -> &str {
        &self.version_spec
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Group with dots turned into path segments (`com/android/tools`).
    pub fn group_path(&self) -> String {
        self.group.replace('.', "/")
    }

    /// File name of this artifact at a concrete version.
    pub fn file_name(&self, version: &ArtifactVersion) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact, version, classifier, self.extension
            ),
            None => format!("{}-{}.{}", self.artifact, version, self.extension),
        }
    }

    /// Coordinate string with the constraint replaced by a concrete version.
    pub fn pinned(&self, version: &ArtifactVersion) -> String {
        self.render(version.as_str())
    }

    fn render(&self, version: &str) -> String {
        let mut out = format!("{}:{}:{}", self.group, self.artifact, version);
        if let Some(classifier) = &self.classifier {
            out.push(':');
            out.push_str(classifier);
        }
        if self.extension != defaults::EXTENSION {
            out.push('@');
            out.push_str(&self.extension);
        }
        out
    }

    fn key(&self) -> (&str, &str, &str, Option<&str>, &str) {
        (
            self.group.as_str(),
            self.artifact.as_str(),
            self.version_spec.as_str(),
            self.classifier.as_deref(),
            self.extension.as_str(),
        )
    }
}

fn validate_field(input: &str, field: &str, value: &str, allow_range: bool) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::malformed(input, format!("{} is empty", field)));
    }
    if value.contains("..") {
        return Err(Error::malformed(input, format!("{} contains '..'", field)));
    }

    // Whitespace is allowed between range bounds and stripped below.
    if let Some(bad) = value.chars().find(|&c| {
        c.is_control()
            || matches!(c, '/' | '\\' | ':' | '@')
            || (c.is_whitespace() && !allow_range)
            || (!allow_range && RANGE_CHARS.contains(&c))
    }) {
        return Err(Error::malformed(
            input,
            format!("{} contains disallowed character {:?}", field, bad),
        ));
    }

    if allow_range {
        if let Some(at) = stray_whitespace(value) {
            return Err(Error::malformed(
                input,
                format!("{} has whitespace at offset {}", field, at),
            ));
        }
        Ok(value.chars().filter(|c| !c.is_whitespace()).collect())
    } else {
        Ok(value.to_string())
    }
}

/// Offset of the first whitespace run not touching a range separator.
fn stray_whitespace(value: &str) -> Option<usize> {
    let is_separator = |c: char| matches!(c, ',' | '[' | ']' | '(' | ')');
    let chars: Vec<(usize, char)> = value.char_indices().collect();
    let mut i = 0;
    while i < chars.len() {
        if !chars[i].1.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i].1.is_whitespace() {
            i += 1;
        }
        let before = start.checked_sub(1).map(|j| chars[j].1);
        let after = chars.get(i).map(|&(_, c)| c);
        if !before.is_some_and(is_separator) && !after.is_some_and(is_separator) {
            return Some(chars[start].0);
        }
    }
    None
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(&self.version_spec))
    }
}

impl FromStr for Coordinate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Coordinate {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Coordinate> for String {
    fn from(coordinate: Coordinate) -> Self {
        coordinate.to_string()
    }
}
