//! Default values for repository queries and well-known repositories.

use std::path::PathBuf;
use std::time::Duration;

pub const QUERY_TIMEOUT_SECS: u64 = 30;
pub const EXTENSION: &str = "jar";

pub const GOOGLE_URL: &str = "https://dl.google.com/dl/android/maven2";
pub const MAVEN_CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2";
pub const JCENTER_URL: &str = "https://jcenter.bintray.com";

/// Environment override for the `mavenLocal` repository root.
pub const MAVEN_LOCAL_ENV: &str = "DEPOT_MAVEN_LOCAL";

pub fn query_timeout_secs() -> u64 { QUERY_TIMEOUT_SECS }
pub fn query_timeout() -> Duration { Duration::from_secs(QUERY_TIMEOUT_SECS) }
pub fn extension() -> String { EXTENSION.to_string() }

/// Root of the local Maven repository, `~/.m2/repository` unless overridden.
pub fn maven_local_path() -> PathBuf {
    if let Ok(path) = std::env::var(MAVEN_LOCAL_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".m2")
        .join("repository")
}
