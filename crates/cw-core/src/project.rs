use std::fmt;
use std::path::Path;
use std::time::UNIX_EPOCH;

use md5::{Digest, Md5};

/// Stable per-project identifier: the first 10 hex chars of
/// MD5(`"<abs_path>::<birthtime_ms>"`).
///
/// The birthtime comes from the `.git/` directory when present, otherwise
/// from the project root itself, so deleting and recreating a project at the
/// same path yields a fresh id (and therefore a fresh index directory).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn derive(project_root: &Path) -> Self {
        let birth_ms = birthtime_ms(project_root);
        let abs = project_root
            .canonicalize()
            .unwrap_or_else(|_| project_root.to_path_buf());
        let input = format!("{}::{}", abs.to_string_lossy(), birth_ms);
        let digest = Md5::digest(input.as_bytes());
        let hex = hex::encode(digest);
        Self(hex[..10].to_string())
    }

    /// Construct from a known id string (tests, tooling).
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Birthtime of `.git/` if present, else of the root, in milliseconds since
/// the epoch. Filesystems without a creation time fall back to mtime.
fn birthtime_ms(project_root: &Path) -> u128 {
    let git_dir = project_root.join(".git");
    let target = if git_dir.is_dir() { git_dir } else { project_root.to_path_buf() };

    let meta = match std::fs::metadata(&target) {
        Ok(m) => m,
        Err(_) => return 0,
    };
    let stamp = meta.created().or_else(|_| meta.modified());
    match stamp {
        Ok(t) => t.duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0),
        Err(_) => 0,
    }
}
