use std::path::PathBuf;

use cw_core::ProjectId;

use crate::error::StorageError;

/// Application directory name under the user's home.
const APP_DIR: &str = ".contextweaver";

/// Per-project filesystem layout: `~/.contextweaver/<projectId>/` holds the
/// row store, the vector store backing directory, and the process lock.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    /// Resolve the layout for a project, creating the directory if needed.
    pub fn for_project(project_id: &ProjectId) -> Result<Self, StorageError> {
        let home = dirs::home_dir().ok_or(StorageError::NoHomeDirectory)?;
        let root = home.join(APP_DIR).join(project_id.as_str());
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Layout rooted at an explicit base directory (tests, tooling).
    pub fn at_base(base: &std::path::Path, project_id: &ProjectId) -> Result<Self, StorageError> {
        let root = base.join(project_id.as_str());
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub fn index_db(&self) -> PathBuf {
        self.root.join("index.db")
    }

    /// Vector store backing directory (ANN index + record table).
    pub fn vectors_dir(&self) -> PathBuf {
        self.root.join("vectors")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.root.join("index.lock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_under_base() {
        let tmp = tempfile::TempDir::new().unwrap();
        let id = ProjectId::from_raw("0123456789");
        let paths = ProjectPaths::at_base(tmp.path(), &id).unwrap();

        assert!(paths.root().exists());
        assert!(paths.index_db().ends_with("0123456789/index.db"));
        assert!(paths.vectors_dir().ends_with("0123456789/vectors"));
        assert!(paths.lock_file().ends_with("0123456789/index.lock"));
    }
}
