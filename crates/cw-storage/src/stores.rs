use std::path::Path;

use cw_core::ProjectId;

use crate::error::StorageError;
use crate::paths::ProjectPaths;
use crate::row::RowStore;
use crate::vector::VectorStore;

/// Facade owning a project's storage backends.
///
/// Callers that only maintain the row store (FTS-only mode) open without a
/// dimension; everything retrieval-side needs both.
pub struct ProjectStores {
    paths: ProjectPaths,
    row: RowStore,
    vector: Option<VectorStore>,
}

impl ProjectStores {
    /// Open the stores under `~/.contextweaver/<projectId>/`.
    pub fn open(project_root: &Path, vector_dimension: Option<usize>) -> Result<Self, StorageError> {
        let id = ProjectId::derive(project_root);
        let paths = ProjectPaths::for_project(&id)?;
        Self::open_at(paths, vector_dimension)
    }

    /// Open under an explicit base directory (tests, tooling).
    pub fn open_with_base(
        base: &Path,
        project_root: &Path,
        vector_dimension: Option<usize>,
    ) -> Result<Self, StorageError> {
        let id = ProjectId::derive(project_root);
        let paths = ProjectPaths::at_base(base, &id)?;
        Self::open_at(paths, vector_dimension)
    }

    fn open_at(paths: ProjectPaths, vector_dimension: Option<usize>) -> Result<Self, StorageError> {
        let row = RowStore::open(&paths.index_db())?;
        let vector = match vector_dimension {
            Some(dim) => Some(VectorStore::open(&paths.vectors_dir(), dim)?),
            None => None,
        };
        Ok(Self { paths, row, vector })
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn row(&self) -> &RowStore {
        &self.row
    }

    pub fn row_mut(&mut self) -> &mut RowStore {
        &mut self.row
    }

    pub fn vector(&self) -> Option<&VectorStore> {
        self.vector.as_ref()
    }

    pub fn vector_mut(&mut self) -> Option<&mut VectorStore> {
        self.vector.as_mut()
    }

    /// Drop all handles explicitly.
    pub fn close(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_layout() {
        let base = tempfile::TempDir::new().unwrap();
        let project = tempfile::TempDir::new().unwrap();

        let stores = ProjectStores::open_with_base(base.path(), project.path(), Some(4)).unwrap();
        assert!(stores.paths().index_db().exists());
        assert!(stores.vector().is_some());
        assert_eq!(stores.vector().unwrap().dimension(), 4);
        stores.close();
    }

    #[test]
    fn open_without_vectors() {
        let base = tempfile::TempDir::new().unwrap();
        let project = tempfile::TempDir::new().unwrap();

        let stores = ProjectStores::open_with_base(base.path(), project.path(), None).unwrap();
        assert!(stores.vector().is_none());
        assert_eq!(stores.row().count_files().unwrap(), 0);
    }

    #[test]
    fn reopen_sees_persisted_rows() {
        let base = tempfile::TempDir::new().unwrap();
        let project = tempfile::TempDir::new().unwrap();

        {
            let mut stores =
                ProjectStores::open_with_base(base.path(), project.path(), None).unwrap();
            stores
                .row_mut()
                .set_meta("embedding_dimensions", "8")
                .unwrap();
        }
        {
            let stores = ProjectStores::open_with_base(base.path(), project.path(), None).unwrap();
            assert_eq!(
                stores.row().get_meta("embedding_dimensions").unwrap().as_deref(),
                Some("8")
            );
        }
    }
}
