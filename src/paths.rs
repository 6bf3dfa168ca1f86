use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Computes per-scope filesystem paths for the relational store and vector
/// persistence directories, all rooted under a single user-data directory.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn databases_dir(&self) -> PathBuf {
        self.root.join("databases")
    }

    /// Global catalog database, shared across all workspaces.
    pub fn global_store_path(&self) -> PathBuf {
        self.databases_dir().join("workspace.db")
    }

    /// Reserved for a future persistent vector backend; not written to by
    /// the in-memory `VectorStore`.
    pub fn global_vector_dir(&self) -> PathBuf {
        self.databases_dir().join("chroma")
    }

    pub fn workspace_store_path(&self, workspace_id: &str) -> PathBuf {
        self.databases_dir()
            .join("workspaces")
            .join(workspace_id)
            .join("workspace.db")
    }

    pub fn workspace_vector_dir(&self, workspace_id: &str) -> PathBuf {
        self.databases_dir()
            .join("workspaces")
            .join(workspace_id)
            .join("chroma")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Idempotent: creates every directory this resolver knows about.
    /// Tolerates "already exists"; only I/O/permission failures surface.
    pub fn ensure_all(&self) -> AppResult<()> {
        for dir in [
            self.databases_dir(),
            self.global_vector_dir(),
            self.logs_dir(),
        ] {
            std::fs::create_dir_all(&dir)
                .map_err(|e| AppError::StorageSetup(format!("{}: {e}", dir.display())))?;
        }
        Ok(())
    }

    /// Ensures the directories for a specific workspace exist.
    pub fn ensure_workspace(&self, workspace_id: &str) -> AppResult<()> {
        let dir = self.workspace_vector_dir(workspace_id);
        std::fs::create_dir_all(&dir)
            .map_err(|e| AppError::StorageSetup(format!("{}: {e}", dir.display())))?;
        if let Some(parent) = self.workspace_store_path(workspace_id).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::StorageSetup(format!("{}: {e}", parent.display())))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_all_creates_expected_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(tmp.path());
        resolver.ensure_all().unwrap();

        assert!(resolver.global_store_path().parent().unwrap().is_dir());
        assert!(resolver.global_vector_dir().is_dir());
        assert!(resolver.logs_dir().is_dir());
    }

    #[test]
    fn ensure_all_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(tmp.path());
        resolver.ensure_all().unwrap();
        resolver.ensure_all().unwrap();
    }

    #[test]
    fn workspace_paths_are_nested_under_root() {
        let resolver = PathResolver::new("/data/root");
        assert_eq!(
            resolver.workspace_store_path("ws1"),
            PathBuf::from("/data/root/databases/workspaces/ws1/workspace.db")
        );
        assert_eq!(
            resolver.workspace_vector_dir("ws1"),
            PathBuf::from("/data/root/databases/workspaces/ws1/chroma")
        );
    }
}
