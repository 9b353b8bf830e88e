use crate::manifest::{Manifest, MANIFEST_FILE_NAME};
use crate::scaffold::{ProjectKind, ScaffoldParams};
use crate::WorkspaceError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Owns the on-disk layout `<root>/<handle>/` for every managed app.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, handle: &Uuid) -> PathBuf {
        self.root.join(handle.to_string())
    }

    pub fn manifest_path(&self, handle: &Uuid) -> PathBuf {
        self.path_for(handle).join(MANIFEST_FILE_NAME)
    }

    /// Local tool directory searched before the inherited `PATH`.
    pub fn bin_dir(&self, handle: &Uuid) -> PathBuf {
        self.path_for(handle).join("node_modules").join(".bin")
    }

    /// Creates a fresh workspace directory. An existing directory for the
    /// handle is a conflict, never reused.
    pub async fn allocate(&self, handle: &Uuid) -> Result<PathBuf, WorkspaceError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let path = self.path_for(handle);
        match tokio::fs::create_dir(&path).await {
            Ok(()) => {
                tracing::debug!(handle = %handle, path = %path.display(), "workspace allocated");
                Ok(path)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(WorkspaceError::Conflict {
                handle: *handle,
                path,
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn write_manifest(&self, manifest: &Manifest) -> Result<PathBuf, WorkspaceError> {
        let path = self.manifest_path(&manifest.handle);
        tokio::fs::write(&path, manifest.to_json()?).await?;
        Ok(path)
    }

    pub async fn read_manifest(&self, handle: &Uuid) -> Result<Manifest, WorkspaceError> {
        let content = tokio::fs::read_to_string(self.manifest_path(handle)).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the starter layout for `kind` into the workspace. Callers treat
    /// a failure here as a warning.
    pub async fn scaffold(
        &self,
        handle: &Uuid,
        kind: ProjectKind,
        params: &ScaffoldParams,
    ) -> Result<(), WorkspaceError> {
        let base = self.path_for(handle);
        let bundle = kind.bundle(params);
        let wrap = |source: std::io::Error| WorkspaceError::Scaffold { kind, source };

        for dir in &bundle.dirs {
            tokio::fs::create_dir_all(base.join(dir))
                .await
                .map_err(wrap)?;
        }
        for (relative, contents) in &bundle.files {
            let target = base.join(relative);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
            }
            tokio::fs::write(&target, contents).await.map_err(wrap)?;
        }

        tracing::info!(handle = %handle, kind = %kind, files = bundle.files.len(), "workspace scaffolded");
        Ok(())
    }

    /// Recursively deletes the workspace. A missing directory is not an error.
    pub async fn destroy(&self, handle: &Uuid) -> Result<(), WorkspaceError> {
        let path = self.path_for(handle);
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                tracing::debug!(handle = %handle, path = %path.display(), "workspace destroyed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn manager() -> (tempfile::TempDir, WorkspaceManager) {
        let dir = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(dir.path().join("dapps"));
        (dir, manager)
    }

    fn manifest_for(manager: &WorkspaceManager, handle: Uuid) -> Manifest {
        Manifest {
            handle,
            name: "demo".to_string(),
            command: "sleep".to_string(),
            arguments: vec!["60".to_string()],
            created_at: Utc::now(),
            working_directory: manager.path_for(&handle),
        }
    }

    #[tokio::test]
    async fn allocate_creates_directory_under_root() {
        let (_dir, manager) = manager();
        let handle = Uuid::new_v4();

        let path = manager.allocate(&handle).await.unwrap();
        assert!(path.is_dir());
        assert_eq!(path, manager.root().join(handle.to_string()));
    }

    #[tokio::test]
    async fn allocate_twice_is_a_conflict() {
        let (_dir, manager) = manager();
        let handle = Uuid::new_v4();

        manager.allocate(&handle).await.unwrap();
        let err = manager.allocate(&handle).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::Conflict { handle: h, .. } if h == handle));
        assert_eq!(err.error_code(), "WORKSPACE_CONFLICT");
    }

    #[tokio::test]
    async fn manifest_is_written_and_overwritable() {
        let (_dir, manager) = manager();
        let handle = Uuid::new_v4();
        manager.allocate(&handle).await.unwrap();

        let mut manifest = manifest_for(&manager, handle);
        manager.write_manifest(&manifest).await.unwrap();
        assert_eq!(manager.read_manifest(&handle).await.unwrap(), manifest);

        manifest.name = "renamed".to_string();
        manager.write_manifest(&manifest).await.unwrap();
        assert_eq!(manager.read_manifest(&handle).await.unwrap().name, "renamed");
    }

    #[tokio::test]
    async fn destroy_removes_workspace_and_is_idempotent() {
        let (_dir, manager) = manager();
        let handle = Uuid::new_v4();
        let path = manager.allocate(&handle).await.unwrap();
        manager
            .write_manifest(&manifest_for(&manager, handle))
            .await
            .unwrap();

        manager.destroy(&handle).await.unwrap();
        assert!(!path.exists());
        manager.destroy(&handle).await.unwrap();
    }

    #[tokio::test]
    async fn destroy_never_allocated_succeeds() {
        let (_dir, manager) = manager();
        manager.destroy(&Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn scaffold_hardhat_writes_bundle() {
        let (_dir, manager) = manager();
        let handle = Uuid::new_v4();
        let path = manager.allocate(&handle).await.unwrap();

        manager
            .scaffold(&handle, ProjectKind::Hardhat, &ScaffoldParams::new("Gold"))
            .await
            .unwrap();

        assert!(path.join("hardhat.config.js").is_file());
        assert!(path.join("contracts").join("GoldToken.sol").is_file());
        assert!(path.join("scripts").join("deploy.js").is_file());
        assert!(path.join("test").is_dir());
    }

    #[tokio::test]
    async fn scaffold_into_missing_workspace_reports_scaffold_error() {
        let (dir, manager) = manager();
        let handle = Uuid::new_v4();
        // A plain file where the apps root should be makes every write fail.
        std::fs::write(dir.path().join("dapps"), b"not a dir").unwrap();

        let err = manager
            .scaffold(&handle, ProjectKind::Hardhat, &ScaffoldParams::new("Gold"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkspaceError::Scaffold {
                kind: ProjectKind::Hardhat,
                ..
            }
        ));
    }

    #[test]
    fn bin_dir_is_inside_workspace() {
        let manager = WorkspaceManager::new("/srv/dapps");
        let handle = Uuid::nil();
        assert_eq!(
            manager.bin_dir(&handle),
            PathBuf::from("/srv/dapps")
                .join(handle.to_string())
                .join("node_modules/.bin")
        );
    }
}
