pub mod manager;
pub mod manifest;
pub mod scaffold;

pub use manager::WorkspaceManager;
pub use manifest::Manifest;
pub use scaffold::{ProjectKind, ScaffoldParams};

use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("Workspace already exists for {handle}: {}", path.display())]
    Conflict { handle: Uuid, path: PathBuf },
    #[error("Failed to scaffold {kind} project: {source}")]
    Scaffold {
        kind: ProjectKind,
        #[source]
        source: std::io::Error,
    },
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkspaceError {
    pub fn error_code(&self) -> &'static str {
        match self {
            WorkspaceError::Conflict { .. } => "WORKSPACE_CONFLICT",
            WorkspaceError::Scaffold { .. } => "SCAFFOLD_FAILED",
            WorkspaceError::Manifest(_) => "MANIFEST_ERROR",
            WorkspaceError::Io(_) => "FILESYSTEM_ERROR",
        }
    }
}
