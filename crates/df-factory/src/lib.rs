mod app;
mod factory;
mod observer;
pub mod registry;

pub use app::{AppEvent, AppStatus, AppSummary, ManagedApp, StopReason};
pub use factory::{AppFactory, CreatedApp};
pub use registry::Registry;

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("App not found: {0}")]
    NotFound(Uuid),
    #[error("Duplicate app handle: {0}")]
    DuplicateHandle(Uuid),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Workspace(#[from] df_workspace::WorkspaceError),
    #[error(transparent)]
    Supervisor(#[from] df_supervisor::SupervisorError),
}

impl FactoryError {
    pub fn error_code(&self) -> &'static str {
        match self {
            FactoryError::NotFound(_) => "APP_NOT_FOUND",
            FactoryError::DuplicateHandle(_) => "DUPLICATE_HANDLE",
            FactoryError::InvalidRequest(_) => "INVALID_REQUEST",
            FactoryError::Workspace(err) => err.error_code(),
            FactoryError::Supervisor(df_supervisor::SupervisorError::Spawn { .. }) => {
                "SPAWN_FAILED"
            }
            FactoryError::Supervisor(_) => "SUPERVISOR_ERROR",
        }
    }
}
