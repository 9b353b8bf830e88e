use crate::app::{AppEvent, AppSummary, ManagedApp, StopReason};
use crate::observer::{spawn_app_observer, ObserverContext};
use crate::registry::Registry;
use crate::FactoryError;
use chrono::Utc;
use df_supervisor::{terminate_tree, SpawnSpec, SupervisedProcess, TerminationReport};
use df_workspace::{Manifest, ProjectKind, ScaffoldParams, WorkspaceManager};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Result of a successful create. `warnings` carries non-fatal problems such
/// as a failed scaffold.
#[derive(Debug, Clone)]
pub struct CreatedApp {
    pub handle: Uuid,
    pub working_dir: PathBuf,
    pub warnings: Vec<String>,
}

pub struct AppFactory {
    workspaces: WorkspaceManager,
    registry: Registry,
    stop_grace: Duration,
    events_tx: broadcast::Sender<AppEvent>,
}

impl AppFactory {
    pub fn new(workspaces: WorkspaceManager, stop_grace: Duration) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            workspaces,
            registry: Registry::new(),
            stop_grace,
            events_tx,
        }
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.events_tx.subscribe()
    }

    /// Provisions a workspace, launches `command` inside it and starts
    /// tracking the process.
    pub async fn create(
        &self,
        name: &str,
        command: &str,
        args: &[String],
    ) -> Result<CreatedApp, FactoryError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(FactoryError::InvalidRequest(
                "command must not be empty".to_string(),
            ));
        }

        let handle = Uuid::new_v4();
        let working_dir = self.workspaces.allocate(&handle).await?;
        let created_at = Utc::now();

        let manifest = Manifest {
            handle,
            name: name.to_string(),
            command: command.to_string(),
            arguments: args.to_vec(),
            created_at,
            working_directory: working_dir.clone(),
        };
        if let Err(err) = self.workspaces.write_manifest(&manifest).await {
            self.discard_workspace(&handle).await;
            return Err(err.into());
        }

        let mut warnings = Vec::new();
        if let Some(kind) = ProjectKind::detect(command) {
            if let Err(err) = self
                .workspaces
                .scaffold(&handle, kind, &ScaffoldParams::new(name))
                .await
            {
                tracing::warn!(handle = %handle, kind = %kind, error = %err, "scaffolding failed");
                warnings.push(format!("Scaffolding {kind} project failed: {err}"));
            }
        }

        let spec = SpawnSpec {
            program: command.to_string(),
            args: args.to_vec(),
            working_dir: working_dir.clone(),
            env: vec![(
                "PATH".to_string(),
                path_with_prefix(&self.workspaces.bin_dir(&handle)),
            )],
            label: name.to_string(),
        };
        let SupervisedProcess {
            handle: process,
            events,
        } = match df_supervisor::spawn(spec) {
            Ok(spawned) => spawned,
            Err(err) => {
                tracing::warn!(handle = %handle, command, error = %err, "failed to start app");
                self.discard_workspace(&handle).await;
                return Err(err.into());
            }
        };
        let pid = process.pid();

        let app = ManagedApp {
            handle,
            name: name.to_string(),
            command: command.to_string(),
            args: args.to_vec(),
            working_dir: working_dir.clone(),
            created_at,
            process: Some(process.clone()),
        };
        if let Err(err) = self.registry.insert(app).await {
            // The workspace may belong to the existing record, so it stays.
            tracing::error!(handle = %handle, pid, "handle collision, terminating fresh process");
            terminate_tree(&process, self.stop_grace).await;
            return Err(err);
        }

        spawn_app_observer(ObserverContext {
            handle,
            name: name.to_string(),
            events,
            registry: self.registry.clone(),
            app_events_tx: self.events_tx.clone(),
        });

        tracing::info!(handle = %handle, app = %name, pid, command, "app created");
        let _ = self.events_tx.send(AppEvent::Created { handle });

        Ok(CreatedApp {
            handle,
            working_dir,
            warnings,
        })
    }

    pub async fn list(&self) -> Vec<AppSummary> {
        self.registry.list().await
    }

    pub async fn get(&self, handle: &Uuid) -> Result<AppSummary, FactoryError> {
        self.registry.get(handle).await
    }

    /// Drops the record and terminates its process tree if it was still
    /// running. Returns `None` when the app had already exited on its own.
    pub async fn stop(&self, handle: &Uuid) -> Result<Option<TerminationReport>, FactoryError> {
        let app = self.registry.take(handle).await?;
        let Some(process) = app.process else {
            tracing::info!(handle = %handle, app = %app.name, "app already exited, record dropped");
            return Ok(None);
        };

        let report = terminate_tree(&process, self.stop_grace).await;
        tracing::info!(
            handle = %handle,
            app = %app.name,
            pid = report.root,
            escalated = report.escalated,
            "app stopped"
        );
        let _ = self.events_tx.send(AppEvent::Stopped {
            handle: *handle,
            reason: StopReason::Requested,
        });
        Ok(Some(report))
    }

    /// Stops the app if it is still known, then deletes its workspace.
    /// Unknown handles succeed, so a failed removal can be retried.
    pub async fn remove(&self, handle: &Uuid) -> Result<(), FactoryError> {
        let known = match self.stop(handle).await {
            Ok(_) => true,
            Err(FactoryError::NotFound(_)) => false,
            Err(err) => return Err(err),
        };

        self.workspaces.destroy(handle).await?;

        if known {
            tracing::info!(handle = %handle, "app removed");
            let _ = self.events_tx.send(AppEvent::Removed { handle: *handle });
        }
        Ok(())
    }

    pub async fn shutdown(&self) {
        let handles = self.registry.handles().await;
        if handles.is_empty() {
            return;
        }
        tracing::info!(count = handles.len(), "stopping all apps");
        for handle in handles {
            match self.stop(&handle).await {
                Ok(_) | Err(FactoryError::NotFound(_)) => {}
                Err(err) => tracing::warn!(handle = %handle, error = %err, "failed to stop app"),
            }
        }
    }

    async fn discard_workspace(&self, handle: &Uuid) {
        if let Err(err) = self.workspaces.destroy(handle).await {
            tracing::warn!(handle = %handle, error = %err, "failed to clean up workspace");
        }
    }
}

/// Inherited `PATH` with `dir` searched first.
fn path_with_prefix(dir: &Path) -> String {
    let inherited = std::env::var_os("PATH").unwrap_or_default();
    let mut entries = vec![dir.to_path_buf()];
    entries.extend(std::env::split_paths(&inherited));

    match std::env::join_paths(entries) {
        Ok(joined) => joined.to_string_lossy().into_owned(),
        Err(err) => {
            tracing::warn!(dir = %dir.display(), error = %err, "cannot prefix PATH, using inherited value");
            inherited.to_string_lossy().into_owned()
        }
    }
}
