use crate::app::{AppEvent, StopReason};
use crate::registry::Registry;
use df_supervisor::{OutputStream, ProcessEvent};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

/// Everything the per-app supervisor task needs.
pub(crate) struct ObserverContext {
    pub handle: Uuid,
    pub name: String,
    pub events: mpsc::UnboundedReceiver<ProcessEvent>,
    pub registry: Registry,
    pub app_events_tx: broadcast::Sender<AppEvent>,
}

/// Consumes one process's event channel until every producer is gone.
pub(crate) fn spawn_app_observer(ctx: ObserverContext) {
    tokio::spawn(run_observer(ctx));
}

async fn run_observer(ctx: ObserverContext) {
    let ObserverContext {
        handle,
        name,
        mut events,
        registry,
        app_events_tx,
    } = ctx;

    while let Some(event) = events.recv().await {
        match event {
            ProcessEvent::OutputLine {
                stream: OutputStream::Stdout,
                line,
            } => {
                tracing::info!(target: "app_output", app = %name, handle = %handle, "{line}");
            }
            ProcessEvent::OutputLine {
                stream: OutputStream::Stderr,
                line,
            } => {
                tracing::warn!(target: "app_output", app = %name, handle = %handle, "{line}");
            }
            ProcessEvent::Exited(exit) => {
                if registry.mark_stopped(&handle).await.is_some() {
                    tracing::info!(
                        handle = %handle,
                        app = %name,
                        code = ?exit.code,
                        signal = ?exit.signal,
                        "app exited"
                    );
                    let _ = app_events_tx.send(AppEvent::Stopped {
                        handle,
                        reason: StopReason::Exited {
                            code: exit.code,
                            signal: exit.signal,
                        },
                    });
                } else {
                    tracing::debug!(handle = %handle, "exit observed after stop");
                }
            }
        }
    }

    tracing::debug!(handle = %handle, "app observer finished");
}
