use crate::reader::spawn_line_forwarder;
use crate::SupervisorError;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::{mpsc, watch};

/// Launch parameters for one supervised process.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: Vec<(String, String)>,
    /// Used only to tag log lines.
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExitInfo {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl From<ExitStatus> for ExitInfo {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;
        Self {
            code: status.code(),
            signal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    OutputLine { stream: OutputStream, line: String },
    /// Sent exactly once, after the child has been reaped.
    Exited(ExitInfo),
}

/// Cheap, cloneable view of a live child: its pid and its exit status once
/// the waiter task has reaped it.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: u32,
    exit_rx: watch::Receiver<Option<ExitInfo>>,
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// The child leads its own process group, so the group id equals its pid.
    pub fn process_group(&self) -> u32 {
        self.pid
    }

    pub fn exit_info(&self) -> Option<ExitInfo> {
        *self.exit_rx.borrow()
    }

    pub fn has_exited(&self) -> bool {
        self.exit_info().is_some()
    }

    /// Waits up to `timeout` for the child to be reaped.
    pub async fn wait_exit(&self, timeout: Duration) -> Option<ExitInfo> {
        let mut rx = self.exit_rx.clone();
        let exit = match tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await {
            Ok(Ok(status)) => *status,
            _ => self.exit_info(),
        };
        exit
    }
}

pub struct SupervisedProcess {
    pub handle: ProcessHandle,
    pub events: mpsc::UnboundedReceiver<ProcessEvent>,
}

/// Spawns `spec` with piped output and starts its observer tasks.
///
/// Must be called from within a tokio runtime. The returned event channel is
/// unbounded so output forwarding never applies backpressure to the child.
pub fn spawn(spec: SpawnSpec) -> Result<SupervisedProcess, SupervisorError> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&spec.working_dir)
        .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false);

    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
        program: spec.program.clone(),
        source,
    })?;
    let pid = child
        .id()
        .ok_or_else(|| SupervisorError::MissingPid(spec.program.clone()))?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (exit_tx, exit_rx) = watch::channel(None);

    if let Some(stdout) = child.stdout.take() {
        spawn_line_forwarder(stdout, OutputStream::Stdout, events_tx.clone(), pid);
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_forwarder(stderr, OutputStream::Stderr, events_tx.clone(), pid);
    }

    let label = spec.label.clone();
    tokio::spawn(async move {
        let exit = match child.wait().await {
            Ok(status) => ExitInfo::from(status),
            Err(err) => {
                tracing::warn!(pid, label = %label, error = %err, "failed to wait on child");
                ExitInfo::default()
            }
        };
        tracing::debug!(pid, label = %label, code = ?exit.code, signal = ?exit.signal, "child reaped");
        exit_tx.send_replace(Some(exit));
        let _ = events_tx.send(ProcessEvent::Exited(exit));
    });

    tracing::info!(pid, label = %spec.label, program = %spec.program, "process spawned");

    Ok(SupervisedProcess {
        handle: ProcessHandle { pid, exit_rx },
        events: events_rx,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn exit_info_from_status_code() {
        use std::os::unix::process::ExitStatusExt;
        let info = ExitInfo::from(ExitStatus::from_raw(3 << 8));
        assert_eq!(info.code, Some(3));
        assert_eq!(info.signal, None);
    }

    #[cfg(unix)]
    #[test]
    fn exit_info_from_signal() {
        use std::os::unix::process::ExitStatusExt;
        let info = ExitInfo::from(ExitStatus::from_raw(libc::SIGTERM));
        assert_eq!(info.code, None);
        assert_eq!(info.signal, Some(libc::SIGTERM));
    }

    #[test]
    fn output_stream_names() {
        assert_eq!(OutputStream::Stdout.as_str(), "stdout");
        assert_eq!(OutputStream::Stderr.as_str(), "stderr");
    }
}
