pub mod process;
mod reader;
pub mod terminate;
pub mod tree;

pub use process::{
    spawn, ExitInfo, OutputStream, ProcessEvent, ProcessHandle, SpawnSpec, SupervisedProcess,
};
pub use terminate::{terminate_tree, TerminationReport};
pub use tree::{descendants, is_process_alive, process_name, signal_process, Signal, SignalOutcome};

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Spawned process {0} has no pid")]
    MissingPid(String),
    #[error("Refusing to signal pid {0}")]
    InvalidPid(u32),
    #[error("Failed to signal pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("Process signaling is not supported on this platform")]
    Unsupported,
}
