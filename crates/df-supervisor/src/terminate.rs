use crate::process::ProcessHandle;
use crate::tree::{
    descendants, group_has_members, is_process_alive, signal_group, signal_process, Signal,
    SignalOutcome,
};
use std::time::Duration;
use tokio::time::Instant;

/// How long to wait for the root after SIGKILL before giving up on
/// confirmation.
const KILL_CONFIRM_TIMEOUT: Duration = Duration::from_secs(2);

const SURVIVOR_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What a tree termination did. Failures are recorded here and logged, never
/// returned as errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminationReport {
    pub root: u32,
    pub signaled: Vec<u32>,
    pub already_gone: Vec<u32>,
    pub failed: Vec<u32>,
    pub escalated: bool,
    pub root_exited: bool,
}

impl TerminationReport {
    fn new(root: u32) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    /// Returns `true` when the signal reached a live process.
    fn deliver(&mut self, pid: u32, signal: Signal) -> bool {
        match signal_process(pid, signal) {
            Ok(SignalOutcome::Delivered) => {
                self.signaled.push(pid);
                true
            }
            Ok(SignalOutcome::AlreadyGone) => {
                self.already_gone.push(pid);
                false
            }
            Err(err) => {
                tracing::warn!(root = self.root, pid, ?signal, error = %err, "failed to signal process, skipping");
                self.failed.push(pid);
                false
            }
        }
    }
}

/// Terminates `handle`'s process and every descendant it has spawned.
///
/// Descendants are signaled before the root so they are still reachable
/// through their parent links. The root's process group is signaled too,
/// which catches anything that was reparented before the snapshot. Whatever
/// is still alive after `grace` gets SIGKILL, including descendants that
/// survived SIGTERM after the root itself exited.
pub async fn terminate_tree(handle: &ProcessHandle, grace: Duration) -> TerminationReport {
    let root = handle.pid();
    let pgid = handle.process_group();
    let deadline = Instant::now() + grace;
    let mut report = TerminationReport::new(root);

    let tracked = signal_tree(handle, Signal::Terminate, &[], &mut report).await;
    let root_exited = handle.wait_exit(grace).await.is_some();

    // Descendants get whatever is left of the grace period after the root.
    let (survivors, group_populated) = loop {
        let (survivors, group_populated) = tree_liveness(&tracked, pgid).await;
        let settled = survivors.is_empty() && !group_populated;
        if settled || !root_exited || Instant::now() >= deadline {
            break (survivors, group_populated);
        }
        tokio::time::sleep(SURVIVOR_POLL_INTERVAL).await;
    };

    if root_exited && survivors.is_empty() && !group_populated {
        report.root_exited = true;
        tracing::info!(
            root,
            signaled = report.signaled.len(),
            failed = report.failed.len(),
            "process tree terminated"
        );
        return report;
    }

    tracing::warn!(
        root,
        root_exited,
        survivors = ?survivors,
        grace_ms = grace.as_millis() as u64,
        "process tree outlived SIGTERM, escalating to SIGKILL"
    );
    report.escalated = true;
    for &pid in &survivors {
        report.deliver(pid, Signal::Kill);
    }
    signal_tree(handle, Signal::Kill, &survivors, &mut report).await;

    report.root_exited = root_exited || handle.wait_exit(KILL_CONFIRM_TIMEOUT).await.is_some();
    if !report.root_exited {
        tracing::error!(root, "root still alive after SIGKILL");
    }
    report
}

/// Which of `tracked` are still alive, and whether the group has members.
async fn tree_liveness(tracked: &[u32], pgid: u32) -> (Vec<u32>, bool) {
    let tracked = tracked.to_vec();
    tokio::task::spawn_blocking(move || {
        let survivors: Vec<u32> = tracked
            .into_iter()
            .filter(|&pid| is_process_alive(pid))
            .collect();
        (survivors, group_has_members(pgid))
    })
    .await
    .unwrap_or_else(|err| {
        tracing::warn!(pgid, error = %err, "liveness check failed, assuming the group survived");
        (Vec::new(), true)
    })
}

/// Signals the tree and group, skipping pids in `skip`. Returns the
/// descendants the signal reached.
async fn signal_tree(
    handle: &ProcessHandle,
    signal: Signal,
    skip: &[u32],
    report: &mut TerminationReport,
) -> Vec<u32> {
    let root = handle.pid();
    let mut reached = Vec::new();

    // Once reaped, the root pid may belong to an unrelated process, so neither
    // it nor its parent links can be trusted. The group id stays reserved while
    // any member is alive.
    if handle.has_exited() {
        report.already_gone.push(root);
    } else {
        let tree = tokio::task::spawn_blocking(move || descendants(root))
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(root, error = %err, "process table snapshot failed");
                Vec::new()
            });
        tracing::debug!(root, ?signal, descendants = ?tree, "signaling process tree");

        for pid in tree.into_iter().filter(|pid| !skip.contains(pid)) {
            if report.deliver(pid, signal) {
                reached.push(pid);
            }
        }
        report.deliver(root, signal);
    }

    if let Err(err) = signal_group(handle.process_group(), signal) {
        tracing::debug!(root, error = %err, "process group signal failed");
    }
    reached
}
