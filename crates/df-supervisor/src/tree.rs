//! Process-table snapshots and signal delivery.
//!
//! Enumeration is a point-in-time snapshot: a process may fork or exit right
//! after it is taken. Callers treat the result as best-effort.

use crate::SupervisorError;
use std::collections::{HashMap, HashSet, VecDeque};
use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Terminate,
    Kill,
}

impl Signal {
    #[cfg(unix)]
    fn as_raw(self) -> libc::c_int {
        match self {
            Signal::Terminate => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    Delivered,
    /// The target no longer exists. Not an error.
    AlreadyGone,
}

/// Returns every descendant of `root` (excluding `root`), parents before
/// their children.
pub fn descendants(root: u32) -> Vec<u32> {
    let mut system = System::new();
    system.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::new());

    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for (pid, process) in system.processes() {
        // Linux lists threads as tasks of their process; only real processes
        // get signaled.
        if process.thread_kind().is_some() {
            continue;
        }
        if let Some(parent) = process.parent() {
            children
                .entry(parent.as_u32())
                .or_default()
                .push(pid.as_u32());
        }
    }
    collect_descendants(root, &children)
}

pub(crate) fn collect_descendants(root: u32, children: &HashMap<u32, Vec<u32>>) -> Vec<u32> {
    let mut seen = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);
    let mut out = Vec::new();

    while let Some(current) = queue.pop_front() {
        let Some(kids) = children.get(&current) else {
            continue;
        };
        for &kid in kids {
            if seen.insert(kid) {
                out.push(kid);
                queue.push_back(kid);
            }
        }
    }
    out
}

/// Returns `true` when `pid` exists and is not a zombie.
pub fn is_process_alive(pid: u32) -> bool {
    let target = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[target]),
        true,
        ProcessRefreshKind::new(),
    );
    match system.process(target) {
        Some(process) => !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead),
        None => false,
    }
}

/// Executable name the kernel reports for `pid`, if the process exists.
pub fn process_name(pid: u32) -> Option<String> {
    let target = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[target]),
        true,
        ProcessRefreshKind::new(),
    );
    system
        .process(target)
        .map(|process| process.name().to_string_lossy().into_owned())
}

/// Sends `signal` to a single process.
pub fn signal_process(pid: u32, signal: Signal) -> Result<SignalOutcome, SupervisorError> {
    let raw = i32::try_from(pid).map_err(|_| SupervisorError::InvalidPid(pid))?;
    if raw <= 0 {
        return Err(SupervisorError::InvalidPid(pid));
    }
    send(raw, pid, signal)
}

/// Sends `signal` to every member of the process group `pgid`.
pub fn signal_group(pgid: u32, signal: Signal) -> Result<SignalOutcome, SupervisorError> {
    let raw = i32::try_from(pgid).map_err(|_| SupervisorError::InvalidPid(pgid))?;
    // pgid 1 would address init's group; 0 would address our own.
    if raw <= 1 {
        return Err(SupervisorError::InvalidPid(pgid));
    }
    send(-raw, pgid, signal)
}

/// Returns `true` while any process, zombies included, still belongs to the
/// group `pgid`.
#[cfg(unix)]
pub fn group_has_members(pgid: u32) -> bool {
    let Ok(raw) = i32::try_from(pgid) else {
        return false;
    };
    if raw <= 1 {
        return false;
    }
    // SAFETY: signal 0 only performs the existence and permission checks.
    let rc = unsafe { libc::kill(-raw, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn group_has_members(_pgid: u32) -> bool {
    false
}

#[cfg(unix)]
fn send(target: i32, pid: u32, signal: Signal) -> Result<SignalOutcome, SupervisorError> {
    // SAFETY: `target` is a validated non-zero pid or negated pgid; kill(2)
    // has no memory-safety preconditions.
    let rc = unsafe { libc::kill(target, signal.as_raw()) };
    if rc == 0 {
        return Ok(SignalOutcome::Delivered);
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(SignalOutcome::AlreadyGone)
    } else {
        Err(SupervisorError::Signal { pid, source: err })
    }
}

#[cfg(not(unix))]
fn send(_target: i32, _pid: u32, _signal: Signal) -> Result<SignalOutcome, SupervisorError> {
    Err(SupervisorError::Unsupported)
}
