//! Two-phase stop for child processes.
//!
//! # Invariants
//!
//! 1. **Single ownership**: each [`RecorderProcess`] owns exactly one child.
//! 2. **Polite first**: a running child gets `SIGTERM` and the full grace
//!    period before `SIGKILL`.
//! 3. **No orphans**: dropping a [`RecorderProcess`] that was never stopped
//!    kills and reaps the child.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Child already gone | Recorder crashed or finished | `AlreadyExited`, no signal sent |
//! | `SIGTERM` ignored | Recorder traps or blocks the signal | `Killed` after the grace period |
//! | Signal delivery fails | Permission or pid issue | `CaptureError::Signal` |
//! | `ESRCH` on `SIGTERM` | Child exited between poll and signal | Treated as delivered |

use std::process::{Child, ExitStatus};
use std::time::Duration;

use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::error::Result;

/// How a stopped child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Exited before the stop was requested.
    AlreadyExited(ExitStatus),
    /// Exited within the grace period after `SIGTERM`.
    Terminated(ExitStatus),
    /// Needed `SIGKILL`.
    Killed(ExitStatus),
}

impl StopOutcome {
    #[must_use]
    pub const fn status(self) -> ExitStatus {
        match self {
            Self::AlreadyExited(status) | Self::Terminated(status) | Self::Killed(status) => {
                status
            }
        }
    }

    #[must_use]
    pub const fn was_forced(self) -> bool {
        matches!(self, Self::Killed(_))
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyExited(_) => "already_exited",
            Self::Terminated(_) => "terminated",
            Self::Killed(_) => "killed",
        }
    }
}

/// Ask `child` to exit, wait up to `grace`, then kill it.
///
/// Blocks the calling thread for at most `grace` plus the time the kernel
/// needs to reap a killed child.
pub fn stop_gracefully(child: &mut Child, grace: Duration) -> Result<StopOutcome> {
    if let Some(status) = child.try_wait()? {
        debug!(pid = child.id(), %status, "child already exited");
        return Ok(StopOutcome::AlreadyExited(status));
    }

    request_termination(child)?;

    if let Some(status) = child.wait_timeout(grace)? {
        debug!(pid = child.id(), %status, "child exited after termination request");
        return Ok(StopOutcome::Terminated(status));
    }

    warn!(
        pid = child.id(),
        grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
        "child ignored termination request, killing"
    );
    child.kill()?;
    let status = child.wait()?;
    Ok(StopOutcome::Killed(status))
}

#[cfg(unix)]
fn request_termination(child: &mut Child) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    use crate::error::CaptureError;

    let pid = child.id();
    let raw = i32::try_from(pid).map_err(|_| CaptureError::Signal {
        pid,
        source: Errno::EINVAL,
    })?;

    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(source) => Err(CaptureError::Signal { pid, source }),
    }
}

// No polite signal to send here; go straight to the kill.
#[cfg(not(unix))]
fn request_termination(child: &mut Child) -> Result<()> {
    child.kill()?;
    Ok(())
}

/// A spawned recorder and the command line it was started with.
#[derive(Debug)]
pub struct RecorderProcess {
    child: Child,
    command: String,
    stopped: bool,
}

impl RecorderProcess {
    #[must_use]
    pub fn new(child: Child, command: impl Into<String>) -> Self {
        Self {
            child,
            command: command.into(),
            stopped: false,
        }
    }

    #[must_use]
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn stop(&mut self, grace: Duration) -> Result<StopOutcome> {
        let outcome = stop_gracefully(&mut self.child, grace)?;
        self.stopped = true;
        Ok(outcome)
    }
}

impl Drop for RecorderProcess {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }
        if let Ok(None) = self.child.try_wait() {
            warn!(pid = self.child.id(), command = %self.command, "killing recorder on drop");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::process::{Command, Stdio};
    use std::time::{Duration, Instant};

    use super::{RecorderProcess, StopOutcome, stop_gracefully};

    fn spawn_sh(script: &str) -> std::process::Child {
        Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn sh")
    }

    #[test]
    fn exited_child_is_reported_without_signal() {
        let mut child = spawn_sh("exit 3");
        let _ = child.wait();
        let outcome = stop_gracefully(&mut child, Duration::from_secs(1)).expect("stop");
        match outcome {
            StopOutcome::AlreadyExited(status) => assert_eq!(status.code(), Some(3)),
            other => panic!("expected AlreadyExited, got {other:?}"),
        }
    }

    #[test]
    fn cooperative_child_terminates_within_grace() {
        let mut child = spawn_sh("exec sleep 30");
        let outcome = stop_gracefully(&mut child, Duration::from_secs(5)).expect("stop");
        assert!(matches!(outcome, StopOutcome::Terminated(_)));
        assert!(!outcome.was_forced());
        assert_eq!(outcome.as_str(), "terminated");
    }

    #[test]
    fn stubborn_child_is_killed_after_grace() {
        let mut child = spawn_sh("trap '' TERM; while :; do sleep 0.05; done");
        // Give the shell a moment to install the trap.
        std::thread::sleep(Duration::from_millis(200));

        let started = Instant::now();
        let outcome = stop_gracefully(&mut child, Duration::from_millis(300)).expect("stop");
        assert!(outcome.was_forced(), "expected kill, got {outcome:?}");
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[test]
    fn dropping_unstopped_recorder_reaps_child() {
        let child = spawn_sh("exec sleep 30");
        let pid = child.id();
        drop(RecorderProcess::new(child, "sleep 30"));

        let raw = i32::try_from(pid).expect("pid fits");
        let liveness = nix::sys::signal::kill(nix::unistd::Pid::from_raw(raw), None);
        assert!(liveness.is_err(), "child {pid} should be gone after drop");
    }
}
