use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::process::RecorderProcess;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
}

/// A recorder that is currently writing `temp_path`.
#[derive(Debug)]
pub struct ActiveCapture {
    pub process: RecorderProcess,
    pub temp_path: PathBuf,
    pub started_at: DateTime<Utc>,
}

/// At most one live recorder per manager.
#[derive(Debug, Default)]
pub struct CaptureSession {
    active: Option<ActiveCapture>,
}

impl CaptureSession {
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.active.is_some() {
            SessionState::Recording
        } else {
            SessionState::Idle
        }
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn temp_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|active| active.temp_path.as_path())
    }

    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.active.as_ref().map(|active| active.process.pid())
    }

    /// Returns the capture this one replaced, if any.
    pub fn begin(&mut self, capture: ActiveCapture) -> Option<ActiveCapture> {
        self.active.replace(capture)
    }

    /// Moves to `Idle`, handing the capture to the caller.
    pub fn take(&mut self) -> Option<ActiveCapture> {
        self.active.take()
    }
}
