//! Start/stop of the recorder around one scenario, and what happens to the
//! file afterwards.
//!
//! `Idle → Recording` on a matching start, `Recording → Idle` on end. Every
//! other event leaves the manager `Idle`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::CaptureConfig;
use crate::error::{CaptureError, Result};
use crate::ledger::CaptureRecord;
use crate::process::StopOutcome;
use crate::recorder::RecorderCommand;
use crate::scenario::{Scenario, ScenarioOutcome};
use crate::session::{ActiveCapture, CaptureSession, SessionState};
use crate::util::now_utc_iso;

const NO_DISPLAY: &str = "no display target available";

/// Result of [`CaptureLifecycleManager::on_scenario_end`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Teardown {
    /// Nothing was recording.
    Idle,
    /// The recorder left no file behind.
    NoRecording { stop: StopOutcome },
    /// Scenario did not fail; the file was deleted.
    Discarded { stop: StopOutcome },
    /// Scenario failed; the file now lives at `path`.
    Retained { path: PathBuf, stop: StopOutcome },
}

impl Teardown {
    #[must_use]
    pub fn stop(&self) -> Option<StopOutcome> {
        match self {
            Self::Idle => None,
            Self::NoRecording { stop } | Self::Discarded { stop } | Self::Retained { stop, .. } => {
                Some(*stop)
            }
        }
    }

    #[must_use]
    pub fn retained_path(&self) -> Option<&Path> {
        match self {
            Self::Retained { path, .. } => Some(path.as_path()),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::NoRecording { .. } => "no_recording",
            Self::Discarded { .. } => "discarded",
            Self::Retained { .. } => "retained",
        }
    }
}

#[derive(Debug)]
pub struct CaptureLifecycleManager {
    config: CaptureConfig,
    session: CaptureSession,
    last_teardown: Option<Teardown>,
}

impl CaptureLifecycleManager {
    #[must_use]
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            session: CaptureSession::idle(),
            last_teardown: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.session.is_recording()
    }

    /// Outcome of the most recent `on_scenario_end`, if it completed.
    #[must_use]
    pub fn last_teardown(&self) -> Option<&Teardown> {
        self.last_teardown.as_ref()
    }

    pub fn on_scenario_start(&mut self, scenario: &Scenario) -> Result<()> {
        if !self.config.matches_tags(&scenario.tags) {
            debug!(
                scenario = %scenario.title,
                tag_filter = ?self.config.tag_filter,
                "scenario not tagged for capture"
            );
            return Ok(());
        }

        if self.config.display.is_empty() {
            return Err(CaptureError::configuration(NO_DISPLAY));
        }

        if let Some(stale) = self.session.take() {
            warn!(
                pid = stale.process.pid(),
                scenario = %scenario.title,
                "previous recording was never stopped, discarding it"
            );
            self.discard_stale(stale);
        }

        let command = RecorderCommand::from_config(&self.config);
        let process = command.spawn()?;
        self.session.begin(ActiveCapture {
            process,
            temp_path: command.output,
            started_at: Utc::now(),
        });
        Ok(())
    }

    pub fn on_scenario_end(
        &mut self,
        scenario: &Scenario,
        outcome: ScenarioOutcome,
    ) -> Result<Teardown> {
        self.last_teardown = None;
        let Some(mut active) = self.session.take() else {
            debug!(scenario = %scenario.title, "no active recording");
            return Ok(Teardown::Idle);
        };

        let stop = match active.process.stop(self.config.grace_period) {
            Ok(stop) => stop,
            Err(error) => {
                remove_leftover(&active.temp_path);
                return Err(error);
            }
        };
        if stop.was_forced() {
            warn!(
                pid = active.process.pid(),
                scenario = %scenario.title,
                "recorder had to be killed, the file may be truncated"
            );
        }

        let teardown = self.settle(&active.temp_path, scenario, outcome, stop)?;
        if self.config.ledger {
            self.record(&active, scenario, outcome, &teardown)?;
        }
        self.last_teardown = Some(teardown.clone());
        Ok(teardown)
    }

    fn settle(
        &self,
        temp_path: &Path,
        scenario: &Scenario,
        outcome: ScenarioOutcome,
        stop: StopOutcome,
    ) -> Result<Teardown> {
        if !temp_path.exists() {
            warn!(
                temp_path = %temp_path.display(),
                scenario = %scenario.title,
                status = %stop.status(),
                "recorder produced no file"
            );
            return Ok(Teardown::NoRecording { stop });
        }

        if outcome.is_failure() {
            let destination = self.config.destination_path(&scenario.title);
            retain_recording(temp_path, &destination)?;
            info!(
                scenario = %scenario.title,
                path = %destination.display(),
                "kept recording of failed scenario"
            );
            return Ok(Teardown::Retained {
                path: destination,
                stop,
            });
        }

        fs::remove_file(temp_path).map_err(CaptureError::storage("delete recording", temp_path))?;
        debug!(
            scenario = %scenario.title,
            outcome = outcome.as_str(),
            "discarded recording"
        );
        Ok(Teardown::Discarded { stop })
    }

    fn discard_stale(&self, mut stale: ActiveCapture) {
        if let Err(error) = stale.process.stop(self.config.grace_period) {
            warn!(%error, "failed to stop stale recorder");
        }
        remove_leftover(&stale.temp_path);
    }

    fn record(
        &self,
        active: &ActiveCapture,
        scenario: &Scenario,
        outcome: ScenarioOutcome,
        teardown: &Teardown,
    ) -> Result<()> {
        let record = CaptureRecord {
            timestamp: now_utc_iso(),
            scenario: scenario.title.clone(),
            tags: scenario.tags.clone(),
            outcome,
            disposition: teardown.as_str().to_string(),
            stop: teardown
                .stop()
                .map_or_else(String::new, |stop| stop.as_str().to_string()),
            recorder_pid: active.process.pid(),
            temp_path: active.temp_path.display().to_string(),
            destination: teardown
                .retained_path()
                .map(|path| path.display().to_string()),
            duration_ms: (Utc::now() - active.started_at).num_milliseconds(),
        };
        record.append_jsonl(&self.config.ledger_path())
    }
}

/// Moves `temp_path` to `destination`, replacing whatever is there.
pub fn retain_recording(temp_path: &Path, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(CaptureError::storage("create directory", parent))?;
    }

    if destination.exists() {
        fs::remove_file(destination)
            .map_err(CaptureError::storage("remove previous recording", destination))?;
    }

    move_file(temp_path, destination)
}

// rename(2) cannot cross filesystems; /tmp is often its own mount.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::CrossesDevices => {
            debug!(from = %from.display(), to = %to.display(), "rename crosses devices, copying");
            copy_then_remove(from, to)
        }
        Err(error) => Err(CaptureError::storage("move recording", to)(error)),
    }
}

fn copy_then_remove(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to).map_err(CaptureError::storage("copy recording", to))?;
    fs::remove_file(from).map_err(CaptureError::storage("delete recording", from))?;
    Ok(())
}

// Best effort: a scratch file nobody will settle. The next `-y` run would
// overwrite it anyway.
fn remove_leftover(temp_path: &Path) {
    if temp_path.exists()
        && let Err(error) = fs::remove_file(temp_path)
    {
        warn!(%error, temp_path = %temp_path.display(), "failed to delete leftover recording");
    }
}
