use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::info;

use crate::config::CaptureConfig;
use crate::error::{CaptureError, Result};
use crate::process::RecorderProcess;

/// Fully resolved recorder invocation.
///
/// The program is executed directly, never through `sh -c`, so the stop
/// signal reaches the recorder itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderCommand {
    pub program: String,
    pub args: Vec<String>,
    pub output: PathBuf,
}

impl RecorderCommand {
    #[must_use]
    pub fn from_config(cfg: &CaptureConfig) -> Self {
        let output = cfg.temp_path();
        Self {
            program: cfg.recorder_path.clone(),
            args: recorder_args(cfg, &output),
            output,
        }
    }

    /// Human-readable command line, for logs and errors only.
    #[must_use]
    pub fn label(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.as_str());
        parts.extend(self.args.iter().map(String::as_str));
        parts.join(" ")
    }

    pub fn spawn(&self) -> Result<RecorderProcess> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                command: self.label(),
                source,
            })?;

        info!(
            pid = child.id(),
            output = %self.output.display(),
            "recorder started"
        );
        Ok(RecorderProcess::new(child, self.label()))
    }
}

/// Arguments after the program name, output file last.
#[must_use]
pub fn recorder_args(cfg: &CaptureConfig, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-r".to_string(),
        cfg.frame_rate.to_string(),
        "-f".to_string(),
        "x11grab".to_string(),
        "-s".to_string(),
        cfg.size.clone(),
        "-i".to_string(),
        cfg.display.clone(),
        "-vc".to_string(),
        "x264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        output.display().to_string(),
    ]
}
