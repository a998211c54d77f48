use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use fastapi_output::RichOutput;
use serde::Serialize;
use sqlmodel_console::OutputMode as SqlModelOutputMode;
use tracing_subscriber::EnvFilter;

use crate::error::{CaptureError, Result};

pub const LOG_ENV: &str = "SCENARIO_CAPTURE_LOG";

#[must_use]
pub fn now_utc_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

pub fn command_exists(command: &str) -> bool {
    which::which(command).is_ok()
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputIntegration {
    pub fastapi_mode: String,
    pub fastapi_agent: bool,
    pub fastapi_ci: bool,
    pub fastapi_tty: bool,
    pub sqlmodel_mode: String,
    pub sqlmodel_agent: bool,
}

impl OutputIntegration {
    #[must_use]
    pub fn detect() -> Self {
        let fastapi_detection = fastapi_output::detect_environment();
        let fastapi_mode = fastapi_output::OutputMode::auto();
        let sqlmodel_mode = SqlModelOutputMode::detect();
        Self {
            fastapi_mode: fastapi_mode.as_str().to_string(),
            fastapi_agent: fastapi_detection.is_agent,
            fastapi_ci: fastapi_detection.is_ci,
            fastapi_tty: fastapi_detection.is_tty,
            sqlmodel_mode: sqlmodel_mode.as_str().to_string(),
            sqlmodel_agent: SqlModelOutputMode::is_agent_environment(),
        }
    }

    #[must_use]
    pub fn should_emit_json(&self) -> bool {
        self.sqlmodel_mode == "json"
    }
}

#[derive(Debug, Clone)]
pub struct CliOutput {
    inner: RichOutput,
    enabled: bool,
}

impl CliOutput {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            inner: RichOutput::auto(),
            enabled,
        }
    }

    pub fn rule(&self, title: Option<&str>) {
        if self.enabled {
            self.inner.rule(title);
        }
    }

    pub fn info(&self, message: &str) {
        if self.enabled {
            self.inner.info(message);
        }
    }

    pub fn success(&self, message: &str) {
        if self.enabled {
            self.inner.success(message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.enabled {
            self.inner.warning(message);
        }
    }

    pub fn error(&self, message: &str) {
        if self.enabled {
            self.inner.error(message);
        }
    }
}

#[must_use]
pub fn output_for(integration: &OutputIntegration) -> CliOutput {
    CliOutput::new(!integration.should_emit_json())
}

/// Installs the global subscriber once; later calls are ignored.
///
/// Filter comes from `SCENARIO_CAPTURE_LOG` (default `warn`). Logs go to
/// stderr so stdout stays parseable in JSON mode.
pub fn init_logging(integration: &OutputIntegration) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = if integration.should_emit_json() {
        builder.json().try_init()
    } else {
        builder.with_target(false).try_init()
    };
}

pub fn require_command(command: &str) -> Result<()> {
    if command_exists(command) {
        Ok(())
    } else {
        Err(CaptureError::MissingCommand {
            command: command.to_string(),
        })
    }
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(CaptureError::storage("create directory", path))
}

/// Creates `path` if needed and confirms a file can be written into it.
pub fn ensure_writable_dir(path: &Path) -> Result<()> {
    ensure_dir(path)?;
    let check = path.join(format!(".scenario_capture_write_check_{}", std::process::id()));
    fs::write(&check, b"").map_err(CaptureError::storage("write file", &check))?;
    fs::remove_file(&check).map_err(CaptureError::storage("delete file", &check))
}

pub fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(CaptureError::storage("open ledger", path))?;
    writeln!(file, "{line}").map_err(CaptureError::storage("append ledger", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::error::CaptureError;

    use super::{
        OutputIntegration, append_line, ensure_dir, ensure_writable_dir, now_utc_iso, output_for,
        require_command,
    };

    #[test]
    fn now_utc_iso_has_zulu_suffix() {
        let stamp = now_utc_iso();
        assert_eq!(stamp.len(), 20);
        assert!(stamp.ends_with('Z'));
    }

    #[test]
    fn require_command_reports_missing_binary() {
        match require_command("scenario-capture-no-such-command") {
            Err(CaptureError::MissingCommand { command }) => {
                assert_eq!(command, "scenario-capture-no-such-command");
            }
            other => panic!("expected MissingCommand, got {other:?}"),
        }
    }

    #[test]
    fn append_line_creates_parent_and_appends() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("a").join("b.jsonl");
        append_line(&path, "one").expect("append one");
        append_line(&path, "two").expect("append two");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "one\ntwo\n");
    }

    #[test]
    fn ensure_writable_dir_creates_directory_and_leaves_it_empty() {
        let temp = tempdir().expect("tempdir");
        let capture = temp.path().join("capture").join("nested");
        ensure_writable_dir(&capture).expect("writable");
        assert!(capture.is_dir());
        let leftovers = std::fs::read_dir(&capture).expect("read dir").count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn ensure_writable_dir_rejects_path_under_a_file() {
        let temp = tempdir().expect("tempdir");
        let file = temp.path().join("plain");
        std::fs::write(&file, b"x").expect("write file");
        assert!(matches!(
            ensure_writable_dir(&file.join("capture")),
            Err(CaptureError::Storage { .. })
        ));
    }

    #[test]
    fn ensure_dir_maps_failures_to_storage_errors() {
        let temp = tempdir().expect("tempdir");
        let file = temp.path().join("plain-file");
        std::fs::write(&file, "x").expect("write file");
        match ensure_dir(&file.join("child")) {
            Err(CaptureError::Storage { operation, .. }) => assert_eq!(operation, "create directory"),
            other => panic!("expected Storage error, got {other:?}"),
        }
    }

    #[test]
    fn output_for_disables_human_output_when_json_mode_requested() {
        let json_integration = OutputIntegration {
            fastapi_mode: "plain".to_string(),
            fastapi_agent: true,
            fastapi_ci: false,
            fastapi_tty: false,
            sqlmodel_mode: "json".to_string(),
            sqlmodel_agent: true,
        };
        let human_integration = OutputIntegration {
            sqlmodel_mode: "plain".to_string(),
            ..json_integration.clone()
        };

        assert!(!output_for(&json_integration).enabled);
        assert!(output_for(&human_integration).enabled);
    }
}
