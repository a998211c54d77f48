use clap::Args;
use serde_json::json;

use crate::capture::ConfigArgs;
use crate::config::{CaptureConfig, parse_frame_size};
use crate::error::{CaptureError, Result};
use crate::util::{CliOutput, OutputIntegration, ensure_writable_dir, output_for, require_command};

#[derive(Debug, Clone, Args)]
pub struct DoctorArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

fn check_recorder(cfg: &CaptureConfig, ui: &CliOutput) -> Result<()> {
    match require_command(&cfg.recorder_path) {
        Ok(()) => {
            ui.success(&format!("recorder available: {}", cfg.recorder_path));
            Ok(())
        }
        Err(error) => {
            ui.error(&format!("recorder missing: {}", cfg.recorder_path));
            Err(error)
        }
    }
}

fn check_display(cfg: &CaptureConfig, ui: &CliOutput) -> Result<()> {
    if cfg.display.is_empty() {
        ui.error("no display: pass --display or set DISPLAY");
        return Err(CaptureError::configuration("no display target available"));
    }
    ui.success(&format!("display: {}", cfg.display));
    Ok(())
}

pub fn run_doctor(args: DoctorArgs) -> Result<()> {
    let integration = OutputIntegration::detect();
    let ui = output_for(&integration);
    let cfg = args.config.resolve()?;

    ui.rule(Some("scenario_capture doctor"));
    ui.info(&format!(
        "tag_filter={}",
        cfg.tag_filter.as_deref().unwrap_or("(none, every scenario)")
    ));
    ui.info(&format!("recorder={}", cfg.recorder_path));
    ui.info(&format!("capture_path={}", cfg.capture_path.display()));
    ui.info(&format!("reports_path={}", cfg.reports_path.display()));

    ui.rule(Some("environment detection"));
    ui.info(&format!(
        "fastapi_output mode={} agent={} ci={} tty={}",
        integration.fastapi_mode,
        integration.fastapi_agent,
        integration.fastapi_ci,
        integration.fastapi_tty
    ));

    check_recorder(&cfg, &ui)?;
    check_display(&cfg, &ui)?;

    if let Some((width, height)) = parse_frame_size(&cfg.size) {
        ui.success(&format!("frame size {width}x{height} at {} fps", cfg.frame_rate));
    }

    ensure_writable_dir(&cfg.capture_path)?;
    ui.success("capture directory writable");
    ui.info(&format!("temp file: {}", cfg.temp_path().display()));

    if integration.should_emit_json() {
        println!(
            "{}",
            json!({
                "command": "doctor",
                "status": "ok",
                "recorder": cfg.recorder_path,
                "display": cfg.display,
                "temp_path": cfg.temp_path().display().to_string(),
                "integration": integration,
            })
        );
    }

    ui.success("doctor checks passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::capture::ConfigArgs;
    use crate::error::CaptureError;

    use super::{DoctorArgs, run_doctor};

    #[cfg(unix)]
    #[test]
    fn doctor_passes_with_writable_capture_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let capture = temp.path().join("capture");
        run_doctor(DoctorArgs {
            config: ConfigArgs {
                recorder: Some("sh".to_string()),
                display: Some(":99".to_string()),
                capture_path: Some(capture.clone()),
                ..ConfigArgs::default()
            },
        })
        .expect("doctor passes");
        assert!(capture.is_dir());
        assert_eq!(std::fs::read_dir(&capture).expect("read dir").count(), 0);
    }

    #[test]
    fn missing_recorder_fails_doctor() {
        let result = run_doctor(DoctorArgs {
            config: ConfigArgs {
                recorder: Some("scenario-capture-no-such-recorder".to_string()),
                display: Some(":99".to_string()),
                ..ConfigArgs::default()
            },
        });
        match result {
            Err(CaptureError::MissingCommand { command }) => {
                assert_eq!(command, "scenario-capture-no-such-recorder");
            }
            other => panic!("expected MissingCommand, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn empty_display_fails_doctor_after_recorder_check() {
        let result = run_doctor(DoctorArgs {
            config: ConfigArgs {
                recorder: Some("sh".to_string()),
                display: Some(String::new()),
                ..ConfigArgs::default()
            },
        });
        assert!(matches!(result, Err(CaptureError::Configuration { .. })));
    }
}
