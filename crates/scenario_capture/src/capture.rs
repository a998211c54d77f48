use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use clap::Args;
use wait_timeout::ChildExt;

use crate::config::CaptureConfig;
use crate::error::{CaptureError, Result};
use crate::hooks::run_scenario;
use crate::manager::{CaptureLifecycleManager, Teardown};
use crate::params::{Parameters, load_parameters};
use crate::scenario::{Scenario, ScenarioOutcome};
use crate::util::{OutputIntegration, output_for};

const TIMEOUT_EXIT: i32 = 124;

/// Recorder options shared by every subcommand.
///
/// Flags are folded into the parameter map so they pass the same
/// validation as a parameters file.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// KEY=VALUE parameters file (tagFilter, recorderPath, frameRate, ...).
    #[arg(long)]
    pub params: Option<PathBuf>,

    #[arg(long = "tag-filter", conflicts_with = "no_tag_filter")]
    pub tag_filter: Option<String>,

    /// Record every scenario regardless of tags.
    #[arg(long = "no-tag-filter")]
    pub no_tag_filter: bool,

    #[arg(long)]
    pub recorder: Option<String>,

    #[arg(long = "frame-rate")]
    pub frame_rate: Option<u32>,

    #[arg(long)]
    pub display: Option<String>,

    #[arg(long = "capture-path")]
    pub capture_path: Option<PathBuf>,

    #[arg(long)]
    pub size: Option<String>,

    #[arg(long = "reports-path")]
    pub reports_path: Option<PathBuf>,

    #[arg(long = "temp-prefix")]
    pub temp_prefix: Option<String>,

    #[arg(long = "grace-seconds")]
    pub grace_seconds: Option<u64>,

    #[arg(long)]
    pub ledger: bool,
}

impl ConfigArgs {
    pub fn to_parameters(&self) -> Result<Parameters> {
        let mut params = match &self.params {
            Some(path) => load_parameters(path)?,
            None => Parameters::new(),
        };

        if let Some(value) = &self.tag_filter {
            params.set("tagFilter", value.clone());
        }
        if self.no_tag_filter {
            params.set("tagFilter", "");
        }
        if let Some(value) = &self.recorder {
            params.set("recorderPath", value.clone());
        }
        if let Some(value) = self.frame_rate {
            params.set("frameRate", value.to_string());
        }
        if let Some(value) = &self.display {
            params.set("display", value.clone());
        }
        if let Some(value) = &self.capture_path {
            params.set("capturePath", value.display().to_string());
        }
        if let Some(value) = &self.size {
            params.set("size", value.clone());
        }
        if let Some(value) = &self.reports_path {
            params.set("reportsPath", value.display().to_string());
        }
        if let Some(value) = &self.temp_prefix {
            params.set("tempPrefix", value.clone());
        }
        if let Some(value) = self.grace_seconds {
            params.set("graceSeconds", value.to_string());
        }
        if self.ledger {
            params.set("ledger", "true");
        }
        Ok(params)
    }

    pub fn resolve(&self) -> Result<CaptureConfig> {
        CaptureConfig::from_parameters(&self.to_parameters()?)
    }
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Scenario title; defaults to the command line.
    #[arg(long)]
    pub title: Option<String>,

    /// Scenario tag, repeatable.
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    #[arg(long = "timeout-seconds")]
    pub timeout_seconds: Option<u64>,

    /// Command that plays the scenario; exit status 0 means passed.
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ConfigCommandArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

pub fn print_config(args: ConfigCommandArgs) -> Result<()> {
    let cfg = args.config.resolve()?;
    println!("{}", serde_json::to_string_pretty(&cfg)?);
    Ok(())
}

/// Runs `command` without a shell; returns its exit code, 124 on timeout.
fn execute_scenario_command(command: &[String], timeout: Option<Duration>) -> Result<i32> {
    let (program, rest) = command
        .split_first()
        .ok_or_else(|| CaptureError::configuration("no scenario command given"))?;

    let mut child = Command::new(program)
        .args(rest)
        .spawn()
        .map_err(|source| CaptureError::Spawn {
            command: command.join(" "),
            source,
        })?;

    let code = match timeout {
        Some(timeout) => match child.wait_timeout(timeout)? {
            Some(status) => status.code().unwrap_or(1),
            None => {
                child.kill()?;
                let _ = child.wait();
                TIMEOUT_EXIT
            }
        },
        None => child.wait()?.code().unwrap_or(1),
    };
    Ok(code)
}

pub fn run_capture(args: RunArgs) -> Result<()> {
    let cfg = args.config.resolve()?;
    let integration = OutputIntegration::detect();
    let ui = output_for(&integration);

    let title = args.title.clone().unwrap_or_else(|| args.command.join(" "));
    let scenario = Scenario::new(title).with_tags(args.tags.iter().cloned());
    let timeout = args.timeout_seconds.map(Duration::from_secs);

    let mut manager = CaptureLifecycleManager::new(cfg);
    let mut exit_code = 0;
    let outcome = run_scenario(&mut manager, &scenario, || {
        exit_code = execute_scenario_command(&args.command, timeout)?;
        Ok::<_, CaptureError>(ScenarioOutcome::from_exit_code(Some(exit_code)))
    })?;

    let teardown = manager.last_teardown().cloned().unwrap_or(Teardown::Idle);
    match &teardown {
        Teardown::Retained { path, .. } => {
            ui.warning(&format!("scenario failed, recording kept: {}", path.display()));
        }
        Teardown::Discarded { .. } => ui.success("scenario passed, recording discarded"),
        Teardown::NoRecording { .. } => ui.warning("recorder produced no file"),
        Teardown::Idle => ui.info("scenario not recorded"),
    }

    if integration.should_emit_json() {
        println!(
            "{}",
            serde_json::json!({
                "command": "run",
                "scenario": scenario.title,
                "outcome": outcome,
                "exit_code": exit_code,
                "capture": teardown.as_str(),
                "recording": teardown.retained_path().map(|path| path.display().to_string()),
                "stop": teardown.stop().map(|stop| stop.as_str()),
                "integration": integration,
            })
        );
    }

    if exit_code != 0 {
        return Err(CaptureError::exit(
            exit_code,
            format!("scenario failed with exit={exit_code}"),
        ));
    }
    Ok(())
}
