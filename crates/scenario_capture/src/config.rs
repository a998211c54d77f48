use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::error::{CaptureError, Result};
use crate::params::Parameters;

pub const DEFAULT_TAG_FILTER: &str = "javascript";
pub const DEFAULT_RECORDER: &str = "ffmpeg";
pub const DEFAULT_FRAME_RATE: u32 = 24;
pub const DEFAULT_CAPTURE_PATH: &str = "/tmp";
pub const DEFAULT_SIZE: &str = "1024x768";
pub const DEFAULT_REPORTS_PATH: &str = "reports/capture";
pub const DEFAULT_TEMP_PREFIX: &str = "behat";
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);

const DISPLAY_ENV: &str = "DISPLAY";

/// Resolved recorder configuration.
///
/// Built once, before the first scenario: defaults, then runner parameters,
/// then the `DISPLAY` fallback. Nothing is looked up lazily afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureConfig {
    pub tag_filter: Option<String>,
    pub recorder_path: String,
    pub frame_rate: u32,
    pub display: String,
    pub capture_path: PathBuf,
    pub size: String,
    pub reports_path: PathBuf,
    pub temp_prefix: String,
    pub grace_period: Duration,
    pub ledger: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl CaptureConfig {
    /// Defaults with no display; use [`CaptureConfig::from_parameters`] to
    /// pick up `DISPLAY`.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            tag_filter: Some(DEFAULT_TAG_FILTER.to_string()),
            recorder_path: DEFAULT_RECORDER.to_string(),
            frame_rate: DEFAULT_FRAME_RATE,
            display: String::new(),
            capture_path: PathBuf::from(DEFAULT_CAPTURE_PATH),
            size: DEFAULT_SIZE.to_string(),
            reports_path: PathBuf::from(DEFAULT_REPORTS_PATH),
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            grace_period: DEFAULT_GRACE_PERIOD,
            ledger: false,
        }
    }

    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        Self::resolve_with(params, |key| std::env::var(key).ok())
    }

    /// Full resolution with an injected environment lookup.
    pub fn resolve_with<F>(params: &Parameters, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::defaults();
        cfg.apply_parameters(params)?;
        if params.get("display").is_none() {
            cfg.display = env(DISPLAY_ENV).unwrap_or_default();
        }
        Ok(cfg)
    }

    pub fn apply_parameters(&mut self, params: &Parameters) -> Result<()> {
        if let Some(value) = params.get("tagFilter") {
            self.tag_filter = parse_tag_filter(value);
        }
        if let Some(value) = params.get_any(&["recorderPath", "pathToFfmpeg"]) {
            self.recorder_path = value.to_string();
        }
        if let Some(value) = params.get_u32("frameRate")? {
            if value == 0 {
                return Err(CaptureError::invalid_parameter("frameRate", "0"));
            }
            self.frame_rate = value;
        }
        if let Some(value) = params.get("display") {
            self.display = value.to_string();
        }
        if let Some(value) = params.get("capturePath") {
            self.capture_path = PathBuf::from(value);
        }
        if let Some(value) = params.get("size") {
            if parse_frame_size(value).is_none() {
                return Err(CaptureError::invalid_parameter("size", value));
            }
            self.size = value.trim().to_string();
        }
        if let Some(value) = params.get("reportsPath") {
            self.reports_path = PathBuf::from(value);
        }
        if let Some(value) = params.get("tempPrefix") {
            self.temp_prefix = value.to_string();
        }
        if let Some(value) = params.get_u64("graceSeconds")? {
            self.grace_period = Duration::from_secs(value);
        }
        if let Some(value) = params.get_bool("ledger")? {
            self.ledger = value;
        }
        Ok(())
    }

    #[must_use]
    pub fn with_tag_filter(mut self, tag: Option<&str>) -> Self {
        self.tag_filter = tag.map(str::to_string);
        self
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: impl Into<String>) -> Self {
        self.recorder_path = recorder.into();
        self
    }

    #[must_use]
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    #[must_use]
    pub fn with_capture_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.capture_path = path.into();
        self
    }

    #[must_use]
    pub fn with_reports_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.reports_path = path.into();
        self
    }

    #[must_use]
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    #[must_use]
    pub fn with_ledger(mut self, enabled: bool) -> Self {
        self.ledger = enabled;
        self
    }

    /// Whether a scenario with these tags should be recorded.
    #[must_use]
    pub fn matches_tags<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        match &self.tag_filter {
            Some(filter) => tags.iter().any(|tag| tag.as_ref() == filter),
            None => true,
        }
    }

    /// Scratch file the recorder writes to, e.g. `/tmp/.behat_ffmpeg_99.mp4`
    /// for display `:99`.
    #[must_use]
    pub fn temp_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "{}/.{}_ffmpeg_{}.mp4",
            trim_trailing_slashes(&self.capture_path),
            self.temp_prefix,
            display_suffix(&self.display),
        ))
    }

    /// Where a failed scenario's recording is kept.
    #[must_use]
    pub fn destination_path(&self, title: &str) -> PathBuf {
        PathBuf::from(format!(
            "{}/{}.mp4",
            trim_trailing_slashes(&self.reports_path),
            sanitize_title(title),
        ))
    }

    #[must_use]
    pub fn ledger_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "{}/capture_ledger.jsonl",
            trim_trailing_slashes(&self.reports_path)
        ))
    }
}

/// Empty, `~` and `null` switch tag filtering off.
#[must_use]
pub fn parse_tag_filter(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    match trimmed {
        "" | "~" | "null" => None,
        tag => Some(tag.to_string()),
    }
}

#[must_use]
pub fn parse_frame_size(raw: &str) -> Option<(u32, u32)> {
    let (width, height) = raw.trim().split_once('x')?;
    let width = width.parse::<u32>().ok()?;
    let height = height.parse::<u32>().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}

/// Spaces and periods become underscores; everything else is kept.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|ch| if ch == ' ' || ch == '.' { '_' } else { ch })
        .collect()
}

/// Drops the first character of the display (the `:` of `:99`).
#[must_use]
pub fn display_suffix(display: &str) -> &str {
    let mut chars = display.chars();
    chars.next();
    chars.as_str()
}

fn trim_trailing_slashes(path: &Path) -> String {
    path.to_string_lossy().trim_end_matches('/').to_string()
}
