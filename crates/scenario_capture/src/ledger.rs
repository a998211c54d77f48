use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, Result};
use crate::scenario::ScenarioOutcome;
use crate::util::append_line;

/// One line of `capture_ledger.jsonl`, written per torn-down recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub timestamp: String,
    pub scenario: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub outcome: ScenarioOutcome,
    pub disposition: String,
    pub stop: String,
    pub recorder_pid: u32,
    pub temp_path: String,
    pub destination: Option<String>,
    pub duration_ms: i64,
}

impl CaptureRecord {
    pub fn append_jsonl(&self, path: &Path) -> Result<()> {
        let line = serde_json::to_string(self)?;
        append_line(path, &line)
    }

    pub fn read_jsonl(path: &Path) -> Result<Vec<Self>> {
        let content = std::fs::read_to_string(path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<Self>(line).map_err(CaptureError::from))
            .collect()
    }
}
