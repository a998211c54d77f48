use serde::{Deserialize, Serialize};

/// Metadata of one test case as seen by the capture hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub title: String,
    pub tags: Vec<String>,
}

impl Scenario {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// Final classification reported by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioOutcome {
    Passed,
    Failed,
    Skipped,
    Pending,
    Undefined,
    /// The runner could not tell, e.g. the scenario body itself errored out.
    Unknown,
}

impl ScenarioOutcome {
    /// Only an explicit failure keeps the recording.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Pending => "pending",
            Self::Undefined => "undefined",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Self::Passed,
            _ => Self::Failed,
        }
    }
}
