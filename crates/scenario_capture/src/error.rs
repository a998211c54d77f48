use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CaptureError>;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("invalid parameter {key}={value}")]
    InvalidParameter { key: String, value: String },

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[cfg(unix)]
    #[error("failed to signal recorder pid={pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("storage error during {operation}: {path}: {source}")]
    Storage {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing dependency command: {command}")]
    MissingCommand { command: String },

    #[error("{message}")]
    Exit { code: i32, message: String },
}

impl CaptureError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exit { code, .. } => *code,
            Self::Configuration { .. } | Self::InvalidParameter { .. } => 2,
            Self::MissingCommand { .. } => 127,
            _ => 1,
        }
    }

    #[must_use]
    pub fn exit(code: i32, message: impl Into<String>) -> Self {
        Self::Exit {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_parameter(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidParameter {
            key: key.into(),
            value: value.into(),
        }
    }

    pub(crate) fn storage(
        operation: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Storage {
            operation,
            path,
            source,
        }
    }
}
