//! Error types for the generation domain

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

use crate::generation::StopReason;

/// Coarse classification of a failed invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The generator ran and exited non-zero
    Tool,
    /// The generator could not be started or supervised
    Infrastructure,
    /// The deadline expired and the generator was killed
    TimedOut,
    /// The caller cancelled and the generator was killed (or never started)
    Cancelled,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Tool => "tool-failure",
            FailureKind::Infrastructure => "infrastructure-failure",
            FailureKind::TimedOut => "timed-out",
            FailureKind::Cancelled => "cancelled",
        }
    }
}

/// Errors that can occur while invoking the generator
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("Generator exited with {status}")]
    ToolFailed { status: ExitStatus },

    #[error("Generator '{program}' was not found on the executable search path")]
    NotFound { program: String },

    #[error("Failed to start generator '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Output folder '{}' is not valid UTF-8", .path.display())]
    NonUtf8OutputFolder { path: PathBuf },

    #[error("Failed while waiting for the generator: {0}")]
    Wait(#[source] io::Error),

    #[error("Generation timed out after {timeout:?}")]
    TimedOut { timeout: Duration },

    #[error("Generation was cancelled")]
    Cancelled,
}

impl InvocationError {
    pub(crate) fn stopped(reason: StopReason, timeout: Option<Duration>) -> Self {
        match reason {
            StopReason::Cancelled => Self::Cancelled,
            StopReason::DeadlineExceeded => Self::TimedOut {
                timeout: timeout.unwrap_or_default(),
            },
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ToolFailed { .. } => FailureKind::Tool,
            Self::NotFound { .. }
            | Self::Spawn { .. }
            | Self::NonUtf8OutputFolder { .. }
            | Self::Wait(_) => FailureKind::Infrastructure,
            Self::TimedOut { .. } => FailureKind::TimedOut,
            Self::Cancelled => FailureKind::Cancelled,
        }
    }

    /// The generator itself reported the failure
    pub fn is_tool_failure(&self) -> bool {
        self.kind() == FailureKind::Tool
    }

    /// Launching or supervising the generator failed. Timeouts and cancellation count.
    pub fn is_infrastructure_failure(&self) -> bool {
        !self.is_tool_failure()
    }

    /// Exit code reported by the generator, if it exited normally
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ToolFailed { status } => status.code(),
            _ => None,
        }
    }
}

/// Returned when a language name cannot form a single flag token
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid generator language: '{0}'")]
pub struct InvalidLanguage(pub String);
