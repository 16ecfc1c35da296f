// Pipeline error taxonomy
// Shared by every port so callers can branch on the failure class

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Upstream query or store unreachable. Transient.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    /// Another pass holds the checkpoint. Not an operator concern.
    #[error("a pass is already running for '{process_name}'")]
    AlreadyRunning { process_name: String },
    /// A conditional write lost a race.
    #[error("conflicting write: {0}")]
    Conflict(String),
    /// The detector rejected its input.
    #[error("detection failure: {0}")]
    DetectionFailure(String),
}

impl PipelineError {
    pub fn source_unavailable(err: impl std::fmt::Display) -> Self {
        PipelineError::SourceUnavailable(format!("{:#}", err))
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::SourceUnavailable(_) | PipelineError::AlreadyRunning { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SourceUnavailable(_) => "source_unavailable",
            PipelineError::AlreadyRunning { .. } => "already_running",
            PipelineError::Conflict(_) => "conflict",
            PipelineError::DetectionFailure(_) => "detection_failure",
        }
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::source_unavailable(err)
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
