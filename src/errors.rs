/*!
 * Error types for the persdeck application.
 *
 * This module contains custom error types for the different layers of the
 * application, using the thiserror crate for ergonomic error definitions:
 * - `ServiceError`: failures talking to the remote deck service
 * - `ValidationError`: problems detected locally before any remote call
 * - `PipelineError`: what a pipeline action returns to its caller
 * - `AppError`: top-level error used by the binary
 */

use serde::Serialize;
use thiserror::Error;

use crate::pipeline::state::{AnalysisPhase, PipelineStage};

/// Errors that can occur when calling the remote deck service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Network or connection failure; no usable response was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status
    #[error("Service rejected the request: {status_code} - {body}")]
    RemoteRejected {
        /// HTTP status code
        status_code: u16,
        /// Raw response body, kept for diagnostics
        body: String,
    },

    /// The response body could not be parsed into the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Errors detected locally, before any remote call is made
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No subtitle file was supplied
    #[error("No subtitle file selected")]
    MissingFile,

    /// The subtitle file has no content
    #[error("Subtitle file '{0}' is empty")]
    EmptyFile(String),

    /// The subtitle file is not an .srt file
    #[error("Only .srt files are supported, got '{0}'")]
    UnsupportedFileType(String),

    /// The episode label is empty after trimming
    #[error("Episode name must not be empty")]
    EmptyEpisodeLabel,

    /// The target language tag is not one of the supported tags
    #[error("Unsupported target language tag: '{0}'")]
    InvalidLanguageTag(String),

    /// The action is not legal in the current pipeline state
    #[error("Cannot {action} while the pipeline is {stage}")]
    InvalidTransition {
        /// The rejected action
        action: PipelineAction,
        /// Stage the pipeline was in when the action was rejected
        stage: PipelineStage,
    },
}

/// The user-initiated pipeline actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineAction {
    SubmitUpload,
    RunAnalysis,
    CreateDeck,
    ExportDeck,
}

impl std::fmt::Display for PipelineAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SubmitUpload => "submit upload",
            Self::RunAnalysis => "run analysis",
            Self::CreateDeck => "create deck",
            Self::ExportDeck => "export deck",
        };
        write!(f, "{}", name)
    }
}

/// Coarse classification of a pipeline failure, used by presentation layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Transport,
    RemoteRejected,
    MalformedResponse,
}

/// Errors returned by `PipelineEngine` actions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Local validation failed; no remote call was made
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The remote service call failed
    #[error("Failed to {action}: {source}")]
    Service {
        /// The action that issued the call
        action: PipelineAction,
        /// For `run_analysis`, the phase that failed
        phase: Option<AnalysisPhase>,
        /// The underlying service failure
        source: ServiceError,
    },

    /// The pipeline was reset while the call was in flight; its result was discarded
    #[error("Pipeline was reset while {0} was in flight; result discarded")]
    Superseded(PipelineAction),
}

impl PipelineError {
    pub(crate) fn service(action: PipelineAction, source: ServiceError) -> Self {
        Self::Service {
            action,
            phase: None,
            source,
        }
    }

    pub(crate) fn analysis_phase(phase: AnalysisPhase, source: ServiceError) -> Self {
        Self::Service {
            action: PipelineAction::RunAnalysis,
            phase: Some(phase),
            source,
        }
    }

    /// Classify this error for display
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Superseded(_) => ErrorKind::Validation,
            Self::Service { source, .. } => match source {
                ServiceError::Transport(_) => ErrorKind::Transport,
                ServiceError::RemoteRejected { .. } => ErrorKind::RemoteRejected,
                ServiceError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            },
        }
    }

    /// Whether this is a rejected stage transition
    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            Self::Validation(ValidationError::InvalidTransition { .. })
        )
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the remote service
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Error from a pipeline action
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
