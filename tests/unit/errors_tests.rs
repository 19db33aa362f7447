/*!
 * Tests for error types and conversions
 */

use persdeck::errors::{AppError, ErrorKind, PipelineAction, PipelineError, ServiceError, ValidationError};
use persdeck::pipeline::{AnalysisPhase, PipelineStage};

#[test]
fn test_serviceError_remoteRejected_shouldDisplayStatusAndBody() {
    let error = ServiceError::RemoteRejected {
        status_code: 422,
        body: "{\"detail\":\"bad file\"}".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("422"));
    assert!(display.contains("bad file"));
}

#[test]
fn test_validationError_invalidTransition_shouldNameActionAndStage() {
    let error = ValidationError::InvalidTransition {
        action: PipelineAction::CreateDeck,
        stage: PipelineStage::JobCreated,
    };
    assert_eq!(error.to_string(), "Cannot create deck while the pipeline is job created");
}

#[test]
fn test_pipelineError_kind_shouldFollowServiceError() {
    let transport = PipelineError::Service {
        action: PipelineAction::SubmitUpload,
        phase: None,
        source: ServiceError::Transport("refused".to_string()),
    };
    assert_eq!(transport.kind(), ErrorKind::Transport);

    let malformed = PipelineError::Service {
        action: PipelineAction::RunAnalysis,
        phase: Some(AnalysisPhase::Fetch),
        source: ServiceError::MalformedResponse("not json".to_string()),
    };
    assert_eq!(malformed.kind(), ErrorKind::MalformedResponse);

    let validation: PipelineError = ValidationError::EmptyEpisodeLabel.into();
    assert_eq!(validation.kind(), ErrorKind::Validation);
    assert!(!validation.is_invalid_transition());
}

#[test]
fn test_pipelineError_service_shouldDisplayActionAndCause() {
    let error = PipelineError::Service {
        action: PipelineAction::ExportDeck,
        phase: None,
        source: ServiceError::Transport("connection reset".to_string()),
    };
    let display = error.to_string();
    assert!(display.contains("export deck"));
    assert!(display.contains("connection reset"));
}

#[test]
fn test_appError_fromPipelineError_shouldWrapCorrectly() {
    let app_error: AppError = PipelineError::Superseded(PipelineAction::RunAnalysis).into();
    assert!(matches!(app_error, AppError::Pipeline(PipelineError::Superseded(_))));
    assert!(app_error.to_string().contains("run analysis"));
}

#[test]
fn test_appError_fromIoError_shouldBecomeFileError() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.srt");
    let app_error: AppError = io.into();
    assert!(matches!(app_error, AppError::File(msg) if msg.contains("missing.srt")));
}
