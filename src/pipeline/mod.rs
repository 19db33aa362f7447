/*!
 * The four-stage subtitle → flashcard pipeline.
 *
 * - `models`: job, analysis, deck and export artifacts
 * - `state`: passive pipeline state with its stage and step-status derivations
 * - `engine`: the orchestrator that validates actions and drives the service
 */

pub mod engine;
pub mod models;
pub mod state;

pub use engine::PipelineEngine;
pub use models::{
    AnalysisResult, AnalysisStats, Deck, DeckId, ExportArtifact, ExportOptions, Job, JobId,
    SubtitleFile,
};
pub use state::{
    AnalysisPhase, ErrorInfo, InFlight, PipelineSnapshot, PipelineStage, PipelineState, Step,
    StepStatus,
};
