/*!
 * # persdeck - subtitle to flashcard deck pipeline
 *
 * A Rust library and CLI that turns an episode's subtitle file into a
 * flashcard deck by driving a remote analysis service.
 *
 * ## Features
 *
 * - Upload an .srt file as a new job for one episode
 * - Run the vocabulary analysis and fetch its word, phrase and sentence items
 * - Build a deck for a target language (DE, EN-GB, EN-US, ES, FR)
 * - Export the deck as a TSV file, optionally with example sentences
 * - Reset at any time; late results from abandoned calls are discarded
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `pipeline`: the pipeline state machine:
 *   - `pipeline::models`: jobs, analysis results, decks and export artifacts
 *   - `pipeline::state`: stage and per-step status derivation
 *   - `pipeline::engine`: the orchestrator that validates and runs actions
 * - `service`: the remote deck service contract:
 *   - `service::http`: REST client over reqwest
 *   - `service::mock`: scripted service for tests
 * - `app_config`: Configuration management
 * - `app_controller`: Runs a whole pipeline for the command line
 * - `file_utils`: File system operations
 * - `language_utils`: Target language tags
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod pipeline;
pub mod service;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, RunOptions, RunSummary};
pub use errors::{AppError, PipelineAction, PipelineError, ServiceError, ValidationError};
pub use language_utils::TargetLanguage;
pub use pipeline::{PipelineEngine, PipelineSnapshot, PipelineStage, Step, StepStatus};
pub use service::DeckService;
