/*!
 * Client side of the remote deck service.
 *
 * This module contains the `DeckService` trait, one async method per remote
 * operation, and its implementations:
 * - `http`: reqwest client speaking the service's REST API
 * - `mock`: scripted in-memory double for tests
 *
 * Implementations never retry, back off or cache. Failures are returned
 * unchanged to the pipeline engine.
 */

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;

use crate::errors::ServiceError;
use crate::language_utils::TargetLanguage;
use crate::pipeline::models::{AnalysisResult, DeckId, ExportOptions, JobId, SubtitleFile};

pub mod http;
pub mod mock;

/// Authentication capability attached to every request
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

// Keep tokens out of logs
impl Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential").field("token", &"***").finish()
    }
}

/// Acknowledgement returned when an analysis is triggered
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AnalysisAck {
    #[serde(default)]
    pub job_id: Option<String>,
    /// Service-side processing statistics, opaque to the client
    #[serde(default)]
    pub stats: Option<Value>,
}

/// Deck build parameters chosen by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckRequest {
    pub job_id: JobId,
    pub deck_name: String,
    pub target_language: TargetLanguage,
}

/// Export parameters for an existing deck
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub job_id: JobId,
    pub deck_id: DeckId,
    pub options: ExportOptions,
}

/// Raw export body as returned by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    pub content: Bytes,
    pub content_type: Option<String>,
}

/// Wire body of `POST /deck`
#[derive(Debug, Clone, Serialize)]
pub struct CreateDeckBody<'a> {
    pub job_id: &'a str,
    pub deck_name: &'a str,
    pub target_lang_tag: &'a str,
    pub build_version: &'a str,
}

/// Wire body of the export request
#[derive(Debug, Clone, Serialize)]
pub struct ExportDeckBody<'a> {
    pub deck_id: &'a DeckId,
    pub output_format: &'a str,
    pub export_options: ExportOptions,
}

/// Remote operations the pipeline depends on
///
/// Each method maps to exactly one HTTP exchange.
#[async_trait]
pub trait DeckService: Send + Sync + Debug {
    /// Upload a subtitle file and register a new job
    async fn create_job(&self, file: &SubtitleFile, episode_label: &str) -> Result<JobId, ServiceError>;

    /// Ask the service to analyse a job
    async fn trigger_analysis(&self, job_id: &JobId) -> Result<AnalysisAck, ServiceError>;

    /// Retrieve the finished analysis of a job
    async fn fetch_analysis(&self, job_id: &JobId) -> Result<AnalysisResult, ServiceError>;

    /// Build a deck from an analysed job
    async fn create_deck(&self, request: &DeckRequest) -> Result<DeckId, ServiceError>;

    /// Render a deck into a downloadable file
    async fn export_deck(&self, request: &ExportRequest) -> Result<ExportPayload, ServiceError>;
}
