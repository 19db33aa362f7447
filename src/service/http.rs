use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, error};
use reqwest::{header, multipart, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::app_config::{DeckRoute, ServiceConfig};
use crate::errors::ServiceError;
use crate::pipeline::models::{AnalysisResult, DeckId, JobId, SubtitleFile};
use super::{
    AnalysisAck, CreateDeckBody, Credential, DeckRequest, DeckService, ExportDeckBody,
    ExportPayload, ExportRequest,
};

/// Response of `POST /jobs`
#[derive(Debug, Deserialize)]
struct CreateJobResponse {
    job_id: String,
}

/// Response of deck creation
#[derive(Debug, Deserialize)]
struct CreateDeckResponse {
    deck_id: DeckId,
}

/// HTTP client for the deck service REST API
pub struct HttpDeckService {
    /// HTTP client for API requests
    client: Client,
    /// Base URL every endpoint is appended to
    base_url: Url,
    /// Optional credential sent as a bearer token
    credential: Option<Credential>,
    deck_route: DeckRoute,
    build_version: String,
    output_format: String,
}

impl std::fmt::Debug for HttpDeckService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDeckService")
            .field("base_url", &self.base_url.as_str())
            .field("credential", &self.credential)
            .field("deck_route", &self.deck_route)
            .finish()
    }
}

impl HttpDeckService {
    /// Create a new client from the service configuration
    ///
    /// Requests carry no timeout: an outstanding call is only ever abandoned
    /// by resetting the pipeline.
    pub fn new(config: &ServiceConfig, credential: Option<Credential>) -> Result<Self> {
        let base_url = config.parsed_base_url()?;
        Ok(Self {
            client: Client::builder().build().unwrap_or_default(),
            base_url,
            credential,
            deck_route: config.deck_route,
            build_version: config.build_version.clone(),
            output_format: config.output_format.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append escaped path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // parsed_base_url() already rejected cannot-be-a-base URLs
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credential {
            Some(credential) => request.bearer_auth(credential.token()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, ServiceError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(format!("Failed to {}: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Deck service error while trying to {} ({}): {}", what, status, body);
            return Err(ServiceError::RemoteRejected {
                status_code: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn body(response: Response, what: &str) -> Result<Bytes, ServiceError> {
        response
            .bytes()
            .await
            .map_err(|e| ServiceError::Transport(format!("Failed to read {} response: {}", what, e)))
    }

    async fn json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ServiceError> {
        let body = Self::body(response, what).await?;
        serde_json::from_slice(&body).map_err(|e| {
            error!("Failed to parse {} response: {}", what, e);
            ServiceError::MalformedResponse(format!("Failed to parse {} response: {}", what, e))
        })
    }
}

#[async_trait]
impl DeckService for HttpDeckService {
    async fn create_job(&self, file: &SubtitleFile, episode_label: &str) -> Result<JobId, ServiceError> {
        let url = self.endpoint(&["jobs"]);
        debug!("POST {} ({}, {} bytes)", url, file.name, file.content.len());

        let part = multipart::Part::bytes(file.content.to_vec()).file_name(file.name.clone());
        let form = multipart::Form::new()
            .part("file", part)
            .text("episode_name", episode_label.to_string());

        let response = self
            .send(self.client.post(url).multipart(form), "create job")
            .await?;
        let created: CreateJobResponse = Self::json(response, "create job").await?;

        if created.job_id.trim().is_empty() {
            return Err(ServiceError::MalformedResponse(
                "Create job response contained an empty job_id".to_string(),
            ));
        }
        Ok(JobId(created.job_id))
    }

    async fn trigger_analysis(&self, job_id: &JobId) -> Result<AnalysisAck, ServiceError> {
        let url = self.endpoint(&["jobs", job_id.as_str(), "manual"]);
        debug!("POST {}", url);

        let response = self.send(self.client.post(url), "trigger analysis").await?;
        let body = Self::body(response, "trigger analysis").await?;

        // Acknowledgement only; an empty body is fine
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(AnalysisAck::default());
        }
        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            ServiceError::MalformedResponse(format!("Failed to parse trigger analysis response: {}", e))
        })?;
        match value {
            Value::Null => Ok(AnalysisAck::default()),
            Value::Object(_) => serde_json::from_value(value).map_err(|e| {
                ServiceError::MalformedResponse(format!("Unexpected trigger analysis response: {}", e))
            }),
            other => Err(ServiceError::MalformedResponse(format!(
                "Unexpected trigger analysis response: {}",
                other
            ))),
        }
    }

    async fn fetch_analysis(&self, job_id: &JobId) -> Result<AnalysisResult, ServiceError> {
        let url = self.endpoint(&["jobs", job_id.as_str(), "analysis"]);
        debug!("GET {}", url);

        let response = self.send(self.client.get(url), "fetch analysis").await?;
        Self::json(response, "fetch analysis").await
    }

    async fn create_deck(&self, request: &DeckRequest) -> Result<DeckId, ServiceError> {
        let url = match self.deck_route {
            DeckRoute::Global => self.endpoint(&["deck"]),
            DeckRoute::PerJob => self.endpoint(&["jobs", request.job_id.as_str(), "deck"]),
        };
        debug!("POST {} ({})", url, request.target_language);

        let body = CreateDeckBody {
            job_id: request.job_id.as_str(),
            deck_name: &request.deck_name,
            target_lang_tag: request.target_language.tag(),
            build_version: &self.build_version,
        };
        let response = self
            .send(self.client.post(url).json(&body), "create deck")
            .await?;
        let created: CreateDeckResponse = Self::json(response, "create deck").await?;
        Ok(created.deck_id)
    }

    async fn export_deck(&self, request: &ExportRequest) -> Result<ExportPayload, ServiceError> {
        let url = self.endpoint(&["jobs", request.job_id.as_str(), "deck"]);
        debug!("POST {} (deck {})", url, request.deck_id);

        let body = ExportDeckBody {
            deck_id: &request.deck_id,
            output_format: &self.output_format,
            export_options: request.options,
        };
        let response = self
            .send(self.client.post(url).json(&body), "export deck")
            .await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content = Self::body(response, "export deck").await?;

        Ok(ExportPayload {
            content,
            content_type,
        })
    }
}
