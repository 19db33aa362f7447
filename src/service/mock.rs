/*!
 * Scripted deck service for testing.
 *
 * `MockDeckService` answers every operation with a default success unless a
 * reply has been queued for it:
 * - `MockDeckService::new()` - every call succeeds
 * - `fail_next(op, error)` - the next call to `op` fails with `error`
 * - `hold(op)` - the next call to `op` blocks until the returned gate opens
 *
 * Clones share their script and call log.
 */

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

use crate::errors::ServiceError;
use crate::pipeline::models::{AnalysisResult, DeckId, JobId, SubtitleFile};
use super::{AnalysisAck, DeckRequest, DeckService, ExportPayload, ExportRequest};

/// The remote operations, for scripting and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    CreateJob,
    TriggerAnalysis,
    FetchAnalysis,
    CreateDeck,
    ExportDeck,
}

/// A recorded call with the arguments that matter for assertions
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    CreateJob { file_name: String, episode_label: String },
    TriggerAnalysis(JobId),
    FetchAnalysis(JobId),
    CreateDeck(DeckRequest),
    ExportDeck(ExportRequest),
}

impl RecordedCall {
    fn operation(&self) -> MockOperation {
        match self {
            Self::CreateJob { .. } => MockOperation::CreateJob,
            Self::TriggerAnalysis(_) => MockOperation::TriggerAnalysis,
            Self::FetchAnalysis(_) => MockOperation::FetchAnalysis,
            Self::CreateDeck(_) => MockOperation::CreateDeck,
            Self::ExportDeck(_) => MockOperation::ExportDeck,
        }
    }
}

/// Handle on a held call
///
/// The held call signals `entered` once it has been issued, then waits
/// until `release` is called.
#[derive(Debug, Clone)]
pub struct MockGate {
    entered: Arc<Notify>,
    release: Arc<Semaphore>,
}

impl MockGate {
    fn new() -> Self {
        Self {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Semaphore::new(0)),
        }
    }

    /// Wait until the held call has been issued
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the held call complete
    pub fn release(&self) {
        self.release.add_permits(1);
    }

    async fn pass(&self) {
        self.entered.notify_one();
        if let Ok(permit) = self.release.acquire().await {
            permit.forget();
        }
    }
}

#[derive(Debug)]
enum Scripted {
    Fail(ServiceError),
    Hold(MockGate),
}

#[derive(Debug, Default)]
struct Script {
    replies: HashMap<MockOperation, VecDeque<Scripted>>,
    calls: Vec<RecordedCall>,
    analysis: Option<Value>,
    job_counter: usize,
}

/// Mock deck service for testing pipeline behavior
#[derive(Debug, Clone, Default)]
pub struct MockDeckService {
    script: Arc<Mutex<Script>>,
}

impl MockDeckService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `analysis` as the body returned by `fetch_analysis`
    pub fn with_analysis(self, analysis: Value) -> Self {
        self.script.lock().analysis = Some(analysis);
        self
    }

    /// Make the next call to `op` fail
    pub fn fail_next(&self, op: MockOperation, error: ServiceError) {
        self.push(op, Scripted::Fail(error));
    }

    /// Block the next call to `op` until the gate is released
    pub fn hold(&self, op: MockOperation) -> MockGate {
        let gate = MockGate::new();
        self.push(op, Scripted::Hold(gate.clone()));
        gate
    }

    /// Number of calls made to `op`
    pub fn calls(&self, op: MockOperation) -> usize {
        self.script
            .lock()
            .calls
            .iter()
            .filter(|call| call.operation() == op)
            .count()
    }

    /// Total number of remote calls made
    pub fn total_calls(&self) -> usize {
        self.script.lock().calls.len()
    }

    /// All recorded calls, in order
    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.script.lock().calls.clone()
    }

    /// A default analysis body with `words` items
    pub fn sample_analysis(words: usize) -> Value {
        let words: Vec<Value> = (0..words)
            .map(|i| json!({"lemma": format!("ord{}", i), "count": i + 1}))
            .collect();
        json!({
            "words": words,
            "phrases": [],
            "sentences": [],
        })
    }

    fn push(&self, op: MockOperation, scripted: Scripted) {
        self.script
            .lock()
            .replies
            .entry(op)
            .or_default()
            .push_back(scripted);
    }

    /// Record the call and play its scripted reply, if any
    async fn play(&self, call: RecordedCall) -> Result<(), ServiceError> {
        let op = call.operation();
        let scripted = {
            let mut script = self.script.lock();
            script.calls.push(call);
            script.replies.get_mut(&op).and_then(VecDeque::pop_front)
        };

        match scripted {
            Some(Scripted::Fail(error)) => Err(error),
            Some(Scripted::Hold(gate)) => {
                gate.pass().await;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DeckService for MockDeckService {
    async fn create_job(&self, file: &SubtitleFile, episode_label: &str) -> Result<JobId, ServiceError> {
        self.play(RecordedCall::CreateJob {
            file_name: file.name.clone(),
            episode_label: episode_label.to_string(),
        })
        .await?;

        let mut script = self.script.lock();
        script.job_counter += 1;
        Ok(JobId(format!("job-{}", script.job_counter)))
    }

    async fn trigger_analysis(&self, job_id: &JobId) -> Result<AnalysisAck, ServiceError> {
        self.play(RecordedCall::TriggerAnalysis(job_id.clone())).await?;
        Ok(AnalysisAck {
            job_id: Some(job_id.to_string()),
            stats: None,
        })
    }

    async fn fetch_analysis(&self, job_id: &JobId) -> Result<AnalysisResult, ServiceError> {
        self.play(RecordedCall::FetchAnalysis(job_id.clone())).await?;

        let body = self
            .script
            .lock()
            .analysis
            .clone()
            .unwrap_or_else(|| Self::sample_analysis(12));
        serde_json::from_value(body).map_err(|e| ServiceError::MalformedResponse(e.to_string()))
    }

    async fn create_deck(&self, request: &DeckRequest) -> Result<DeckId, ServiceError> {
        self.play(RecordedCall::CreateDeck(request.clone())).await?;
        Ok(DeckId::Number(1))
    }

    async fn export_deck(&self, request: &ExportRequest) -> Result<ExportPayload, ServiceError> {
        self.play(RecordedCall::ExportDeck(request.clone())).await?;

        let tsv: &'static str = if request.options.include_sentence {
            "hus\thouse\tDet är ett hus.\n"
        } else {
            "hus\thouse\n"
        };
        Ok(ExportPayload {
            content: Bytes::from_static(tsv.as_bytes()),
            content_type: Some("text/tab-separated-values; charset=utf-8".to_string()),
        })
    }
}
