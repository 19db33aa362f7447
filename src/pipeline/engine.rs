/*!
 * Pipeline orchestration.
 *
 * `PipelineEngine` owns the `PipelineState`, validates each user action
 * against it, sequences the calls to the `DeckService` and publishes a
 * snapshot to observers after every change.
 *
 * The state lock is never held across an `.await`. Every accepted action
 * remembers the state generation it started in; when its remote call
 * resolves after a `reset()`, the result is dropped and the caller gets
 * `PipelineError::Superseded`.
 */

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

use crate::errors::{PipelineAction, PipelineError, ValidationError};
use crate::language_utils::TargetLanguage;
use crate::service::{DeckRequest, DeckService, ExportRequest};
use super::models::{
    export_file_name, AnalysisResult, Deck, ExportArtifact, ExportOptions, Job, JobId, SubtitleFile,
};
use super::state::{
    AnalysisPhase, ErrorInfo, InFlight, PipelineSnapshot, PipelineStage, PipelineState, Step,
    StepStatus,
};

/// Orchestrates one pipeline instance against a deck service
pub struct PipelineEngine {
    service: Arc<dyn DeckService>,
    state: Mutex<PipelineState>,
    updates: watch::Sender<PipelineSnapshot>,
}

impl std::fmt::Debug for PipelineEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineEngine")
            .field("service", &self.service)
            .field("stage", &self.stage())
            .finish()
    }
}

impl PipelineEngine {
    pub fn new(service: Arc<dyn DeckService>) -> Self {
        let state = PipelineState::new();
        let (updates, _) = watch::channel(state.snapshot());
        Self {
            service,
            state: Mutex::new(state),
            updates,
        }
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    pub fn stage(&self) -> PipelineStage {
        self.state.lock().current_stage()
    }

    pub fn status_of(&self, step: Step) -> StepStatus {
        self.state.lock().status_of(step)
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.state.lock().snapshot()
    }

    /// Receive a fresh snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<PipelineSnapshot> {
        self.updates.subscribe()
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Upload a subtitle file and create the job
    pub async fn submit_upload(
        &self,
        file: Option<SubtitleFile>,
        episode_label: &str,
    ) -> Result<JobId, PipelineError> {
        let action = PipelineAction::SubmitUpload;
        let (generation, (file, label)) = self.begin(
            action,
            |state| {
                if state.job.is_some() {
                    return Err(invalid(action, state));
                }
                let file = file.ok_or(ValidationError::MissingFile)?;
                if file.content.is_empty() {
                    return Err(ValidationError::EmptyFile(file.name.clone()));
                }
                if !file.has_subtitle_extension() {
                    return Err(ValidationError::UnsupportedFileType(file.name.clone()));
                }
                let label = episode_label.trim();
                if label.is_empty() {
                    return Err(ValidationError::EmptyEpisodeLabel);
                }
                Ok((file, label.to_string()))
            },
            |flags| flags.creating_job = true,
        )?;

        debug!("Creating job for '{}' ({})", label, file.name);
        let outcome = self
            .service
            .create_job(&file, &label)
            .await
            .map_err(|e| PipelineError::service(action, e));

        self.complete(
            action,
            generation,
            outcome,
            |flags| flags.creating_job = false,
            move |state, job_id| {
                info!("Job {} created for '{}'", job_id, label);
                state.job = Some(Job {
                    id: job_id.clone(),
                    source_file: file,
                    episode_label: label,
                });
                job_id
            },
        )
    }

    /// Trigger the analysis of the current job, then fetch its result
    ///
    /// A failure in either phase leaves the analysis absent; the whole
    /// action must be re-run, which triggers the analysis again.
    pub async fn run_analysis(&self) -> Result<AnalysisResult, PipelineError> {
        let action = PipelineAction::RunAnalysis;
        let (generation, job_id) = self.begin(
            action,
            |state| match (&state.job, &state.analysis) {
                (Some(job), None) => Ok(job.id.clone()),
                _ => Err(invalid(action, state)),
            },
            |flags| flags.running_analysis = true,
        )?;

        debug!("Triggering analysis for job {}", job_id);
        if let Err(e) = self.service.trigger_analysis(&job_id).await {
            let error = PipelineError::analysis_phase(AnalysisPhase::Trigger, e);
            return Err(self.fail(action, generation, error, |flags| {
                flags.running_analysis = false
            }));
        }

        self.enter_fetch_phase(generation)?;

        debug!("Fetching analysis for job {}", job_id);
        let outcome = self
            .service
            .fetch_analysis(&job_id)
            .await
            .map_err(|e| PipelineError::analysis_phase(AnalysisPhase::Fetch, e));

        self.complete(
            action,
            generation,
            outcome,
            |flags| flags.fetching_analysis = false,
            |state, analysis| {
                info!("Analysis ready for job {}: {}", job_id, analysis.stats());
                state.analysis = Some(analysis.clone());
                analysis
            },
        )
    }

    /// Build the deck for the analysed job
    pub async fn create_deck(&self, target_language_tag: &str) -> Result<Deck, PipelineError> {
        let action = PipelineAction::CreateDeck;
        let (generation, request) = self.begin(
            action,
            |state| {
                let job = match (&state.job, &state.analysis, &state.deck) {
                    (Some(job), Some(_), None) => job,
                    _ => return Err(invalid(action, state)),
                };
                let target_language = TargetLanguage::parse(target_language_tag)?;
                Ok(DeckRequest {
                    job_id: job.id.clone(),
                    deck_name: job.episode_label.clone(),
                    target_language,
                })
            },
            |flags| flags.creating_deck = true,
        )?;

        debug!("Creating {} deck for job {}", request.target_language, request.job_id);
        let outcome = self
            .service
            .create_deck(&request)
            .await
            .map_err(|e| PipelineError::service(action, e));

        self.complete(
            action,
            generation,
            outcome,
            |flags| flags.creating_deck = false,
            |state, deck_id| {
                info!("Deck {} created ({})", deck_id, request.target_language);
                let deck = Deck {
                    id: deck_id,
                    target_language: request.target_language,
                };
                state.deck = Some(deck.clone());
                deck
            },
        )
    }

    /// Export the deck; never changes the stage and may be repeated
    pub async fn export_deck(&self, options: ExportOptions) -> Result<ExportArtifact, PipelineError> {
        let action = PipelineAction::ExportDeck;
        let (generation, (request, file_name)) = self.begin(
            action,
            |state| match (&state.job, &state.deck) {
                (Some(job), Some(deck)) if !state.in_flight.exporting => Ok((
                    ExportRequest {
                        job_id: job.id.clone(),
                        deck_id: deck.id.clone(),
                        options,
                    },
                    export_file_name(&job.episode_label),
                )),
                _ => Err(invalid(action, state)),
            },
            |flags| flags.exporting = true,
        )?;

        debug!("Exporting deck {} (include_sentence={})", request.deck_id, options.include_sentence);
        let outcome = self
            .service
            .export_deck(&request)
            .await
            .map_err(|e| PipelineError::service(action, e));

        self.complete(
            action,
            generation,
            outcome,
            |flags| flags.exporting = false,
            |_, payload| {
                info!("Exported {} bytes as {}", payload.content.len(), file_name);
                ExportArtifact {
                    content: payload.content,
                    options,
                    file_name,
                    content_type: payload.content_type,
                }
            },
        )
    }

    /// Discard every artifact and return to `NotStarted`
    ///
    /// Outstanding calls are not cancelled; their results are dropped when
    /// they arrive.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        if state.in_flight.any() {
            warn!("Resetting pipeline with calls in flight; their results will be discarded");
        }
        state.clear();
        info!("Pipeline reset");
        self.publish(&state);
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Validate and accept an action
    ///
    /// On success the last error is cleared, the action's in-flight flag is
    /// raised and the current generation is returned with the guard's value.
    fn begin<T>(
        &self,
        action: PipelineAction,
        guard: impl FnOnce(&PipelineState) -> Result<T, ValidationError>,
        raise: impl FnOnce(&mut InFlight),
    ) -> Result<(u64, T), PipelineError> {
        let mut state = self.state.lock();

        let checked = if state.in_flight.stage_transition_pending() && action != PipelineAction::ExportDeck {
            Err(invalid(action, &state))
        } else {
            guard(&state)
        };

        match checked {
            Ok(value) => {
                state.last_error = None;
                raise(&mut state.in_flight);
                self.publish(&state);
                Ok((state.generation, value))
            }
            Err(validation) => {
                let error = PipelineError::Validation(validation);
                warn!("Rejected {}: {}", action, error);
                state.last_error = Some(ErrorInfo::from_error(action, &error));
                self.publish(&state);
                Err(error)
            }
        }
    }

    /// Switch `run_analysis` from its trigger to its fetch phase
    fn enter_fetch_phase(&self, generation: u64) -> Result<(), PipelineError> {
        let mut state = self.state.lock();
        if state.generation != generation {
            warn!("Analysis trigger finished after a reset; stopping");
            return Err(PipelineError::Superseded(PipelineAction::RunAnalysis));
        }
        state.in_flight.running_analysis = false;
        state.in_flight.fetching_analysis = true;
        self.publish(&state);
        Ok(())
    }

    /// Apply the outcome of a remote call, unless the pipeline was reset meanwhile
    ///
    /// A success clears `last_error`.
    fn complete<T, V>(
        &self,
        action: PipelineAction,
        generation: u64,
        outcome: Result<T, PipelineError>,
        lower: impl FnOnce(&mut InFlight),
        apply: impl FnOnce(&mut PipelineState, T) -> V,
    ) -> Result<V, PipelineError> {
        let value = match outcome {
            Ok(value) => value,
            Err(error) => return Err(self.fail(action, generation, error, lower)),
        };

        let mut state = self.state.lock();
        if state.generation != generation {
            warn!("Discarding {} result: pipeline was reset while it was in flight", action);
            return Err(PipelineError::Superseded(action));
        }
        lower(&mut state.in_flight);
        // Rejections raised while this call was in flight are moot now
        state.last_error = None;
        let result = apply(&mut state, value);
        self.publish(&state);
        Ok(result)
    }

    /// Record a failed remote call, unless the pipeline was reset meanwhile
    fn fail(
        &self,
        action: PipelineAction,
        generation: u64,
        error: PipelineError,
        lower: impl FnOnce(&mut InFlight),
    ) -> PipelineError {
        let mut state = self.state.lock();
        if state.generation != generation {
            warn!("Discarding {} failure: pipeline was reset while it was in flight", action);
            return PipelineError::Superseded(action);
        }
        error!("{}", error);
        lower(&mut state.in_flight);
        state.last_error = Some(ErrorInfo::from_error(action, &error));
        self.publish(&state);
        error
    }

    fn publish(&self, state: &PipelineState) {
        self.updates.send_replace(state.snapshot());
    }
}

fn invalid(action: PipelineAction, state: &PipelineState) -> ValidationError {
    ValidationError::InvalidTransition {
        action,
        stage: state.current_stage(),
    }
}
