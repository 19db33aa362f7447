/*!
 * Passive pipeline state and its pure derivations.
 *
 * `PipelineState` holds the accumulated artifacts, the last error and the
 * in-flight flags. It never enforces ordering itself; `PipelineEngine` is the
 * only writer and is responsible for setting artifacts in dependency order.
 */

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::{ErrorKind, PipelineAction, PipelineError};
use super::models::{AnalysisResult, Deck, Job};

/// Coarse pipeline position, derived from which artifacts exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    NotStarted,
    JobCreated,
    Analyzed,
    DeckCreated,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::JobCreated => "job created",
            Self::Analyzed => "analyzed",
            Self::DeckCreated => "deck created",
        };
        write!(f, "{}", name)
    }
}

/// The two sub-steps of running an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPhase {
    /// Asking the service to process the job
    Trigger,
    /// Retrieving the finished analysis
    Fetch,
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trigger => write!(f, "trigger"),
            Self::Fetch => write!(f, "fetch"),
        }
    }
}

/// Displayed pipeline steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Upload,
    Analyze,
    CreateDeck,
    Export,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Upload, Step::Analyze, Step::CreateDeck, Step::Export];
}

/// Progress badge state of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Active,
    Loading,
    Completed,
}

/// One flag per asynchronous action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct InFlight {
    pub creating_job: bool,
    pub running_analysis: bool,
    pub fetching_analysis: bool,
    pub creating_deck: bool,
    pub exporting: bool,
}

impl InFlight {
    /// Whether any call that can advance the stage is outstanding
    pub fn stage_transition_pending(&self) -> bool {
        self.creating_job || self.running_analysis || self.fetching_analysis || self.creating_deck
    }

    pub fn any(&self) -> bool {
        self.stage_transition_pending() || self.exporting
    }
}

/// The most recent failure, as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub action: PipelineAction,
    /// Set when a `run_analysis` sub-step failed
    pub phase: Option<AnalysisPhase>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorInfo {
    pub fn from_error(action: PipelineAction, error: &PipelineError) -> Self {
        let phase = match error {
            PipelineError::Service { phase, .. } => *phase,
            _ => None,
        };
        Self {
            kind: error.kind(),
            action,
            phase,
            message: error.to_string(),
            occurred_at: Utc::now(),
        }
    }
}

/// The mutable record owned by `PipelineEngine`
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub job: Option<Job>,
    pub analysis: Option<AnalysisResult>,
    pub deck: Option<Deck>,
    pub last_error: Option<ErrorInfo>,
    pub in_flight: InFlight,
    /// Bumped on every reset; in-flight calls compare it before applying results
    pub generation: u64,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_stage(&self) -> PipelineStage {
        match (&self.job, &self.analysis, &self.deck) {
            (Some(_), Some(_), Some(_)) => PipelineStage::DeckCreated,
            (Some(_), Some(_), None) => PipelineStage::Analyzed,
            (Some(_), None, _) => PipelineStage::JobCreated,
            (None, ..) => PipelineStage::NotStarted,
        }
    }

    pub fn status_of(&self, step: Step) -> StepStatus {
        derive_status(
            step,
            self.job.is_some(),
            self.analysis.is_some(),
            self.deck.is_some(),
            &self.in_flight,
        )
    }

    /// Drop every artifact, the error and all flags; start a new generation
    pub fn clear(&mut self) {
        let generation = self.generation.wrapping_add(1);
        *self = Self {
            generation,
            ..Self::default()
        };
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            stage: self.current_stage(),
            job: self.job.clone(),
            analysis: self.analysis.clone(),
            deck: self.deck.clone(),
            last_error: self.last_error.clone(),
            in_flight: self.in_flight,
        }
    }
}

/// Read-only view handed to presentation layers
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineSnapshot {
    pub stage: PipelineStage,
    pub job: Option<Job>,
    pub analysis: Option<AnalysisResult>,
    pub deck: Option<Deck>,
    pub last_error: Option<ErrorInfo>,
    pub in_flight: InFlight,
}

impl PipelineSnapshot {
    pub fn status_of(&self, step: Step) -> StepStatus {
        derive_status(
            step,
            self.job.is_some(),
            self.analysis.is_some(),
            self.deck.is_some(),
            &self.in_flight,
        )
    }

    /// Step badges for the whole pipeline, in display order
    pub fn step_statuses(&self) -> [(Step, StepStatus); 4] {
        Step::ALL.map(|step| (step, self.status_of(step)))
    }
}

fn derive_status(step: Step, job: bool, analysis: bool, deck: bool, flags: &InFlight) -> StepStatus {
    match step {
        Step::Upload => {
            if job {
                StepStatus::Completed
            } else if flags.creating_job {
                StepStatus::Loading
            } else {
                StepStatus::Active
            }
        }
        Step::Analyze => {
            if analysis {
                StepStatus::Completed
            } else if flags.running_analysis || flags.fetching_analysis {
                StepStatus::Loading
            } else if job {
                StepStatus::Active
            } else {
                StepStatus::Pending
            }
        }
        Step::CreateDeck => {
            if deck {
                StepStatus::Completed
            } else if flags.creating_deck {
                StepStatus::Loading
            } else if analysis {
                StepStatus::Active
            } else {
                StepStatus::Pending
            }
        }
        // Exports are repeatable, so this step never completes
        Step::Export => {
            if flags.exporting {
                StepStatus::Loading
            } else if deck {
                StepStatus::Active
            } else {
                StepStatus::Pending
            }
        }
    }
}
