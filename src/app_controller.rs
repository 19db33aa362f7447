use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::app_config::Config;
use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::pipeline::models::{
    export_file_name, AnalysisStats, Deck, ExportArtifact, ExportOptions, JobId, SubtitleFile,
};
use crate::pipeline::{PipelineEngine, PipelineSnapshot, PipelineStage};
use crate::service::http::HttpDeckService;
use crate::service::{Credential, DeckService};

// @module: Application controller for the command-line pipeline run

/// Parameters of one pipeline run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input_file: PathBuf,
    pub episode_label: String,
    /// Falls back to the configured default when absent
    pub target_language: Option<String>,
    pub include_sentence: bool,
    pub output_dir: PathBuf,
    pub force_overwrite: bool,
}

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub job_id: JobId,
    pub stats: AnalysisStats,
    pub deck: Deck,
    pub output_path: PathBuf,
    pub elapsed: Duration,
}

/// Spinner plus the task feeding it engine snapshots
struct ProgressSpinner {
    bar: ProgressBar,
    watcher: JoinHandle<()>,
}

impl ProgressSpinner {
    /// Clear the spinner and stop its watcher
    fn finish(&self) {
        self.bar.finish_and_clear();
        self.watcher.abort();
    }
}

/// Drives one pipeline from upload to export for the CLI
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: The single pipeline instance
    engine: Arc<PipelineEngine>,
}

impl Controller {
    // @method: Create a controller talking to the configured HTTP service
    pub fn with_config(config: Config, credential: Option<Credential>) -> Result<Self, AppError> {
        let service = HttpDeckService::new(&config.service, credential)
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(Self::with_service(config, Arc::new(service)))
    }

    // @method: Create a controller around any deck service
    pub fn with_service(config: Config, service: Arc<dyn DeckService>) -> Self {
        Self {
            config,
            engine: Arc::new(PipelineEngine::new(service)),
        }
    }

    pub fn engine(&self) -> &Arc<PipelineEngine> {
        &self.engine
    }

    /// Run the whole pipeline: upload, analyse, build the deck, export it to disk
    pub async fn run(&self, options: RunOptions) -> Result<RunSummary, AppError> {
        let start_time = Instant::now();

        let target_language = match &options.target_language {
            Some(tag) => tag.clone(),
            None => self.config.default_target_language.clone(),
        };

        let planned_output = options.output_dir.join(export_file_name(&options.episode_label));
        if planned_output.exists() && !options.force_overwrite {
            warn!("Skipping run, {:?} already exists (use -f to force overwrite)", planned_output);
            return Err(AppError::File(format!(
                "Output file already exists: {:?}",
                planned_output
            )));
        }

        let file = FileManager::read_subtitle_file(&options.input_file)?;

        let progress = Self::spawn_progress(&self.engine);
        let outcome = self.drive(file, &options, &target_language).await;
        progress.finish();

        let (job_id, stats, deck, artifact) = outcome?;
        let output_path = FileManager::write_artifact(&options.output_dir, &artifact, options.force_overwrite)
            .context("Failed to save exported deck")?;

        let elapsed = start_time.elapsed();
        info!(
            "Deck saved to {:?} in {}.",
            output_path,
            Self::format_duration(elapsed)
        );

        Ok(RunSummary {
            job_id,
            stats,
            deck,
            output_path,
            elapsed,
        })
    }

    async fn drive(
        &self,
        file: SubtitleFile,
        options: &RunOptions,
        target_language: &str,
    ) -> Result<(JobId, AnalysisStats, Deck, ExportArtifact), AppError> {
        let job_id = self.engine.submit_upload(Some(file), &options.episode_label).await?;
        info!("Job created: {}", job_id);

        let analysis = self.engine.run_analysis().await?;
        let stats = analysis.stats();
        for line in stats.lines() {
            info!("{}", line);
        }

        let deck = self.engine.create_deck(target_language).await?;
        info!("Deck created ({})", deck.target_language.display_name());

        let artifact = self
            .engine
            .export_deck(ExportOptions {
                include_sentence: options.include_sentence,
            })
            .await?;

        Ok((job_id, stats, deck, artifact))
    }

    /// Show a spinner that follows the engine's snapshots
    fn spawn_progress(engine: &PipelineEngine) -> ProgressSpinner {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(120));

        let mut updates = engine.subscribe();
        let pb = spinner.clone();
        let watcher = tokio::spawn(async move {
            loop {
                let message = progress_message(&updates.borrow_and_update());
                pb.set_message(message);
                if updates.changed().await.is_err() {
                    break;
                }
            }
        });

        ProgressSpinner {
            bar: spinner,
            watcher,
        }
    }

    // @returns: Human-readable duration
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// Spinner text for a snapshot
pub fn progress_message(snapshot: &PipelineSnapshot) -> String {
    let flags = &snapshot.in_flight;
    if flags.creating_job {
        "Uploading subtitle file…".to_string()
    } else if flags.running_analysis {
        "Analyzing…".to_string()
    } else if flags.fetching_analysis {
        "Fetching results…".to_string()
    } else if flags.creating_deck {
        "Creating flashcard deck…".to_string()
    } else if flags.exporting {
        "Exporting TSV file…".to_string()
    } else {
        match snapshot.stage {
            PipelineStage::NotStarted => "Waiting".to_string(),
            stage => format!("Pipeline {}", stage),
        }
    }
}
