#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use persdeck::app_config::{self, Config};
use persdeck::app_controller::{Controller, RunOptions};
use persdeck::service::Credential;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build and export a flashcard deck from a subtitle file
    Run(RunArgs),

    /// Generate shell completions for persdeck
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Subtitle file (.srt) to upload
    #[arg(value_name = "SUBTITLE_FILE")]
    input_file: PathBuf,

    /// Episode name; also used for the exported file name
    #[arg(short, long)]
    episode: String,

    /// Target language tag (DE, EN-GB, EN-US, ES, FR)
    #[arg(short, long)]
    target_lang: Option<String>,

    /// Include an example sentence column in the export
    #[arg(short = 's', long)]
    include_sentence: bool,

    /// Directory the TSV file is written to (defaults to the input file's directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long = "force")]
    force_overwrite: bool,

    /// Configuration file path
    #[arg(short, long = "config", default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Bearer token for the deck service
    #[arg(long, env = "PERSDECK_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,
}

/// persdeck - flashcard decks from subtitles
///
/// Uploads a subtitle file to the deck service, runs the vocabulary analysis,
/// builds a deck for the chosen language and saves it as a TSV file.
#[derive(Parser, Debug)]
#[command(name = "persdeck")]
#[command(version = "0.1.0")]
#[command(about = "Turn subtitle files into flashcard decks")]
#[command(long_about = "persdeck uploads a subtitle file to the deck service and exports the resulting flashcard deck.

EXAMPLES:
    persdeck run ep1.srt -e S01E01                  # Build a deck using default config
    persdeck run ep1.srt -e S01E01 -t DE -s         # German deck with example sentences
    persdeck run ep1.srt -e S01E01 -o decks/ -f     # Write to decks/, overwrite if present
    persdeck completions bash > persdeck.bash       # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Accept everything here; the effective level is set once the config is loaded
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "persdeck", &mut std::io::stdout());
            Ok(())
        }
        Commands::Run(args) => run_pipeline(args).await,
    }
}

async fn run_pipeline(options: RunArgs) -> Result<()> {
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&options.config_path)?;

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
    if let Some(token) = &options.auth_token {
        config.service.auth_token = token.clone();
    }

    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    let credential = match config.service.auth_token.trim() {
        "" => None,
        token => Some(Credential::bearer(token)),
    };

    let output_dir = match &options.output {
        Some(dir) => dir.clone(),
        None => options
            .input_file
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf(),
    };

    let controller = Controller::with_config(config, credential)?;
    let summary = controller
        .run(RunOptions {
            input_file: options.input_file,
            episode_label: options.episode,
            target_language: options.target_lang,
            include_sentence: options.include_sentence,
            output_dir,
            force_overwrite: options.force_overwrite,
        })
        .await?;

    info!("Success: {:?}", summary.output_path);
    Ok(())
}
