use anyhow::{anyhow, Context, Result};
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use url::Url;

use crate::language_utils::TargetLanguage;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Remote deck service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Target language tag used when none is given on the command line
    #[serde(default = "default_target_language")]
    pub default_target_language: String,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Which endpoint builds decks
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeckRoute {
    /// `POST /deck`
    #[default]
    Global,
    /// `POST /jobs/{job_id}/deck`
    PerJob,
}

/// Remote deck service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceConfig {
    /// Base URL every endpoint path is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Deck creation endpoint variant
    #[serde(default)]
    pub deck_route: DeckRoute,

    /// Content-selection version sent with each deck build
    #[serde(default = "default_build_version")]
    pub build_version: String,

    /// Export format requested from the service
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Bearer token for the service (empty = anonymous)
    #[serde(default = "String::new")]
    pub auth_token: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            deck_route: DeckRoute::default(),
            build_version: default_build_version(),
            output_format: default_output_format(),
            auth_token: String::new(),
        }
    }
}

impl ServiceConfig {
    /// Parse and check the base URL
    pub fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(self.base_url.trim())
            .with_context(|| format!("Invalid service base URL: {}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(anyhow!("Service base URL must be an http(s) URL: {}", self.base_url));
        }
        Ok(url)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_build_version() -> String {
    "v1".to_string()
}

fn default_output_format() -> String {
    "quizlet".to_string()
}

fn default_target_language() -> String {
    TargetLanguage::default().tag().to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        self.service.parsed_base_url()?;

        if self.service.build_version.trim().is_empty() {
            return Err(anyhow!("Build version must not be empty"));
        }

        if self.service.output_format.trim().is_empty() {
            return Err(anyhow!("Output format must not be empty"));
        }

        self.target_language()?;

        Ok(())
    }

    /// The configured default target language
    pub fn target_language(&self) -> Result<TargetLanguage> {
        TargetLanguage::parse(&self.default_target_language)
            .map_err(|e| anyhow!("Invalid default target language: {}", e))
    }

    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load a configuration file, writing the defaults first if it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;
        Ok(config)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            service: ServiceConfig::default(),
            default_target_language: default_target_language(),
            log_level: LogLevel::default(),
        }
    }
}
