/*!
 * Pipeline artifacts: the job, its analysis, the deck, and export payloads.
 */

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::language_utils::TargetLanguage;

/// File extension accepted for uploads
pub const SUBTITLE_EXTENSION: &str = ".srt";

/// Export file name used when the episode label yields no usable name
pub const DEFAULT_EXPORT_STEM: &str = "flashcards";

/// An uploaded subtitle file (name + raw bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleFile {
    /// File name as sent in the multipart part
    pub name: String,
    /// Raw file content
    pub content: Bytes,
}

impl SubtitleFile {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Whether the file name carries the .srt extension (case-insensitive)
    pub fn has_subtitle_extension(&self) -> bool {
        self.name.to_lowercase().ends_with(SUBTITLE_EXTENSION)
    }
}

/// Opaque job identifier assigned by the service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One subtitle-analysis task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub source_file: SubtitleFile,
    /// Trimmed, non-empty display name
    pub episode_label: String,
}

/// Linguistic extraction output for a job
///
/// Item shapes belong to the service; only the three well-known lists are
/// pulled out, every other top-level key is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub words: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phrases: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sentences: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl AnalysisResult {
    pub fn stats(&self) -> AnalysisStats {
        AnalysisStats {
            words: self.words.len(),
            phrases: self.phrases.len(),
            sentences: self.sentences.len(),
        }
    }
}

/// Item counts of an analysis, for progress display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AnalysisStats {
    pub words: usize,
    pub phrases: usize,
    pub sentences: usize,
}

impl AnalysisStats {
    /// Labelled non-zero counts, e.g. `["Words: 12", "Sentences: 3"]`
    pub fn lines(&self) -> Vec<String> {
        [
            ("Words", self.words),
            ("Phrases", self.phrases),
            ("Sentences", self.sentences),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(label, count)| format!("{}: {}", label, count))
        .collect()
    }
}

impl std::fmt::Display for AnalysisStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.lines().join(", "))
    }
}

/// Opaque deck identifier, echoed back to the service exactly as received
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeckId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for DeckId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A flashcard deck built from an analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    pub id: DeckId,
    pub target_language: TargetLanguage,
}

/// Per-export options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExportOptions {
    pub include_sentence: bool,
}

/// The downloadable file produced from a deck
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Tab-separated payload
    pub content: Bytes,
    pub options: ExportOptions,
    /// Suggested download name
    pub file_name: String,
    pub content_type: Option<String>,
}

/// Build the suggested export file name from an episode label
pub fn export_file_name(episode_label: &str) -> String {
    let stem: String = episode_label
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim_matches(|c: char| c == '_' || c == '.' || c.is_whitespace());
    if stem.is_empty() {
        format!("{}.tsv", DEFAULT_EXPORT_STEM)
    } else {
        format!("{}.tsv", stem)
    }
}
