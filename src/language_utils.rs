use isolang::Language;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::ValidationError;

/// Deck target language utilities
///
/// The deck service translates cards into a fixed set of target languages,
/// identified by uppercase BCP-47-like tags (`EN-US`, `DE`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetLanguage {
    #[serde(rename = "DE")]
    De,
    #[serde(rename = "EN-GB")]
    EnGb,
    #[default]
    #[serde(rename = "EN-US")]
    EnUs,
    #[serde(rename = "ES")]
    Es,
    #[serde(rename = "FR")]
    Fr,
}

impl TargetLanguage {
    /// All supported target languages, in display order
    pub const ALL: [TargetLanguage; 5] = [
        TargetLanguage::De,
        TargetLanguage::EnGb,
        TargetLanguage::EnUs,
        TargetLanguage::Es,
        TargetLanguage::Fr,
    ];

    /// The wire tag sent as `target_lang_tag`
    pub fn tag(&self) -> &'static str {
        match self {
            Self::De => "DE",
            Self::EnGb => "EN-GB",
            Self::EnUs => "EN-US",
            Self::Es => "ES",
            Self::Fr => "FR",
        }
    }

    /// ISO 639-1 code of the base language
    pub fn iso_639_1(&self) -> &'static str {
        match self {
            Self::De => "de",
            Self::EnGb | Self::EnUs => "en",
            Self::Es => "es",
            Self::Fr => "fr",
        }
    }

    /// English display name, e.g. "English (GB)"
    pub fn display_name(&self) -> String {
        let base = Language::from_639_1(self.iso_639_1())
            .map(|l| l.to_name())
            .unwrap_or("Unknown");
        let region = self.tag().rsplit('-').next().unwrap_or(self.tag());
        format!("{} ({})", base, region)
    }

    /// Parse a user-supplied tag
    ///
    /// Surrounding whitespace and letter case are ignored, `_` is accepted in
    /// place of `-`. Anything else outside the supported set is rejected.
    pub fn parse(tag: &str) -> Result<Self, ValidationError> {
        let normalized = tag.trim().to_uppercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|lang| lang.tag() == normalized)
            .ok_or_else(|| ValidationError::InvalidLanguageTag(tag.to_string()))
    }
}

impl std::fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for TargetLanguage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
