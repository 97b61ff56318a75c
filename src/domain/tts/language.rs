use lingua::{Language, LanguageDetectorBuilder};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// ISO 639-1 language codes supported for narration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageCode {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ko")]
    Korean,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "it")]
    Italian,
    #[serde(rename = "pt")]
    Portuguese,
}

impl LanguageCode {
    pub const ALL: [LanguageCode; 7] = [
        LanguageCode::English,
        LanguageCode::Korean,
        LanguageCode::Spanish,
        LanguageCode::French,
        LanguageCode::German,
        LanguageCode::Italian,
        LanguageCode::Portuguese,
    ];

    /// Get the ISO 639-1 code as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::English => "en",
            LanguageCode::Korean => "ko",
            LanguageCode::Spanish => "es",
            LanguageCode::French => "fr",
            LanguageCode::German => "de",
            LanguageCode::Italian => "it",
            LanguageCode::Portuguese => "pt",
        }
    }

    /// English name, used in prompts
    pub fn name(&self) -> &'static str {
        match self {
            LanguageCode::English => "English",
            LanguageCode::Korean => "Korean",
            LanguageCode::Spanish => "Spanish",
            LanguageCode::French => "French",
            LanguageCode::German => "German",
            LanguageCode::Italian => "Italian",
            LanguageCode::Portuguese => "Portuguese",
        }
    }

    /// Convert lingua Language to LanguageCode
    pub fn from_lingua(language: Language) -> Self {
        match language {
            Language::English => LanguageCode::English,
            Language::Korean => LanguageCode::Korean,
            Language::Spanish => LanguageCode::Spanish,
            Language::French => LanguageCode::French,
            Language::German => LanguageCode::German,
            Language::Italian => LanguageCode::Italian,
            Language::Portuguese => LanguageCode::Portuguese,
        }
    }
}

impl FromStr for LanguageCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_lowercase();
        LanguageCode::ALL
            .into_iter()
            .find(|l| l.as_str() == code || l.name().to_lowercase() == code)
            .ok_or_else(|| format!("unsupported language '{}'", s))
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Detect the language of the given text
/// Returns LanguageCode or defaults to English
pub fn detect_language(text: &str) -> LanguageCode {
    let languages = vec![
        Language::English,
        Language::Korean,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Portuguese,
    ];

    let detector = LanguageDetectorBuilder::from_languages(&languages).build();

    match detector.detect_language_of(text) {
        Some(language) => LanguageCode::from_lingua(language),
        None => {
            tracing::warn!("Could not detect language, falling back to English");
            LanguageCode::English
        }
    }
}

/// Default Polly neural voice for a language
pub fn polly_voice_for_language(language: LanguageCode) -> &'static str {
    match language {
        LanguageCode::English => "Joanna",
        LanguageCode::Korean => "Seoyeon",
        LanguageCode::Spanish => "Lupe",
        LanguageCode::French => "Lea",
        LanguageCode::German => "Vicki",
        LanguageCode::Italian => "Bianca",
        LanguageCode::Portuguese => "Ines",
    }
}

/// Default OpenAI voice for a language
pub fn openai_voice_for_language(language: LanguageCode) -> &'static str {
    match language {
        LanguageCode::English => "alloy",
        LanguageCode::Korean => "nova",
        LanguageCode::Spanish => "echo",
        LanguageCode::French => "nova",
        LanguageCode::German => "onyx",
        LanguageCode::Italian => "fable",
        LanguageCode::Portuguese => "shimmer",
    }
}

/// Polly voice for the second radio show host. Languages with a single
/// neural voice reuse it.
pub fn polly_cohost_voice_for_language(language: LanguageCode) -> &'static str {
    match language {
        LanguageCode::English => "Matthew",
        LanguageCode::Korean => "Seoyeon",
        LanguageCode::Spanish => "Pedro",
        LanguageCode::French => "Remi",
        LanguageCode::German => "Daniel",
        LanguageCode::Italian => "Adriano",
        LanguageCode::Portuguese => "Camila",
    }
}

/// OpenAI voice for the second radio show host
pub fn openai_cohost_voice_for_language(language: LanguageCode) -> &'static str {
    match language {
        LanguageCode::English => "onyx",
        LanguageCode::Korean => "echo",
        LanguageCode::Spanish => "nova",
        LanguageCode::French => "onyx",
        LanguageCode::German => "nova",
        LanguageCode::Italian => "onyx",
        LanguageCode::Portuguese => "echo",
    }
}
