pub mod language;

pub use language::{
    detect_language, openai_cohost_voice_for_language, openai_voice_for_language,
    polly_cohost_voice_for_language, polly_voice_for_language, LanguageCode,
};
