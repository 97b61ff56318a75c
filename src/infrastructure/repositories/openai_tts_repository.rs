use super::tts_repository::{SynthesisError, TtsRepository};
use crate::domain::tts::{openai_cohost_voice_for_language, openai_voice_for_language, LanguageCode};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{CreateSpeechRequest, SpeechModel, Voice},
    Client,
};
use async_trait::async_trait;
use std::sync::Arc;

/// OpenAI has a limit of 4096 characters per request
const MAX_PAYLOAD_BYTES: usize = 4096;

/// OpenAI TTS implementation of TTS repository
pub struct OpenAiTtsRepository {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
    default_voice: String,
}

impl OpenAiTtsRepository {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: String, default_voice: String) -> Self {
        Self {
            client,
            model,
            default_voice,
        }
    }

    /// First requested voice, then the configured default, then the language default
    fn select_voice(&self, voices: &[String], language: LanguageCode) -> String {
        voices
            .iter()
            .find(|v| !v.trim().is_empty())
            .cloned()
            .or_else(|| {
                (!self.default_voice.is_empty()).then(|| self.default_voice.clone())
            })
            .unwrap_or_else(|| openai_voice_for_language(language).to_string())
    }

    fn speech_model(&self) -> SpeechModel {
        match self.model.as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        }
    }
}

fn parse_voice(voice: &str) -> Result<Voice, SynthesisError> {
    match voice.to_lowercase().as_str() {
        "alloy" => Ok(Voice::Alloy),
        "echo" => Ok(Voice::Echo),
        "fable" => Ok(Voice::Fable),
        "onyx" => Ok(Voice::Onyx),
        "nova" => Ok(Voice::Nova),
        "shimmer" => Ok(Voice::Shimmer),
        other => Err(SynthesisError::MalformedRequest(format!(
            "unknown OpenAI voice '{}'",
            other
        ))),
    }
}

/// Map an OpenAI error onto the retry classes
fn classify_error(error: OpenAIError) -> SynthesisError {
    match error {
        OpenAIError::ApiError(api_error) => {
            let kind = format!("{:?} {:?}", api_error.r#type, api_error.code).to_lowercase();
            if kind.contains("rate_limit") || kind.contains("insufficient_quota") {
                SynthesisError::QuotaExceeded(api_error.message)
            } else if kind.contains("invalid_request") {
                SynthesisError::MalformedRequest(api_error.message)
            } else {
                SynthesisError::Transient(api_error.message)
            }
        }
        OpenAIError::InvalidArgument(message) => SynthesisError::MalformedRequest(message),
        other => SynthesisError::Transient(other.to_string()),
    }
}

#[async_trait]
impl TtsRepository for OpenAiTtsRepository {
    async fn synthesize(
        &self,
        text: &str,
        voices: &[String],
        language: LanguageCode,
    ) -> Result<Vec<u8>, SynthesisError> {
        let start_time = std::time::Instant::now();
        let voice = self.select_voice(voices, language);

        if text.len() > MAX_PAYLOAD_BYTES {
            return Err(SynthesisError::MalformedRequest(format!(
                "chunk of {} bytes exceeds the {} byte limit",
                text.len(),
                MAX_PAYLOAD_BYTES
            )));
        }

        let request = CreateSpeechRequest {
            model: self.speech_model(),
            input: text.to_string(),
            voice: parse_voice(&voice)?,
            response_format: None, // Defaults to MP3
            speed: None,           // Defaults to 1.0
        };

        let response = self.client.audio().speech(request).await.map_err(|e| {
            tracing::error!(
                error = %e,
                model = %self.model,
                voice = %voice,
                text_length = text.len(),
                "OpenAI TTS API call failed"
            );
            classify_error(e)
        })?;

        let audio_bytes = response.bytes.to_vec();

        tracing::debug!(
            provider = "openai",
            model = %self.model,
            voice = %voice,
            language = %language,
            latency_ms = start_time.elapsed().as_millis() as u64,
            characters_count = text.len(),
            audio_size_bytes = audio_bytes.len(),
            "TTS chunk synthesized"
        );

        Ok(audio_bytes)
    }

    fn cohost_voice(&self, language: LanguageCode) -> String {
        openai_cohost_voice_for_language(language).to_string()
    }

    fn max_payload_bytes(&self) -> usize {
        MAX_PAYLOAD_BYTES
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
