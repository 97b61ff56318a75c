use super::tts_repository::{SynthesisError, TtsRepository};
use crate::domain::tts::{polly_cohost_voice_for_language, polly_voice_for_language, LanguageCode};
use async_trait::async_trait;
use aws_sdk_polly::{
    error::{ProvideErrorMetadata, SdkError},
    types::{Engine, OutputFormat, VoiceId},
    Client as PollyClient,
};
use std::sync::Arc;

/// AWS Polly has a limit of 3000 characters per request
const MAX_PAYLOAD_BYTES: usize = 3000;

const QUOTA_CODES: &[&str] = &[
    "ThrottlingException",
    "TooManyRequestsException",
    "LimitExceededException",
];

const MALFORMED_CODES: &[&str] = &[
    "TextLengthExceededException",
    "InvalidSsmlException",
    "InvalidSampleRateException",
    "LanguageNotSupportedException",
    "EngineNotSupportedException",
    "LexiconNotFoundException",
    "MarksNotSupportedForFormatException",
    "SsmlMarksNotSupportedForTextTypeException",
    "ValidationException",
];

/// AWS Polly implementation of TTS repository
pub struct PollyTtsRepository {
    polly_client: Arc<PollyClient>,
}

impl PollyTtsRepository {
    pub fn new(polly_client: Arc<PollyClient>) -> Self {
        Self { polly_client }
    }

    fn select_voice(voices: &[String], language: LanguageCode) -> String {
        voices
            .iter()
            .find(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| polly_voice_for_language(language).to_string())
    }
}

/// Map a Polly error code onto the retry classes
fn classify_code(code: Option<&str>, message: String) -> SynthesisError {
    match code {
        Some(code) if QUOTA_CODES.contains(&code) => SynthesisError::QuotaExceeded(message),
        Some(code) if MALFORMED_CODES.contains(&code) => SynthesisError::MalformedRequest(message),
        _ => SynthesisError::Transient(message),
    }
}

fn classify_error<E, R>(error: &SdkError<E, R>) -> SynthesisError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = format!("AWS Polly error: {}", error);
    match error {
        SdkError::ServiceError(service_error) => {
            classify_code(service_error.err().code(), message)
        }
        // Dispatch failures, timeouts and unparseable responses
        _ => SynthesisError::Transient(message),
    }
}

#[async_trait]
impl TtsRepository for PollyTtsRepository {
    async fn synthesize(
        &self,
        text: &str,
        voices: &[String],
        language: LanguageCode,
    ) -> Result<Vec<u8>, SynthesisError> {
        let start_time = std::time::Instant::now();
        let voice_name = Self::select_voice(voices, language);
        let voice_id = VoiceId::from(voice_name.as_str());
        let engine = Engine::Neural;

        tracing::debug!(
            language = %language,
            voice = %voice_name,
            engine = ?engine,
            text_length = text.len(),
            "Calling AWS Polly synthesize_speech"
        );

        let result = self
            .polly_client
            .synthesize_speech()
            .text(text)
            .voice_id(voice_id)
            .output_format(OutputFormat::Mp3)
            .engine(engine.clone())
            .send()
            .await
            .map_err(|e| {
                let classified = classify_error(&e);
                tracing::error!(
                    error = %e,
                    classified = %classified,
                    language = %language,
                    voice = %voice_name,
                    text_length = text.len(),
                    "AWS Polly synthesize_speech failed"
                );
                classified
            })?;

        let audio_stream = result.audio_stream.collect().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to collect audio stream from Polly response");
            SynthesisError::Transient(format!("Failed to read audio stream: {}", e))
        })?;

        let audio_bytes = audio_stream.into_bytes().to_vec();

        tracing::debug!(
            provider = "polly",
            voice = %voice_name,
            latency_ms = start_time.elapsed().as_millis() as u64,
            characters_count = text.len(),
            audio_size_bytes = audio_bytes.len(),
            "TTS chunk synthesized"
        );

        Ok(audio_bytes)
    }

    fn cohost_voice(&self, language: LanguageCode) -> String {
        polly_cohost_voice_for_language(language).to_string()
    }

    fn max_payload_bytes(&self) -> usize {
        MAX_PAYLOAD_BYTES
    }

    fn name(&self) -> &'static str {
        "polly"
    }
}
