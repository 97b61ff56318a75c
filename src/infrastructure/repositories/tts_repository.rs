use crate::domain::tts::LanguageCode;
use async_trait::async_trait;

/// How a synthesis provider failed, which decides the retry policy
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    /// Provider quota hit; retry with backoff after penalizing the rate limiter
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Network faults, 5xx responses and timeouts; retry with backoff
    #[error("transient failure: {0}")]
    Transient(String),

    /// The provider will never accept this request
    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

/// Repository for TTS synthesis operations.
/// Abstracts the underlying TTS provider (AWS Polly, OpenAI, etc.)
///
/// Implementations synthesize exactly one chunk per call. Splitting, pacing and
/// retries are handled by the synthesis dispatcher.
#[async_trait]
pub trait TtsRepository: Send + Sync {
    /// Synthesize one chunk to MP3 bytes
    ///
    /// # Arguments
    /// * `text` - Chunk text, never longer than `max_payload_bytes()`
    /// * `voices` - Requested voices; empty means the provider default for `language`
    /// * `language` - The target language for synthesis
    async fn synthesize(
        &self,
        text: &str,
        voices: &[String],
        language: LanguageCode,
    ) -> Result<Vec<u8>, SynthesisError>;

    /// Voice for the second radio show host when the job names only one voice
    fn cohost_voice(&self, language: LanguageCode) -> String;

    /// Hard per-request payload ceiling in UTF-8 bytes
    fn max_payload_bytes(&self) -> usize;

    fn name(&self) -> &'static str;
}
