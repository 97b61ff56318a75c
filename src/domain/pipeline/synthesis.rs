use super::error::{PipelineError, SynthesisFailureReason};
use super::model::{AudioBuffer, SynthesisChunk};
use super::rate_limiter::RateLimiter;
use super::settings::SynthesisSettings;
use super::ProgressCallback;
use crate::domain::tts::LanguageCode;
use crate::infrastructure::audio;
use crate::infrastructure::repositories::{SynthesisError, TtsRepository};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct ChunkFailure {
    index: usize,
    reason: SynthesisFailureReason,
    message: String,
    cancelled: bool,
}

impl ChunkFailure {
    fn cancelled(index: usize) -> Self {
        Self {
            index,
            reason: SynthesisFailureReason::TransientExhausted,
            message: "cancelled".to_string(),
            cancelled: true,
        }
    }
}

/// Everything one chunk task needs, cloned per task
#[derive(Clone)]
struct ChunkContext {
    tts_repo: Arc<dyn TtsRepository>,
    rate_limiter: Arc<RateLimiter>,
    settings: SynthesisSettings,
    voices: Arc<Vec<String>>,
    language: LanguageCode,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl ChunkContext {
    /// Voices for the host reading a chunk.
    ///
    /// The first host gets the job's voices as requested. The second host gets
    /// the job's second voice, or the provider's co-host voice when only one
    /// (or none) was requested.
    fn voices_for(&self, speaker: usize) -> Vec<String> {
        if speaker == 0 {
            return self.voices.to_vec();
        }
        match self.voices.get(speaker) {
            Some(voice) if !voice.trim().is_empty() => vec![voice.clone()],
            _ => vec![self.tts_repo.cohost_voice(self.language)],
        }
    }
}

/// Dispatches chunk synthesis through the shared rate limiter
pub struct SynthesisDispatcher {
    tts_repo: Arc<dyn TtsRepository>,
    rate_limiter: Arc<RateLimiter>,
    settings: SynthesisSettings,
}

impl SynthesisDispatcher {
    pub fn new(
        tts_repo: Arc<dyn TtsRepository>,
        rate_limiter: Arc<RateLimiter>,
        settings: SynthesisSettings,
    ) -> Self {
        Self {
            tts_repo,
            rate_limiter,
            settings,
        }
    }

    /// Byte ceiling chunks must respect: the configured one or the provider's, whichever is smaller
    pub fn chunk_ceiling(&self) -> usize {
        self.settings
            .max_chunk_bytes
            .min(self.tts_repo.max_payload_bytes())
    }

    /// Synthesize every chunk and return the buffers in chunk index order.
    ///
    /// Every attempt, retries included, is admitted by the rate limiter. The
    /// first chunk that fails for good cancels the stage. Chunks read by the
    /// second radio show host use the second voice.
    pub async fn synthesize(
        &self,
        chunks: &[SynthesisChunk],
        voices: &[String],
        language: LanguageCode,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Vec<AudioBuffer>, PipelineError> {
        let total = chunks.len();
        let mut slots: Vec<Option<AudioBuffer>> = vec![None; total];

        let context = ChunkContext {
            tts_repo: self.tts_repo.clone(),
            rate_limiter: self.rate_limiter.clone(),
            settings: self.settings.clone(),
            voices: Arc::new(voices.to_vec()),
            language,
            semaphore: Arc::new(Semaphore::new(self.settings.workers.max(1))),
            cancel: CancellationToken::new(),
        };

        tracing::info!(
            provider = self.tts_repo.name(),
            chunks = total,
            workers = self.settings.workers,
            "Dispatching synthesis"
        );

        let mut tasks = JoinSet::new();
        for chunk in chunks {
            if chunk.index >= total {
                return Err(PipelineError::Synthesis {
                    failed_chunks: vec![chunk.index],
                    reason: SynthesisFailureReason::MalformedRequest,
                    message: format!("chunk index {} outside 0..{}", chunk.index, total),
                });
            }
            tasks.spawn(synthesize_chunk(context.clone(), chunk.clone()));
        }

        let mut completed = 0;
        let mut failures: Vec<ChunkFailure> = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(buffer)) => {
                    let index = buffer.index;
                    slots[index] = Some(buffer);
                    completed += 1;
                    if let Some(callback) = &on_progress {
                        callback(completed, total);
                    }
                }
                Ok(Err(failure)) => {
                    if !failure.cancelled {
                        context.cancel.cancel();
                        failures.push(failure);
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Synthesis task aborted");
                    context.cancel.cancel();
                }
            }
        }

        if failures.is_empty() && slots.iter().all(Option::is_some) {
            return Ok(slots.into_iter().flatten().collect());
        }

        failures.sort_by_key(|f| f.index);
        let reason = failures
            .first()
            .map_or(SynthesisFailureReason::TransientExhausted, |f| f.reason);
        let failed_chunks: Vec<usize> = if failures.is_empty() {
            slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.is_none())
                .map(|(index, _)| index)
                .collect()
        } else {
            failures.iter().map(|f| f.index).collect()
        };
        let message = if failures.is_empty() {
            "synthesis tasks ended without producing audio".to_string()
        } else {
            failures
                .iter()
                .map(|f| format!("chunk {}: {}", f.index, f.message))
                .collect::<Vec<_>>()
                .join("; ")
        };

        Err(PipelineError::Synthesis {
            failed_chunks,
            reason,
            message,
        })
    }
}

async fn synthesize_chunk(
    context: ChunkContext,
    chunk: SynthesisChunk,
) -> Result<AudioBuffer, ChunkFailure> {
    let index = chunk.index;
    let cancel = &context.cancel;

    let _permit = tokio::select! {
        _ = cancel.cancelled() => return Err(ChunkFailure::cancelled(index)),
        permit = context.semaphore.clone().acquire_owned() => {
            permit.map_err(|_| ChunkFailure::cancelled(index))?
        }
    };

    let voices = context.voices_for(chunk.speaker);
    let max_attempts = context.settings.max_attempts.max(1);
    let mut quota_rejections = 0u32;
    let mut transient_failures = 0u32;
    let mut last_reason = SynthesisFailureReason::TransientExhausted;
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(ChunkFailure::cancelled(index));
        }

        let wait = context.rate_limiter.admit();
        if !wait.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(ChunkFailure::cancelled(index)),
                _ = tokio::time::sleep(wait) => {}
            }
        }

        let outcome = tokio::time::timeout(
            context.settings.timeout,
            context
                .tts_repo
                .synthesize(&chunk.text, &voices, context.language),
        )
        .await;

        match outcome {
            Ok(Ok(bytes)) => {
                let duration = audio::probe_duration(&bytes);
                tracing::debug!(
                    chunk_index = index,
                    attempt = attempt,
                    audio_bytes = bytes.len(),
                    duration_ms = duration.as_millis() as u64,
                    "Chunk synthesized"
                );
                return Ok(AudioBuffer {
                    index,
                    bytes,
                    duration,
                });
            }
            Ok(Err(SynthesisError::MalformedRequest(e))) => {
                tracing::error!(chunk_index = index, error = %e, "Synthesis request rejected");
                return Err(ChunkFailure {
                    index,
                    reason: SynthesisFailureReason::MalformedRequest,
                    message: e,
                    cancelled: false,
                });
            }
            Ok(Err(SynthesisError::QuotaExceeded(e))) => {
                context.rate_limiter.penalize();
                quota_rejections += 1;
                last_reason = SynthesisFailureReason::QuotaExhausted;
                last_error = e;
            }
            Ok(Err(SynthesisError::Transient(e))) => {
                transient_failures += 1;
                last_reason = SynthesisFailureReason::TransientExhausted;
                last_error = e;
            }
            Err(_) => {
                transient_failures += 1;
                last_reason = SynthesisFailureReason::TransientExhausted;
                last_error = format!("timed out after {:?}", context.settings.timeout);
            }
        }

        if attempt == max_attempts {
            break;
        }

        let delay = context.settings.backoff.jittered_delay(attempt);
        tracing::warn!(
            chunk_index = index,
            attempt = attempt,
            max_attempts = max_attempts,
            quota_rejections = quota_rejections,
            transient_failures = transient_failures,
            retry_in_ms = delay.as_millis() as u64,
            error = %last_error,
            "Synthesis attempt failed, backing off"
        );
        tokio::select! {
            _ = cancel.cancelled() => return Err(ChunkFailure::cancelled(index)),
            _ = tokio::time::sleep(delay) => {}
        }
    }

    Err(ChunkFailure {
        index,
        reason: last_reason,
        message: format!(
            "{} after {} attempt(s) ({} quota rejection(s), {} transient failure(s))",
            last_error, max_attempts, quota_rejections, transient_failures
        ),
        cancelled: false,
    })
}
