use super::error::PipelineError;
use super::model::{SegmentDescriptor, SegmentScript, StyleConfig};
use super::settings::WriterSettings;
use super::ProgressCallback;
use crate::infrastructure::repositories::{WritingRepository, WritingRequest};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct WriteFailure {
    index: usize,
    message: String,
    cancelled: bool,
}

/// Fans out one writing call per segment under a concurrency cap
pub struct SegmentWriterPool {
    writing_repo: Arc<dyn WritingRepository>,
    settings: WriterSettings,
}

impl SegmentWriterPool {
    pub fn new(writing_repo: Arc<dyn WritingRepository>, settings: WriterSettings) -> Self {
        Self {
            writing_repo,
            settings,
        }
    }

    /// Write a script for every descriptor and return them in index order.
    ///
    /// Each call only sees its own excerpt of `source`. A segment that fails
    /// every attempt cancels the stage: siblings stop starting new attempts,
    /// in-flight calls drain, and the error lists every failed index.
    pub async fn write_all(
        &self,
        descriptors: &[SegmentDescriptor],
        source: &str,
        style: &StyleConfig,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Vec<SegmentScript>, PipelineError> {
        let total = descriptors.len();
        let mut slots: Vec<Option<SegmentScript>> = vec![None; total];

        for descriptor in descriptors {
            if descriptor.index >= total {
                return Err(PipelineError::Writing {
                    failed_segments: vec![descriptor.index],
                    message: format!("segment index {} outside 0..{}", descriptor.index, total),
                });
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();

        for descriptor in descriptors {
            let request = WritingRequest {
                descriptor: descriptor.clone(),
                excerpt: descriptor.excerpt(source).to_string(),
                style: style.clone(),
            };
            tasks.spawn(write_segment(
                self.writing_repo.clone(),
                request,
                self.settings.clone(),
                semaphore.clone(),
                cancel.clone(),
            ));
        }

        let mut completed = 0;
        let mut failures: Vec<WriteFailure> = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(script)) => {
                    let index = script.index;
                    if slots[index].is_some() {
                        cancel.cancel();
                        failures.push(WriteFailure {
                            index,
                            message: "duplicate script".to_string(),
                            cancelled: false,
                        });
                        continue;
                    }
                    slots[index] = Some(script);
                    completed += 1;
                    if let Some(callback) = &on_progress {
                        callback(completed, total);
                    }
                }
                Ok(Err(failure)) => {
                    if !failure.cancelled {
                        cancel.cancel();
                        failures.push(failure);
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Writer task aborted");
                    cancel.cancel();
                }
            }
        }

        if failures.is_empty() && slots.iter().all(Option::is_some) {
            return Ok(slots.into_iter().flatten().collect());
        }

        failures.sort_by_key(|f| f.index);
        let mut failed_segments: Vec<usize> = failures.iter().map(|f| f.index).collect();
        if failed_segments.is_empty() {
            failed_segments = missing_indices(&slots);
        }

        let message = if failures.is_empty() {
            "writer tasks ended without producing a script".to_string()
        } else {
            failures
                .iter()
                .map(|f| format!("segment {}: {}", f.index, f.message))
                .collect::<Vec<_>>()
                .join("; ")
        };

        Err(PipelineError::Writing {
            failed_segments,
            message,
        })
    }
}

fn missing_indices(slots: &[Option<SegmentScript>]) -> Vec<usize> {
    slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.is_none())
        .map(|(index, _)| index)
        .collect()
}

async fn write_segment(
    writing_repo: Arc<dyn WritingRepository>,
    request: WritingRequest,
    settings: WriterSettings,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> Result<SegmentScript, WriteFailure> {
    let index = request.descriptor.index;
    let cancelled = || WriteFailure {
        index,
        message: "cancelled".to_string(),
        cancelled: true,
    };

    let _permit = tokio::select! {
        _ = cancel.cancelled() => return Err(cancelled()),
        permit = semaphore.acquire_owned() => permit.map_err(|_| cancelled())?,
    };

    let max_attempts = settings.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        let outcome = tokio::time::timeout(settings.timeout, writing_repo.write(&request)).await;
        match outcome {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                tracing::debug!(
                    segment_index = index,
                    attempt = attempt,
                    script_length = text.len(),
                    "Segment script written"
                );
                return Ok(SegmentScript { index, text });
            }
            Ok(Ok(_)) => last_error = "collaborator returned an empty script".to_string(),
            Ok(Err(e)) => last_error = e,
            Err(_) => last_error = format!("timed out after {:?}", settings.timeout),
        }

        if attempt == max_attempts {
            break;
        }

        let delay = settings.backoff.jittered_delay(attempt);
        tracing::warn!(
            segment_index = index,
            attempt = attempt,
            max_attempts = max_attempts,
            retry_in_ms = delay.as_millis() as u64,
            error = %last_error,
            "Segment writing attempt failed, backing off"
        );
        tokio::select! {
            _ = cancel.cancelled() => return Err(cancelled()),
            _ = tokio::time::sleep(delay) => {}
        }
    }

    tracing::warn!(
        segment_index = index,
        attempts = max_attempts,
        error = %last_error,
        "Segment writing attempts exhausted"
    );

    Err(WriteFailure {
        index,
        message: format!("{} (after {} attempt(s))", last_error, max_attempts),
        cancelled: false,
    })
}
