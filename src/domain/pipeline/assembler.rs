use super::error::{DestinationFailure, PipelineError};
use super::model::{AudioBuffer, Chapter, MergedScript, SynthesisChunk};
use super::settings::AssemblySettings;
use crate::infrastructure::audio::{self, AudiobookTags};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Descriptive metadata for the finished audiobook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudiobookMetadata {
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    /// One title per segment, in segment order
    pub segment_titles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledAudio {
    /// Tagged MP3 bytes
    pub bytes: Vec<u8>,
    pub duration: Duration,
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<PathBuf>,
    pub failures: Vec<DestinationFailure>,
}

pub struct Assembler {
    settings: AssemblySettings,
}

impl Assembler {
    pub fn new(settings: AssemblySettings) -> Self {
        Self { settings }
    }

    /// Concatenate buffers by index and tag the result.
    ///
    /// Buffers may arrive in any order; they must cover `0..chunks.len()`
    /// exactly once.
    pub async fn assemble(
        &self,
        mut buffers: Vec<AudioBuffer>,
        chunks: &[SynthesisChunk],
        script: &MergedScript,
        metadata: &AudiobookMetadata,
    ) -> Result<AssembledAudio, PipelineError> {
        buffers.sort_by_key(|b| b.index);

        if buffers.len() != chunks.len() {
            return Err(PipelineError::Assembly(format!(
                "expected {} audio buffers, got {}",
                chunks.len(),
                buffers.len()
            )));
        }
        for (position, buffer) in buffers.iter().enumerate() {
            if buffer.index != position {
                return Err(PipelineError::Assembly(format!(
                    "audio buffer {} missing or duplicated",
                    position
                )));
            }
        }

        let durations: Vec<Duration> = buffers.iter().map(|b| b.duration).collect();
        let duration: Duration = durations.iter().sum();
        let chapters = build_chapters(
            &script.segment_offsets,
            &metadata.segment_titles,
            chunks,
            &durations,
        );

        let audio_len = buffers.iter().map(|b| b.bytes.len()).sum();
        let mut stream = Vec::with_capacity(audio_len);
        for buffer in &buffers {
            stream.extend_from_slice(&buffer.bytes);
        }

        let tags = AudiobookTags {
            title: metadata.title.clone(),
            author: metadata.author.clone(),
            year: metadata.year,
            chapters: chapters.clone(),
            cover: self.load_cover().await,
        };
        let bytes = audio::tag_audiobook(&stream, &tags)
            .map_err(|e| PipelineError::Assembly(format!("failed to write ID3 tag: {}", e)))?;

        tracing::info!(
            buffers = buffers.len(),
            chapters = chapters.len(),
            duration_secs = duration.as_secs(),
            size_bytes = bytes.len(),
            "Audio assembled"
        );

        Ok(AssembledAudio {
            bytes,
            duration,
            chapters,
        })
    }

    async fn load_cover(&self) -> Option<(Vec<u8>, String)> {
        let path = self.settings.cover_image_path.as_ref()?;
        match tokio::fs::read(path).await {
            Ok(data) => Some((data, audio::cover_mime_type(path))),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Cover image unreadable, assembling without cover"
                );
                None
            }
        }
    }

    /// Copy the artifact to every output directory with a transcript next to it.
    ///
    /// Succeeds when at least one destination received the audio; failed
    /// destinations are listed in the report.
    pub async fn deliver(
        &self,
        artifact: &Path,
        stem: &str,
        transcript: &str,
    ) -> Result<DeliveryReport, PipelineError> {
        let mut report = DeliveryReport::default();

        for dir in &self.settings.output_dirs {
            match deliver_to(dir, artifact, stem, transcript).await {
                Ok(path) => {
                    tracing::info!(destination = %path.display(), "Audiobook delivered");
                    report.delivered.push(path);
                }
                Err(e) => {
                    tracing::warn!(
                        destination = %dir.display(),
                        error = %e,
                        "Destination write failed"
                    );
                    report.failures.push(DestinationFailure {
                        path: dir.display().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if report.delivered.is_empty() {
            return Err(PipelineError::Delivery {
                failures: report.failures,
            });
        }
        Ok(report)
    }
}

async fn deliver_to(
    dir: &Path,
    artifact: &Path,
    stem: &str,
    transcript: &str,
) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let target = dir.join(format!("{}.mp3", stem));
    tokio::fs::copy(artifact, &target).await?;

    let sidecar = dir.join(format!("{}.txt", stem));
    if let Err(e) = tokio::fs::write(&sidecar, transcript).await {
        tracing::warn!(path = %sidecar.display(), error = %e, "Transcript sidecar not written");
    }
    Ok(target)
}

/// Place segment starts on the audio timeline.
///
/// A segment's offset in the merged script is located inside the chunk that
/// contains it, and its time is interpolated linearly within that chunk's audio.
pub fn build_chapters(
    segment_offsets: &[usize],
    titles: &[String],
    chunks: &[SynthesisChunk],
    durations: &[Duration],
) -> Vec<Chapter> {
    let mut chunk_starts = Vec::with_capacity(durations.len());
    let mut elapsed = Duration::ZERO;
    for duration in durations {
        chunk_starts.push(elapsed);
        elapsed += *duration;
    }
    let total_ms = elapsed.as_millis() as u64;

    let time_at = |offset: usize| -> u64 {
        let Some(position) = chunks.iter().rposition(|c| c.offset <= offset) else {
            return 0;
        };
        let chunk = &chunks[position];
        let (Some(start), Some(duration)) = (chunk_starts.get(position), durations.get(position))
        else {
            return total_ms;
        };
        let fraction = ((offset - chunk.offset) as f64 / chunk.text.len().max(1) as f64).min(1.0);
        (start.as_millis() as f64 + duration.as_millis() as f64 * fraction) as u64
    };

    let starts: Vec<u64> = segment_offsets
        .iter()
        .enumerate()
        .map(|(i, offset)| if i == 0 { 0 } else { time_at(*offset) })
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, start)| Chapter {
            title: titles
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("Chapter {}", i + 1)),
            start_ms: *start,
            end_ms: starts.get(i + 1).copied().unwrap_or(total_ms).max(*start),
        })
        .collect()
}

/// File-system friendly artifact name built from the title
pub fn artifact_stem(title: &str, job_id: &str) -> String {
    let mut stem: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    while stem.contains("__") {
        stem = stem.replace("__", "_");
    }
    let stem: String = stem.trim_matches('_').chars().take(80).collect();
    let short_id: String = job_id.chars().take(8).collect();

    if stem.is_empty() {
        format!("audiobook_{}", short_id)
    } else {
        format!("{}_{}", stem, short_id)
    }
}
