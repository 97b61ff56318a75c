use super::options::{ContentCategory, NarrativeMode};
use crate::domain::pipeline::{Chapter, DestinationFailure, PipelineError, PipelineStep};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Progress reached when planning finishes
pub const PLANNING_DONE: u8 = 10;
/// Progress reached when every segment script exists
pub const WRITING_DONE: u8 = 45;
/// Progress reached when every chunk has audio
pub const SYNTHESIS_DONE: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

fn default_language() -> String {
    "auto".to_string()
}

/// Per-job narration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    /// ISO 639-1 code, or `auto` to detect from the text
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub category: ContentCategory,
    #[serde(default)]
    pub narrative_mode: NarrativeMode,
    /// Requested voices; empty uses the provider default for the language
    #[serde(default)]
    pub voices: Vec<String>,
    #[serde(default)]
    pub listener_name: String,
    /// Use the faster writer model
    #[serde(default)]
    pub fast_model: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            category: ContentCategory::default(),
            narrative_mode: NarrativeMode::default(),
            voices: Vec::new(),
            listener_name: String::new(),
            fast_model: false,
            segment_count: None,
            author: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub title: String,
    pub language: String,
    /// First destination that received the audiobook
    pub artifact_path: String,
    pub download_url: String,
    pub destinations: Vec<String>,
    pub failed_destinations: Vec<DestinationFailure>,
    pub duration_secs: f64,
    pub size_bytes: u64,
    pub segment_count: usize,
    pub chunk_count: usize,
    pub chapters: Vec<Chapter>,
}

/// Why a job failed, with the stage and units involved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub stage: PipelineStep,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failed_units: Vec<usize>,
}

impl From<&PipelineError> for JobError {
    fn from(err: &PipelineError) -> Self {
        Self {
            stage: err.stage(),
            message: err.to_string(),
            failed_units: err.failed_units(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub progress: u8,
    pub current_step: PipelineStep,
    pub current_step_label: String,
    pub segments_total: usize,
    pub segments_completed: usize,
    pub chunks_total: usize,
    pub chunks_completed: usize,
    #[serde(skip_serializing, default)]
    pub input_text: String,
    pub config: JobConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(input_text: String, config: JobConfig) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Queued,
            progress: 0,
            current_step: PipelineStep::Queued,
            current_step_label: PipelineStep::Queued.label().to_string(),
            segments_total: 0,
            segments_completed: 0,
            chunks_total: 0,
            chunks_completed: 0,
            input_text,
            config,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Queued -> Processing. Returns false when the job was not queued.
    pub fn start(&mut self) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }
        self.status = JobStatus::Processing;
        self.set_step(PipelineStep::Planning);
        true
    }

    /// Move to `step` at `progress`. Neither ever goes backward.
    pub fn advance(&mut self, step: PipelineStep, progress: u8) {
        if self.status != JobStatus::Processing {
            return;
        }
        if step > self.current_step {
            self.set_step(step);
        }
        self.progress = self.progress.max(progress.min(99));
    }

    pub fn record_segments(&mut self, completed: usize, total: usize) {
        if self.status != JobStatus::Processing {
            return;
        }
        self.segments_total = total;
        self.segments_completed = self.segments_completed.max(completed);
        self.advance(
            PipelineStep::Writing,
            scale(PLANNING_DONE, WRITING_DONE, completed, total),
        );
    }

    pub fn record_chunks(&mut self, completed: usize, total: usize) {
        if self.status != JobStatus::Processing {
            return;
        }
        self.chunks_total = total;
        self.chunks_completed = self.chunks_completed.max(completed);
        self.advance(
            PipelineStep::Synthesis,
            scale(WRITING_DONE, SYNTHESIS_DONE, completed, total),
        );
    }

    /// Processing -> Completed
    pub fn complete(&mut self, result: JobResult) {
        if self.status != JobStatus::Processing {
            return;
        }
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.set_step(PipelineStep::Done);
        self.result = Some(result);
    }

    /// Any non-terminal state -> Failed. Progress stays where it stopped.
    pub fn fail(&mut self, error: JobError) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.current_step_label = format!("Failed during {}", error.stage);
        self.error = Some(error);
    }

    fn set_step(&mut self, step: PipelineStep) {
        self.current_step = step;
        self.current_step_label = step.label().to_string();
    }
}

/// Linear progress between `from` and `to` for `done` of `total` units
fn scale(from: u8, to: u8, done: usize, total: usize) -> u8 {
    if total == 0 {
        return to;
    }
    let span = (to - from) as usize;
    from + (span * done.min(total) / total) as u8
}
