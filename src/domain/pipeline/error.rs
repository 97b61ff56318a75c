use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage a job is in, or the stage that failed. Ordered by execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Queued,
    Planning,
    Writing,
    Synthesis,
    Assembly,
    Done,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Queued => "queued",
            PipelineStep::Planning => "planning",
            PipelineStep::Writing => "writing",
            PipelineStep::Synthesis => "synthesis",
            PipelineStep::Assembly => "assembly",
            PipelineStep::Done => "done",
        }
    }

    /// Human readable step description
    pub fn label(&self) -> &'static str {
        match self {
            PipelineStep::Queued => "Waiting to start",
            PipelineStep::Planning => "Planning segments",
            PipelineStep::Writing => "Writing segment scripts",
            PipelineStep::Synthesis => "Synthesizing speech",
            PipelineStep::Assembly => "Assembling audiobook",
            PipelineStep::Done => "Done",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why the synthesis stage gave up on a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisFailureReason {
    QuotaExhausted,
    TransientExhausted,
    MalformedRequest,
}

impl fmt::Display for SynthesisFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SynthesisFailureReason::QuotaExhausted => "quota exceeded on every attempt",
            SynthesisFailureReason::TransientExhausted => "retries exhausted",
            SynthesisFailureReason::MalformedRequest => "provider rejected the request",
        };
        write!(f, "{}", label)
    }
}

/// A destination that could not be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationFailure {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("planning stage failed after {attempts} attempt(s): {message}")]
    Planning { attempts: u32, message: String },

    #[error("writing stage failed for segment(s) {failed_segments:?}: {message}")]
    Writing {
        failed_segments: Vec<usize>,
        message: String,
    },

    #[error("synthesis stage failed for chunk(s) {failed_chunks:?} ({reason}): {message}")]
    Synthesis {
        failed_chunks: Vec<usize>,
        reason: SynthesisFailureReason,
        message: String,
    },

    #[error("assembly stage failed: {0}")]
    Assembly(String),

    #[error("assembly stage failed: no destination could be written ({})", format_failures(.failures))]
    Delivery { failures: Vec<DestinationFailure> },

    #[error("{stage} stage failed: job workspace error: {message}")]
    Workspace { stage: PipelineStep, message: String },
}

fn format_failures(failures: &[DestinationFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.path, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl PipelineError {
    /// Stage the failure belongs to
    pub fn stage(&self) -> PipelineStep {
        match self {
            PipelineError::Planning { .. } => PipelineStep::Planning,
            PipelineError::Writing { .. } => PipelineStep::Writing,
            PipelineError::Synthesis { .. } => PipelineStep::Synthesis,
            PipelineError::Assembly(_) | PipelineError::Delivery { .. } => PipelineStep::Assembly,
            PipelineError::Workspace { stage, .. } => *stage,
        }
    }

    /// Indices of the segments or chunks that could not be produced
    pub fn failed_units(&self) -> Vec<usize> {
        match self {
            PipelineError::Writing {
                failed_segments, ..
            } => failed_segments.clone(),
            PipelineError::Synthesis { failed_chunks, .. } => failed_chunks.clone(),
            _ => Vec::new(),
        }
    }
}
