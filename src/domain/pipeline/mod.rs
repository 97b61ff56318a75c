pub mod assembler;
pub mod chunker;
pub mod dialogue;
pub mod error;
pub mod model;
pub mod planner;
pub mod rate_limiter;
pub mod settings;
pub mod synthesis;
pub mod text;
pub mod workspace;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

pub use assembler::{AssembledAudio, Assembler, AudiobookMetadata, DeliveryReport};
pub use error::{DestinationFailure, PipelineError, PipelineStep, SynthesisFailureReason};
pub use model::{
    AudioBuffer, Chapter, MergedScript, Plan, SegmentDescriptor, SegmentScript, StyleConfig,
    SynthesisChunk,
};
pub use planner::SegmentPlanner;
pub use rate_limiter::{RateLimitSettings, RateLimiter};
pub use settings::{
    AssemblySettings, BackoffSettings, PipelineSettings, PlannerSettings, SynthesisSettings,
    WriterSettings,
};
pub use synthesis::SynthesisDispatcher;
pub use workspace::JobWorkspace;
pub use writer::SegmentWriterPool;

/// Reports `(completed, total)` units of a fan-out stage
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;
