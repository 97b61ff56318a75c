use super::rate_limiter::RateLimitSettings;
use rand::Rng;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerSettings {
    pub max_attempts: u32,
    pub timeout: Duration,
    pub backoff: BackoffSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriterSettings {
    pub concurrency: usize,
    pub max_attempts: u32,
    pub timeout: Duration,
    pub backoff: BackoffSettings,
}

/// Exponential backoff with uniform jitter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffSettings {
    pub base: Duration,
    pub max: Duration,
    pub jitter: Duration,
}

impl BackoffSettings {
    /// Delay before retry number `attempt` (1-based), without jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base.saturating_mul(factor).min(self.max)
    }

    /// `delay_for(attempt)` plus uniform jitter
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.delay_for(attempt) + Duration::from_millis(jitter)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisSettings {
    pub workers: usize,
    pub max_attempts: u32,
    pub timeout: Duration,
    /// Chunk ceiling; the effective ceiling is the smaller of this and the provider's
    pub max_chunk_bytes: usize,
    pub backoff: BackoffSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblySettings {
    pub output_dirs: Vec<PathBuf>,
    pub cover_image_path: Option<PathBuf>,
    pub default_author: String,
}

/// Everything the pipeline stages need, derived from `Config`
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub default_segment_count: usize,
    pub work_dir: PathBuf,
    pub rate_limit: RateLimitSettings,
    pub planner: PlannerSettings,
    pub writer: WriterSettings,
    pub synthesis: SynthesisSettings,
    pub assembly: AssemblySettings,
}
