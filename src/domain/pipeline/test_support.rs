//! In-process collaborators for pipeline unit tests

use super::model::{Plan, SegmentDescriptor, StyleConfig};
use super::rate_limiter::RateLimitSettings;
use super::settings::{
    AssemblySettings, BackoffSettings, PipelineSettings, PlannerSettings, SynthesisSettings,
    WriterSettings,
};
use crate::domain::job::{ContentCategory, NarrativeMode};
use crate::domain::tts::LanguageCode;
use crate::infrastructure::repositories::{
    PlanningRepository, PlanningRequest, SynthesisError, TtsRepository, WritingRepository,
    WritingRequest,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub fn descriptor(index: usize, start: usize, end: usize) -> SegmentDescriptor {
    SegmentDescriptor {
        index,
        title: format!("Segment {}", index),
        start,
        end,
        summary: format!("Summary {}", index),
    }
}

pub fn style() -> StyleConfig {
    StyleConfig {
        language: LanguageCode::English,
        category: ContentCategory::TechNews,
        narrative_mode: NarrativeMode::Mentor,
        listener_name: "Alex".to_string(),
        fast_model: false,
    }
}

pub struct ScriptedPlanner {
    responses: Mutex<VecDeque<Result<Plan, String>>>,
    fallback: Result<Plan, String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedPlanner {
    pub fn new(responses: Vec<Result<Plan, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: Err("no scripted response".to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_failing(message: &str) -> Self {
        let mut planner = Self::new(Vec::new());
        planner.fallback = Err(message.to_string());
        planner
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlanningRepository for ScriptedPlanner {
    async fn plan(&self, _request: &PlanningRequest) -> Result<Plan, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Writes "Script for <excerpt>" for every segment unless told otherwise
pub struct ScriptedWriter {
    failing: HashSet<usize>,
    empty: HashSet<usize>,
    delay: Duration,
    reverse_delays: Option<usize>,
    calls: Mutex<HashMap<usize, usize>>,
    excerpts: Mutex<Vec<String>>,
}

impl ScriptedWriter {
    pub fn new() -> Self {
        Self {
            failing: HashSet::new(),
            empty: HashSet::new(),
            delay: Duration::ZERO,
            reverse_delays: None,
            calls: Mutex::new(HashMap::new()),
            excerpts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }

    pub fn empty_on(mut self, index: usize) -> Self {
        self.empty.insert(index);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Segment `i` of `n` takes `(n - i) * 10ms`, so later segments finish first
    pub fn with_reverse_delays(mut self, n: usize) -> Self {
        self.reverse_delays = Some(n);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn calls_for(&self, index: usize) -> usize {
        self.calls.lock().unwrap().get(&index).copied().unwrap_or(0)
    }

    pub fn excerpts(&self) -> Vec<String> {
        self.excerpts.lock().unwrap().clone()
    }
}

#[async_trait]
impl WritingRepository for ScriptedWriter {
    async fn write(&self, request: &WritingRequest) -> Result<String, String> {
        let index = request.descriptor.index;
        *self.calls.lock().unwrap().entry(index).or_insert(0) += 1;
        self.excerpts.lock().unwrap().push(request.excerpt.clone());

        if self.failing.contains(&index) {
            return Err(format!("writer failed for segment {}", index));
        }

        let delay = match self.reverse_delays {
            Some(n) => Duration::from_millis((n.saturating_sub(index) * 10) as u64),
            None => self.delay,
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.empty.contains(&index) {
            return Ok("   ".to_string());
        }
        Ok(format!("Script for {}", request.excerpt))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsStep {
    Succeed,
    Quota,
    Transient,
    Malformed,
}

/// Echoes the chunk text as "audio" and records when each call was made
pub struct ScriptedTts {
    scripts: Mutex<HashMap<String, VecDeque<TtsStep>>>,
    delay: Duration,
    reverse_delays: Option<usize>,
    max_payload: usize,
    calls: Mutex<HashMap<String, usize>>,
    voices: Mutex<HashMap<String, String>>,
    dispatch_times: Mutex<Vec<Instant>>,
    completion_order: Mutex<Vec<usize>>,
}

impl ScriptedTts {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            reverse_delays: None,
            max_payload: 4096,
            calls: Mutex::new(HashMap::new()),
            voices: Mutex::new(HashMap::new()),
            dispatch_times: Mutex::new(Vec::new()),
            completion_order: Mutex::new(Vec::new()),
        }
    }

    /// Outcomes for successive calls with `text`; succeeds once the script runs out
    pub fn script(self, text: &str, steps: Vec<TtsStep>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(text.to_string(), steps.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Chunk texts ending in `-i` take `(n - i) * 100ms`
    pub fn with_reverse_delays(mut self, n: usize) -> Self {
        self.reverse_delays = Some(n);
        self
    }

    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    pub fn calls_for(&self, text: &str) -> usize {
        self.calls.lock().unwrap().get(text).copied().unwrap_or(0)
    }

    /// First voice sent along with `text`, or "default" for an empty voice list
    pub fn voice_for(&self, text: &str) -> Option<String> {
        self.voices.lock().unwrap().get(text).cloned()
    }

    pub fn dispatch_times(&self) -> Vec<Instant> {
        self.dispatch_times.lock().unwrap().clone()
    }

    pub fn completion_order(&self) -> Vec<usize> {
        self.completion_order.lock().unwrap().clone()
    }
}

fn trailing_index(text: &str) -> Option<usize> {
    text.rsplit('-').next().and_then(|s| s.parse().ok())
}

#[async_trait]
impl TtsRepository for ScriptedTts {
    async fn synthesize(
        &self,
        text: &str,
        voices: &[String],
        _language: LanguageCode,
    ) -> Result<Vec<u8>, SynthesisError> {
        *self.calls.lock().unwrap().entry(text.to_string()).or_insert(0) += 1;
        let voice = voices.first().cloned().unwrap_or_else(|| "default".to_string());
        self.voices.lock().unwrap().insert(text.to_string(), voice);
        self.dispatch_times.lock().unwrap().push(Instant::now());

        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(text)
            .and_then(|steps| steps.pop_front())
            .unwrap_or(TtsStep::Succeed);

        let delay = match (self.reverse_delays, trailing_index(text)) {
            (Some(n), Some(i)) => Duration::from_millis((n.saturating_sub(i) * 100) as u64),
            _ => self.delay,
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match step {
            TtsStep::Succeed => {
                if let Some(i) = trailing_index(text) {
                    self.completion_order.lock().unwrap().push(i);
                }
                Ok(text.as_bytes().to_vec())
            }
            TtsStep::Quota => Err(SynthesisError::QuotaExceeded("rate exceeded".to_string())),
            TtsStep::Transient => Err(SynthesisError::Transient("connection reset".to_string())),
            TtsStep::Malformed => Err(SynthesisError::MalformedRequest(
                "text too long".to_string(),
            )),
        }
    }

    fn cohost_voice(&self, _language: LanguageCode) -> String {
        "cohost".to_string()
    }

    fn max_payload_bytes(&self) -> usize {
        self.max_payload
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Small, fast settings for end-to-end pipeline tests
pub fn pipeline_settings(work_dir: &Path, output_dir: &Path) -> PipelineSettings {
    PipelineSettings {
        default_segment_count: 1,
        work_dir: work_dir.to_path_buf(),
        rate_limit: RateLimitSettings {
            burst: 10,
            steady_rate: 10,
            window: Duration::from_secs(1),
        },
        planner: PlannerSettings {
            max_attempts: 3,
            timeout: Duration::from_secs(5),
            backoff: fast_backoff(),
        },
        writer: WriterSettings {
            concurrency: 4,
            max_attempts: 1,
            timeout: Duration::from_secs(5),
            backoff: fast_backoff(),
        },
        synthesis: SynthesisSettings {
            workers: 4,
            max_attempts: 2,
            timeout: Duration::from_secs(5),
            max_chunk_bytes: 4096,
            backoff: fast_backoff(),
        },
        assembly: AssemblySettings {
            output_dirs: vec![output_dir.to_path_buf()],
            cover_image_path: None,
            default_author: "Audiobook Backend".to_string(),
        },
    }
}

fn fast_backoff() -> BackoffSettings {
    BackoffSettings {
        base: Duration::from_millis(10),
        max: Duration::from_millis(50),
        jitter: Duration::ZERO,
    }
}
