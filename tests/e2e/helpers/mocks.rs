use async_trait::async_trait;
use audiobook_backend::domain::job::NarrativeMode;
use audiobook_backend::domain::pipeline::{Plan, SegmentDescriptor};
use audiobook_backend::domain::tts::LanguageCode;
use audiobook_backend::infrastructure::repositories::{
    PlanningRepository, PlanningRequest, SynthesisError, TtsRepository, WritingRepository,
    WritingRequest,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Text containing this marker makes the mock planner fail every attempt
pub const FAIL_PLANNING: &str = "[planner-down]";

/// Splits the text into `segment_count` pieces at paragraph breaks
#[derive(Default)]
pub struct MockPlanner {
    calls: AtomicUsize,
}

impl MockPlanner {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlanningRepository for MockPlanner {
    async fn plan(&self, request: &PlanningRequest) -> Result<Plan, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if request.text.contains(FAIL_PLANNING) {
            return Err("planning model unavailable".to_string());
        }

        let mut starts: Vec<usize> = vec![0];
        starts.extend(
            request
                .text
                .match_indices("\n\n")
                .map(|(i, sep)| i + sep.len())
                .take(request.segment_count.saturating_sub(1)),
        );
        if starts.len() != request.segment_count {
            return Err(format!(
                "cannot split into {} segments",
                request.segment_count
            ));
        }

        let segments = starts
            .iter()
            .enumerate()
            .map(|(index, start)| SegmentDescriptor {
                index,
                title: format!("Chapter {}", index + 1),
                start: *start,
                end: starts.get(index + 1).copied().unwrap_or(request.text.len()),
                summary: String::new(),
            })
            .collect();

        Ok(Plan {
            title: "Test Audiobook".to_string(),
            segments,
        })
    }
}

/// Narrates an excerpt by prefixing it, or as a two-host exchange for radio shows
pub struct MockWriter;

#[async_trait]
impl WritingRepository for MockWriter {
    async fn write(&self, request: &WritingRequest) -> Result<String, String> {
        let excerpt = request.excerpt.trim();
        if request.style.narrative_mode == NarrativeMode::RadioShow {
            return Ok(format!(
                "Host 1: Welcome back. {}\nHost 2: Thanks for having me.",
                excerpt
            ));
        }
        Ok(format!("Narration. {}", excerpt))
    }
}

/// Returns the chunk text as the "audio" payload and records the voice used
#[derive(Default)]
pub struct MockTts {
    voices: Mutex<Vec<String>>,
}

impl MockTts {
    pub fn voices_used(&self) -> Vec<String> {
        self.voices.lock().unwrap().clone()
    }
}

#[async_trait]
impl TtsRepository for MockTts {
    async fn synthesize(
        &self,
        text: &str,
        voices: &[String],
        _language: LanguageCode,
    ) -> Result<Vec<u8>, SynthesisError> {
        let voice = voices.first().cloned().unwrap_or_else(|| "default".to_string());
        self.voices.lock().unwrap().push(voice);
        Ok(text.as_bytes().to_vec())
    }

    fn cohost_voice(&self, _language: LanguageCode) -> String {
        "cohost".to_string()
    }

    fn max_payload_bytes(&self) -> usize {
        4096
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
