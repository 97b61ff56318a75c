use crate::domain::job::ContentCategory;
use crate::domain::pipeline::Plan;
use crate::domain::tts::LanguageCode;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanningRequest {
    pub text: String,
    pub segment_count: usize,
    pub language: LanguageCode,
    pub category: ContentCategory,
}

/// Decomposes source text into ordered segments.
///
/// Implementations return descriptors with byte offsets into `request.text`;
/// the pipeline validates them and retries on malformed output.
#[async_trait]
pub trait PlanningRepository: Send + Sync {
    async fn plan(&self, request: &PlanningRequest) -> Result<Plan, String>;
}
