use crate::domain::pipeline::{SegmentDescriptor, StyleConfig};
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritingRequest {
    pub descriptor: SegmentDescriptor,
    /// Only the descriptor's span of the source text
    pub excerpt: String,
    pub style: StyleConfig,
}

/// Writes the narrated script for one segment
#[async_trait]
pub trait WritingRepository: Send + Sync {
    async fn write(&self, request: &WritingRequest) -> Result<String, String>;
}
