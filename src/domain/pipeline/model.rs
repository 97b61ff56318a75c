use crate::domain::job::{ContentCategory, NarrativeMode};
use crate::domain::tts::LanguageCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One planned section of the source text.
///
/// `start`/`end` are byte offsets into the cleaned source text and always sit on
/// char boundaries once the planner has validated them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    pub index: usize,
    pub title: String,
    pub start: usize,
    pub end: usize,
    pub summary: String,
}

impl SegmentDescriptor {
    /// The part of the source text this segment covers
    pub fn excerpt<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or_default()
    }
}

/// Output of the planning stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub title: String,
    pub segments: Vec<SegmentDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentScript {
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisChunk {
    pub index: usize,
    pub text: String,
    /// Byte offset of the chunk's first character inside the merged script
    pub offset: usize,
    /// Radio show host reading the chunk; always 0 for single-narrator scripts
    pub speaker: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    pub index: usize,
    pub bytes: Vec<u8>,
    pub duration: Duration,
}

/// Global style settings handed to every writer call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleConfig {
    pub language: LanguageCode,
    pub category: ContentCategory,
    pub narrative_mode: NarrativeMode,
    pub listener_name: String,
    pub fast_model: bool,
}

/// Separator placed between segment scripts in the merged script
pub const SCRIPT_SEPARATOR: &str = "\n\n";

/// The merged script plus the byte offset where each segment starts inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedScript {
    pub text: String,
    pub segment_offsets: Vec<usize>,
}

impl MergedScript {
    /// Join scripts in index order. Callers pass scripts already sorted by index.
    pub fn from_scripts(scripts: &[SegmentScript]) -> Self {
        let mut text = String::new();
        let mut segment_offsets = Vec::with_capacity(scripts.len());

        for script in scripts {
            if !text.is_empty() {
                text.push_str(SCRIPT_SEPARATOR);
            }
            segment_offsets.push(text.len());
            text.push_str(script.text.trim());
        }

        Self {
            text,
            segment_offsets,
        }
    }
}

/// A chapter marker on the final audio timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub start_ms: u64,
    pub end_ms: u64,
}
