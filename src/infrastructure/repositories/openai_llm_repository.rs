use super::planning_repository::{PlanningRepository, PlanningRequest};
use super::writing_repository::{WritingRepository, WritingRequest};
use crate::domain::job::NarrativeMode;
use crate::domain::pipeline::{Plan, SegmentDescriptor};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Shortest prefix of a start quote still worth searching for
const MIN_QUOTE_PREFIX_CHARS: usize = 24;

/// Chat-completion backed planner and segment writer
pub struct OpenAiLlmRepository {
    client: Arc<Client<OpenAIConfig>>,
    planner_model: String,
    writer_model: String,
    fast_writer_model: String,
}

impl OpenAiLlmRepository {
    pub fn new(
        client: Arc<Client<OpenAIConfig>>,
        planner_model: String,
        writer_model: String,
        fast_writer_model: String,
    ) -> Self {
        Self {
            client,
            planner_model,
            writer_model,
            fast_writer_model,
        }
    }

    async fn complete(&self, model: &str, system: String, user: String) -> Result<String, String> {
        let start_time = std::time::Instant::now();

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(describe)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(describe)?
                .into(),
        ];
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .build()
            .map_err(describe)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            tracing::error!(error = %e, model = %model, "OpenAI chat completion failed");
            describe(e)
        })?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        tracing::debug!(
            model = %model,
            latency_ms = start_time.elapsed().as_millis() as u64,
            response_length = content.len(),
            "Chat completion received"
        );

        Ok(content)
    }
}

fn describe(error: OpenAIError) -> String {
    match error {
        OpenAIError::ApiError(api_error) => api_error.message,
        other => other.to_string(),
    }
}

#[async_trait]
impl PlanningRepository for OpenAiLlmRepository {
    async fn plan(&self, request: &PlanningRequest) -> Result<Plan, String> {
        let system = planner_prompt(request);
        let response = self
            .complete(&self.planner_model, system, request.text.clone())
            .await?;
        let raw = parse_plan_response(&response)?;
        resolve_plan(raw, &request.text)
    }
}

#[async_trait]
impl WritingRepository for OpenAiLlmRepository {
    async fn write(&self, request: &WritingRequest) -> Result<String, String> {
        let model = if request.style.fast_model {
            &self.fast_writer_model
        } else {
            &self.writer_model
        };
        let system = writer_prompt(request);
        let script = self
            .complete(model, system, request.excerpt.clone())
            .await?;
        Ok(script.trim().to_string())
    }
}

fn planner_prompt(request: &PlanningRequest) -> String {
    format!(
        "You are the showrunner of an audiobook adaptation. The user message is the full \
         source text ({category}). Split it into exactly {count} consecutive segments that \
         follow the order of the text and together cover all of it. For each segment give a \
         short title in {language}, a one-sentence summary, and start_quote: the first 8 to 15 \
         words of the segment copied verbatim from the source. Also give a title for the whole \
         audiobook. Reply with JSON only, shaped as \
         {{\"title\": \"...\", \"segments\": [{{\"title\": \"...\", \"summary\": \"...\", \
         \"start_quote\": \"...\"}}]}}.",
        category = request.category.label(),
        count = request.segment_count,
        language = request.language.name(),
    )
}

fn writer_prompt(request: &WritingRequest) -> String {
    let style = &request.style;
    let voice = match style.narrative_mode {
        NarrativeMode::Mentor => "a patient mentor guiding the listener through the material",
        NarrativeMode::Friend => "a close friend explaining it casually",
        NarrativeMode::Lover => "a warm partner talking softly to the listener",
        NarrativeMode::RadioShow => "two radio hosts discussing the material with each other",
    };
    let format = if style.narrative_mode == NarrativeMode::RadioShow {
        " Write it as a dialogue: start every line with \"Host 1:\" or \"Host 2:\", let the \
         hosts take turns, and keep each turn to one or two sentences."
    } else {
        ""
    };
    let listener = if style.listener_name.trim().is_empty() {
        String::new()
    } else {
        format!(" Address the listener as {}.", style.listener_name.trim())
    };

    format!(
        "You write the narration for one segment of an audiobook about {category}. Segment \
         {number}: \"{title}\" ({summary}). The user message is the source excerpt for this \
         segment only. Narrate it in {language} as {voice}.{listener}{format} Write plain \
         spoken text with no markdown, headings, lists or stage directions, and do not \
         mention other segments.",
        category = style.category.label(),
        number = request.descriptor.index + 1,
        title = request.descriptor.title,
        summary = request.descriptor.summary,
        language = style.language.name(),
    )
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    title: String,
    segments: Vec<RawSegment>,
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    start_quote: String,
}

/// Parse the JSON object in a model reply, ignoring any text around it
fn parse_plan_response(response: &str) -> Result<RawPlan, String> {
    let start = response.find('{');
    let end = response.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => return Err("planner reply contains no JSON object".to_string()),
    };
    serde_json::from_str(json).map_err(|e| format!("planner reply is not a valid plan: {}", e))
}

/// Turn start quotes into contiguous byte spans over `source`.
///
/// The first segment always starts at 0 and each segment ends where the next
/// one starts. Quotes must appear in order.
fn resolve_plan(raw: RawPlan, source: &str) -> Result<Plan, String> {
    if raw.segments.is_empty() {
        return Err("planner returned no segments".to_string());
    }

    let mut starts = Vec::with_capacity(raw.segments.len());
    for (index, segment) in raw.segments.iter().enumerate() {
        if index == 0 {
            starts.push(0);
            continue;
        }
        let previous = starts[index - 1];
        let from = next_char_boundary(source, previous);
        let start = locate_quote(source, from, &segment.start_quote).ok_or_else(|| {
            format!(
                "start quote of segment {} not found after byte {}: {:?}",
                index, from, segment.start_quote
            )
        })?;
        starts.push(start);
    }

    let segments = raw
        .segments
        .into_iter()
        .enumerate()
        .map(|(index, segment)| SegmentDescriptor {
            index,
            title: segment.title.trim().to_string(),
            start: starts[index],
            end: starts.get(index + 1).copied().unwrap_or(source.len()),
            summary: segment.summary.trim().to_string(),
        })
        .collect();

    Ok(Plan {
        title: raw.title.trim().to_string(),
        segments,
    })
}

fn next_char_boundary(source: &str, at: usize) -> usize {
    source[at..]
        .chars()
        .next()
        .map(|c| at + c.len_utf8())
        .unwrap_or(source.len())
}

/// Byte offset of `quote` in `source[from..]`, retrying with a shorter prefix
/// when the model paraphrased the tail of the quote
fn locate_quote(source: &str, from: usize, quote: &str) -> Option<usize> {
    let quote = quote.trim();
    if quote.is_empty() {
        return None;
    }
    let haystack = &source[from..];
    if let Some(found) = haystack.find(quote) {
        return Some(from + found);
    }
    let prefix_end = quote
        .char_indices()
        .nth(MIN_QUOTE_PREFIX_CHARS)
        .map(|(i, _)| i)?;
    haystack.find(&quote[..prefix_end]).map(|found| from + found)
}
