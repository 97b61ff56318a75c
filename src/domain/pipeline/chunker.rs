use super::dialogue::parse_dialogue;
use super::model::SynthesisChunk;
use regex::Regex;
use std::sync::OnceLock;

/// Smallest ceiling that still fits any single UTF-8 character
const MIN_CHUNK_BYTES: usize = 4;

fn sentence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Sentence-ending punctuation (ASCII and full-width), closing quotes/brackets, trailing whitespace
    PATTERN.get_or_init(|| {
        Regex::new(r#"[.!?。！？]+["'”’)\]]*\s*"#).expect("sentence pattern is valid")
    })
}

/// Split text into ordered chunks of at most `max_bytes` UTF-8 bytes.
///
/// Sentences are packed greedily; a sentence that alone exceeds the ceiling is
/// cut at the last whitespace before the limit (or the last char boundary when
/// there is none). Chunks are trimmed and remember their byte offset in `text`.
/// Ceilings below 4 bytes are raised to 4.
pub fn split(text: &str, max_bytes: usize) -> Vec<SynthesisChunk> {
    let max_bytes = max_bytes.max(MIN_CHUNK_BYTES);
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut current: Option<(usize, usize)> = None;

    for (start, end) in sentence_spans(text) {
        if let Some((current_start, _)) = current {
            if end - current_start <= max_bytes {
                current = Some((current_start, end));
                continue;
            }
            spans.push((current_start, current.map_or(current_start, |(_, e)| e)));
        }

        if end - start <= max_bytes {
            current = Some((start, end));
        } else {
            let mut pieces = hard_split(text, start, end, max_bytes);
            // The tail of an oversized sentence can still take following sentences
            current = pieces.pop();
            spans.extend(pieces);
        }
    }

    if let Some(span) = current {
        spans.push(span);
    }

    spans
        .into_iter()
        .enumerate()
        .map(|(index, (start, end))| SynthesisChunk {
            index,
            text: text[start..end].to_string(),
            offset: start,
            speaker: 0,
        })
        .collect()
}

/// Split a speaker-labelled radio show script into chunks.
///
/// Every turn is chunked on its own with `split`, so no chunk mixes two hosts
/// and labels are never spoken. Offsets still point into `text`.
pub fn split_dialogue(text: &str, max_bytes: usize) -> Vec<SynthesisChunk> {
    let mut chunks = Vec::new();

    for turn in parse_dialogue(text) {
        for chunk in split(&text[turn.start..turn.end], max_bytes) {
            chunks.push(SynthesisChunk {
                index: chunks.len(),
                text: chunk.text,
                offset: turn.start + chunk.offset,
                speaker: turn.speaker,
            });
        }
    }

    chunks
}

/// Trimmed, non-empty sentence spans in order
fn sentence_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut last_end = 0;

    for mat in sentence_pattern().find_iter(text) {
        if let Some(span) = trim_span(text, last_end, mat.end()) {
            spans.push(span);
        }
        last_end = mat.end();
    }

    // Text after the last sentence boundary
    if let Some(span) = trim_span(text, last_end, text.len()) {
        spans.push(span);
    }

    spans
}

fn trim_span(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return None;
    }
    let trimmed_start = start + leading;
    Some((trimmed_start, trimmed_start + trimmed.len()))
}

/// Cut one oversized sentence into pieces no longer than `max_bytes`
fn hard_split(text: &str, start: usize, end: usize, max_bytes: usize) -> Vec<(usize, usize)> {
    let mut pieces = Vec::new();
    let mut pos = start;

    while end - pos > max_bytes {
        let mut limit = pos + max_bytes;
        while !text.is_char_boundary(limit) {
            limit -= 1;
        }

        let cut = match text[pos..limit].rfind(char::is_whitespace) {
            Some(i) if i > 0 => pos + i,
            _ => limit,
        };

        if let Some(span) = trim_span(text, pos, cut) {
            pieces.push(span);
        }

        pos = cut;
        while let Some(c) = text[pos..end].chars().next() {
            if !c.is_whitespace() {
                break;
            }
            pos += c.len_utf8();
        }
    }

    if let Some(span) = trim_span(text, pos, end) {
        pieces.push(span);
    }

    pieces
}
