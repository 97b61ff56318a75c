use regex::Regex;
use std::sync::OnceLock;

fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // "Host 1:", "Speaker2 -", "H1:", "화자 1:", "[Host 2]", optionally behind a list bullet
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*[-*]?\s*(?:\[\s*(?:host|speaker|화자)\s*([12])\s*\]\s*[:：]?|(?:host|speaker|화자|h)\s*([12])\s*[:：\-])\s*",
        )
        .expect("speaker label pattern is valid")
    })
}

/// One uninterrupted turn of a radio show host (0 or 1).
///
/// `start..end` is a byte span of the script that excludes the speaker label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueTurn {
    pub speaker: usize,
    pub start: usize,
    pub end: usize,
}

/// Split a speaker-labelled script into turns.
///
/// A labelled line opens a turn; unlabelled lines continue the current one.
/// Text before the first label belongs to the first host, so a script without
/// any label is a single turn.
pub fn parse_dialogue(text: &str) -> Vec<DialogueTurn> {
    let mut turns = Vec::new();
    let mut current: Option<DialogueTurn> = None;
    let mut line_start = 0;

    for line in text.split_inclusive('\n') {
        let content_end = line_start + line.trim_end().len();

        match label_pattern().captures(line) {
            Some(captures) => {
                if let Some(turn) = current.take() {
                    push_turn(text, &mut turns, turn);
                }
                let speaker = captures
                    .get(1)
                    .or_else(|| captures.get(2))
                    .map_or(0, |m| if m.as_str() == "2" { 1 } else { 0 });
                let start = line_start + captures.get(0).map_or(0, |m| m.end());
                current = Some(DialogueTurn {
                    speaker,
                    start,
                    end: content_end.max(start),
                });
            }
            None if !line.trim().is_empty() => match current.as_mut() {
                Some(turn) => turn.end = content_end,
                None => {
                    current = Some(DialogueTurn {
                        speaker: 0,
                        start: line_start,
                        end: content_end,
                    })
                }
            },
            None => {}
        }

        line_start += line.len();
    }

    if let Some(turn) = current {
        push_turn(text, &mut turns, turn);
    }

    turns
}

fn push_turn(text: &str, turns: &mut Vec<DialogueTurn>, turn: DialogueTurn) {
    if !text[turn.start..turn.end].trim().is_empty() {
        turns.push(turn);
    }
}
