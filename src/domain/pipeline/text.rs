use html2text::from_read;
use regex::Regex;
use std::sync::OnceLock;

fn html_tag() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"</?[a-zA-Z][^>]*>").expect("html tag pattern is valid"))
}

fn url() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://[^\s)\]]+").expect("url pattern is valid"))
}

fn paragraph_break() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\n[ \t\r]*\n").expect("paragraph pattern is valid"))
}

fn whitespace() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Normalize source text before planning.
///
/// HTML is converted to text, URLs are removed, whitespace inside a paragraph
/// collapses to single spaces and paragraphs are separated by one blank line.
pub fn clean_text(text: &str) -> String {
    let plain_text = if html_tag().is_match(text) {
        from_read(text.as_bytes(), usize::MAX)
    } else {
        text.to_string()
    };

    let without_urls = url().replace_all(&plain_text, "");

    paragraph_break()
        .split(&without_urls)
        .map(|paragraph| whitespace().replace_all(paragraph, " ").trim().to_string())
        .filter(|paragraph| !paragraph.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
