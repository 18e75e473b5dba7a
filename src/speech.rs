//! Text preparation for speech output
//!
//! Replies are read aloud, so anything a voice cannot say (markdown markup,
//! links, emoji) is stripped, and long replies are cut into sentence-ended
//! chunks that can be synthesized independently.

use std::sync::LazyLock;

use regex::Regex;

/// Default chunk threshold in characters
pub const DEFAULT_CHUNK_CHARS: usize = 100;

static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*{1,3}([^*]+)\*{1,3}").expect("valid regex"));

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+").expect("valid regex"));

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid regex"));

static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid regex"));

static RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^-{3,}$").expect("valid regex"));

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[-*•]\s+").expect("valid regex"));

static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\.\s+").expect("valid regex"));

static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"[\x{1F600}-\x{1F64F}\x{1F300}-\x{1F5FF}\x{1F680}-\x{1F6FF}\x{1F1E0}-\x{1F1FF}",
        r"\x{2600}-\x{27BF}\x{FE00}-\x{FE0F}\x{1F900}-\x{1F9FF}",
        r"\x{200D}\x{20E3}\x{E0020}-\x{E007F}]"
    ))
    .expect("valid regex")
});

static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Strip formatting a text-to-speech voice would read out literally
///
/// Markdown emphasis and link text are kept, markup and URLs are dropped,
/// list markers and headers are removed, emoji are deleted, and runs of
/// blank lines collapse to one.
#[must_use]
pub fn sanitize_for_speech(text: &str) -> String {
    let text = EMPHASIS.replace_all(text, "$1");
    let text = HEADER.replace_all(&text, "");
    let text = LINK.replace_all(&text, "$1");
    let text = BARE_URL.replace_all(&text, "");
    let text = RULE.replace_all(&text, "");
    let text = BULLET.replace_all(&text, "");
    let text = NUMBERED.replace_all(&text, "");
    let text = EMOJI.replace_all(&text, "");
    let text = BLANK_RUN.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Split text into chunks for incremental synthesis
///
/// Text up to `threshold` characters stays whole. Longer text is cut at the
/// first `.` found at or past `threshold` characters, the period staying with
/// the chunk before it; text with no such period is emitted as one chunk.
/// Chunks are trimmed and never empty.
#[must_use]
pub fn split_chunks(text: &str, threshold: usize) -> Vec<String> {
    let threshold = if threshold == 0 { DEFAULT_CHUNK_CHARS } else { threshold };
    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        // Byte offset of the character at `threshold`, if the text is longer
        let Some((start, _)) = remaining.char_indices().nth(threshold) else {
            chunks.push(remaining.trim().to_string());
            break;
        };

        let Some(dot) = remaining[start..].find('.').map(|i| start + i) else {
            chunks.push(remaining.trim().to_string());
            break;
        };

        chunks.push(remaining[..=dot].trim().to_string());
        remaining = &remaining[dot + 1..];
    }

    chunks.retain(|c| !c.is_empty());
    chunks
}
