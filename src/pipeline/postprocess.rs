//! Post-processing: deterministic cleanup of model transcriptions.
//!
//! Even with "output only the transcription" in the prompt, models
//! sometimes wrap their answer in a code fence, use CRLF line endings or
//! sprinkle zero-width characters. These rules fix the envelope and never
//! touch the words themselves; in particular bracket alternatives such as
//! `valve[3/8]` or `[pump, pipe]` pass through unchanged.
//!
//! [`find_alternatives`] is a read-only scanner over those bracket spans,
//! used for per-item statistics.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Apply all cleanup rules to a raw transcription.
///
/// Rules (applied in order):
/// 1. Strip an outer code fence
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, …)
/// 4. Trim trailing whitespace per line
/// 5. Trim leading/trailing blank lines
pub fn clean_transcription(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    s.trim_matches('\n').to_string()
}

// ── Rule 1: Strip outer fence ────────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\r?\n(.*?)\r?\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Strip invisible characters ───────────────────────────────────────

const INVISIBLE: [char; 6] = [
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}',
];

fn remove_invisible_chars(input: &str) -> String {
    input.chars().filter(|c| !INVISIBLE.contains(c)).collect()
}

// ── Rule 4: Trim trailing whitespace ─────────────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Bracket alternatives ─────────────────────────────────────────────────────

/// An unresolved span such as `valve[3/8]` or `[pump, pipe, pipe]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeSpan {
    /// Word the brackets are attached to (`valve` in `valve[3/8]`), if any.
    pub word: Option<String>,
    pub alternatives: Vec<String>,
    /// Byte offset of the span in the text.
    pub offset: usize,
}

static RE_ALTERNATIVES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^\s\[\]]*)\[([^\[\]\n]+)\]").unwrap());

/// Find bracket-alternative spans. Brackets without a `/` or `,` separator
/// (`[sic]`, `[1]`) are not alternatives and are skipped.
pub fn find_alternatives(text: &str) -> Vec<AlternativeSpan> {
    RE_ALTERNATIVES
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = &caps[2];
            let sep = if inner.contains('/') {
                '/'
            } else if inner.contains(',') {
                ','
            } else {
                return None;
            };
            let alternatives: Vec<String> = inner
                .split(sep)
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from)
                .collect();
            if alternatives.len() < 2 {
                return None;
            }
            let word = caps.get(1).map(|m| m.as_str()).filter(|w| !w.is_empty());
            Some(AlternativeSpan {
                word: word.map(String::from),
                alternatives,
                offset: whole.start(),
            })
        })
        .collect()
}
