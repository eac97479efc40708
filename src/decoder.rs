//! Decoder for Ollama's streamed `/api/generate` output.
//!
//! With `"stream": true` Ollama answers with one JSON object per line:
//!
//! ```text
//! {"model":"llava","response":"The","done":false}
//! {"model":"llava","response":" cat","done":false}
//! {"model":"llava","response":"","done":true,"total_duration":123}
//! ```
//!
//! The body is not a single JSON document, so each line is scanned on its
//! own for the `"response":"` field and the string value is cut out with a
//! backslash-parity scan. Lines that cannot be read are skipped; the decode
//! itself never fails and reports degraded outcomes as sentinel strings.
//!
//! Only the `\n`, `\r`, `\t`, `\"` and `\\` escapes are translated. `\uXXXX`
//! sequences are passed through untouched.

use std::panic::{self, AssertUnwindSafe};
use tracing::{error, warn};

/// Returned when the upstream body is empty or whitespace.
pub const EMPTY_STREAM: &str = "The model returned an empty response stream.";

/// Returned when no line carried any text.
pub const NO_CONTENT: &str = "No content could be extracted from the model response.";

/// Prefix of the sentinel returned when the decode pass itself blows up.
pub const DECODE_FAILED: &str = "Failed to decode the model response";

const RESPONSE_MARKER: &str = "\"response\":\"";
const DIAGNOSTIC_PREFIX_CHARS: usize = 500;

/// Rebuild the full answer from a buffered stream body.
///
/// Fragments are concatenated in line order. Returns [`EMPTY_STREAM`] for a
/// blank body, [`NO_CONTENT`] when nothing was extracted, and a message
/// starting with [`DECODE_FAILED`] if the pass aborts unexpectedly.
pub fn decode_stream(body: &str) -> String {
    if body.trim().is_empty() {
        return EMPTY_STREAM.to_string();
    }

    match panic::catch_unwind(AssertUnwindSafe(|| fragments(body).collect::<String>())) {
        Ok(answer) if answer.is_empty() => NO_CONTENT.to_string(),
        Ok(answer) => answer,
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            let head: String = body.chars().take(DIAGNOSTIC_PREFIX_CHARS).collect();
            error!(reason = %reason, body = %head, "Stream decode aborted");
            format!("{}: {}", DECODE_FAILED, reason)
        }
    }
}

/// Lazily yield the unescaped text fragment of every readable line.
///
/// Blank lines, lines without a `"response"` string, and lines whose string
/// never terminates are skipped (the last with a warning).
pub fn fragments(body: &str) -> Fragments<'_> {
    Fragments {
        lines: body.lines().enumerate(),
    }
}

/// Iterator returned by [`fragments`].
pub struct Fragments<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl Iterator for Fragments<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for (index, line) in self.lines.by_ref() {
            match extract_fragment(line) {
                LineFragment::Text(text) => return Some(text),
                LineFragment::Absent => continue,
                LineFragment::Unterminated => {
                    warn!(line = index + 1, "Skipping stream line with unterminated response string");
                }
            }
        }
        None
    }
}

/// What a single stream line contributed.
#[derive(Debug, PartialEq)]
enum LineFragment {
    Text(String),
    Absent,
    Unterminated,
}

fn extract_fragment(line: &str) -> LineFragment {
    if line.trim().is_empty() {
        return LineFragment::Absent;
    }

    let Some(start) = line.find(RESPONSE_MARKER) else {
        return LineFragment::Absent;
    };
    let value = &line[start + RESPONSE_MARKER.len()..];

    match find_closing_quote(value) {
        Some(end) => LineFragment::Text(unescape(&value[..end])),
        None => LineFragment::Unterminated,
    }
}

/// Byte offset of the first quote preceded by an even run of backslashes.
fn find_closing_quote(value: &str) -> Option<usize> {
    let mut backslashes = 0usize;
    for (i, byte) in value.bytes().enumerate() {
        match byte {
            b'\\' => backslashes += 1,
            b'"' if backslashes % 2 == 0 => return Some(i),
            _ => backslashes = 0,
        }
    }
    None
}

// Order matters: `\\` is collapsed last.
fn unescape(raw: &str) -> String {
    raw.replace("\\n", "\n")
        .replace("\\r", "\r")
        .replace("\\t", "\t")
        .replace("\\\"", "\"")
        .replace("\\\\", "\\")
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown error".to_string()
    }
}
