//! ANSI escape code sanitization
//!
//! Subprocess output is stripped of color/style sequences and trailing
//! whitespace before it is displayed or matched against prompt rules.
//! Only SGR sequences (`ESC [ <params> m`) are removed; cursor movement and
//! other escape families pass through untouched.

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches `ESC [ <params> m`
static SGR_SEQUENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("SGR pattern is a valid regex"));

/// A sequence that may still become SGR once more bytes arrive
static PARTIAL_SGR_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b(?:\[[0-9;]*)?\z").expect("SGR tail pattern is a valid regex"));

/// Strip color codes and trailing whitespace from a chunk of output.
///
/// Line boundaries and leading whitespace are preserved, and `\r\n` collapses
/// to `\n` because the `\r` is trailing whitespace of its line. The function
/// is idempotent: `sanitize(&sanitize(t)) == sanitize(t)`.
pub fn sanitize(raw: &str) -> String {
    let stripped = strip_sgr(raw);

    let mut out = String::with_capacity(stripped.len());
    for (i, line) in stripped.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line.trim_end());
    }
    out
}

/// Remove SGR sequences until none remain.
///
/// A single pass is not enough: removing `ESC[0m` from `ESC ESC[0m [31m`
/// splices a brand new `ESC[31m` together.
pub fn strip_sgr(text: &str) -> String {
    let mut current = text.to_string();
    while SGR_SEQUENCE.is_match(&current) {
        current = SGR_SEQUENCE.replace_all(&current, "").into_owned();
    }
    current
}

/// Whether the text contains any SGR sequence
pub fn has_sgr(text: &str) -> bool {
    SGR_SEQUENCE.is_match(text)
}

/// Chunk-boundary aware [`sanitize`].
///
/// Trailing whitespace and a half-received SGR sequence at the end of a
/// chunk are held back until the next chunk shows whether they end a line
/// or continue it. Feeding a stream in any split produces the same text as
/// sanitizing it whole.
#[derive(Debug, Default)]
pub struct StreamSanitizer {
    held: String,
}

impl StreamSanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitize the next chunk
    pub fn feed(&mut self, chunk: &str) -> String {
        let mut text = std::mem::take(&mut self.held);
        text.push_str(chunk);

        let mut text = strip_sgr(&text);
        let keep = undecided_suffix_start(&text);
        self.held = text.split_off(keep);
        sanitize(&text)
    }

    /// End of stream: whatever was held back
    pub fn finish(&mut self) -> String {
        sanitize(&std::mem::take(&mut self.held))
    }

    /// Bytes held back from the last chunk
    pub fn held_len(&self) -> usize {
        self.held.len()
    }
}

fn undecided_suffix_start(text: &str) -> usize {
    let end = PARTIAL_SGR_TAIL
        .find(text)
        .map_or(text.len(), |m| m.start());
    text[..end]
        .trim_end_matches(|c: char| c.is_whitespace() && c != '\n')
        .len()
}

/// Incremental UTF-8 decoder for byte chunks read from a pipe.
///
/// A multi-byte character split across two reads is held back until the
/// rest of it arrives instead of being replaced with U+FFFD.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    carry: Vec<u8>,
}

impl ChunkDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, keeping an incomplete trailing sequence for next time
    pub fn decode(&mut self, data: &[u8]) -> String {
        self.carry.extend_from_slice(data);

        let mut text = String::with_capacity(self.carry.len());
        let mut rest = &self.carry[..];
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        // Invalid bytes: one replacement character, keep going
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the end: wait for the rest
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.carry = rest.to_vec();
        text
    }

    /// Flush whatever is left at end of stream
    pub fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.carry).into_owned();
        self.carry.clear();
        text
    }

    /// Number of bytes waiting for completion
    pub fn pending_bytes(&self) -> usize {
        self.carry.len()
    }
}
