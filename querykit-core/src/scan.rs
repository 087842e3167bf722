//! Byte-level scanning helpers shared by the template rewriter and the binder.
//!
//! Every delimiter the engine looks for is ASCII, so byte offsets found
//! here are always valid `str` slice boundaries.

use std::ops::Range;

const QUOTES: [u8; 3] = [b'\'', b'"', b'`'];

/// `[A-Za-z0-9_]`.
pub(crate) const fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Byte ranges of `text` that lie outside quoted string literals, quoted
/// identifiers and comments. A doubled quote closes one span and opens the
/// next, so `'it''s'` is covered entirely. An unterminated quote or block
/// comment runs to the end. A `--` comment stops before its newline.
pub(crate) fn unquoted_ranges(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut idx = 0;
    while idx < bytes.len() {
        let Some(end) = opaque_span_end(bytes, idx) else {
            idx += 1;
            continue;
        };
        if start < idx {
            ranges.push(start..idx);
        }
        idx = end;
        start = idx;
    }
    if start < bytes.len() {
        ranges.push(start..bytes.len());
    }
    ranges
}

/// End of the quoted span or comment opening at `idx`, if one opens there.
fn opaque_span_end(bytes: &[u8], idx: usize) -> Option<usize> {
    let rest = &bytes[idx..];
    if rest.starts_with(b"--") {
        return Some(
            rest.iter()
                .position(|&b| b == b'\n')
                .map_or(bytes.len(), |offset| idx + offset),
        );
    }
    if rest.starts_with(b"/*") {
        return Some(
            rest[2..]
                .windows(2)
                .position(|pair| pair == b"*/")
                .map_or(bytes.len(), |offset| idx + offset + 4),
        );
    }
    let quote = rest[0];
    if !QUOTES.contains(&quote) {
        return None;
    }
    Some(
        rest[1..]
            .iter()
            .position(|&b| b == quote)
            .map_or(bytes.len(), |offset| idx + offset + 2),
    )
}

/// Returns `true` if `key` occurs at `pos` without being glued to word
/// characters on an edge where the key itself is a word character.
///
/// `:id` therefore matches in `id = :id,` but not in `id = :id2`.
pub(crate) fn key_at(text: &str, pos: usize, key: &str) -> bool {
    let bytes = text.as_bytes();
    let key_bytes = key.as_bytes();
    let (Some(&first), Some(&last)) = (key_bytes.first(), key_bytes.last()) else {
        return false;
    };
    if !bytes[pos..].starts_with(key_bytes) {
        return false;
    }
    let end = pos + key_bytes.len();
    let left_ok = !is_word_byte(first) || pos == 0 || !is_word_byte(bytes[pos - 1]);
    let right_ok = !is_word_byte(last) || end == bytes.len() || !is_word_byte(bytes[end]);
    left_ok && right_ok
}

/// Occurrences of `key` outside quoted spans, as `(start, end)` offsets.
pub(crate) fn find_key(text: &str, key: &str) -> Vec<Range<usize>> {
    let mut found = Vec::new();
    for range in unquoted_ranges(text) {
        let mut pos = range.start;
        while pos + key.len() <= range.end {
            if key_at(text, pos, key) {
                found.push(pos..pos + key.len());
                pos += key.len();
            } else {
                pos += 1;
            }
        }
    }
    found
}

/// Applies `edits` (ascending, non-overlapping byte ranges paired with
/// their replacement) to `text`.
pub(crate) fn splice(text: &str, edits: Vec<(Range<usize>, String)>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    for (range, replacement) in edits {
        out.push_str(&text[copied..range.start]);
        out.push_str(&replacement);
        copied = range.end;
    }
    out.push_str(&text[copied..]);
    out
}
