//! Low-level scanners shared by the tokenizer, skeleton builder, merge engine
//! and validator.
//!
//! Every scanner works on byte offsets into a `&str`. All delimiters Harlowe
//! cares about are ASCII, so any offset returned here is a valid char
//! boundary. None of the scanners fail: unbalanced or unterminated input is
//! consumed to the end of the text instead.

use std::sync::LazyLock;

use regex::Regex;

static MACRO_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("valid macro name pattern"));

/// Length in bytes of the character starting at `index`, or 1 past the end.
pub(crate) fn char_len_at(src: &str, index: usize) -> usize {
    src[index..].chars().next().map_or(1, char::len_utf8)
}

/// Scan a balanced region starting at an opening delimiter.
///
/// Depth tracking is naive: every `open` increments, every `close`
/// decrements, and quoted text is not treated specially. When the depth
/// never returns to zero the rest of the input is returned.
///
/// # Returns
/// `(end, span)` where `end` is the index just past the matching close and
/// `span` is the delimiter-inclusive substring.
///
/// # Example
/// ```ignore
/// let (end, span) = scan_balanced("a[b[c]]d", 1, b'[', b']');
/// assert_eq!((end, span), (7, "[b[c]]"));
/// ```
pub fn scan_balanced(src: &str, start: usize, open: u8, close: u8) -> (usize, &str) {
    let bytes = src.as_bytes();
    let mut depth: usize = 0;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        if b == open {
            depth += 1;
        } else if b == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return (i + 1, &src[start..=i]);
            }
        }
        i += 1;
    }
    (src.len(), &src[start..])
}

/// Location of a quoted string literal inside a larger text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralSpan {
    /// Index of the opening quote.
    pub start: usize,
    /// Index just past the closing quote (or end of text if unterminated).
    pub end: usize,
    /// The quote character, `"` or `'`.
    pub quote: char,
    /// False when the text ended before the closing quote.
    pub terminated: bool,
}

impl LiteralSpan {
    /// The raw (still escaped) content between the delimiters.
    pub fn inner<'a>(&self, text: &'a str) -> &'a str {
        let content_end = if self.terminated { self.end - 1 } else { self.end };
        &text[self.start + 1..content_end]
    }

    /// The delimiter-inclusive literal.
    pub fn raw<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// The decoded content of the literal.
    pub fn value(&self, text: &str) -> String {
        unescape_literal(self.inner(text))
    }
}

/// Find the end of a literal whose opening quote sits at `start`.
///
/// A backslash consumes the following byte unconditionally, so `\\` and
/// `\"` never close the literal. Returns the index just past the closing
/// quote, or `None` if the text runs out first.
pub(crate) fn skip_literal(src: &str, start: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' && i + 1 < bytes.len() {
            i += 2;
            continue;
        }
        if b == quote {
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

/// Locate the first string literal at or after `from`.
pub fn find_literal_from(text: &str, from: usize) -> Option<LiteralSpan> {
    let start = text.as_bytes()[from..]
        .iter()
        .position(|&b| b == b'"' || b == b'\'')
        .map(|offset| from + offset)?;
    let quote = char::from(text.as_bytes()[start]);
    let span = match skip_literal(text, start) {
        Some(end) => LiteralSpan {
            start,
            end,
            quote,
            terminated: true,
        },
        None => LiteralSpan {
            start,
            end: text.len(),
            quote,
            terminated: false,
        },
    };
    Some(span)
}

/// Locate the first string literal in `text`.
///
/// # Example
/// ```ignore
/// let span = find_first_literal(r#"5, "Hello", 'x'"#).unwrap();
/// assert_eq!(span.quote, '"');
/// assert_eq!(span.raw(r#"5, "Hello", 'x'"#), "\"Hello\"");
/// ```
pub fn find_first_literal(text: &str) -> Option<LiteralSpan> {
    find_literal_from(text, 0)
}

/// Decoded content of the first string literal in `text`, if any.
pub fn first_literal_value(text: &str) -> Option<String> {
    find_first_literal(text).map(|span| span.value(text))
}

/// Replace each backslash-escaped pair with the escaped character.
///
/// Multi-character escape codes (`\n`, `\u{..}`) are not interpreted: `\n`
/// decodes to `n`. A trailing lone backslash is kept as is.
pub fn unescape_literal(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Escape `value` so it can sit between two `quote` characters.
///
/// Backslashes are escaped first so the quote escapes are not doubled.
pub fn escape_literal(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        if c == '\\' || c == quote {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Index of the top-level colon if the parenthesised group at `start` is a
/// macro head such as `(link-goto: "x")`.
///
/// Quoted literals are skipped whole so their content never affects depth or
/// satisfies the colon test. The plain characters seen at depth one before
/// the colon must form a macro name.
pub fn macro_head_colon(src: &str, start: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    if bytes.get(start) != Some(&b'(') {
        return None;
    }
    let mut depth: usize = 1;
    let mut candidate = String::new();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_literal(src, i)?;
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return None;
                }
            }
            b':' if depth == 1 => {
                return MACRO_NAME.is_match(candidate.trim()).then_some(i);
            }
            _ if depth == 1 => {
                let len = char_len_at(src, i);
                candidate.push_str(&src[i..i + len]);
                i += len;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Whether the parenthesised group at `start` is a macro invocation.
pub fn looks_like_macro_head(src: &str, start: usize) -> bool {
    macro_head_colon(src, start).is_some()
}
