use std::sync::LazyLock;

use regex::Regex;

use crate::escape::unescape_entities;
use crate::scanner::{char_len_at, macro_head_colon, scan_balanced};
use crate::segment::{
    ALIGN_CENTER, HookSegment, LinkSegment, MacroHook, MacroSegment, Segment, assign_ids,
    content_hash,
};

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<[^>]+>").expect("valid tag pattern"));
static VAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$[A-Za-z_][A-Za-z0-9_]*").expect("valid variable pattern"));

/// A recognizer either claims the input at `start`, returning the index just
/// past what it consumed and the segment it built, or declines.
type Recognizer = fn(&str, usize) -> Option<(usize, Segment)>;

/// Recognizers in priority order. The first one to claim a position wins.
const RECOGNIZERS: &[Recognizer] = &[
    recognize_align_center,
    recognize_link,
    recognize_macro,
    recognize_tag,
    recognize_hook,
    recognize_var,
];

/// Tokenizer for Harlowe passage source.
///
/// The input must already be unescaped from the `<tw-passagedata>` entity
/// encoding. Parsing never fails: malformed markup degrades to text or to a
/// span that runs to the end of the input.
pub struct Parser<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser { input, position: 0 }
    }

    /// Tokenize the whole input into a segment tree without identifiers.
    pub fn parse(&mut self) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut text_start = self.position;

        'scan: while self.position < self.input.len() {
            for recognize in RECOGNIZERS {
                if let Some((end, segment)) = recognize(self.input, self.position) {
                    flush_text(&self.input[text_start..self.position], &mut segments);
                    segments.push(segment);
                    self.position = end;
                    text_start = end;
                    continue 'scan;
                }
            }
            self.position += char_len_at(self.input, self.position);
        }
        flush_text(&self.input[text_start..], &mut segments);
        segments
    }
}

fn flush_text(text: &str, segments: &mut Vec<Segment>) {
    if !text.is_empty() {
        segments.push(Segment::text(text));
    }
}

/// Tokenize `src` and assign identifiers.
///
/// # Example
/// ```ignore
/// let segments = tokenize("Hello $name");
/// assert_eq!(segments[1].id(), "s0002");
/// ```
pub fn tokenize(src: &str) -> Vec<Segment> {
    let mut segments = Parser::new(src).parse();
    assign_ids(&mut segments);
    segments
}

fn recognize_align_center(src: &str, start: usize) -> Option<(usize, Segment)> {
    src[start..]
        .starts_with(ALIGN_CENTER)
        .then(|| (start + ALIGN_CENTER.len(), Segment::align_center()))
}

/// `[[label]]` or `[[label->target]]`.
///
/// The body is found by a flat search for the next `]]`, so a label cannot
/// contain that sequence. An unterminated `[[` is declined.
fn recognize_link(src: &str, start: usize) -> Option<(usize, Segment)> {
    if !src[start..].starts_with("[[") {
        return None;
    }
    let body_start = start + 2;
    let close = src[body_start..].find("]]")? + body_start;
    let end = close + 2;
    let inner = &src[body_start..close];
    let (label, target) = match inner.split_once("->") {
        Some((label, target)) => (
            unescape_entities(label.trim()),
            unescape_entities(target.trim()),
        ),
        None => {
            let label = unescape_entities(inner.trim());
            (label.clone(), label)
        }
    };
    let hash = content_hash(&label);
    Some((
        end,
        Segment::Link(LinkSegment {
            id: String::new(),
            src: src[start..end].to_string(),
            label,
            target,
            hash,
        }),
    ))
}

/// `(name: args)` optionally followed directly by a `[hook]`.
fn recognize_macro(src: &str, start: usize) -> Option<(usize, Segment)> {
    let colon = macro_head_colon(src, start)?;
    let (macro_end, raw) = scan_balanced(src, start, b'(', b')');
    let body_end = start + 1 + span_body(raw, b'(', b')').len();
    let name = src[start + 1..colon].trim().to_string();
    let args = src[(colon + 1).min(body_end)..body_end].trim().to_string();

    let mut end = macro_end;
    let hook = if src[macro_end..].starts_with('[') {
        let (hook_end, hook_src) = scan_balanced(src, macro_end, b'[', b']');
        end = hook_end;
        Some(MacroHook {
            src: hook_src.to_string(),
            segments: Parser::new(span_body(hook_src, b'[', b']')).parse(),
        })
    } else {
        None
    };

    Some((
        end,
        Segment::Macro(MacroSegment {
            id: String::new(),
            name,
            args,
            src: raw.to_string(),
            hook,
        }),
    ))
}

fn recognize_tag(src: &str, start: usize) -> Option<(usize, Segment)> {
    let found = HTML_TAG.find(&src[start..])?;
    Some((start + found.end(), Segment::tag(found.as_str())))
}

/// A bare `[hook]` that is not the start of a link.
fn recognize_hook(src: &str, start: usize) -> Option<(usize, Segment)> {
    let rest = &src[start..];
    if !rest.starts_with('[') || rest.starts_with("[[") {
        return None;
    }
    let (end, raw) = scan_balanced(src, start, b'[', b']');
    Some((
        end,
        Segment::Hook(HookSegment {
            id: String::new(),
            src: raw.to_string(),
            segments: Parser::new(span_body(raw, b'[', b']')).parse(),
        }),
    ))
}

fn recognize_var(src: &str, start: usize) -> Option<(usize, Segment)> {
    let found = VAR_TOKEN.find(&src[start..])?;
    Some((start + found.end(), Segment::var(found.as_str())))
}

/// Content of a span returned by `scan_balanced` without its delimiters.
/// A span that ran to the end of input unclosed only loses its opener.
fn span_body(raw: &str, open: u8, close: u8) -> &str {
    let body = &raw[1..];
    let opens = raw.bytes().filter(|&b| b == open).count();
    let closes = raw.bytes().filter(|&b| b == close).count();
    if opens == closes {
        body.strip_suffix(char::from(close)).unwrap_or(body)
    } else {
        body
    }
}
