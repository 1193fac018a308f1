//! Re-render Harlowe source from a (possibly merged) segment tree.
//!
//! Rendering is the inverse of [`crate::parser`], but deliberately not
//! byte-exact: macros are always written as `(name: args)` with a single
//! space after the colon, and links are rebuilt from label and target.
//! Translated content itself is never lost.

use std::collections::BTreeMap;

use crate::document::{Document, Passage};
use crate::escape::escape_passage_text;
use crate::segment::{ALIGN_CENTER, Segment};

/// Output form of a rendered passage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Plain Harlowe source.
    Raw,
    /// Entity-escaped, ready to replace the text of a `<tw-passagedata>`.
    #[default]
    Escaped,
}

pub fn render_segment(segment: &Segment) -> String {
    let mut out = String::new();
    write_segment(segment, &mut out);
    out
}

pub fn render_segments(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        write_segment(segment, &mut out);
    }
    out
}

fn write_segment(segment: &Segment, out: &mut String) {
    match segment {
        Segment::Text(text) => out.push_str(&text.src),
        Segment::Link(link) => {
            out.push_str("[[");
            out.push_str(&link.label);
            if !link.target.is_empty() && link.target != link.label {
                out.push_str("->");
                out.push_str(&link.target);
            }
            out.push_str("]]");
        }
        Segment::Macro(m) => {
            out.push('(');
            out.push_str(&m.name);
            out.push_str(": ");
            out.push_str(&m.args);
            out.push(')');
            if let Some(hook) = &m.hook {
                write_hook(&hook.segments, out);
            }
        }
        Segment::Hook(hook) => write_hook(&hook.segments, out),
        Segment::Tag(tag) => out.push_str(&tag.src),
        Segment::Var(var) => out.push_str(&var.src),
        Segment::AlignCenter(_) => out.push_str(ALIGN_CENTER),
        Segment::Other(other) => out.push_str(&other.src),
    }
}

fn write_hook(children: &[Segment], out: &mut String) {
    out.push('[');
    for child in children {
        write_segment(child, out);
    }
    out.push(']');
}

/// Render one passage in the requested form.
pub fn render_passage(passage: &Passage, mode: RenderMode) -> String {
    let raw = render_segments(&passage.segments);
    match mode {
        RenderMode::Raw => raw,
        RenderMode::Escaped => escape_passage_text(&raw),
    }
}

/// Render every passage, keyed by passage name.
pub fn render_document(document: &Document, mode: RenderMode) -> BTreeMap<String, String> {
    document
        .iter()
        .map(|(name, passage)| (name.clone(), render_passage(passage, mode)))
        .collect()
}
