//! HTML entity handling for passage text.
//!
//! Twine stores passage source entity-escaped inside `<tw-passagedata>`.
//! Rendering uses the same fixed five-entity scheme the Twine editor writes;
//! decoding accepts the full HTML entity table.

/// Escape passage source for embedding in `<tw-passagedata>`.
///
/// Order matters: `&` goes first so the entities introduced by the later
/// replacements are not escaped again.
pub fn escape_passage_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Decode HTML entities, named or numeric, in passage source.
///
/// Unknown entities and a bare `&` are left untouched.
pub fn unescape_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}
