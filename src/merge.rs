//! Merge a translated skeleton back into an extracted document.
//!
//! The merge never touches its input: it clones the document first and only
//! writes translatable fields of the clone. Anything it cannot apply is
//! logged, recorded as a [`MergeIssue`], and counted as a problem when
//! running in strict mode so the caller can decide pass or fail.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::document::{Document, Passage};
use crate::scanner::{escape_literal, find_first_literal};
use crate::segment::{Segment, index_paths, segment_at_path_mut};
use crate::skeleton::{Field, Skeleton, is_translatable_macro, split_key};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Count unresolved references and incompatible entries as problems.
    pub strict: bool,
    /// Apply translations that are empty or whitespace-only.
    pub apply_empty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeIssueKind {
    UnknownPassage,
    MalformedKey,
    UnknownSegment,
    FieldMismatch,
    NonTranslatableMacro,
    NoStringLiteral,
}

/// One skeleton entry that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeIssue {
    pub passage: String,
    /// The skeleton key, absent for passage-level issues.
    pub key: Option<String>,
    pub kind: MergeIssueKind,
    pub message: String,
}

impl fmt::Display for MergeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The merged copy of the input document.
    pub document: Document,
    /// Number of issues counted as problems (only non-zero in strict mode).
    pub problems: usize,
    /// Every issue encountered, strict or not.
    pub issues: Vec<MergeIssue>,
    /// Number of fields written.
    pub applied: usize,
}

impl MergeOutcome {
    pub fn is_clean(&self) -> bool {
        self.problems == 0
    }
}

/// Splice skeleton translations into a copy of `document`.
///
/// # Arguments
/// * `document` - The extraction tree; left untouched
/// * `skeleton` - Translated skeleton entries keyed by passage then `id.field`
/// * `options` - Strictness and empty-value handling
///
/// # Example
/// ```ignore
/// let mut skeleton = Skeleton::new();
/// skeleton.with_entry("Start", "s0001.label", "打开门");
/// let outcome = merge(&document, &skeleton, MergeOptions::default());
/// assert_eq!(outcome.problems, 0);
/// ```
pub fn merge(document: &Document, skeleton: &Skeleton, options: MergeOptions) -> MergeOutcome {
    let mut merger = Merger {
        options,
        problems: 0,
        issues: Vec::new(),
        applied: 0,
    };
    let mut merged = document.clone();

    for (passage_name, entries) in skeleton.iter() {
        match merged.get_mut(passage_name) {
            Some(passage) => merger.merge_passage(passage_name, passage, entries),
            None => merger.report(
                passage_name,
                None,
                MergeIssueKind::UnknownPassage,
                format!("Translation provided for unknown passage '{}'", passage_name),
            ),
        }
    }

    MergeOutcome {
        document: merged,
        problems: merger.problems,
        issues: merger.issues,
        applied: merger.applied,
    }
}

struct Merger {
    options: MergeOptions,
    problems: usize,
    issues: Vec<MergeIssue>,
    applied: usize,
}

impl Merger {
    fn report(&mut self, passage: &str, key: Option<&str>, kind: MergeIssueKind, message: String) {
        warn!(passage, key, "{}", message);
        if self.options.strict {
            self.problems += 1;
        }
        self.issues.push(MergeIssue {
            passage: passage.to_string(),
            key: key.map(str::to_string),
            kind,
            message,
        });
    }

    fn merge_passage(&mut self, passage_name: &str, passage: &mut Passage, entries: &BTreeMap<String, String>) {
        let paths = index_paths(&passage.segments);

        for (key, value) in entries {
            let Some((id, field)) = split_key(key) else {
                self.report(
                    passage_name,
                    Some(key),
                    MergeIssueKind::MalformedKey,
                    format!("Bad translation key '{}' in passage '{}' (missing .field)", key, passage_name),
                );
                continue;
            };

            let found = match paths.get(id) {
                Some(path) => segment_at_path_mut(&mut passage.segments, path),
                None => None,
            };
            let Some(segment) = found else {
                self.report(
                    passage_name,
                    Some(key),
                    MergeIssueKind::UnknownSegment,
                    format!(
                        "Translation key '{}' refers to unknown segment id in passage '{}'",
                        key, passage_name
                    ),
                );
                continue;
            };

            if !self.options.apply_empty && value.trim().is_empty() {
                debug!(passage = passage_name, key = key.as_str(), "skipping empty translation");
                continue;
            }

            if let Err((kind, message)) = apply(segment, field.parse().ok(), value) {
                self.report(passage_name, Some(key), kind, format!("Translation key '{}': {}", key, message));
            } else {
                self.applied += 1;
            }
        }
    }
}

/// Write `value` into the field of `segment` named by `field`.
fn apply(segment: &mut Segment, field: Option<Field>, value: &str) -> Result<(), (MergeIssueKind, String)> {
    match (segment, field) {
        (Segment::Text(text), Some(Field::Src)) => {
            text.src = value.to_string();
            Ok(())
        }
        (Segment::Link(link), Some(Field::Label)) => {
            // The target stays as extracted, even when it defaulted to the label.
            link.label = value.to_string();
            Ok(())
        }
        (Segment::Macro(m), Some(Field::Args)) => {
            if !is_translatable_macro(&m.name) {
                return Err((
                    MergeIssueKind::NonTranslatableMacro,
                    format!("macro '{}' is not in the translatable set; ignored", m.name),
                ));
            }
            match replace_first_literal(&m.args, value) {
                Some(args) => {
                    m.args = args;
                    Ok(())
                }
                None => Err((
                    MergeIssueKind::NoStringLiteral,
                    format!("no string literal in args of macro '{}'; translation ignored", m.name),
                )),
            }
        }
        (segment, _) => Err((
            MergeIssueKind::FieldMismatch,
            format!("does not match segment type/field (type={})", segment.kind()),
        )),
    }
}

/// Replace the content of the first string literal in `args` with `value`,
/// escaped for that literal's quote. Every byte outside the literal is kept.
///
/// Returns `None` when `args` has no string literal.
///
/// # Example
/// ```ignore
/// assert_eq!(replace_first_literal(r#""Hello", 5"#, "你好").unwrap(), r#""你好", 5"#);
/// ```
pub fn replace_first_literal(args: &str, value: &str) -> Option<String> {
    let span = find_first_literal(args)?;
    let content_end = if span.terminated { span.end - 1 } else { span.end };
    let mut out = String::with_capacity(args.len() + value.len());
    out.push_str(&args[..=span.start]);
    out.push_str(&escape_literal(value, span.quote));
    if span.terminated {
        out.push_str(&args[content_end..]);
    } else {
        out.push(span.quote);
    }
    Some(out)
}
