//! Validate a translated document against the extraction it came from.
//!
//! The two documents are compared passage by passage and, within a passage,
//! segment by segment keyed on identifier. Because identifiers are
//! positional, keying on them walks hook children pairwise by position.
//!
//! Findings come in three severities:
//!
//! * **Error** - structural drift or a change to a non-translatable field
//! * **Warning** - content present only in the candidate
//! * **Untranslated** - a translatable field identical to the source; not an
//!   error, but worth a follow-up

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::document::{Document, Passage};
use crate::scanner::find_first_literal;
use crate::segment::{Segment, index_by_id, walk};
use crate::skeleton::is_translatable_macro;

static VAR_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[A-Za-z_][A-Za-z0-9_]*").expect("valid variable pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Untranslated,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Error => "ERR",
            Severity::Warning => "WARN",
            Severity::Untranslated => "UNTR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    MissingPassage,
    ExtraPassage,
    MissingSegment,
    ExtraSegment,
    TypeChanged,
    TextUntranslated,
    PlaceholderMismatch,
    LinkTargetChanged,
    LinkLabelUntranslated,
    MacroNameChanged,
    MacroLiteralUntranslated,
    MacroArgsChanged,
    ImmutableFieldChanged,
}

/// One validation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub passage: String,
    /// Segment identifier; absent for passage-level findings.
    pub segment: Option<String>,
    pub severity: Severity,
    pub kind: FindingKind,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.segment {
            Some(id) => write!(f, "[{}] {}:{} {}", self.severity.label(), self.passage, id, self.message),
            None => write!(f, "[{}] {} {}", self.severity.label(), self.passage, self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
    /// Passages present in both documents.
    pub passages_checked: usize,
}

impl ValidationReport {
    fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn untranslated(&self) -> usize {
        self.count(Severity::Untranslated)
    }

    /// No errors and no untranslated fields. Warnings are ignored.
    pub fn is_clean(&self) -> bool {
        self.errors() == 0 && self.untranslated() == 0
    }

    /// Whether the report should fail the run. Only strict runs ever fail.
    pub fn fails(&self, strict: bool) -> bool {
        strict && !self.is_clean()
    }

    pub fn summary(&self) -> String {
        format!(
            "Summary: passages {} | errors {} | warns {} | untranslated {}",
            self.passages_checked,
            self.errors(),
            self.warnings(),
            self.untranslated()
        )
    }
}

/// Distinct `$name` placeholders in a text.
pub fn placeholders(text: &str) -> BTreeSet<&str> {
    VAR_PLACEHOLDER.find_iter(text).map(|m| m.as_str()).collect()
}

/// Compare `candidate` against `original`.
///
/// # Example
/// ```ignore
/// let report = validate(&original, &merged);
/// for finding in &report.findings {
///     println!("{}", finding);
/// }
/// assert!(!report.fails(false));
/// ```
pub fn validate(original: &Document, candidate: &Document) -> ValidationReport {
    let mut validator = Validator {
        report: ValidationReport::default(),
    };

    for (name, original_passage) in original {
        match candidate.get(name) {
            Some(candidate_passage) => {
                validator.report.passages_checked += 1;
                validator.check_passage(name, original_passage, candidate_passage);
            }
            None => validator.push(
                name,
                None,
                Severity::Error,
                FindingKind::MissingPassage,
                format!("passage '{}' missing in translated file", name),
            ),
        }
    }
    for name in candidate.names() {
        if !original.contains(name) {
            validator.push(
                name,
                None,
                Severity::Warning,
                FindingKind::ExtraPassage,
                format!("extra passage '{}' present only in translated", name),
            );
        }
    }

    validator.report
}

struct Validator {
    report: ValidationReport,
}

impl Validator {
    fn push(&mut self, passage: &str, segment: Option<&str>, severity: Severity, kind: FindingKind, message: String) {
        self.report.findings.push(Finding {
            passage: passage.to_string(),
            segment: segment.map(str::to_string),
            severity,
            kind,
            message,
        });
    }

    fn check_passage(&mut self, name: &str, original: &Passage, candidate: &Passage) {
        let candidate_index = index_by_id(&candidate.segments);
        let mut original_ids = BTreeSet::new();

        let mut ordered = Vec::new();
        walk(&original.segments, &mut |segment| {
            if !segment.id().is_empty() {
                ordered.push(segment);
            }
        });

        for segment in ordered {
            let id = segment.id();
            original_ids.insert(id);
            match candidate_index.get(id) {
                Some(other) => self.check_segment(name, id, segment, other),
                None => self.push(
                    name,
                    Some(id),
                    Severity::Error,
                    FindingKind::MissingSegment,
                    "missing in translated".to_string(),
                ),
            }
        }

        let mut extra: Vec<&str> = candidate_index
            .keys()
            .copied()
            .filter(|id| !original_ids.contains(id))
            .collect();
        extra.sort_unstable();
        for id in extra {
            self.push(
                name,
                Some(id),
                Severity::Warning,
                FindingKind::ExtraSegment,
                "present only in translated".to_string(),
            );
        }
    }

    fn check_segment(&mut self, passage: &str, id: &str, original: &Segment, candidate: &Segment) {
        if original.kind() != candidate.kind() {
            self.push(
                passage,
                Some(id),
                Severity::Error,
                FindingKind::TypeChanged,
                format!("type mismatch {}->{}", original.kind(), candidate.kind()),
            );
            return;
        }

        match (original, candidate) {
            (Segment::Text(o), Segment::Text(c)) => {
                if o.src == c.src && !o.src.is_empty() {
                    self.push(passage, Some(id), Severity::Untranslated, FindingKind::TextUntranslated, "text not translated".to_string());
                }
                let before = placeholders(&o.src);
                let after = placeholders(&c.src);
                if before != after {
                    self.push(
                        passage,
                        Some(id),
                        Severity::Error,
                        FindingKind::PlaceholderMismatch,
                        format!("variable placeholder mismatch {:?}->{:?}", before, after),
                    );
                }
            }
            (Segment::Link(o), Segment::Link(c)) => {
                if o.target != c.target {
                    self.push(
                        passage,
                        Some(id),
                        Severity::Error,
                        FindingKind::LinkTargetChanged,
                        format!("link.target changed '{}'->'{}'", o.target, c.target),
                    );
                }
                if o.label == c.label && !o.label.is_empty() {
                    self.push(passage, Some(id), Severity::Untranslated, FindingKind::LinkLabelUntranslated, "link label not translated".to_string());
                }
            }
            (Segment::Macro(o), Segment::Macro(c)) => {
                if o.name != c.name {
                    self.push(
                        passage,
                        Some(id),
                        Severity::Error,
                        FindingKind::MacroNameChanged,
                        format!("macro name modified '{}'->'{}'", o.name, c.name),
                    );
                    return;
                }
                let name = o.name.trim().to_lowercase();
                if is_translatable_macro(&name) {
                    self.check_translatable_args(passage, id, &name, &o.args, &c.args);
                } else if o.args != c.args {
                    self.push(
                        passage,
                        Some(id),
                        Severity::Error,
                        FindingKind::MacroArgsChanged,
                        format!("macro '{}' args modified but not translatable", name),
                    );
                }
            }
            (Segment::Hook(_), Segment::Hook(_)) => {}
            (o, c) => {
                // tag, var, align_center and unknown segments are copied verbatim.
                if segment_src(o) != segment_src(c) {
                    self.push(
                        passage,
                        Some(id),
                        Severity::Error,
                        FindingKind::ImmutableFieldChanged,
                        "field 'src' was modified but is not translatable".to_string(),
                    );
                }
            }
        }
    }

    fn check_translatable_args(&mut self, passage: &str, id: &str, name: &str, original: &str, candidate: &str) {
        let Some(span) = find_first_literal(original) else {
            if original != candidate {
                self.push(
                    passage,
                    Some(id),
                    Severity::Error,
                    FindingKind::MacroArgsChanged,
                    format!("macro '{}' args modified but hold no string literal", name),
                );
            }
            return;
        };

        let original_value = span.value(original);
        let candidate_value = find_first_literal(candidate).map(|s| s.value(candidate));
        if candidate_value.as_deref() == Some(original_value.as_str()) && !original_value.is_empty() {
            self.push(
                passage,
                Some(id),
                Severity::Untranslated,
                FindingKind::MacroLiteralUntranslated,
                format!("macro '{}' string literal not translated", name),
            );
        }

        if !outside_literal_unchanged(original, candidate) {
            self.push(
                passage,
                Some(id),
                Severity::Error,
                FindingKind::MacroArgsChanged,
                format!("macro '{}' args outside literal were modified", name),
            );
        }
    }
}

/// Whether the bytes around the first literal are the same in both args.
///
/// Each side is split around its own first literal, so a translated literal
/// of a different length still lines up.
fn outside_literal_unchanged(original: &str, candidate: &str) -> bool {
    match (find_first_literal(original), find_first_literal(candidate)) {
        (Some(o), Some(c)) => {
            original[..o.start] == candidate[..c.start]
                && original[o.end..] == candidate[c.end..]
                && o.quote == c.quote
        }
        _ => false,
    }
}

fn segment_src(segment: &Segment) -> &str {
    match segment {
        Segment::Tag(s) => &s.src,
        Segment::Var(s) => &s.src,
        Segment::AlignCenter(s) => &s.src,
        Segment::Other(s) => &s.src,
        Segment::Text(s) => &s.src,
        Segment::Link(s) => &s.src,
        Segment::Macro(s) => &s.src,
        Segment::Hook(s) => &s.src,
    }
}

/// Per-passage finding counts, ordered by passage name.
pub fn findings_by_passage(report: &ValidationReport) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for finding in &report.findings {
        *counts.entry(finding.passage.as_str()).or_insert(0) += 1;
    }
    counts
}
