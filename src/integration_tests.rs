//! End-to-end tests for the extract, skeleton, merge, render and validate
//! pipeline.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;
use tempfile::TempDir;

use crate::document::{Document, Passage, PassageMeta, PassageSource, extract_document};
use crate::loader::{load_document, load_skeleton, load_sources, write_json};
use crate::merge::{MergeIssueKind, MergeOptions, merge};
use crate::parser::tokenize;
use crate::render::{RenderMode, render_document, render_passage, render_segments};
use crate::scanner::{escape_literal, unescape_literal};
use crate::segment::{Segment, walk};
use crate::skeleton::{Skeleton, build_skeleton};
use crate::validate::{FindingKind, Severity, validate};

fn single(body: &str) -> Document {
    let mut document = Document::new();
    document.with_passage("Start", Passage::extract(body, PassageMeta::default()));
    document
}

fn translations(entries: &[(&str, &str)]) -> Skeleton {
    let mut skeleton = Skeleton::new();
    for (key, value) in entries {
        skeleton.with_entry("Start", key, value);
    }
    skeleton
}

fn type_sequence(segments: &[Segment]) -> Vec<String> {
    let mut kinds = Vec::new();
    walk(segments, &mut |segment| kinds.push(segment.kind().to_string()));
    kinds
}

// ============================================================================
// Worked scenarios
// ============================================================================

#[test]
fn test_macro_with_hook_scenario() {
    let segments = tokenize(r#"Hello $name, (click: "Go")[next]"#);
    assert_eq!(type_sequence(&segments), vec!["text", "var", "text", "macro", "text"]);

    match &segments[3] {
        Segment::Macro(m) => {
            assert_eq!(m.name, "click");
            assert_eq!(m.args, r#""Go""#);
            assert_eq!(m.hook.as_ref().map(|h| h.src.as_str()), Some("[next]"));
        }
        other => panic!("Expected macro, got {:?}", other),
    }

    let skeleton = build_skeleton(&single(r#"Hello $name, (click: "Go")[next]"#), false);
    assert_eq!(skeleton.get("Start", "s0004.args").map(String::as_str), Some("Go"));
    assert_eq!(skeleton.get("Start", "s0004_1.src").map(String::as_str), Some("next"));
}

#[test]
fn test_link_label_scenario() {
    let original = single("[[Open Door->Door1]]");
    let skeleton = build_skeleton(&original, false);
    assert_eq!(skeleton.passage("Start").map(BTreeMap::len), Some(1));
    assert_eq!(skeleton.get("Start", "s0001.label").map(String::as_str), Some("Open Door"));

    let outcome = merge(&original, &translations(&[("s0001.label", "打开门")]), MergeOptions::default());
    let rendered = render_passage(outcome.document.get("Start").unwrap(), RenderMode::Raw);
    assert_eq!(rendered, "[[打开门->Door1]]");
}

#[test]
fn test_macro_literal_scenario() {
    let original = single(r#"(print: "Hello", 5)"#);
    let outcome = merge(&original, &translations(&[("s0001.args", "你好")]), MergeOptions::default());
    match &outcome.document.get("Start").unwrap().segments[0] {
        Segment::Macro(m) => assert_eq!(m.args, r#""你好", 5"#),
        other => panic!("Expected macro, got {:?}", other),
    }
}

#[test]
fn test_placeholder_scenario() {
    let original: Document = serde_json::from_value(json!({
        "Start": {
            "meta": {"pid": 1, "tags": "", "hash": ""},
            "segments": [{"type": "text", "id": "s0001", "src": "You have $gold gold."}]
        }
    }))
    .unwrap();

    let kept = merge(&original, &translations(&[("s0001.src", "你有 $gold 金币。")]), MergeOptions::default());
    let report = validate(&original, &kept.document);
    assert_eq!(report.errors(), 0);
    assert!(report.is_clean());

    let dropped = merge(&original, &translations(&[("s0001.src", "你有金币。")]), MergeOptions::default());
    let report = validate(&original, &dropped.document);
    assert_eq!(report.errors(), 1);
    assert_eq!(report.findings[0].kind, FindingKind::PlaceholderMismatch);
    assert!(!report.is_clean());
    assert!(report.fails(true));
}

#[test]
fn test_unknown_identifier_scenario() {
    let original = single("Hi");
    let skeleton = translations(&[("s0042.src", "嗨")]);

    let lenient = merge(&original, &skeleton, MergeOptions::default());
    assert_eq!(lenient.problems, 0);
    assert_eq!(lenient.issues[0].kind, MergeIssueKind::UnknownSegment);

    let strict = merge(&original, &skeleton, MergeOptions { strict: true, apply_empty: false });
    assert_eq!(strict.problems, 1);
    assert_eq!(strict.document, original);
}

// ============================================================================
// Properties
// ============================================================================

const SAMPLES: &[&str] = &[
    "Plain text only.",
    r#"Hello $name, (click: "Go")[next]"#,
    "=><=\nCentered [[Start]] and [[Go on->Next]].",
    "(if: $hp > 0)[(set: $hp to it - 1)You bleed.](else:)[<b>Dead.</b>]",
    "[outer [inner $x] tail] <br> (print: 'it\\'s')",
    "(link-reveal: \"Open\")[(alert: \"Boo\")]",
];

#[test]
fn test_render_then_retokenize_keeps_types() {
    for source in SAMPLES {
        let original = tokenize(source);
        let again = tokenize(&render_segments(&original));
        assert_eq!(type_sequence(&again), type_sequence(&original), "source: {}", source);

        let mut plain_a = Vec::new();
        let mut plain_b = Vec::new();
        walk(&original, &mut |s| {
            if matches!(s, Segment::Text(_) | Segment::Tag(_) | Segment::Var(_)) {
                plain_a.push(s.clone());
            }
        });
        walk(&again, &mut |s| {
            if matches!(s, Segment::Text(_) | Segment::Tag(_) | Segment::Var(_)) {
                plain_b.push(s.clone());
            }
        });
        assert_eq!(plain_a, plain_b, "source: {}", source);
    }
}

#[test]
fn test_identifiers_unique_and_deterministic() {
    for source in SAMPLES {
        let first = tokenize(source);
        let second = tokenize(source);
        assert_eq!(first, second);

        let mut ids = Vec::new();
        walk(&first, &mut |s| ids.push(s.id().to_string()));
        let unique: BTreeSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len(), "duplicate id in {}", source);
        assert!(ids.iter().all(|id| id.starts_with('s')));
    }
}

#[test]
fn test_literal_encode_decode() {
    let values = ["plain", r#"say "hi""#, "it's", r"back\slash", r#"mixed \"both' "#, ""];
    for value in values {
        for quote in ['"', '\''] {
            assert_eq!(unescape_literal(&escape_literal(value, quote)), value);
        }
    }
}

#[test]
fn test_validator_soundness_on_identical_input() {
    let document: Document = SAMPLES
        .iter()
        .enumerate()
        .map(|(i, body)| (format!("P{}", i), Passage::extract(body, PassageMeta::default())))
        .collect();
    let report = validate(&document, &document);
    assert_eq!(report.errors(), 0);
    assert_eq!(report.warnings(), 0);
    assert_eq!(report.passages_checked, SAMPLES.len());

    // Every non-empty translatable field, whitespace-only ones included,
    // shows up as an untranslated finding.
    let skeleton = build_skeleton(&document, true);
    let expected: BTreeSet<(String, String)> = skeleton
        .iter()
        .flat_map(|(passage, entries)| {
            entries
                .iter()
                .filter(|(_, value)| !value.is_empty())
                .map(move |(key, _)| {
                    let id = key.rsplit_once('.').map_or(key.as_str(), |(id, _)| id);
                    (passage.clone(), id.to_string())
                })
        })
        .collect();
    let flagged: BTreeSet<(String, String)> = report
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Untranslated)
        .map(|f| (f.passage.clone(), f.segment.clone().unwrap_or_default()))
        .collect();
    assert_eq!(flagged, expected);
    assert_eq!(report.untranslated(), expected.len());
    // The lone space between the hook and the `<br>` tag.
    assert!(expected.contains(&("P4".to_string(), "s0002".to_string())));
}

#[test]
fn test_link_target_tampering_single_error() {
    let original = single("Go [[Open Door->Door1]] now");
    let mut candidate = merge(
        &original,
        &translations(&[("s0001.src", "去 "), ("s0002.label", "开门"), ("s0003.src", " 现在")]),
        MergeOptions::default(),
    )
    .document;
    if let Segment::Link(link) = &mut candidate.get_mut("Start").unwrap().segments[1] {
        link.target = "Door9".to_string();
    }
    let report = validate(&original, &candidate);
    assert_eq!(report.errors(), 1);
    assert_eq!(report.findings.len(), 1);
    let finding = &report.findings[0];
    assert_eq!(finding.kind, FindingKind::LinkTargetChanged);
    assert_eq!(finding.segment.as_deref(), Some("s0002"));
    assert!(finding.message.contains("link.target"));
}

// ============================================================================
// Full pipeline
// ============================================================================

#[test]
fn test_full_pipeline_through_files() {
    let dir = TempDir::new().unwrap();
    let sources_path = dir.path().join("sources.json");
    std::fs::write(
        &sources_path,
        serde_json::to_string(&json!({
            "Start": {"body": "Hello $name, (click: \"Go\")[next]\n[[Open Door->Door1]]", "pid": 1},
            "Door1": "(set: $open to true)You are <i>inside</i>."
        }))
        .unwrap(),
    )
    .unwrap();

    let sources: BTreeMap<String, PassageSource> = load_sources(&sources_path).unwrap();
    let document = extract_document(sources);
    let extract_path = dir.path().join("extract.json");
    write_json(&document, Some(&extract_path), 2).unwrap();

    let skeleton = build_skeleton(&load_document(&extract_path).unwrap(), false);
    let mut translated = skeleton.clone();
    for entries in translated.0.values_mut() {
        for value in entries.values_mut() {
            *value = format!("«{}»", value);
        }
    }
    let skeleton_path = dir.path().join("skeleton.zh.json");
    write_json(&translated, Some(&skeleton_path), 0).unwrap();

    let outcome = merge(
        &document,
        &load_skeleton(&skeleton_path).unwrap(),
        MergeOptions { strict: true, apply_empty: false },
    );
    assert!(outcome.is_clean(), "issues: {:?}", outcome.issues);
    assert_eq!(outcome.applied, skeleton.len());

    let report = validate(&document, &outcome.document);
    assert_eq!(report.errors(), 0, "findings: {:?}", report.findings);
    // The "\n" between the hook and the link was not in the skeleton.
    assert_eq!(report.untranslated(), 1);
    assert_eq!(report.findings[0].passage, "Start");
    assert_eq!(report.findings[0].segment.as_deref(), Some("s0005"));
    assert!(!report.fails(false));

    let rendered = render_document(&outcome.document, RenderMode::Raw);
    assert_eq!(
        rendered["Start"],
        "«Hello »$name«, »(click: \"«Go»\")[«next»]\n[[«Open Door»->Door1]]"
    );
    assert_eq!(rendered["Door1"], "(set: $open to true)«You are »<i>«inside»</i>«.»");

    let escaped = render_document(&outcome.document, RenderMode::Escaped);
    assert!(escaped["Door1"].contains("&lt;i&gt;"));
    assert_eq!(outcome.document.get("Start").unwrap().meta.pid, 1);
}
