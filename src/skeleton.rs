//! Translation skeletons: the translatable fields of a document, flattened.
//!
//! A skeleton maps each passage name to `"<segment id>.<field>"` keys and
//! the source-language string for that field:
//!
//! ```json
//! {
//!   "Start": {
//!     "s0001.src": "Hello ",
//!     "s0004.args": "Go",
//!     "s0004_1.src": "next"
//!   }
//! }
//! ```
//!
//! Translators edit the values in place; [`crate::merge`] splices them back.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::scanner::first_literal_value;
use crate::segment::Segment;

/// Macros whose first string literal is shown to the player and therefore
/// translated. Compared against the trimmed, lowercased macro name.
pub const TRANSLATABLE_MACROS: &[&str] = &[
    "click",
    "link",
    "link-repeat",
    "link-reveal",
    "hover",
    "hover-tooltip",
    "tooltip",
    "alert",
    "print",
];

pub fn is_translatable_macro(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    TRANSLATABLE_MACROS.contains(&name.as_str())
}

/// Which field of a segment a skeleton entry addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// `text.src`
    Src,
    /// `link.label`
    Label,
    /// First string literal of a whitelisted `macro.args`.
    Args,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Src => "src",
            Field::Label => "label",
            Field::Args => "args",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "src" => Ok(Field::Src),
            "label" => Ok(Field::Label),
            "args" => Ok(Field::Args),
            other => Err(format!("unknown field '{}'", other)),
        }
    }
}

/// Build a skeleton key.
pub fn skeleton_key(id: &str, field: Field) -> String {
    format!("{}.{}", id, field)
}

/// Split a skeleton key at its last `.` into segment id and field name.
pub fn split_key(key: &str) -> Option<(&str, &str)> {
    key.rsplit_once('.')
}

/// Passage name to `"<id>.<field>"` to string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Skeleton(pub BTreeMap<String, BTreeMap<String, String>>);

impl Skeleton {
    pub fn new() -> Self {
        Skeleton(BTreeMap::new())
    }

    pub fn with_entry(&mut self, passage: &str, key: &str, value: &str) -> &mut Self {
        self.0
            .entry(passage.to_owned())
            .or_default()
            .insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn get(&self, passage: &str, key: &str) -> Option<&String> {
        self.0.get(passage).and_then(|entries| entries.get(key))
    }

    pub fn passage(&self, passage: &str) -> Option<&BTreeMap<String, String>> {
        self.0.get(passage)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, String>)> {
        self.0.iter()
    }
}

/// Collect the translatable fields of one passage.
///
/// Entries whose trimmed value is empty are skipped unless `include_empty`
/// is set. Hooks are always descended into, whether or not their owning
/// macro contributed an entry.
pub fn build_passage_skeleton(segments: &[Segment], include_empty: bool) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for segment in segments {
        collect_segment(segment, include_empty, &mut out);
    }
    out
}

fn collect_segment(segment: &Segment, include_empty: bool, out: &mut BTreeMap<String, String>) {
    let id = segment.id();
    if id.is_empty() {
        return;
    }
    let mut emit = |field: Field, value: &str| {
        if include_empty || !value.trim().is_empty() {
            out.insert(skeleton_key(id, field), value.to_string());
        }
    };

    match segment {
        Segment::Text(text) => emit(Field::Src, &text.src),
        Segment::Link(link) => emit(Field::Label, &link.label),
        Segment::Macro(m) => {
            if is_translatable_macro(&m.name) {
                if let Some(literal) = first_literal_value(&m.args) {
                    emit(Field::Args, &literal);
                }
            }
        }
        Segment::Hook(_)
        | Segment::Tag(_)
        | Segment::Var(_)
        | Segment::AlignCenter(_)
        | Segment::Other(_) => {}
    }

    for child in segment.children() {
        collect_segment(child, include_empty, out);
    }
}

/// Build the skeleton for every passage, omitting passages with no entries.
pub fn build_skeleton(document: &Document, include_empty: bool) -> Skeleton {
    Skeleton(
        document
            .iter()
            .map(|(name, passage)| (name.clone(), build_passage_skeleton(&passage.segments, include_empty)))
            .filter(|(_, entries)| !entries.is_empty())
            .collect(),
    )
}
