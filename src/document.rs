//! Passages and documents: the unit exchanged between every pipeline stage.
//!
//! A [`Document`] maps passage names to extracted [`Passage`]s. It is built
//! from a map of passage source bodies, which the HTML-container layer (or a
//! previous `render --raw`) supplies already entity-decoded.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::parser::tokenize;
use crate::segment::{Segment, content_hash};

/// Metadata carried over from the `<tw-passagedata>` attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassageMeta {
    #[serde(default)]
    pub pid: i64,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    /// Hash of the full unescaped passage body at extraction time.
    #[serde(default)]
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub meta: PassageMeta,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl Passage {
    /// Tokenize a passage body and record its hash.
    pub fn extract(body: &str, mut meta: PassageMeta) -> Self {
        meta.hash = content_hash(body);
        Passage {
            meta,
            segments: tokenize(body),
        }
    }
}

/// Source of one passage as handed to the extractor.
///
/// Accepts either a bare body string or an object carrying the body plus
/// the container attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PassageSource {
    Body(String),
    Detailed {
        body: String,
        #[serde(default)]
        pid: i64,
        #[serde(default)]
        tags: String,
        #[serde(default)]
        position: Option<String>,
        #[serde(default)]
        size: Option<String>,
    },
}

impl PassageSource {
    pub fn into_parts(self) -> (String, PassageMeta) {
        match self {
            PassageSource::Body(body) => (body, PassageMeta::default()),
            PassageSource::Detailed {
                body,
                pid,
                tags,
                position,
                size,
            } => (
                body,
                PassageMeta {
                    pid,
                    tags,
                    position,
                    size,
                    hash: String::new(),
                },
            ),
        }
    }
}

/// Passage name to extracted passage, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(pub BTreeMap<String, Passage>);

impl Document {
    pub fn new() -> Self {
        Document(BTreeMap::new())
    }

    pub fn with_passage(&mut self, name: &str, passage: Passage) -> &mut Self {
        self.0.insert(name.to_owned(), passage);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Passage> {
        self.0.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Passage> {
        self.0.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Passage)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Passage);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Passage>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, Passage)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Passage)>>(iter: I) -> Self {
        Document(iter.into_iter().collect())
    }
}

/// Extract every passage of a source map into a document.
///
/// # Example
/// ```ignore
/// let mut sources = BTreeMap::new();
/// sources.insert("Start".to_string(), PassageSource::Body("[[Go->End]]".to_string()));
/// let document = extract_document(sources);
/// assert_eq!(document.get("Start").unwrap().segments[0].kind(), "link");
/// ```
pub fn extract_document(sources: impl IntoIterator<Item = (String, PassageSource)>) -> Document {
    sources
        .into_iter()
        .map(|(name, source)| {
            let (body, meta) = source.into_parts();
            (name, Passage::extract(&body, meta))
        })
        .collect()
}

/// Turn repeatable, comma-separated `--name` values into a set.
///
/// Returns `None` when no usable name was given, meaning "no filter".
pub fn parse_name_filter(values: &[String]) -> Option<BTreeSet<String>> {
    let names: BTreeSet<String> = values
        .iter()
        .flat_map(|chunk| chunk.split(','))
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() { None } else { Some(names) }
}

/// Keep only the wanted entries of a name-keyed map.
///
/// # Returns
/// The filtered map and the wanted names that were not present.
pub fn filter_by_name<V: Clone>(
    map: &BTreeMap<String, V>,
    wanted: Option<&BTreeSet<String>>,
) -> (BTreeMap<String, V>, Vec<String>) {
    let Some(wanted) = wanted else {
        return (map.clone(), Vec::new());
    };
    let kept = map
        .iter()
        .filter(|(name, _)| wanted.contains(*name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    let missing = wanted
        .iter()
        .filter(|name| !map.contains_key(*name))
        .cloned()
        .collect();
    (kept, missing)
}
