use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Marker for Harlowe's centered-alignment line.
pub const ALIGN_CENTER: &str = "=><=";

/// Lowercase hex SHA-1 of `text`.
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha1::digest(text.as_bytes()))
}

/// One typed node of an extracted passage.
///
/// Serialized with an inline `"type"` tag so the JSON reads
/// `{"type": "text", "id": "s0001", "src": "...", "hash": "..."}`.
/// Segments written by a newer tool with an unknown `type` are kept as
/// [`Segment::Other`] instead of failing the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Text(TextSegment),
    Link(LinkSegment),
    Macro(MacroSegment),
    Hook(HookSegment),
    Tag(TagSegment),
    Var(VarSegment),
    AlignCenter(AlignCenterSegment),
    #[serde(untagged)]
    Other(OtherSegment),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    #[serde(default)]
    pub id: String,
    pub src: String,
    #[serde(default)]
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSegment {
    #[serde(default)]
    pub id: String,
    /// The raw `[[...]]` form as it appeared in the passage.
    #[serde(default)]
    pub src: String,
    pub label: String,
    pub target: String,
    /// Hash of the label at extraction time.
    #[serde(default)]
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroSegment {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub args: String,
    /// The raw `(name: args)` form, without the hook.
    #[serde(default)]
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook: Option<MacroHook>,
}

/// Hook attached to a macro. It has no identifier of its own; its children
/// are numbered under the macro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroHook {
    pub src: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookSegment {
    #[serde(default)]
    pub id: String,
    pub src: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSegment {
    #[serde(default)]
    pub id: String,
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarSegment {
    #[serde(default)]
    pub id: String,
    pub src: String,
    #[serde(default)]
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignCenterSegment {
    #[serde(default)]
    pub id: String,
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherSegment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub src: String,
}

impl Segment {
    pub fn text(src: &str) -> Self {
        Segment::Text(TextSegment {
            id: String::new(),
            src: src.to_string(),
            hash: content_hash(src),
        })
    }

    pub fn var(src: &str) -> Self {
        Segment::Var(VarSegment {
            id: String::new(),
            src: src.to_string(),
            hash: content_hash(src),
        })
    }

    pub fn tag(src: &str) -> Self {
        Segment::Tag(TagSegment {
            id: String::new(),
            src: src.to_string(),
        })
    }

    pub fn align_center() -> Self {
        Segment::AlignCenter(AlignCenterSegment {
            id: String::new(),
            src: ALIGN_CENTER.to_string(),
        })
    }

    /// The `"type"` tag this segment serializes with.
    pub fn kind(&self) -> &str {
        match self {
            Segment::Text(_) => "text",
            Segment::Link(_) => "link",
            Segment::Macro(_) => "macro",
            Segment::Hook(_) => "hook",
            Segment::Tag(_) => "tag",
            Segment::Var(_) => "var",
            Segment::AlignCenter(_) => "align_center",
            Segment::Other(other) => &other.kind,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Segment::Text(s) => &s.id,
            Segment::Link(s) => &s.id,
            Segment::Macro(s) => &s.id,
            Segment::Hook(s) => &s.id,
            Segment::Tag(s) => &s.id,
            Segment::Var(s) => &s.id,
            Segment::AlignCenter(s) => &s.id,
            Segment::Other(s) => &s.id,
        }
    }

    pub fn set_id(&mut self, id: String) {
        let slot = match self {
            Segment::Text(s) => &mut s.id,
            Segment::Link(s) => &mut s.id,
            Segment::Macro(s) => &mut s.id,
            Segment::Hook(s) => &mut s.id,
            Segment::Tag(s) => &mut s.id,
            Segment::Var(s) => &mut s.id,
            Segment::AlignCenter(s) => &mut s.id,
            Segment::Other(s) => &mut s.id,
        };
        *slot = id;
    }

    /// Child segments of a bare hook or of a macro's hook.
    pub fn children(&self) -> &[Segment] {
        match self {
            Segment::Hook(hook) => &hook.segments,
            Segment::Macro(MacroSegment {
                hook: Some(hook), ..
            }) => &hook.segments,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> &mut [Segment] {
        match self {
            Segment::Hook(hook) => &mut hook.segments,
            Segment::Macro(MacroSegment {
                hook: Some(hook), ..
            }) => &mut hook.segments,
            _ => &mut [],
        }
    }
}

/// Assign hierarchical identifiers in document order.
///
/// The n-th top-level segment becomes `s0001`, `s0002`, ... and the k-th
/// child of a hook becomes `<parent>_k`, recursively. Existing identifiers
/// are overwritten.
pub fn assign_ids(segments: &mut [Segment]) {
    for (index, segment) in segments.iter_mut().enumerate() {
        let id = format!("s{:04}", index + 1);
        assign_child_ids(segment, &id);
        segment.set_id(id);
    }
}

fn assign_child_ids(segment: &mut Segment, parent_id: &str) {
    for (index, child) in segment.children_mut().iter_mut().enumerate() {
        let id = format!("{}_{}", parent_id, index + 1);
        assign_child_ids(child, &id);
        child.set_id(id);
    }
}

/// Visit every segment depth-first in document order.
pub fn walk<'a>(segments: &'a [Segment], visit: &mut impl FnMut(&'a Segment)) {
    for segment in segments {
        visit(segment);
        walk(segment.children(), visit);
    }
}

/// Map every non-empty identifier in the tree to its segment.
pub fn index_by_id(segments: &[Segment]) -> HashMap<&str, &Segment> {
    let mut index = HashMap::new();
    walk(segments, &mut |segment| {
        if !segment.id().is_empty() {
            index.insert(segment.id(), segment);
        }
    });
    index
}

/// Map every non-empty identifier to the child-index path that reaches it,
/// for use with [`segment_at_path_mut`].
pub fn index_paths(segments: &[Segment]) -> HashMap<String, Vec<usize>> {
    fn visit(segments: &[Segment], prefix: &mut Vec<usize>, out: &mut HashMap<String, Vec<usize>>) {
        for (index, segment) in segments.iter().enumerate() {
            prefix.push(index);
            if !segment.id().is_empty() {
                out.insert(segment.id().to_string(), prefix.clone());
            }
            visit(segment.children(), prefix, out);
            prefix.pop();
        }
    }
    let mut out = HashMap::new();
    visit(segments, &mut Vec::new(), &mut out);
    out
}

pub fn segment_at_path_mut<'a>(segments: &'a mut [Segment], path: &[usize]) -> Option<&'a mut Segment> {
    let (first, rest) = path.split_first()?;
    let segment = segments.get_mut(*first)?;
    if rest.is_empty() {
        Some(segment)
    } else {
        segment_at_path_mut(segment.children_mut(), rest)
    }
}
