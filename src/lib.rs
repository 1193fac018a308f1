//! Localization round trip for Harlowe (Twine 2) story passages.
//!
//! A passage body is tokenized into a tree of typed segments, the
//! translatable fields are flattened into a skeleton for translators, and
//! translated skeletons are merged back, rendered to Harlowe source and
//! validated against the original extraction.
//!
//! ```ignore
//! use harlowe_l10n::{MergeOptions, RenderMode, build_skeleton, extract_document, merge, render_document, validate};
//!
//! let document = extract_document(sources);
//! let mut skeleton = build_skeleton(&document, false);
//! // ... translators edit `skeleton` ...
//! let outcome = merge(&document, &skeleton, MergeOptions::default());
//! let report = validate(&document, &outcome.document);
//! let passages = render_document(&outcome.document, RenderMode::Escaped);
//! ```

pub mod document;
pub mod error;
pub mod escape;
pub mod loader;
pub mod merge;
pub mod parser;
pub mod render;
pub mod scanner;
pub mod segment;
pub mod skeleton;
pub mod validate;

// Re-export the pipeline entry points for convenient access
pub use document::{Document, Passage, PassageMeta, PassageSource, extract_document};
pub use error::{L10nError, L10nResult};
pub use merge::{MergeIssue, MergeIssueKind, MergeOptions, MergeOutcome, merge};
pub use parser::{Parser, tokenize};
pub use render::{RenderMode, render_document, render_passage, render_segments};
pub use segment::Segment;
pub use skeleton::{Field, Skeleton, build_skeleton};
pub use validate::{Finding, FindingKind, Severity, ValidationReport, validate};

#[cfg(test)]
mod integration_tests;
