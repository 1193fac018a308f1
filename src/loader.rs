//! Reading and writing the JSON files exchanged between pipeline stages.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::debug;

use crate::document::{Document, PassageSource};
use crate::error::{L10nError, L10nResult};
use crate::skeleton::Skeleton;

/// Read and deserialize a JSON file.
///
/// # Errors
/// - File read errors
/// - JSON that does not match `T`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> L10nResult<T> {
    let content = fs::read_to_string(path).map_err(|source| L10nError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value = serde_json::from_str(&content).map_err(|source| L10nError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = content.len(), "loaded JSON");
    Ok(value)
}

/// Load a passage source map: passage name to body, or to a
/// `{"body": ..., "pid": ...}` object.
pub fn load_sources(path: &Path) -> L10nResult<BTreeMap<String, PassageSource>> {
    read_json(path)
}

/// Load an extracted (or merged) document.
pub fn load_document(path: &Path) -> L10nResult<Document> {
    read_json(path)
}

/// Load a translation skeleton.
pub fn load_skeleton(path: &Path) -> L10nResult<Skeleton> {
    read_json(path)
}

/// Serialize `value` as JSON, pretty-printed with `indent` spaces.
///
/// An `indent` of 0 produces compact single-line output.
pub fn to_json_string<T: Serialize>(value: &T, indent: usize) -> L10nResult<String> {
    if indent == 0 {
        return Ok(serde_json::to_string(value)?);
    }
    let pad = " ".repeat(indent);
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(pad.as_bytes()));
    value.serialize(&mut serializer)?;
    // serde_json only ever emits UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write `value` as JSON to `path`, or to stdout when `path` is `None`.
///
/// Parent directories of `path` are created as needed.
pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>, indent: usize) -> L10nResult<()> {
    let mut text = to_json_string(value, indent)?;
    text.push('\n');

    match path {
        Some(path) => {
            let io_error = |source: std::io::Error| L10nError::Io {
                path: path.to_path_buf(),
                source,
            };
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(io_error)?;
            }
            fs::write(path, text).map_err(io_error)?;
            debug!(path = %path.display(), "wrote JSON");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Passage, PassageMeta};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_sources_mixed_shapes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sources.json");
        fs::write(
            &path,
            r#"{"Start": "Hello [[Go->End]]", "End": {"body": "Bye", "pid": 2, "tags": "ending"}}"#,
        )
        .unwrap();

        let sources = load_sources(&path).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources["Start"], PassageSource::Body("Hello [[Go->End]]".to_string()));
        let (body, meta) = sources["End"].clone().into_parts();
        assert_eq!(body, "Bye");
        assert_eq!(meta.pid, 2);
        assert_eq!(meta.tags, "ending");
    }

    #[test]
    fn test_document_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("extract.json");
        let mut document = Document::new();
        document.with_passage("Start", Passage::extract("Hi (click: \"Go\")[next]", PassageMeta::default()));

        write_json(&document, Some(&path), 2).unwrap();
        let loaded = load_document(&path).unwrap();
        assert_eq!(loaded, document);
    }

    #[test]
    fn test_load_skeleton() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skeleton.json");
        fs::write(&path, r#"{"Start": {"s0001.src": "嗨"}}"#).unwrap();
        let skeleton = load_skeleton(&path).unwrap();
        assert_eq!(skeleton.get("Start", "s0001.src").map(String::as_str), Some("嗨"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = load_document(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, L10nError::Io { .. }));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn test_invalid_json_is_json_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();
        let err = load_skeleton(&path).unwrap_err();
        assert!(matches!(err, L10nError::Json { .. }));
    }

    #[test]
    fn test_indent_control() {
        let mut skeleton = Skeleton::new();
        skeleton.with_entry("A", "s0001.src", "x");
        assert_eq!(to_json_string(&skeleton, 0).unwrap(), r#"{"A":{"s0001.src":"x"}}"#);
        assert_eq!(
            to_json_string(&skeleton, 4).unwrap(),
            "{\n    \"A\": {\n        \"s0001.src\": \"x\"\n    }\n}"
        );
    }

    #[test]
    fn test_non_ascii_written_verbatim() {
        let mut skeleton = Skeleton::new();
        skeleton.with_entry("A", "s0001.src", "打开门");
        assert!(to_json_string(&skeleton, 2).unwrap().contains("打开门"));
    }
}
