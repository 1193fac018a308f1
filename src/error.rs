use std::io;
use std::path::PathBuf;

/// Errors raised while loading or writing pipeline files.
///
/// The tokenizer, merge and validator never fail; problems they encounter
/// are reported as issues and findings instead.
#[derive(Debug, thiserror::Error)]
pub enum L10nError {
    /// A file could not be read or written.
    #[error("failed to access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file did not contain the expected JSON shape.
    #[error("failed to parse JSON from '{}': {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Writing a value to JSON failed.
    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Writing to standard output failed.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Result type for file-facing operations
pub type L10nResult<T> = Result<T, L10nError>;
