use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal, whole-pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("failed to serialize output '{path}': {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Per-document failures; the document becomes an invalid item and its
/// siblings carry on.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    MetadataDecode(#[from] MetadataDecodeError),
    #[error("{name} is not valid JSON")]
    InvalidFormat {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot derive a content key from '{path}': {reason}")]
    Structural { path: String, reason: String },
    #[error("failed to serialize '{path}': {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A malformed structured header.
///
/// `line` and `column` are 1-based and counted in the original document, so
/// the opening header delimiter is line 1.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{name}: {reason} at line {line}, column {column}:\n{snippet}")]
pub struct MetadataDecodeError {
    pub name: String,
    pub reason: String,
    pub line: usize,
    pub column: usize,
    /// Offending source line followed by a caret line.
    pub snippet: String,
}

impl MetadataDecodeError {
    pub const NAME: &'static str = "YAMLException";

    /// Builds the error, pointing the caret at `column` of `line` within `source`.
    pub fn at(reason: impl Into<String>, source: &str, line: usize, column: usize) -> Self {
        let source_line = source
            .lines()
            .nth(line.saturating_sub(1))
            .unwrap_or_default()
            .trim_end_matches('\r');
        let caret = format!("{}^", " ".repeat(column.saturating_sub(1)));
        Self {
            name: Self::NAME.to_string(),
            reason: reason.into(),
            line,
            column,
            snippet: format!("{line:>4} | {source_line}\n     | {caret}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source directory {0:?} does not exist")]
    MissingRoot(PathBuf),
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("refusing to write outside the output directory: {0}")]
    InvalidPath(String),
}
