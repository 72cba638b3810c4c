//! # contract: data model and collaborator seams
//!
//! This module defines the plain data that flows through the pipeline and the
//! traits behind which every external collaborator sits:
//!
//! - [`SourceProvider`] yields the raw documents of a run.
//! - [`MetadataParser`] splits a document into attributes and body text.
//! - [`Renderer`] turns body text into markup.
//! - [`Sink`] receives emitted output documents and out-of-band error events.
//!
//! ## Mocking & Testing
//! - `SourceProvider` and `Sink` are annotated for `mockall`, so consumers can
//!   generate deterministic mocks for unit/integration tests (exported behind
//!   the `test-export-mocks` feature).
//!
//! ## Ownership
//! - A [`RawDocument`] is owned by the source provider until handed to the
//!   pipeline; the pipeline only borrows it.
//! - A [`TransformedDocument`] is owned by the pipeline until it is serialized
//!   into an [`OutputDocument`], whose ownership passes to the sink.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

#[allow(unused_imports)]
use mockall::{automock, predicate::*};

use crate::error::{DocumentError, MetadataDecodeError, SinkError, SourceError};

/// Extension of documents that are already in the pipeline's output format.
pub const OUTPUT_EXTENSION: &str = "json";

/// Name of the consolidated output document unless configured otherwise.
pub const DEFAULT_CONSOLIDATED_NAME: &str = "content.json";

/// Attribute map of a structured record.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A source document: relative path, raw payload and optional modification time.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    /// Slash-delimited path relative to the source root, e.g. `blog/posts/index.md`.
    pub path: String,
    pub contents: Vec<u8>,
    pub modified: Option<DateTime<Utc>>,
}

impl RawDocument {
    pub fn new(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            modified: None,
        }
    }

    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Final path component.
    pub fn base_name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str())
    }

    /// Extension of the final path component, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let base = self.base_name();
        match base.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&base[idx + 1..]),
        }
    }

    /// True when the document is already in the output format and only needs validating.
    pub fn is_passthrough(&self) -> bool {
        self.extension()
            .map(|ext| ext.eq_ignore_ascii_case(OUTPUT_EXTENSION))
            .unwrap_or(false)
    }

    /// Modification time as `YYYY-MM-DDTHH:MM:SS.sssZ`.
    pub fn updated_at(&self) -> Option<String> {
        self.modified
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Same path with its final extension replaced by the output extension.
    pub fn output_path(&self) -> String {
        with_output_extension(&self.path)
    }
}

/// Replaces the final extension of `path` (or appends one) with [`OUTPUT_EXTENSION`].
pub fn with_output_extension(path: &str) -> String {
    let base_start = path.rfind(['/', '\\']).map(|idx| idx + 1).unwrap_or(0);
    let stem_end = match path[base_start..].rfind('.') {
        Some(idx) if idx > 0 => base_start + idx,
        _ => path.len(),
    };
    format!("{}.{OUTPUT_EXTENSION}", &path[..stem_end])
}

/// Result of splitting a document into its structured header and body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedMetadata {
    pub attributes: Record,
    /// Body text with the header block removed.
    pub body: String,
    /// 1-based line of the payload at which the body starts.
    pub body_begin: usize,
    /// Raw header text, `None` when the document had no header block.
    pub frontmatter: Option<String>,
}

/// A document after transformation (or passthrough validation).
///
/// `data` is a `Value` rather than a [`Record`] because a user transform may
/// return any shape.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedDocument {
    /// Path of the originating [`RawDocument`].
    pub path: String,
    pub data: serde_json::Value,
}

/// A serialized document handed to the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDocument {
    /// Relative, slash-delimited output path.
    pub path: String,
    pub contents: Vec<u8>,
}

impl OutputDocument {
    pub fn json(
        path: impl Into<String>,
        value: &serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            path: path.into(),
            contents: serde_json::to_vec(value)?,
        })
    }

    /// Payload decoded back into JSON.
    pub fn parse(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.contents)
    }
}

/// A document that failed decoding or validation, reported but never emitted.
#[derive(Debug)]
pub struct InvalidItem {
    pub path: String,
    pub error: DocumentError,
}

impl std::fmt::Display for InvalidItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.error)
    }
}

/// Renders body text into markup.
///
/// Implementations are shared across concurrently processed documents, so they
/// must be reentrant. Options a renderer carries (its "context") live on the
/// implementing value itself.
pub trait Renderer: Send + Sync {
    fn render(&self, body: &str) -> String;
}

/// Splits a payload into a structured header and remaining body text.
pub trait MetadataParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<ParsedMetadata, MetadataDecodeError>;
}

/// Yields the documents of a run as an ordered list.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn documents(&self) -> Result<Vec<RawDocument>, SourceError>;
}

/// Receives output documents and per-document error events.
///
/// `report` is an out-of-band notification: it cannot fail and must not stop
/// the run.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Sink: Send + Sync {
    async fn emit(&self, document: OutputDocument) -> Result<(), SinkError>;

    async fn report(&self, item: &InvalidItem);
}
