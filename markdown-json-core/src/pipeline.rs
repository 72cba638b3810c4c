//! High-level pipeline: orchestrates filter → transform → (consolidate) → emit.
//!
//! This module coordinates the per-document steps over one document or a
//! batch of documents:
//!   - Drops binary payloads (documents in the output format are exempt)
//!   - Transforms each remaining document, or validates it when it is already JSON
//!   - In single-item mode, emits one output document per record as each settles
//!   - In batch mode, consolidates all records into one tree and emits that
//!
//! # Major Types
//! - [`Pipeline`]: holds the normalized configuration; stateless between batches
//! - [`RunReport`]: what was emitted, skipped and rejected during a run
//!
//! # Error Handling
//! Per-document failures become [`InvalidItem`]s: they are forwarded to the
//! sink's `report` and collected in the report, and never stop sibling
//! documents. Only configuration, source and sink failures abort a run.
//!
//! # Concurrency
//! Every document's chain is created as its own future before any of them is
//! awaited. Batch mode collects results in input order, which is what makes
//! key collisions in consolidation deterministic; streaming mode emits in
//! completion order.

use std::fmt;
use std::str::FromStr;

use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::binary::{sniff, Classification};
use crate::config::{PipelineBuilder, PipelineConfig};
use crate::consolidate::{consolidate, path_key};
use crate::contract::{
    with_output_extension, InvalidItem, OutputDocument, RawDocument, Sink, SourceProvider,
    TransformedDocument,
};
use crate::error::{DocumentError, PipelineError};
use crate::transform::DocumentTransformer;

/// How a run turns records into output documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// One output document per source document.
    Single,
    /// One consolidated output document for the whole batch.
    #[default]
    Consolidate,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" | "Single" => Ok(Mode::Single),
            "consolidate" | "Consolidate" | "batch" => Ok(Mode::Consolidate),
            other => Err(format!(
                "unknown mode '{other}', expected 'single' or 'consolidate'"
            )),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Single => f.write_str("single"),
            Mode::Consolidate => f.write_str("consolidate"),
        }
    }
}

/// Settled state of one document.
#[derive(Debug)]
pub enum ItemOutcome {
    Settled(TransformedDocument),
    /// Binary payload, excluded without error.
    Skipped(String),
    Failed(InvalidItem),
}

/// Outcome of single-item processing.
#[derive(Debug)]
pub enum SingleOutcome {
    Emitted(OutputDocument),
    Skipped(String),
    Invalid(InvalidItem),
}

/// Outcome of batch processing.
#[derive(Debug)]
pub struct BatchOutcome {
    pub document: OutputDocument,
    pub tree: Value,
    /// Invalid items in input order.
    pub invalid: Vec<InvalidItem>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    /// Output paths handed to the sink.
    pub emitted: Vec<String>,
    /// Source paths dropped as binary.
    pub skipped: Vec<String>,
    pub invalid: Vec<InvalidItem>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty()
    }
}

#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs one document through the filter and the transformer.
    pub async fn process_document(&self, document: &RawDocument) -> ItemOutcome {
        debug!(path = %document.path, "Processing document");
        if !document.is_passthrough() && sniff(document).await == Classification::Binary {
            debug!(path = %document.path, "Skipping binary document");
            return ItemOutcome::Skipped(document.path.clone());
        }

        match DocumentTransformer::new(&self.config).transform(document) {
            Ok(transformed) => ItemOutcome::Settled(transformed),
            Err(error) => ItemOutcome::Failed(InvalidItem {
                path: document.path.clone(),
                error,
            }),
        }
    }

    /// Single-item mode for one document. Completes only once the document has settled.
    pub async fn process_single(&self, document: &RawDocument) -> SingleOutcome {
        match self.process_document(document).await {
            ItemOutcome::Settled(transformed) => match self.single_output(transformed) {
                Ok(output) => SingleOutcome::Emitted(output),
                Err(item) => SingleOutcome::Invalid(item),
            },
            ItemOutcome::Skipped(path) => SingleOutcome::Skipped(path),
            ItemOutcome::Failed(item) => SingleOutcome::Invalid(item),
        }
    }

    /// Serializes a record as its own output document next to its source path.
    pub fn single_output(
        &self,
        document: TransformedDocument,
    ) -> Result<OutputDocument, InvalidItem> {
        let output_path = with_output_extension(&document.path);
        let payload = if self.config.nest_single_output {
            let key = path_key(&document.path).map_err(|error| InvalidItem {
                path: document.path.clone(),
                error,
            })?;
            let mut wrapper = serde_json::Map::new();
            wrapper.insert(key, document.data);
            Value::Object(wrapper)
        } else {
            document.data
        };

        OutputDocument::json(output_path.clone(), &payload).map_err(|source| InvalidItem {
            path: document.path,
            error: DocumentError::Serialize {
                path: output_path,
                source,
            },
        })
    }

    /// Batch mode: every document is dispatched before any is awaited; valid
    /// records are consolidated in input order.
    pub async fn process_batch(
        &self,
        documents: &[RawDocument],
    ) -> Result<BatchOutcome, PipelineError> {
        info!(documents = documents.len(), "[BATCH] Starting batch");

        let outcomes = join_all(documents.iter().map(|doc| self.process_document(doc))).await;

        let mut settled = Vec::with_capacity(outcomes.len());
        let mut invalid = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                ItemOutcome::Settled(doc) => settled.push(doc),
                ItemOutcome::Skipped(path) => skipped.push(path),
                ItemOutcome::Failed(item) => {
                    error!(path = %item.path, error = %item.error, "[BATCH][ERROR] Document rejected");
                    invalid.push(item);
                }
            }
        }

        let consolidated = consolidate(
            settled,
            self.config.flatten_index,
            self.config.consolidated_name(),
        )?;
        invalid.extend(consolidated.invalid);

        info!(
            output = %consolidated.document.path,
            invalid = invalid.len(),
            skipped = skipped.len(),
            "[BATCH] Batch consolidated"
        );
        Ok(BatchOutcome {
            document: consolidated.document,
            tree: consolidated.tree,
            invalid,
            skipped,
        })
    }

    /// Single-item mode over many documents: each output document is emitted
    /// as soon as its document settles, in completion order.
    pub async fn stream<S>(
        &self,
        documents: &[RawDocument],
        sink: &S,
    ) -> Result<RunReport, PipelineError>
    where
        S: Sink + ?Sized,
    {
        info!(documents = documents.len(), "[STREAM] Starting single-item run");
        let mut report = RunReport::default();

        let mut pending: FuturesUnordered<_> = documents
            .iter()
            .map(|doc| self.process_single(doc))
            .collect();

        while let Some(outcome) = pending.next().await {
            match outcome {
                SingleOutcome::Emitted(output) => {
                    let path = output.path.clone();
                    sink.emit(output).await.map_err(|e| {
                        error!(path = %path, error = %e, "[STREAM][ERROR] Sink rejected output");
                        e
                    })?;
                    debug!(path = %path, "[STREAM] Emitted");
                    report.emitted.push(path);
                }
                SingleOutcome::Skipped(path) => report.skipped.push(path),
                SingleOutcome::Invalid(item) => {
                    error!(path = %item.path, error = %item.error, "[STREAM][ERROR] Document rejected");
                    sink.report(&item).await;
                    report.invalid.push(item);
                }
            }
        }

        info!(
            emitted = report.emitted.len(),
            invalid = report.invalid.len(),
            skipped = report.skipped.len(),
            "[STREAM] Run complete"
        );
        Ok(report)
    }

    /// Batch mode with emission: reports invalid items, then emits the consolidated document.
    pub async fn consolidate_into<S>(
        &self,
        documents: &[RawDocument],
        sink: &S,
    ) -> Result<RunReport, PipelineError>
    where
        S: Sink + ?Sized,
    {
        let outcome = self.process_batch(documents).await?;

        for item in &outcome.invalid {
            sink.report(item).await;
        }
        let path = outcome.document.path.clone();
        sink.emit(outcome.document).await?;

        Ok(RunReport {
            emitted: vec![path],
            skipped: outcome.skipped,
            invalid: outcome.invalid,
        })
    }
}

/// Fetches every document from `source` and processes them in `mode`.
pub async fn run<P, S>(
    pipeline: &Pipeline,
    mode: Mode,
    source: &P,
    sink: &S,
) -> Result<RunReport, PipelineError>
where
    P: SourceProvider + ?Sized,
    S: Sink + ?Sized,
{
    info!(%mode, "[RUN] Starting pipeline run");
    let documents = source.documents().await.map_err(|e| {
        error!(error = %e, "[RUN][ERROR] Source provider failed");
        e
    })?;
    if documents.is_empty() {
        warn!("[RUN] Source provided no documents");
    }

    let report = match mode {
        Mode::Single => pipeline.stream(&documents, sink).await?,
        Mode::Consolidate => pipeline.consolidate_into(&documents, sink).await?,
    };

    info!(
        emitted = report.emitted.len(),
        invalid = report.invalid.len(),
        "[RUN] Pipeline run complete"
    );
    Ok(report)
}
