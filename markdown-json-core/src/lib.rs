#![doc = "markdown-json-core: turns trees of markdown and JSON documents into JSON."]

//! This crate contains the document model, the per-document transformation and
//! the consolidation of many documents into one tree. The command line front
//! end lives in the `markdown-json` crate.
//!
//! # Usage
//! Build a [`Pipeline`] with a renderer, then either process documents
//! directly or [`run`] it between a [`SourceProvider`] and a [`Sink`].

pub mod binary;
pub mod config;
pub mod consolidate;
pub mod contract;
pub mod error;
pub mod frontmatter;
pub mod pipeline;
pub mod render;
pub mod sink;
pub mod source;
pub mod title;
pub mod transform;

pub use config::{PipelineBuilder, PipelineConfig};
pub use contract::{
    InvalidItem, OutputDocument, RawDocument, Record, Renderer, Sink, SourceProvider,
    TransformedDocument,
};
pub use error::{DocumentError, PipelineError};
pub use pipeline::{run, Mode, Pipeline, RunReport};
