/// # markdown-json CLI Interface (Module)
///
/// Command parsing and orchestration for the `markdown-json` binary. All
/// conversion logic lives in [`markdown_json_core`]; this module loads the
/// config file, applies command-line overrides, wires the filesystem source
/// and sink to a pipeline, and runs it.
///
/// For programmatic or integration use, call [`run`] with a constructed [`Cli`].
use crate::load_config::{load_config, CliConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use markdown_json_core::pipeline::{self, Mode, Pipeline, RunReport};
use markdown_json_core::render::commonmark;
use markdown_json_core::sink::FsSink;
use markdown_json_core::source::FsSource;
use std::path::PathBuf;

/// CLI for markdown-json: convert markdown trees into JSON.
#[derive(Parser)]
#[clap(
    name = "markdown-json",
    version,
    about = "Convert markdown documents with YAML front matter into JSON records or one consolidated content tree"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert every document below the configured source directory
    Convert {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Override the configured mode (`single` or `consolidate`)
        #[clap(long)]
        mode: Option<Mode>,
        /// Override the name of the consolidated output document
        #[clap(long)]
        name: Option<String>,
        /// Merge index documents into their directory node
        #[clap(long)]
        flatten_index: bool,
        /// Remove the derived title heading from the body
        #[clap(long)]
        strip_title: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<RunReport> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Convert {
            config,
            mode,
            name,
            flatten_index,
            strip_title,
        } => {
            let mut loaded = load_config(&config)?;
            if let Some(mode) = mode {
                loaded.mode = mode;
            }
            if name.is_some() {
                loaded.name = name;
            }
            loaded.flatten_index |= flatten_index;
            loaded.strip_title |= strip_title;
            convert(&loaded).await
        }
    }
}

/// Builds the pipeline described by `config`.
pub fn build_pipeline(config: &CliConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder()
        .renderer(commonmark(config.markdown))
        .strip_title(config.strip_title)
        .flatten_index(config.flatten_index)
        .nest_single_output(config.nest_single_output);
    if let Some(name) = &config.name {
        builder = builder.name(name.clone());
    }
    builder.build().context("Invalid pipeline configuration")
}

async fn convert(config: &CliConfig) -> Result<RunReport> {
    tracing::info!(
        command = "convert",
        source_dir = %config.source_dir.display(),
        output_dir = %config.output_dir.display(),
        mode = %config.mode,
        "Starting conversion"
    );
    let pipeline = build_pipeline(config)?;

    let mut source = FsSource::new(&config.source_dir);
    if let Some(extensions) = &config.extensions {
        source = source.with_extensions(extensions.iter().cloned());
    }
    let sink = FsSink::new(&config.output_dir);

    match pipeline::run(&pipeline, config.mode, &source, &sink).await {
        Ok(report) => {
            tracing::info!(
                command = "convert",
                emitted = report.emitted.len(),
                skipped = report.skipped.len(),
                invalid = report.invalid.len(),
                "Conversion complete"
            );
            Ok(report)
        }
        Err(e) => {
            tracing::error!(command = "convert", error = %e, "Conversion failed");
            Err(anyhow::Error::new(e).context("Conversion failed"))
        }
    }
}
