use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::contract::{MetadataParser, RawDocument, Record, Renderer, DEFAULT_CONSOLIDATED_NAME};
use crate::error::PipelineError;
use crate::frontmatter::YamlFrontMatter;
use crate::pipeline::Pipeline;
use crate::render::ContextRenderer;

/// User post-transform: receives the record and the source document, returns
/// whatever should be emitted in its place.
pub type TransformFn = Arc<dyn Fn(Record, &RawDocument) -> Value + Send + Sync>;

/// Normalized pipeline configuration, built once by [`PipelineBuilder`].
pub struct PipelineConfig {
    pub renderer: Arc<dyn Renderer>,
    pub metadata_parser: Arc<dyn MetadataParser>,
    pub strip_title: bool,
    pub transform: Option<TransformFn>,
    /// Merge `index` and same-named-as-parent documents into their parent node (batch mode).
    pub flatten_index: bool,
    /// Name of the consolidated output document.
    pub name: Option<String>,
    /// Nest single-item output under its path key instead of emitting the bare record.
    pub nest_single_output: bool,
}

impl PipelineConfig {
    pub fn consolidated_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_CONSOLIDATED_NAME)
    }

    pub fn trace_loaded(&self) {
        info!(
            strip_title = self.strip_title,
            flatten_index = self.flatten_index,
            transform = self.transform.is_some(),
            name = self.consolidated_name(),
            "Loaded PipelineConfig"
        );
        debug!(config = ?self, "PipelineConfig loaded (full debug)");
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("strip_title", &self.strip_title)
            .field("transform", &self.transform.as_ref().map(|_| "<fn>"))
            .field("flatten_index", &self.flatten_index)
            .field("name", &self.name)
            .field("nest_single_output", &self.nest_single_output)
            .finish_non_exhaustive()
    }
}

/// Collects pipeline options; the renderer is the only required one.
#[derive(Default)]
pub struct PipelineBuilder {
    renderer: Option<Arc<dyn Renderer>>,
    metadata_parser: Option<Arc<dyn MetadataParser>>,
    strip_title: bool,
    transform: Option<TransformFn>,
    flatten_index: bool,
    name: Option<String>,
    nest_single_output: bool,
}

impl PipelineBuilder {
    pub fn renderer<R>(mut self, renderer: R) -> Self
    where
        R: Renderer + 'static,
    {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    /// Uses `render` with `context` as its receiver.
    pub fn renderer_with_context<C>(self, context: Arc<C>, render: fn(&C, &str) -> String) -> Self
    where
        C: Send + Sync + 'static,
    {
        self.renderer(ContextRenderer::new(context, render))
    }

    pub fn shared_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn metadata_parser<P>(mut self, parser: P) -> Self
    where
        P: MetadataParser + 'static,
    {
        self.metadata_parser = Some(Arc::new(parser));
        self
    }

    pub fn strip_title(mut self, strip_title: bool) -> Self {
        self.strip_title = strip_title;
        self
    }

    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Record, &RawDocument) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn flatten_index(mut self, flatten_index: bool) -> Self {
        self.flatten_index = flatten_index;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn nest_single_output(mut self, nest: bool) -> Self {
        self.nest_single_output = nest;
        self
    }

    /// Validates and normalizes the options. Fails when no renderer was given.
    pub fn build_config(self) -> Result<PipelineConfig, PipelineError> {
        let renderer = self.renderer.ok_or_else(|| {
            PipelineError::Configuration("Markdown renderer function required".to_string())
        })?;
        if matches!(self.name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(PipelineError::Configuration(
                "consolidated output name must not be empty".to_string(),
            ));
        }

        Ok(PipelineConfig {
            renderer,
            metadata_parser: self
                .metadata_parser
                .unwrap_or_else(|| Arc::new(YamlFrontMatter)),
            strip_title: self.strip_title,
            transform: self.transform,
            flatten_index: self.flatten_index,
            name: self.name,
            nest_single_output: self.nest_single_output,
        })
    }

    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let config = self.build_config()?;
        config.trace_loaded();
        Ok(Pipeline::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_renderer_is_a_configuration_error() {
        let err = PipelineBuilder::default().strip_title(true).build().unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(err.to_string().contains("renderer"));
    }

    #[test]
    fn defaults_apply() {
        let config = PipelineBuilder::default()
            .renderer(|body: &str| body.to_string())
            .build_config()
            .unwrap();
        assert!(!config.strip_title);
        assert!(!config.flatten_index);
        assert!(!config.nest_single_output);
        assert!(config.transform.is_none());
        assert_eq!(config.consolidated_name(), "content.json");
    }

    #[test]
    fn name_overrides_default_and_must_not_be_blank() {
        let config = PipelineBuilder::default()
            .renderer(|body: &str| body.to_string())
            .name("blog.json")
            .build_config()
            .unwrap();
        assert_eq!(config.consolidated_name(), "blog.json");

        let err = PipelineBuilder::default()
            .renderer(|body: &str| body.to_string())
            .name("  ")
            .build_config()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
