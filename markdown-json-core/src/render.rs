//! Renderer adapters and the default CommonMark renderer.
//!
//! Callers hand the pipeline either a bare function or a function bound to a
//! context value (renderer options, a configured engine). Both are normalized
//! into `Arc<dyn Renderer>` once, when the pipeline is built.

use std::sync::Arc;

use pulldown_cmark::{html, Options, Parser};
use serde::{Deserialize, Serialize};

use crate::contract::Renderer;

impl<F> Renderer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn render(&self, body: &str) -> String {
        self(body)
    }
}

/// A render function called with a shared context as its receiver.
pub struct ContextRenderer<C> {
    context: Arc<C>,
    render: fn(&C, &str) -> String,
}

impl<C> ContextRenderer<C> {
    pub fn new(context: Arc<C>, render: fn(&C, &str) -> String) -> Self {
        Self { context, render }
    }

    pub fn context(&self) -> &C {
        &self.context
    }
}

impl<C> Renderer for ContextRenderer<C>
where
    C: Send + Sync,
{
    fn render(&self, body: &str) -> String {
        (self.render)(&self.context, body)
    }
}

/// Options for the CommonMark renderer; these form its render context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownOptions {
    pub smart_punctuation: bool,
    pub tables: bool,
    pub footnotes: bool,
    pub strikethrough: bool,
    pub tasklists: bool,
    pub heading_attributes: bool,
}

impl MarkdownOptions {
    fn to_parser_options(self) -> Options {
        let mut options = Options::empty();
        let flags = [
            (self.smart_punctuation, Options::ENABLE_SMART_PUNCTUATION),
            (self.tables, Options::ENABLE_TABLES),
            (self.footnotes, Options::ENABLE_FOOTNOTES),
            (self.strikethrough, Options::ENABLE_STRIKETHROUGH),
            (self.tasklists, Options::ENABLE_TASKLISTS),
            (self.heading_attributes, Options::ENABLE_HEADING_ATTRIBUTES),
        ];
        for (enabled, flag) in flags {
            if enabled {
                options.insert(flag);
            }
        }
        options
    }
}

/// Renders CommonMark to HTML with `pulldown-cmark`.
pub fn render_commonmark(options: &MarkdownOptions, body: &str) -> String {
    let parser = Parser::new_ext(body, options.to_parser_options());
    let mut markup = String::with_capacity(body.len() * 3 / 2);
    html::push_html(&mut markup, parser);
    markup
}

pub type CommonMarkRenderer = ContextRenderer<MarkdownOptions>;

pub fn commonmark(options: MarkdownOptions) -> CommonMarkRenderer {
    ContextRenderer::new(Arc::new(options), render_commonmark)
}
