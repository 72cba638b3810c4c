//! Per-document transformation: front matter → render → title → timestamp → user transform.
//!
//! Documents that already carry the output extension skip all of that and are
//! only validated (passthrough).

use serde_json::Value;
use tracing::{debug, error};

use crate::config::PipelineConfig;
use crate::contract::{RawDocument, Record, TransformedDocument};
use crate::error::DocumentError;
use crate::title::extract_title;

pub const BODY: &str = "body";
pub const TITLE: &str = "title";
pub const UPDATED_AT: &str = "updatedAt";

/// Turns one raw document into one structured record.
pub struct DocumentTransformer<'a> {
    config: &'a PipelineConfig,
}

impl<'a> DocumentTransformer<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn transform(&self, document: &RawDocument) -> Result<TransformedDocument, DocumentError> {
        if document.is_passthrough() {
            return validate_passthrough(document);
        }

        let record = self.build_record(document)?;
        let data = match &self.config.transform {
            Some(transform) => transform(record, document),
            None => Value::Object(record),
        };

        debug!(path = %document.path, "Transformed document");
        Ok(TransformedDocument {
            path: document.path.clone(),
            data,
        })
    }

    /// Decodes and renders once; front-matter values for `body`, `title` and
    /// `updatedAt` take precedence over derived ones.
    fn build_record(&self, document: &RawDocument) -> Result<Record, DocumentError> {
        let text = String::from_utf8_lossy(&document.contents);
        let parsed = self.config.metadata_parser.parse(&text).map_err(|e| {
            error!(
                path = %document.path,
                line = e.line,
                column = e.column,
                reason = %e.reason,
                "Failed to decode front matter"
            );
            e
        })?;

        let mut record = parsed.attributes;
        let markup = self.config.renderer.render(&parsed.body);
        let body_from_metadata = record.contains_key(BODY);

        let title_from_metadata = record.get(TITLE).map(is_present).unwrap_or(false);
        if !title_from_metadata {
            if let Some(extracted) = extract_title(&markup, self.config.strip_title) {
                record.insert(TITLE.to_string(), Value::String(extracted.title));
                if let (Some(stripped), false) = (extracted.body, body_from_metadata) {
                    record.insert(BODY.to_string(), Value::String(stripped));
                }
            }
        }
        record
            .entry(BODY.to_string())
            .or_insert_with(|| Value::String(markup));

        if let Some(updated_at) = document.updated_at() {
            record
                .entry(UPDATED_AT.to_string())
                .or_insert(Value::String(updated_at));
        }

        Ok(record)
    }
}

/// Validates a document already in the output format; its parsed content is the record.
pub fn validate_passthrough(document: &RawDocument) -> Result<TransformedDocument, DocumentError> {
    match serde_json::from_slice::<Value>(&document.contents) {
        Ok(data) => {
            debug!(path = %document.path, "Passed through JSON document");
            Ok(TransformedDocument {
                path: document.path.clone(),
                data,
            })
        }
        Err(source) => {
            error!(path = %document.path, error = %source, "Passthrough document is not valid JSON");
            Err(DocumentError::InvalidFormat {
                name: document.base_name().to_string(),
                source,
            })
        }
    }
}

/// Whether a metadata value counts as supplied (null, `false` and `""` do not).
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineBuilder;
    use crate::render::{commonmark, MarkdownOptions};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn config(strip_title: bool) -> PipelineConfig {
        PipelineBuilder::default()
            .renderer(commonmark(MarkdownOptions::default()))
            .strip_title(strip_title)
            .build_config()
            .unwrap()
    }

    fn transform(config: &PipelineConfig, contents: &str) -> Value {
        let doc = RawDocument::new("fixture.md", contents);
        DocumentTransformer::new(config).transform(&doc).unwrap().data
    }

    #[test]
    fn merges_front_matter_and_rendered_body() {
        let data = transform(&config(false), "---\ntitle: lipsum ipsum\n---\n*\"dipsum\"*");
        assert_eq!(data["title"], json!("lipsum ipsum"));
        assert!(data["body"].as_str().unwrap().contains("<p>"));
    }

    #[test]
    fn untitled_document_has_no_title() {
        let data = transform(&config(true), "*tipsum dipsum*");
        assert!(data.get("title").is_none());
        assert_eq!(data["body"], json!("<p><em>tipsum dipsum</em></p>\n"));
    }

    #[test]
    fn extracts_atx_and_setext_titles() {
        for source in ["# Titulus\n*\"tipsum\"*", "Titulus\n=======\n*\"tipsum\"*"] {
            let data = transform(&config(false), source);
            assert_eq!(data["title"], json!("Titulus"));
            assert!(data["body"].as_str().unwrap().contains("<h1>Titulus</h1>"));
        }
    }

    #[test]
    fn strip_title_removes_first_heading_only() {
        let data = transform(&config(true), "# lipsum ipsum\n\n# Titulus tipsum");
        assert_eq!(data["title"], json!("lipsum ipsum"));
        let body = data["body"].as_str().unwrap();
        assert!(!body.contains("<h1>lipsum ipsum</h1>"));
        assert!(body.contains("<h1>Titulus tipsum</h1>"));
    }

    #[test]
    fn metadata_title_wins_and_is_never_stripped() {
        let source = "---\ntitle: lipsum ipsum\n---\n# Titulus\n*\"tipsum\"*";
        for strip in [false, true] {
            let data = transform(&config(strip), source);
            assert_eq!(data["title"], json!("lipsum ipsum"));
            assert!(data["body"].as_str().unwrap().contains("<h1>Titulus</h1>"));
        }
    }

    #[test]
    fn empty_metadata_title_is_backfilled() {
        let data = transform(&config(false), "---\ntitle: ''\n---\n# Titulus\n");
        assert_eq!(data["title"], json!("Titulus"));
    }

    #[test]
    fn stamps_updated_at_from_modification_time() {
        let config = config(false);
        let ts = Utc.with_ymd_and_hms(2015, 11, 3, 8, 9, 10).unwrap();
        let doc = RawDocument::new("a.md", "text").with_modified(ts);
        let data = DocumentTransformer::new(&config).transform(&doc).unwrap().data;
        assert_eq!(data["updatedAt"], json!("2015-11-03T08:09:10.000Z"));
    }

    #[test]
    fn user_transform_replaces_record() {
        let config = PipelineBuilder::default()
            .renderer(commonmark(MarkdownOptions::default()))
            .transform(|mut record: Record, doc: &RawDocument| {
                record.remove("body");
                record.insert("path".into(), json!(doc.path));
                Value::Object(record)
            })
            .build_config()
            .unwrap();
        let data = transform(&config, "---\ntitle: lipsum ipsum\n---\n*\"dipsum\"*");
        assert_eq!(data["title"], json!("lipsum ipsum"));
        assert!(data.get("body").is_none());
        assert_eq!(data["path"], json!("fixture.md"));
    }

    #[test]
    fn invalid_front_matter_is_a_decode_error() {
        let config = config(false);
        let doc = RawDocument::new("bad.md", "---\ntitle: \"lipsum \"fragor\" ipsum\"\n---\n*\"dipsum\"*");
        let err = DocumentTransformer::new(&config).transform(&doc).unwrap_err();
        match err {
            DocumentError::MetadataDecode(e) => assert_eq!(e.line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn passthrough_keeps_json_unchanged_and_skips_transform() {
        let config = PipelineBuilder::default()
            .renderer(|body: &str| body.to_string())
            .transform(|_record: Record, _doc: &RawDocument| json!("transformed"))
            .build_config()
            .unwrap();
        let doc = RawDocument::new("blog/site.json", r#"{"title":"ipsum blog","nested":{"b":1,"a":2}}"#);
        let data = DocumentTransformer::new(&config).transform(&doc).unwrap().data;
        assert_eq!(data, json!({"title": "ipsum blog", "nested": {"b": 1, "a": 2}}));
    }

    #[test]
    fn invalid_passthrough_names_the_file() {
        let doc = RawDocument::new("data/invalid.json", "\"{ \\\"title\\\"");
        let err = validate_passthrough(&doc).unwrap_err();
        assert_eq!(err.to_string(), "invalid.json is not valid JSON");
    }
}
