use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use markdown_json_core::render::{commonmark, MarkdownOptions};
use markdown_json_core::sink::CollectingSink;
use markdown_json_core::{Pipeline, RawDocument};
use tracing::field::{Field, Visit};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Collects `level message key=value ...` lines for every event.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

struct LineVisitor<'a>(&'a mut String);

impl Visit for LineVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let _ = write!(self.0, " {}={:?}", field.name(), value);
    }
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut line = event.metadata().level().to_string();
        event.record(&mut LineVisitor(&mut line));
        self.events.lock().unwrap().push(line);
    }
}

#[tokio::test]
async fn invalid_documents_are_logged_with_their_path_and_line() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = Registry::default().with(EventCollector {
        events: events.clone(),
    });
    let _guard = tracing::subscriber::set_default(subscriber);

    let pipeline = Pipeline::builder()
        .renderer(commonmark(MarkdownOptions::default()))
        .build()
        .unwrap();
    let documents = vec![
        RawDocument::new("ok.md", "# Fine"),
        RawDocument::new("broken.md", "---\ntitle: \"a \"b\" c\"\n---\n"),
    ];
    let sink = CollectingSink::new();
    pipeline.consolidate_into(&documents, &sink).await.unwrap();

    let events = events.lock().unwrap();
    assert!(
        events.iter().any(|e| e.starts_with("INFO") && e.contains("Loaded PipelineConfig")),
        "missing config event: {events:?}"
    );
    assert!(
        events
            .iter()
            .any(|e| e.starts_with("ERROR") && e.contains("broken.md") && e.contains("line=2")),
        "missing decode error event: {events:?}"
    );
    assert!(
        events.iter().any(|e| e.contains("[BATCH] Batch consolidated")),
        "missing batch summary: {events:?}"
    );
}
