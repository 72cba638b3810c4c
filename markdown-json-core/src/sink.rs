//! Sinks: where output documents and error events go.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::contract::{InvalidItem, OutputDocument, Sink};
use crate::error::SinkError;

/// Writes output documents below `root`, each through a temporary file that
/// is renamed into place.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Target path for a relative output path; rejects paths escaping `root`.
    fn target(&self, relative: &str) -> Result<PathBuf, SinkError> {
        let relative = Path::new(relative);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.as_os_str().is_empty() {
            return Err(SinkError::InvalidPath(relative.display().to_string()));
        }
        Ok(self.root.join(relative))
    }

    pub fn write(&self, document: &OutputDocument) -> Result<PathBuf, SinkError> {
        let target = self.target(&document.path)?;
        let parent = target.parent().unwrap_or(&self.root).to_path_buf();
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| SinkError::Io { path, source }
        };

        std::fs::create_dir_all(&parent).map_err(io_err(&parent))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(io_err(&parent))?;
        tmp.write_all(&document.contents).map_err(io_err(&target))?;
        tmp.persist(&target)
            .map_err(|e| e.error)
            .map_err(io_err(&target))?;
        Ok(target)
    }
}

#[async_trait]
impl Sink for FsSink {
    async fn emit(&self, document: OutputDocument) -> Result<(), SinkError> {
        let target = self.write(&document)?;
        info!(path = %target.display(), bytes = document.contents.len(), "Wrote output document");
        Ok(())
    }

    async fn report(&self, item: &InvalidItem) {
        error!(path = %item.path, error = %item.error, "Invalid document");
    }
}

/// Keeps everything in memory; useful for embedding and tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    documents: Mutex<Vec<OutputDocument>>,
    reports: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn documents(&self) -> Vec<OutputDocument> {
        self.documents.lock().await.clone()
    }

    /// Rendered error events, in the order they were reported.
    pub async fn reports(&self) -> Vec<String> {
        self.reports.lock().await.clone()
    }
}

#[async_trait]
impl Sink for CollectingSink {
    async fn emit(&self, document: OutputDocument) -> Result<(), SinkError> {
        self.documents.lock().await.push(document);
        Ok(())
    }

    async fn report(&self, item: &InvalidItem) {
        self.reports.lock().await.push(item.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_nested_output_paths() {
        let tmp = tempdir().unwrap();
        let sink = FsSink::new(tmp.path());
        let doc = OutputDocument::json("blog/posts/a.json", &json!({"title": "A"})).unwrap();
        sink.emit(doc).await.unwrap();

        let written = std::fs::read_to_string(tmp.path().join("blog/posts/a.json")).unwrap();
        assert_eq!(written, r#"{"title":"A"}"#);
    }

    #[tokio::test]
    async fn rejects_paths_outside_root() {
        let tmp = tempdir().unwrap();
        let sink = FsSink::new(tmp.path().join("out"));
        for path in ["../evil.json", "/etc/evil.json", ""] {
            let doc = OutputDocument {
                path: path.to_string(),
                contents: vec![],
            };
            assert!(matches!(
                sink.emit(doc).await,
                Err(SinkError::InvalidPath(_))
            ));
        }
    }

    #[tokio::test]
    async fn collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        for name in ["a.json", "b.json"] {
            sink.emit(OutputDocument {
                path: name.into(),
                contents: b"{}".to_vec(),
            })
            .await
            .unwrap();
        }
        let paths: Vec<_> = sink.documents().await.into_iter().map(|d| d.path).collect();
        assert_eq!(paths, ["a.json", "b.json"]);
    }
}
