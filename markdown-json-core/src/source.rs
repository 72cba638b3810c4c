//! Filesystem source provider.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::contract::{RawDocument, SourceProvider};
use crate::error::SourceError;

/// Reads every file below `root`, skipping hidden files and directories.
///
/// Documents are returned sorted by relative path so that runs over the same
/// tree see the same input order.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
    extensions: Option<Vec<String>>,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: None,
        }
    }

    /// Only yield files with one of these extensions (case-insensitive, without dot).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(
            extensions
                .into_iter()
                .map(|ext| ext.into().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        );
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Synchronous walk, shared by the trait implementation and tests.
    pub fn read_all(&self) -> Result<Vec<RawDocument>, SourceError> {
        if !self.root.is_dir() {
            error!(path = %self.root.display(), "Source directory does not exist");
            return Err(SourceError::MissingRoot(self.root.clone()));
        }

        let mut documents = Vec::new();
        self.visit_dir(&self.root, &mut documents)?;
        documents.sort_by(|a, b| a.path.cmp(&b.path));

        info!(
            root = %self.root.display(),
            count = documents.len(),
            "Collected source documents"
        );
        Ok(documents)
    }

    fn visit_dir(&self, dir: &Path, results: &mut Vec<RawDocument>) -> Result<(), SourceError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| SourceError::Io { path, source }
        };

        for entry in std::fs::read_dir(dir).map_err(io_err(dir))? {
            let entry = entry.map_err(io_err(dir))?;
            let path = entry.path();
            let file_name = entry.file_name();
            if file_name.to_string_lossy().starts_with('.') {
                debug!(path = %path.display(), "Skipping hidden entry");
                continue;
            }

            if path.is_dir() {
                self.visit_dir(&path, results)?;
            } else if path.is_file() && self.accepts(&path) {
                let contents = std::fs::read(&path).map_err(io_err(&path))?;
                let modified = entry
                    .metadata()
                    .and_then(|meta| meta.modified())
                    .ok()
                    .map(DateTime::<Utc>::from);
                let relative = relative_path(&self.root, &path);
                debug!(path = %relative, size = contents.len(), "Read source document");
                results.push(RawDocument {
                    path: relative,
                    contents,
                    modified,
                });
            }
        }
        Ok(())
    }

    fn accepts(&self, path: &Path) -> bool {
        let Some(extensions) = &self.extensions else {
            return true;
        };
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

#[async_trait]
impl SourceProvider for FsSource {
    async fn documents(&self) -> Result<Vec<RawDocument>, SourceError> {
        self.read_all()
    }
}

/// `path` relative to `root`, joined with `/` on every platform.
fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|comp| comp.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
