//! Text/binary classification of document payloads.
//!
//! The name is consulted first; unknown extensions fall back to sniffing the
//! leading bytes of the payload.

use crate::contract::RawDocument;

/// Number of leading bytes inspected when the extension is inconclusive.
const SNIFF_LEN: usize = 8000;

const TEXT_EXTENSIONS: &[&str] = &[
    "adoc", "css", "csv", "htm", "html", "js", "json", "markdown", "md", "mdown", "mdx", "mkd",
    "rst", "svg", "text", "toml", "tsv", "txt", "xml", "yaml", "yml",
];

const BINARY_EXTENSIONS: &[&str] = &[
    "7z", "avi", "bin", "bmp", "dll", "dylib", "eot", "exe", "gif", "gz", "ico", "jpeg", "jpg",
    "mov", "mp3", "mp4", "ogg", "otf", "pdf", "png", "psd", "rar", "so", "tar", "tif", "tiff",
    "ttf", "wasm", "wav", "webm", "webp", "woff", "woff2", "xz", "zip",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Text,
    Binary,
}

pub fn classify(name: &str, contents: &[u8]) -> Classification {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    if let Some(ext) = extension.as_deref() {
        if TEXT_EXTENSIONS.contains(&ext) {
            return Classification::Text;
        }
        if BINARY_EXTENSIONS.contains(&ext) {
            return Classification::Binary;
        }
    }
    classify_contents(contents)
}

/// NUL bytes or invalid UTF-8 in the leading bytes mean binary. A multi-byte
/// sequence cut off by the sniff window does not count as invalid.
pub fn classify_contents(contents: &[u8]) -> Classification {
    let window = &contents[..contents.len().min(SNIFF_LEN)];
    if window.contains(&0) {
        return Classification::Binary;
    }
    match std::str::from_utf8(window) {
        Ok(_) => Classification::Text,
        Err(e) if e.error_len().is_none() => Classification::Text,
        Err(_) => Classification::Binary,
    }
}

/// Classifies a document; suspends like any other per-document step so the
/// orchestrator can interleave documents.
pub async fn sniff(document: &RawDocument) -> Classification {
    classify(document.base_name(), &document.contents)
}
