//! Title extraction from rendered markup.

use regex::Regex;
use std::sync::LazyLock;

static FIRST_H1: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<h1[^>]*>([^<]*)</h1>").expect("static heading pattern is valid")
});

/// Title found in markup, plus the stripped body when stripping was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTitle {
    pub title: String,
    pub body: Option<String>,
}

/// Finds the first `<h1>` with plain text content in `markup`.
///
/// Returns `None` when the markup has no such heading. With `strip`, the body
/// is the markup minus that heading element, trimmed.
pub fn extract_title(markup: &str, strip: bool) -> Option<ExtractedTitle> {
    let captures = FIRST_H1.captures(markup)?;
    let whole = captures.get(0)?;
    let title = captures.get(1)?.as_str().to_string();

    let body = strip.then(|| {
        let mut stripped = String::with_capacity(markup.len() - whole.len());
        stripped.push_str(&markup[..whole.start()]);
        stripped.push_str(&markup[whole.end()..]);
        stripped.trim().to_string()
    });

    Some(ExtractedTitle { title, body })
}
