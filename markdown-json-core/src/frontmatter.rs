//! YAML front-matter decoding.
//!
//! A header block starts on the first line with `---` and ends at the next line
//! consisting of `---` or `...`. Everything after the closing line is body.
//! Documents without a complete header block are all body.

use serde_json::Value;
use tracing::debug;

use crate::contract::{MetadataParser, ParsedMetadata, Record};
use crate::error::MetadataDecodeError;

const OPEN: &str = "---";
const CLOSE: [&str; 2] = ["---", "..."];

/// Default [`MetadataParser`]: YAML front matter decoded with `serde_yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFrontMatter;

impl MetadataParser for YamlFrontMatter {
    fn parse(&self, text: &str) -> Result<ParsedMetadata, MetadataDecodeError> {
        parse_front_matter(text)
    }
}

pub fn parse_front_matter(text: &str) -> Result<ParsedMetadata, MetadataDecodeError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let lines: Vec<&str> = text.split_inclusive('\n').collect();

    let opens = lines
        .first()
        .map(|line| line.trim_end() == OPEN)
        .unwrap_or(false);
    let close_idx = if opens {
        lines
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, line)| CLOSE.contains(&line.trim_end()))
            .map(|(idx, _)| idx)
    } else {
        None
    };

    let Some(close_idx) = close_idx else {
        return Ok(ParsedMetadata {
            attributes: Record::new(),
            body: text.to_string(),
            body_begin: 1,
            frontmatter: None,
        });
    };

    let yaml: String = lines[1..close_idx].concat();
    let body: String = lines[close_idx + 1..].concat();
    let attributes = decode_attributes(&yaml, text)?;
    debug!(
        attributes = attributes.len(),
        body_begin = close_idx + 2,
        "Decoded front matter"
    );

    Ok(ParsedMetadata {
        attributes,
        body,
        body_begin: close_idx + 2,
        frontmatter: Some(yaml),
    })
}

/// Decodes the header into an attribute map. Error positions are shifted by
/// one line to account for the opening delimiter.
fn decode_attributes(yaml: &str, document: &str) -> Result<Record, MetadataDecodeError> {
    if yaml.trim().is_empty() {
        return Ok(Record::new());
    }

    let value: Value = serde_yaml::from_str(yaml).map_err(|e| {
        let (line, column) = e
            .location()
            .map(|loc| (loc.line() + 1, loc.column()))
            .unwrap_or((2, 1));
        MetadataDecodeError::at(reason_of(&e), document, line, column)
    })?;

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Record::new()),
        other => Err(MetadataDecodeError::at(
            format!("front matter must be a mapping, found {}", kind_of(&other)),
            document,
            2,
            1,
        )),
    }
}

/// The parser's message without its trailing position, which is reported separately.
fn reason_of(err: &serde_yaml::Error) -> String {
    let message = err.to_string();
    match message.find(" at line ") {
        Some(idx) => message[..idx].to_string(),
        None => message,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
