//! Consolidation of many records into one tree mirroring the source hierarchy.
//!
//! Each record's path becomes a dotted key (`blog/posts/index.md` →
//! `blog.posts.index`), which is expanded into nested mappings. Every mapping
//! level is sorted by key before serialization.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::contract::{InvalidItem, OutputDocument, TransformedDocument};
use crate::error::{DocumentError, PipelineError};

/// Result of one consolidation call.
#[derive(Debug)]
pub struct Consolidated {
    pub document: OutputDocument,
    pub tree: Value,
    /// Records excluded because no key could be derived from their path.
    pub invalid: Vec<InvalidItem>,
}

/// Segments of a path's key: final extension dropped, split on path separators and dots.
pub fn path_key_segments(path: &str) -> Result<Vec<String>, DocumentError> {
    let base_start = path.rfind(['/', '\\']).map(|idx| idx + 1).unwrap_or(0);
    let without_extension = match path[base_start..].rfind('.') {
        Some(idx) if idx > 0 => &path[..base_start + idx],
        _ => path,
    };

    let segments: Vec<String> = without_extension
        .split(['/', '\\', '.'])
        .map(str::to_string)
        .collect();

    if segments.iter().any(String::is_empty) {
        return Err(DocumentError::Structural {
            path: path.to_string(),
            reason: if without_extension.is_empty() {
                "key is empty".to_string()
            } else {
                format!("key '{}' has an empty segment", segments.join("."))
            },
        });
    }
    Ok(segments)
}

/// Dotted key for a path, e.g. `blog.posts.oakland-activist`.
pub fn path_key(path: &str) -> Result<String, DocumentError> {
    path_key_segments(path).map(|segments| segments.join("."))
}

/// Collapses `[.., parent, parent]` and `[.., parent, "index"]` into `[.., parent]`.
pub fn flatten_index_segments(mut segments: Vec<String>) -> Vec<String> {
    if let [.., parent, leaf] = segments.as_slice() {
        if leaf == parent || leaf == "index" {
            segments.pop();
        }
    }
    segments
}

/// Builds the consolidated tree from records in input order.
///
/// Records whose keys coincide resolve to the one latest in input order. A
/// record sitting at the position of an intermediate node shares that node
/// with its children.
pub fn consolidate(
    records: Vec<TransformedDocument>,
    flatten_index: bool,
    name: &str,
) -> Result<Consolidated, PipelineError> {
    info!(records = records.len(), flatten_index, name, "Consolidating records");

    let mut invalid = Vec::new();
    let mut flat: BTreeMap<String, (Vec<String>, TransformedDocument)> = BTreeMap::new();

    for record in records {
        let segments = match path_key_segments(&record.path) {
            Ok(segments) if flatten_index => flatten_index_segments(segments),
            Ok(segments) => segments,
            Err(error) => {
                warn!(path = %record.path, error = %error, "Excluding record from consolidated output");
                invalid.push(InvalidItem {
                    path: record.path,
                    error,
                });
                continue;
            }
        };
        let key = segments.join(".");
        if let Some((_, previous)) = flat.get(&key) {
            warn!(
                key = %key,
                replaced = %previous.path,
                by = %record.path,
                "Key collision, later document wins"
            );
        }
        flat.insert(key, (segments, record));
    }

    let mut root = Map::new();
    for (key, (segments, record)) in flat {
        debug!(key = %key, path = %record.path, "Placing record");
        insert_at(&mut root, &segments, record.data);
    }

    let tree = deep_sort(Value::Object(root));
    let document = OutputDocument::json(name, &tree).map_err(|source| PipelineError::Serialize {
        path: name.to_string(),
        source,
    })?;

    Ok(Consolidated {
        document,
        tree,
        invalid,
    })
}

fn insert_at(root: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut node = root;
    for segment in parents {
        let slot = node
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            warn!(segment = %segment, "Replacing non-mapping value with a nested node");
            *slot = Value::Object(Map::new());
        }
        node = match slot {
            Value::Object(map) => map,
            _ => return,
        };
    }

    let merge = value.is_object() && matches!(node.get(last), Some(Value::Object(_)));
    if merge {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) = (node.get_mut(last), value)
        {
            existing.extend(incoming);
        }
    } else {
        node.insert(last.clone(), value);
    }
}

/// Sorts the keys of every mapping, at any depth, in ordinal order. Arrays keep
/// their element order.
pub fn deep_sort(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, deep_sort(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(deep_sort).collect()),
        other => other,
    }
}
