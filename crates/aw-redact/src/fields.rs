//! Field selection.
//!
//! A whitelist over JSON values. Patterns are parsed once into a small trie:
//!
//! - `"*"` keeps everything.
//! - `"a.b.c"` keeps the value at that object path.
//! - `"items[]"` keeps the array `items` whole.
//! - `"items[].name"` keeps `name` inside every element of `items`.
//!
//! Plain segments only descend into objects and `[]` segments only descend
//! into arrays; a value of the wrong shape is dropped. Containers that end up
//! empty after filtering are dropped too, except the top-level value.

use crate::error::{RedactionError, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// One segment of a dotted field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub key: String,
    /// `key[]`: descend into every element of the array at `key`.
    pub each: bool,
}

/// A parsed field-path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPattern {
    /// `*`: keep everything.
    KeepAll,
    /// A dotted path.
    Path(Vec<Segment>),
}

impl FieldPattern {
    /// Parse a pattern string.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed == "*" {
            return Ok(FieldPattern::KeepAll);
        }
        if trimmed.is_empty() {
            return Err(RedactionError::InvalidFieldPath(s.to_string()));
        }

        let mut segments = Vec::new();
        for part in trimmed.split('.') {
            let (key, each) = match part.strip_suffix("[]") {
                Some(key) => (key, true),
                None => (part, false),
            };
            if key.is_empty() || key.contains(['[', ']', '*']) {
                return Err(RedactionError::InvalidFieldPath(s.to_string()));
            }
            segments.push(Segment {
                key: key.to_string(),
                each,
            });
        }
        Ok(FieldPattern::Path(segments))
    }
}

impl std::fmt::Display for FieldPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldPattern::KeepAll => f.write_str("*"),
            FieldPattern::Path(segments) => {
                for (i, seg) in segments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(&seg.key)?;
                    if seg.each {
                        f.write_str("[]")?;
                    }
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Default, Clone)]
struct Node {
    /// Keep the value reaching this node whole.
    keep: bool,
    /// Object children.
    fields: BTreeMap<String, Node>,
    /// Array elements (`[]`).
    elements: Option<Box<Node>>,
}

impl Node {
    fn insert(&mut self, segments: &[Segment]) {
        if self.keep {
            return;
        }
        let Some((first, rest)) = segments.split_first() else {
            self.keep = true;
            self.fields.clear();
            self.elements = None;
            return;
        };
        let child = self.fields.entry(first.key.clone()).or_default();
        if first.each {
            if child.keep {
                return;
            }
            child
                .elements
                .get_or_insert_with(Default::default)
                .insert(rest);
        } else {
            child.insert(rest);
        }
    }
}

/// Compiled field whitelist.
#[derive(Debug, Clone, Default)]
pub struct FieldSelector {
    root: Node,
}

impl FieldSelector {
    /// Build a selector from parsed patterns.
    pub fn new(patterns: &[FieldPattern]) -> Self {
        let mut root = Node::default();
        for pattern in patterns {
            match pattern {
                FieldPattern::KeepAll => root.insert(&[]),
                FieldPattern::Path(segments) => root.insert(segments),
            }
        }
        Self { root }
    }

    /// Parse and compile pattern strings.
    pub fn parse<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let parsed = patterns
            .iter()
            .map(|p| FieldPattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(&parsed))
    }

    /// Whether this selector keeps everything.
    pub fn keeps_all(&self) -> bool {
        self.root.keep
    }

    /// Filter a value.
    pub fn select(&self, data: &Value) -> Value {
        self.select_with_report(data).0
    }

    /// Filter a value and report the dotted paths that were dropped.
    ///
    /// Paths inside arrays use `[]`, e.g. `messages[].raw`. The list is
    /// sorted and deduplicated.
    pub fn select_with_report(&self, data: &Value) -> (Value, Vec<String>) {
        let mut stripped = BTreeSet::new();
        let value = if self.root.keep {
            data.clone()
        } else {
            match data {
                Value::Object(_) => select_node(&self.root, data, "", &mut stripped)
                    .unwrap_or_else(|| Value::Object(Map::new())),
                Value::Array(items) => Value::Array(
                    items
                        .iter()
                        .filter_map(|item| select_node(&self.root, item, "[]", &mut stripped))
                        .filter(|v| !is_empty_container(v))
                        .collect(),
                ),
                _ => Value::Null,
            }
        };
        (value, stripped.into_iter().collect())
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Apply `node` to `value`. `None` means the value has the wrong shape for
/// the node and is dropped entirely.
fn select_node(
    node: &Node,
    value: &Value,
    path: &str,
    stripped: &mut BTreeSet<String>,
) -> Option<Value> {
    if node.keep {
        return Some(value.clone());
    }
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, child_value) in map {
                let child_path = join(path, key);
                let Some(child) = node.fields.get(key) else {
                    stripped.insert(child_path);
                    continue;
                };
                match select_child(child, child_value, &child_path, stripped) {
                    Some(v) if child.keep || !is_empty_container(&v) => {
                        out.insert(key.clone(), v);
                    }
                    Some(_) => {}
                    None => {
                        stripped.insert(child_path);
                    }
                }
            }
            Some(Value::Object(out))
        }
        _ => None,
    }
}

/// Apply a child node, which may descend either into an object or, through
/// `[]`, into the elements of an array.
fn select_child(
    child: &Node,
    value: &Value,
    path: &str,
    stripped: &mut BTreeSet<String>,
) -> Option<Value> {
    if child.keep {
        return Some(value.clone());
    }
    match (value, &child.elements) {
        (Value::Array(items), Some(element)) => {
            let element_path = format!("{path}[]");
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match select_node(element, item, &element_path, stripped) {
                    Some(v) if element.keep || !is_empty_container(&v) => out.push(v),
                    Some(_) => {}
                    None => {
                        stripped.insert(element_path.clone());
                    }
                }
            }
            Some(Value::Array(out))
        }
        (Value::Object(_), _) if !child.fields.is_empty() => {
            select_node(child, value, path, stripped)
        }
        _ => None,
    }
}

/// Keep only whitelisted fields of `data`.
///
/// `["*"]` returns `data` unchanged. An empty list returns `{}` for an object,
/// `[]` for an array, and `null` for anything else.
pub fn apply_field_selection<S: AsRef<str>>(data: &Value, kept_fields: &[S]) -> Result<Value> {
    Ok(FieldSelector::parse(kept_fields)?.select(data))
}

/// Like [`apply_field_selection`], also returning the dropped field paths.
pub fn apply_field_selection_with_report<S: AsRef<str>>(
    data: &Value,
    kept_fields: &[S],
) -> Result<(Value, Vec<String>)> {
    Ok(FieldSelector::parse(kept_fields)?.select_with_report(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> Value {
        json!({
            "id": "conv-1",
            "cwd": "/home/dev/proj",
            "stats": {"tool_count": 4, "duration_ms": 1200},
            "messages": [
                {"role": "user", "content": "hi", "raw": {"x": 1}},
                {"role": "assistant", "content": "hello"}
            ],
            "tags": ["a", "b"]
        })
    }

    #[test]
    fn test_parse_patterns() {
        assert_eq!(FieldPattern::parse("*").unwrap(), FieldPattern::KeepAll);
        let FieldPattern::Path(segs) = FieldPattern::parse("messages[].role").unwrap() else {
            panic!("expected a path");
        };
        assert_eq!(
            segs,
            vec![
                Segment { key: "messages".into(), each: true },
                Segment { key: "role".into(), each: false },
            ]
        );
        assert_eq!(FieldPattern::parse("a.b[].c").unwrap().to_string(), "a.b[].c");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "a..b", ".a", "a.", "a[", "a[x]", "[]", "a.*"] {
            assert!(FieldPattern::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_keep_all_is_identity() {
        let data = session();
        assert_eq!(apply_field_selection(&data, &["*"]).unwrap(), data);
    }

    #[test]
    fn test_empty_list_empties_top_level() {
        assert_eq!(apply_field_selection::<&str>(&session(), &[]).unwrap(), json!({}));
        assert_eq!(
            apply_field_selection::<&str>(&json!([{"a": 1}, 2]), &[]).unwrap(),
            json!([])
        );
        assert_eq!(apply_field_selection::<&str>(&json!("text"), &[]).unwrap(), Value::Null);
    }

    #[test]
    fn test_exact_paths() {
        let out = apply_field_selection(&session(), &["id", "stats.tool_count"]).unwrap();
        assert_eq!(out, json!({"id": "conv-1", "stats": {"tool_count": 4}}));
    }

    #[test]
    fn test_array_element_paths() {
        let out = apply_field_selection(&session(), &["messages[].role"]).unwrap();
        assert_eq!(
            out,
            json!({"messages": [{"role": "user"}, {"role": "assistant"}]})
        );
    }

    #[test]
    fn test_trailing_brackets_keep_whole_array() {
        let out = apply_field_selection(&session(), &["tags[]"]).unwrap();
        assert_eq!(out, json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn test_shape_mismatch_drops_value() {
        // `stats` is an object, not an array; `id` is a scalar, not an object.
        let out = apply_field_selection(&session(), &["stats[].x", "id.y"]).unwrap();
        assert_eq!(out, json!({}));
    }

    #[test]
    fn test_wider_pattern_wins() {
        let out = apply_field_selection(&session(), &["stats.tool_count", "stats"]).unwrap();
        assert_eq!(out["stats"], session()["stats"]);
    }

    #[test]
    fn test_stripped_report() {
        let (_, stripped) =
            apply_field_selection_with_report(&session(), &["id", "messages[].role"]).unwrap();
        assert_eq!(
            stripped,
            vec![
                "cwd".to_string(),
                "messages[].content".to_string(),
                "messages[].raw".to_string(),
                "stats".to_string(),
                "tags".to_string(),
            ]
        );
    }

    #[test]
    fn test_top_level_array_elementwise() {
        let data = json!([{"id": 1, "secret": "x"}, {"id": 2}]);
        let out = apply_field_selection(&data, &["id"]).unwrap();
        assert_eq!(out, json!([{"id": 1}, {"id": 2}]));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(matches!(
            apply_field_selection(&session(), &["a..b"]),
            Err(RedactionError::InvalidFieldPath(_))
        ));
    }
}
