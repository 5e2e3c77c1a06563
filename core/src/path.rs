//! Dotted path addressing over record trees.
//!
//! A [`PathSpec`] names a location inside a record as a sequence of field
//! names (`produceDescriptions.text`). Paths never carry array indices:
//! whenever resolution meets an array it fans out over every element and
//! returns an array aligned by position.
//!
//! # Examples
//!
//! ```
//! use record_lens_core::{PathSpec, resolve};
//! use serde_json::json;
//!
//! let record = json!({"items": [{"text": "x"}, {"text": "y"}]});
//! let path = PathSpec::parse("items.text");
//! assert_eq!(resolve(&record, &path), json!(["x", "y"]));
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Tree;

static INDEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]").expect("static regex must compile"));

/// A dotted sequence of field names with implicit array traversal.
///
/// Serializes as the plain dotted string.
///
/// # Examples
///
/// ```
/// use record_lens_core::PathSpec;
///
/// let path = PathSpec::parse("descriptions.targetId");
/// assert_eq!(path.segments(), vec!["descriptions", "targetId"]);
/// assert_eq!(path.depth(), 2);
/// assert_eq!(path.to_string(), "descriptions.targetId");
///
/// assert!(PathSpec::parse("").is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PathSpec {
    raw: String,
}

impl PathSpec {
    /// Parses a dotted path. The string is kept verbatim.
    pub fn parse(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Returns the dotted form.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the field names in order. An empty path has no segments.
    pub fn segments(&self) -> Vec<&str> {
        if self.raw.is_empty() {
            return Vec::new();
        }
        self.raw.split('.').collect()
    }

    /// Number of field-access steps.
    pub fn depth(&self) -> usize {
        self.segments().len()
    }

    /// Returns `true` for the empty path.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Splits `top.sub` into its first segment and the remainder.
    pub fn split_first(&self) -> Option<(&str, Option<&str>)> {
        if self.raw.is_empty() {
            return None;
        }
        match self.raw.split_once('.') {
            Some((head, rest)) => Some((head, Some(rest))),
            None => Some((self.raw.as_str(), None)),
        }
    }

    fn child(&self, field: &str) -> Self {
        if self.raw.is_empty() {
            Self::parse(field)
        } else {
            Self::parse(format!("{}.{field}", self.raw))
        }
    }
}

impl From<String> for PathSpec {
    fn from(raw: String) -> Self {
        Self::parse(raw)
    }
}

impl From<&str> for PathSpec {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<PathSpec> for String {
    fn from(path: PathSpec) -> Self {
        path.raw
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Resolves `path` against `node`.
///
/// Returns [`Tree::Null`] when the path cannot be followed (missing field,
/// scalar in the way). Arrays fan out: each element is resolved on its own
/// and non-object elements yield `null` at their position, so crossing
/// several array layers yields nested arrays mirroring the record.
///
/// # Examples
///
/// ```
/// use record_lens_core::{PathSpec, resolve};
/// use serde_json::json;
///
/// let record = json!({"id": 7, "items": [{"text": "a"}, "bare", {"other": 1}]});
/// assert_eq!(resolve(&record, &PathSpec::parse("items.text")), json!(["a", null, null]));
/// assert_eq!(resolve(&record, &PathSpec::parse("missing")), json!(null));
/// assert_eq!(resolve(&record, &PathSpec::parse("")), record);
/// ```
pub fn resolve(node: &Tree, path: &PathSpec) -> Tree {
    resolve_segments(node, &path.segments())
}

fn resolve_segments(node: &Tree, segments: &[&str]) -> Tree {
    let Some((head, rest)) = segments.split_first() else {
        return node.clone();
    };

    match node {
        Tree::Object(map) => match map.get(*head) {
            Some(child) => resolve_segments(child, rest),
            None => Tree::Null,
        },
        Tree::Array(items) => Tree::Array(
            items
                .iter()
                .map(|item| match item {
                    Tree::Object(_) => resolve_segments(item, segments),
                    _ => Tree::Null,
                })
                .collect(),
        ),
        _ => Tree::Null,
    }
}

/// Returns `true` when resolving `path` on `node` crosses an array boundary,
/// i.e. the resolved value is a fan-out rather than the terminal field.
///
/// # Examples
///
/// ```
/// use record_lens_core::{PathSpec, fans_out};
/// use serde_json::json;
///
/// let record = json!({"texts": ["a", "b"], "items": [{"text": "x"}]});
/// assert!(!fans_out(&record, &PathSpec::parse("texts")));
/// assert!(fans_out(&record, &PathSpec::parse("items.text")));
/// ```
pub fn fans_out(node: &Tree, path: &PathSpec) -> bool {
    fans_out_segments(node, &path.segments())
}

fn fans_out_segments(node: &Tree, segments: &[&str]) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        return false;
    };

    match node {
        Tree::Object(map) => map
            .get(*head)
            .is_some_and(|child| fans_out_segments(child, rest)),
        Tree::Array(_) => true,
        _ => false,
    }
}

/// Strips array index decorations from a traversal path.
///
/// # Examples
///
/// ```
/// use record_lens_core::normalize_indexed_path;
///
/// assert_eq!(
///     normalize_indexed_path("produceDescriptions[0].produceDescriptionType"),
///     "produceDescriptions.produceDescriptionType"
/// );
/// assert_eq!(normalize_indexed_path("a[1][2].b"), "a.b");
/// ```
pub fn normalize_indexed_path(path: &str) -> String {
    INDEX_RE.replace_all(path, "").into_owned()
}

/// Lists every normalized path of `record` that reaches a leaf.
///
/// Objects are descended field by field. Arrays whose first element is an
/// object or array are descended element by element without adding to the
/// path; every other value (scalar, `null`, string array, empty array) is a
/// leaf. Paths are returned once each, in first-seen order.
///
/// # Examples
///
/// ```
/// use record_lens_core::leaf_paths;
/// use serde_json::json;
///
/// let record = json!({
///     "id": 1,
///     "texts": ["a"],
///     "items": [{"text": "x", "kind": 2}, {"text": "y", "extra": {"note": "n"}}],
/// });
/// let paths: Vec<String> = leaf_paths(&record).iter().map(|p| p.to_string()).collect();
/// assert_eq!(
///     paths,
///     vec!["id", "texts", "items.text", "items.kind", "items.extra.note"]
/// );
/// ```
pub fn leaf_paths(record: &Tree) -> Vec<PathSpec> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    collect_leaf_paths(record, &PathSpec::parse(""), &mut seen, &mut out);
    out
}

fn collect_leaf_paths(
    node: &Tree,
    prefix: &PathSpec,
    seen: &mut HashSet<PathSpec>,
    out: &mut Vec<PathSpec>,
) {
    match node {
        Tree::Object(map) => {
            for (field, value) in map {
                let path = prefix.child(field);
                if is_structural(value) {
                    collect_leaf_paths(value, &path, seen, out);
                } else if seen.insert(path.clone()) {
                    out.push(path);
                }
            }
        }
        Tree::Array(items) => {
            for item in items {
                if matches!(item, Tree::Object(_) | Tree::Array(_)) {
                    collect_leaf_paths(item, prefix, seen, out);
                }
            }
        }
        _ => {}
    }
}

fn is_structural(value: &Tree) -> bool {
    match value {
        Tree::Object(_) => true,
        Tree::Array(items) => items
            .first()
            .is_some_and(|first| matches!(first, Tree::Object(_) | Tree::Array(_))),
        _ => false,
    }
}
