//! Projection of records into flat key maps.
//!
//! Every eligible non-key text leaf of a record becomes one entry keyed by
//! `CompositeKey|PathSpec`. Values reached through arrays (string arrays or
//! fan-outs under arrays of objects) are list-encoded so one path maps to
//! one string.
//!
//! # Examples
//!
//! ```
//! use record_lens_core::{PathSpec, project};
//! use serde_json::json;
//!
//! let record = json!({
//!     "id": "42",
//!     "name": "タイトル",
//!     "items": [{"text": "あ"}, {"text": "い"}],
//! });
//! let primary_keys = [PathSpec::parse("id")];
//! let flat = project(&record, &primary_keys, None);
//!
//! assert_eq!(flat["42|name"], "タイトル");
//! assert_eq!(flat["42|items.text"], "[LA_F]あ[LA_N_F]い");
//! assert_eq!(flat.len(), 2);
//! ```

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::codec::encode_list;
use crate::filter::needs_translation;
use crate::key::{composite_key, flat_key};
use crate::path::{leaf_paths, resolve};
use crate::{FlatMap, PathSpec, Tree};

/// Flat entries gathered from a whole collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionProjection {
    /// Union of every record's entries; later records win on collision.
    pub entries: FlatMap,
    /// Flat keys written by more than one record, in collision order.
    pub collisions: Vec<String>,
}

/// Projects one record into a new flat map.
///
/// All leaf paths of the record are considered; when `translatable` is
/// given only the listed paths are kept. Primary-key paths are never
/// emitted, and values failing [`needs_translation`] are skipped.
pub fn project(
    record: &Tree,
    primary_keys: &[PathSpec],
    translatable: Option<&[PathSpec]>,
) -> FlatMap {
    let mut entries = FlatMap::new();
    project_into(record, primary_keys, translatable, &mut entries, |_| {});
    entries
}

/// Projects every record into one map.
///
/// Records are applied in order, so a record sharing a composite key with an
/// earlier one overwrites the earlier entries for the same paths.
///
/// # Examples
///
/// ```
/// use record_lens_core::{PathSpec, project_collection};
/// use serde_json::json;
///
/// let rows = [
///     json!({"id": "1", "name": "最初"}),
///     json!({"id": "1", "name": "後"}),
/// ];
/// let projection = project_collection(&rows, &[PathSpec::parse("id")], None);
/// assert_eq!(projection.entries["1|name"], "後");
/// assert_eq!(projection.collisions, vec!["1|name".to_string()]);
/// ```
pub fn project_collection(
    records: &[Tree],
    primary_keys: &[PathSpec],
    translatable: Option<&[PathSpec]>,
) -> CollectionProjection {
    let mut projection = CollectionProjection::default();
    for record in records {
        let mut collided = Vec::new();
        project_into(
            record,
            primary_keys,
            translatable,
            &mut projection.entries,
            |key| collided.push(key.to_string()),
        );
        for key in &collided {
            warn!(key = %key, "composite key collision, later record wins");
        }
        projection.collisions.extend(collided);
    }
    projection
}

fn project_into(
    record: &Tree,
    primary_keys: &[PathSpec],
    translatable: Option<&[PathSpec]>,
    entries: &mut FlatMap,
    mut on_collision: impl FnMut(&str),
) {
    let composite = composite_key(record, primary_keys);
    let allowed: Option<HashSet<&PathSpec>> = translatable.map(|paths| paths.iter().collect());

    for path in leaf_paths(record) {
        if primary_keys.contains(&path) {
            continue;
        }
        if allowed.as_ref().is_some_and(|allowed| !allowed.contains(&path)) {
            continue;
        }

        let Some(text) = flat_value(&resolve(record, &path)) else {
            continue;
        };
        if !needs_translation(&text) {
            continue;
        }

        let key = flat_key(&composite, &path);
        debug!(key = %key, "projected entry");
        if entries.insert(key.clone(), text).is_some() {
            on_collision(&key);
        }
    }
}

/// Renders a resolved value as a flat string, list-encoding arrays.
fn flat_value(value: &Tree) -> Option<String> {
    match value {
        Tree::String(text) => Some(text.clone()),
        Tree::Array(_) => {
            let mut items = Vec::new();
            collect_strings(value, &mut items);
            Some(encode_list(items))
        }
        _ => None,
    }
}

fn collect_strings<'a>(value: &'a Tree, out: &mut Vec<&'a str>) {
    match value {
        Tree::String(text) => out.push(text),
        Tree::Array(items) => {
            for item in items {
                collect_strings(item, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn paths(raw: &[&str]) -> Vec<PathSpec> {
        raw.iter().map(|p| PathSpec::parse(*p)).collect()
    }

    #[test]
    fn test_primary_key_is_never_projected() {
        let record = json!({"id": "日本語のID", "name": "名前"});
        let pk = paths(&["id"]);
        let translatable = paths(&["id", "name"]);
        let flat = project(&record, &pk, Some(&translatable));
        assert_eq!(flat.len(), 1);
        assert!(flat.contains_key("日本語のID|name"));
    }

    #[test]
    fn test_nested_primary_key_path_is_excluded() {
        let record = json!({
            "id": "c1",
            "descriptions": [{"type": "種類", "text": "本文"}],
        });
        let pk = paths(&["id", "descriptions.type"]);
        let flat = project(&record, &pk, None);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat["c1|種類|descriptions.text"], "[LA_F]本文");
    }

    #[test]
    fn test_plain_ascii_values_are_skipped() {
        let record = json!({"id": "1", "code": "ABC-1", "name": "hello world!"});
        let flat = project(&record, &paths(&["id"]), None);
        assert!(flat.is_empty());
    }

    #[test]
    fn test_translatable_filter_restricts_paths() {
        let record = json!({"id": "1", "name": "名前", "memo": "メモ"});
        let flat = project(&record, &paths(&["id"]), Some(&paths(&["name"])));
        assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["1|name"]);
    }

    #[test]
    fn test_string_array_is_list_encoded() {
        let record = json!({"id": 3, "texts": ["一行目", "second"]});
        let flat = project(&record, &paths(&["id"]), None);
        assert_eq!(flat["3|texts"], "[LA_F]一行目[LA_N_F]second");
    }

    #[test]
    fn test_empty_and_ascii_arrays_are_skipped() {
        let record = json!({"id": 3, "texts": [], "tags": ["a", "b"], "ids": [1, 2]});
        let flat = project(&record, &paths(&["id"]), None);
        assert!(flat.is_empty());
    }

    #[test]
    fn test_fan_out_skips_missing_elements() {
        let record = json!({
            "id": "x",
            "items": [{"text": "あ"}, {"other": 1}, {"text": "う"}],
        });
        let flat = project(&record, &paths(&["id"]), None);
        assert_eq!(flat["x|items.text"], "[LA_F]あ[LA_N_F]う");
    }

    #[test]
    fn test_nested_objects_use_dotted_paths() {
        let record = json!({"id": "1", "detail": {"title": {"main": "題"}}});
        let flat = project(&record, &paths(&["id"]), None);
        assert_eq!(flat["1|detail.title.main"], "題");
    }

    #[test]
    fn test_collection_without_collisions() {
        let rows = vec![
            json!({"id": "1", "name": "一"}),
            json!({"id": "2", "name": "二"}),
        ];
        let projection = project_collection(&rows, &paths(&["id"]), None);
        assert_eq!(projection.entries.len(), 2);
        assert!(projection.collisions.is_empty());
    }
}
