//! Reinsertion of translated flat entries into records.
//!
//! Merging never edits the input record. [`merge_record`] resolves every
//! declared field path against the original, swaps in the translated value
//! when the flat map has one, and writes the result into a freshly built
//! tree. Arrays in the output are sized by the values written through them,
//! and each array slot becomes an object the first time a field below it is
//! written. [`merge_record_all`] instead works on a copy of the record and
//! only touches the leaves that were translated.
//!
//! # Examples
//!
//! ```
//! use record_lens_core::{FieldOverrides, FlatMap, RecordSchema, merge_record};
//! use serde_json::json;
//!
//! let schema = RecordSchema::new(["id"], ["name", "items.text"]);
//! let record = json!({"id": "42", "name": "タイトル", "items": [{"text": "あ"}, {"text": "い"}]});
//!
//! let mut translated = FlatMap::new();
//! translated.insert("42|name".into(), "Title".into());
//! translated.insert("42|items.text".into(), "[LA_F]A[LA_N_F]B".into());
//!
//! let merged = merge_record(&record, &schema, &translated, &FieldOverrides::new());
//! assert_eq!(merged, json!({"id": "42", "name": "Title", "items": [{"text": "A"}, {"text": "B"}]}));
//! ```

use serde_json::Map;
use tracing::debug;

use crate::codec::decode_list;
use crate::key::{composite_key, flat_key};
use crate::path::{fans_out, leaf_paths, resolve};
use crate::{FieldOverride, FieldOverrides, FlatMap, PathSpec, RecordSchema, Tree};

/// Merges translations into a record using the schema's declared paths.
///
/// Primary-key and translatable paths are rebuilt in declared order; other
/// fields of the record do not appear in the result. Paths that do not
/// resolve on the record are dropped.
pub fn merge_record(
    record: &Tree,
    schema: &RecordSchema,
    translated: &FlatMap,
    overrides: &FieldOverrides,
) -> Tree {
    merge_with_paths(
        record,
        &schema.primary_keys,
        &schema.field_paths(),
        translated,
        overrides,
    )
}

/// Merges translations into a record when only its primary keys are known.
///
/// The result is a copy of the whole record: only leaves that have a
/// translation are overwritten, and everything else (nulls, empty objects,
/// nested arrays) comes through as it was.
///
/// # Examples
///
/// ```
/// use record_lens_core::{FieldOverrides, FlatMap, PathSpec, merge_record_all};
/// use serde_json::json;
///
/// let record = json!({"id": 1, "order": 5, "name": "名前", "meta": {}});
/// let mut translated = FlatMap::new();
/// translated.insert("1|name".into(), "Name".into());
///
/// let merged = merge_record_all(&record, &[PathSpec::parse("id")], &translated, &FieldOverrides::new());
/// assert_eq!(merged, json!({"id": 1, "order": 5, "name": "Name", "meta": {}}));
/// ```
pub fn merge_record_all(
    record: &Tree,
    primary_keys: &[PathSpec],
    translated: &FlatMap,
    overrides: &FieldOverrides,
) -> Tree {
    let composite = composite_key(record, primary_keys);
    let mut out = record.clone();

    for path in leaf_paths(record) {
        if primary_keys.contains(&path) {
            continue;
        }
        let Some(text) = translated.get(&flat_key(&composite, &path)) else {
            continue;
        };
        let original = resolve(record, &path);
        if original.is_null() {
            continue;
        }
        let rule = overrides.get(path.as_str()).copied().unwrap_or_default();
        let value = substitute(record, &path, original, text, rule);
        overwrite_path(&mut out, &path.segments(), value);
    }

    out
}

fn merge_with_paths(
    record: &Tree,
    primary_keys: &[PathSpec],
    paths: &[PathSpec],
    translated: &FlatMap,
    overrides: &FieldOverrides,
) -> Tree {
    let composite = composite_key(record, primary_keys);

    rebuild(record, paths, |path, original| {
        if primary_keys.contains(path) {
            return original;
        }
        match translated.get(&flat_key(&composite, path)) {
            Some(text) => substitute(
                record,
                path,
                original,
                text,
                overrides.get(path.as_str()).copied().unwrap_or_default(),
            ),
            None => original,
        }
    })
}

/// Rebuilds `record` from the values at `paths`, passed through `value_for`.
pub(crate) fn rebuild(
    record: &Tree,
    paths: &[PathSpec],
    mut value_for: impl FnMut(&PathSpec, Tree) -> Tree,
) -> Tree {
    let mut out = Map::new();

    for path in paths {
        let original = resolve(record, path);
        if original.is_null() {
            debug!(path = %path, "path does not resolve, dropped");
            continue;
        }
        let value = value_for(path, original);
        write_path(&mut out, record, &path.segments(), value);
    }

    Tree::Object(out)
}

fn substitute(
    record: &Tree,
    path: &PathSpec,
    original: Tree,
    text: &str,
    rule: FieldOverride,
) -> Tree {
    let Some(mut items) = decode_list(text) else {
        return match original {
            Tree::String(_) => Tree::String(text.to_string()),
            other => {
                debug!(path = %path, "plain translation for a non-text value, original kept");
                other
            }
        };
    };

    if rule.empty_list && items.len() == 1 && items[0].is_empty() {
        items.clear();
    }

    match original {
        Tree::String(_) => Tree::String(text.to_string()),
        Tree::Array(ref elements)
            if !fans_out(record, path) && elements.iter().all(Tree::is_string) =>
        {
            Tree::Array(items.into_iter().map(Tree::String).collect())
        }
        Tree::Array(_) => refill(&original, &mut items.into_iter()),
        other => other,
    }
}

/// Replaces string leaves of `shape` in order with `items`; leaves past the
/// end of `items` keep their text.
fn refill(shape: &Tree, items: &mut impl Iterator<Item = String>) -> Tree {
    match shape {
        Tree::String(text) => Tree::String(items.next().unwrap_or_else(|| text.clone())),
        Tree::Array(elements) => {
            Tree::Array(elements.iter().map(|element| refill(element, items)).collect())
        }
        other => other.clone(),
    }
}

/// Writes `value` at `segments` below `target`, following the shape of
/// `source` to decide where arrays fan out.
fn write_path(target: &mut Map<String, Tree>, source: &Tree, segments: &[&str], value: Tree) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        target.insert(head.to_string(), value);
        return;
    }

    let source_child = source.get(*head).unwrap_or(&Tree::Null);

    match (source_child, value) {
        (Tree::Array(source_items), Tree::Array(values)) => {
            let slot = target
                .entry(head.to_string())
                .or_insert_with(|| Tree::Array(Vec::new()));
            if !slot.is_array() {
                *slot = Tree::Array(Vec::new());
            }
            let Tree::Array(slots) = slot else {
                return;
            };
            if slots.len() < values.len() {
                slots.resize(values.len(), Tree::Null);
            }

            for (index, item) in values.into_iter().enumerate() {
                if item.is_null() {
                    continue;
                }
                if !slots[index].is_object() {
                    slots[index] = Tree::Object(Map::new());
                }
                let element_source = source_items.get(index).unwrap_or(&Tree::Null);
                if let Tree::Object(element) = &mut slots[index] {
                    write_path(element, element_source, rest, item);
                }
            }
        }
        (_, value) => {
            let slot = target
                .entry(head.to_string())
                .or_insert_with(|| Tree::Object(Map::new()));
            if !slot.is_object() {
                *slot = Tree::Object(Map::new());
            }
            if let Tree::Object(child) = slot {
                write_path(child, source_child, rest, value);
            }
        }
    }
}

/// Overwrites the value at `segments` inside `target` in place. Arrays fan
/// out by position; `null` items and missing fields leave the target as is.
fn overwrite_path(target: &mut Tree, segments: &[&str], value: Tree) {
    match target {
        Tree::Object(map) => {
            let Some((head, rest)) = segments.split_first() else {
                return;
            };
            if rest.is_empty() {
                map.insert(head.to_string(), value);
            } else if let Some(child) = map.get_mut(*head) {
                overwrite_path(child, rest, value);
            }
        }
        Tree::Array(elements) if !segments.is_empty() => {
            let Tree::Array(values) = value else {
                return;
            };
            for (element, item) in elements.iter_mut().zip(values) {
                if !item.is_null() {
                    overwrite_path(element, segments, item);
                }
            }
        }
        _ => {}
    }
}
