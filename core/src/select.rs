//! Field selection for building record collections from raw rows.

use crate::merge::rebuild;
use crate::{RecordSchema, Tree};

/// Keeps only the schema's declared paths of `record`.
///
/// The output has the same nested shape as the source for every kept path.
/// When `test_suffix` is set, translatable text (strings and arrays of
/// strings) gets the suffix appended so untranslated fields stand out when
/// the data is loaded in the target application.
///
/// # Examples
///
/// ```
/// use record_lens_core::{RecordSchema, select_record};
/// use serde_json::json;
///
/// let schema = RecordSchema::new(["id"], ["name", "texts"]);
/// let row = json!({"id": "a", "name": "名", "texts": ["一"], "assetId": "img_01"});
///
/// assert_eq!(select_record(&row, &schema, None), json!({"id": "a", "name": "名", "texts": ["一"]}));
/// assert_eq!(
///     select_record(&row, &schema, Some("TEST")),
///     json!({"id": "a", "name": "名TEST", "texts": ["一TEST"]})
/// );
/// ```
pub fn select_record(record: &Tree, schema: &RecordSchema, test_suffix: Option<&str>) -> Tree {
    rebuild(record, &schema.field_paths(), |path, original| {
        match test_suffix {
            Some(suffix) if schema.is_translatable(path) && !schema.is_primary_key(path) => {
                mark(original, suffix)
            }
            _ => original,
        }
    })
}

fn mark(value: Tree, suffix: &str) -> Tree {
    match value {
        Tree::String(text) => Tree::String(format!("{text}{suffix}")),
        Tree::Array(items) if items.iter().all(Tree::is_string) => Tree::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Tree::String(text) => Tree::String(format!("{text}{suffix}")),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_select_keeps_nested_key_and_text_paths() {
        let schema = RecordSchema::new(
            ["id", "descriptions.type"],
            ["descriptions.text"],
        );
        let row = json!({
            "id": "e1",
            "priority": 3,
            "descriptions": [
                {"type": "A", "text": "一", "targetId": "t"},
                {"type": "B", "text": "二"},
            ],
        });
        assert_eq!(
            select_record(&row, &schema, None),
            json!({
                "id": "e1",
                "descriptions": [{"type": "A", "text": "一"}, {"type": "B", "text": "二"}],
            })
        );
    }

    #[test]
    fn test_suffix_never_touches_primary_keys() {
        let schema = RecordSchema::new(["id"], ["id", "name"]);
        let row = json!({"id": "k", "name": "n"});
        assert_eq!(
            select_record(&row, &schema, Some("TEST")),
            json!({"id": "k", "name": "nTEST"})
        );
    }

    #[test]
    fn test_suffix_marks_fanned_out_text() {
        let schema = RecordSchema::new(["id"], ["items.text"]);
        let row = json!({"id": "k", "items": [{"text": "a"}, {"text": "b"}]});
        assert_eq!(
            select_record(&row, &schema, Some("!")),
            json!({"id": "k", "items": [{"text": "a!"}, {"text": "b!"}]})
        );
    }

    #[test]
    fn test_missing_declared_fields_are_left_out() {
        let schema = RecordSchema::new(["id"], ["name", "description"]);
        let row = json!({"id": 9, "name": "n"});
        assert_eq!(select_record(&row, &schema, None), json!({"id": 9, "name": "n"}));
    }
}
