//! Collection envelopes: one record type's rows plus their key rules.
//!
//! On disk an envelope is a JSON document of the form
//! `{"rules": {"primaryKeys": [...]}, "data": [...]}`. Carrying the key paths
//! next to the data lets export and import run without a registry.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    CollectionProjection, FieldOverrides, FlatMap, PathSpec, RecordSchema, Tree, composite_key,
    merge_record, merge_record_all, project_collection, select_record, split_flat_key,
};

/// Key rules stored alongside the rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeRules {
    #[serde(default)]
    pub primary_keys: Vec<PathSpec>,
}

/// A record collection with its primary-key rules.
///
/// # Examples
///
/// ```
/// use record_lens_core::{CollectionEnvelope, FieldOverrides, FlatMap, PathSpec};
/// use serde_json::json;
///
/// let envelope: CollectionEnvelope = serde_json::from_value(json!({
///     "rules": {"primaryKeys": ["id"]},
///     "data": [{"id": "1", "name": "剣"}, {"id": "2", "name": "盾"}],
/// }))
/// .unwrap();
///
/// let projection = envelope.project(None);
/// assert_eq!(projection.entries["1|name"], "剣");
///
/// let mut translated = FlatMap::new();
/// translated.insert("2|name".into(), "Shield".into());
/// let merged = envelope.merge(None, &translated, &FieldOverrides::new());
/// assert_eq!(merged.data[1], json!({"id": "2", "name": "Shield"}));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionEnvelope {
    #[serde(default)]
    pub rules: EnvelopeRules,
    #[serde(default)]
    pub data: Vec<Tree>,
}

impl CollectionEnvelope {
    /// Creates an envelope from key paths and rows.
    pub fn new(primary_keys: Vec<PathSpec>, data: Vec<Tree>) -> Self {
        Self {
            rules: EnvelopeRules { primary_keys },
            data,
        }
    }

    /// Builds an envelope from raw rows, keeping only the schema's paths.
    pub fn select(rows: &[Tree], schema: &RecordSchema, test_suffix: Option<&str>) -> Self {
        Self::new(
            schema.primary_keys.clone(),
            rows.iter()
                .map(|row| select_record(row, schema, test_suffix))
                .collect(),
        )
    }

    /// Primary-key paths of the rows.
    pub fn primary_keys(&self) -> &[PathSpec] {
        &self.rules.primary_keys
    }

    /// Projects every row into one flat map.
    pub fn project(&self, translatable: Option<&[PathSpec]>) -> CollectionProjection {
        project_collection(&self.data, self.primary_keys(), translatable)
    }

    /// Returns a new envelope with translations merged into every row.
    ///
    /// With `translatable` the rows are rebuilt from the key and listed
    /// paths only; without it each row keeps all of its fields.
    pub fn merge(
        &self,
        translatable: Option<&[PathSpec]>,
        translated: &FlatMap,
        overrides: &FieldOverrides,
    ) -> Self {
        let data = match translatable {
            Some(paths) => {
                let schema = RecordSchema {
                    primary_keys: self.rules.primary_keys.clone(),
                    translatable: paths.to_vec(),
                };
                self.data
                    .iter()
                    .map(|row| merge_record(row, &schema, translated, overrides))
                    .collect()
            }
            None => self
                .data
                .iter()
                .map(|row| merge_record_all(row, self.primary_keys(), translated, overrides))
                .collect(),
        };
        Self {
            rules: self.rules.clone(),
            data,
        }
    }

    /// Returns the keys of `translated` whose composite key matches no row.
    ///
    /// Such entries are never merged; they usually point at rows that were
    /// removed from the source data or at keys edited by hand.
    pub fn unmatched_keys<'a>(&self, translated: &'a FlatMap) -> Vec<&'a str> {
        let composites: HashSet<String> = self
            .data
            .iter()
            .map(|row| composite_key(row, self.primary_keys()))
            .collect();
        translated
            .keys()
            .filter(|key| match split_flat_key(key) {
                Some((composite, _)) => !composites.contains(composite),
                None => true,
            })
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::FieldOverride;

    #[test]
    fn test_serialized_shape_uses_camel_case_rules() {
        let envelope = CollectionEnvelope::new(vec![PathSpec::parse("id")], vec![json!({"id": 1})]);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"rules": {"primaryKeys": ["id"]}, "data": [{"id": 1}]})
        );
    }

    #[test]
    fn test_select_then_merge_with_override() {
        let schema = RecordSchema::new(["tutorialType", "step"], ["texts"]);
        let rows = vec![json!({
            "tutorialType": "Lesson",
            "step": 1,
            "texts": ["説明"],
            "assetId": "x",
        })];
        let envelope = CollectionEnvelope::select(&rows, &schema, None);
        assert_eq!(envelope.len(), 1);
        assert_eq!(envelope.data[0].get("assetId"), None);

        let mut translated = FlatMap::new();
        translated.insert("Lesson|1|texts".into(), "[LA_F]".into());
        let mut overrides = FieldOverrides::new();
        overrides.insert("texts".into(), FieldOverride { empty_list: true });

        let merged = envelope.merge(Some(&schema.translatable), &translated, &overrides);
        assert_eq!(
            merged.data[0],
            json!({"tutorialType": "Lesson", "step": 1, "texts": []})
        );
    }

    #[test]
    fn test_missing_rules_deserialize_as_empty() {
        let envelope: CollectionEnvelope = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(envelope.primary_keys().is_empty());
        assert!(envelope.is_empty());
    }

    #[test]
    fn test_unmatched_keys_lists_entries_without_a_row() {
        let envelope = CollectionEnvelope::new(
            vec![PathSpec::parse("id"), PathSpec::parse("kind")],
            vec![json!({"id": "1", "kind": "a", "name": "剣"})],
        );
        let mut translated = FlatMap::new();
        translated.insert("1|a|name".into(), "Sword".into());
        translated.insert("2|a|name".into(), "Shield".into());
        translated.insert("stray".into(), "x".into());

        assert_eq!(envelope.unmatched_keys(&translated), vec!["2|a|name", "stray"]);
    }
}
