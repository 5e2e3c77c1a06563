//! Schema registry types.
//!
//! The registry is plain data: for each record type it names the primary-key
//! paths that identify a record and the paths that carry translatable text,
//! plus a small table of per-field merge overrides. The engine functions
//! take these values as arguments and never look types up on their own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::PathSpec;

/// Version of the registry document format.
pub const REGISTRY_FORMAT_VERSION: &str = "1.0";

static NO_OVERRIDES: FieldOverrides = BTreeMap::new();

/// Primary-key and translatable paths for one record type.
///
/// # Examples
///
/// ```
/// use record_lens_core::{PathSpec, RecordSchema};
///
/// let schema = RecordSchema::new(["id"], ["name", "description"]);
/// assert!(schema.is_primary_key(&PathSpec::parse("id")));
/// assert!(schema.is_translatable(&PathSpec::parse("name")));
/// assert_eq!(schema.field_paths().len(), 3);
/// assert!(!schema.is_pending());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    /// Paths whose values identify a record, in key order.
    #[serde(default)]
    pub primary_keys: Vec<PathSpec>,
    /// Paths whose values are offered for translation.
    #[serde(default)]
    pub translatable: Vec<PathSpec>,
}

impl RecordSchema {
    /// Creates a schema from key and translatable paths.
    pub fn new<K, T>(
        primary_keys: impl IntoIterator<Item = K>,
        translatable: impl IntoIterator<Item = T>,
    ) -> Self
    where
        K: Into<PathSpec>,
        T: Into<PathSpec>,
    {
        Self {
            primary_keys: primary_keys.into_iter().map(Into::into).collect(),
            translatable: translatable.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` when `path` is one of the primary-key paths.
    pub fn is_primary_key(&self, path: &PathSpec) -> bool {
        self.primary_keys.contains(path)
    }

    /// Returns `true` when `path` is declared translatable.
    pub fn is_translatable(&self, path: &PathSpec) -> bool {
        self.translatable.contains(path)
    }

    /// Returns primary-key paths followed by translatable paths, each once.
    pub fn field_paths(&self) -> Vec<PathSpec> {
        let mut paths: Vec<PathSpec> =
            Vec::with_capacity(self.primary_keys.len() + self.translatable.len());
        for path in self.primary_keys.iter().chain(&self.translatable) {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        paths
    }

    /// Returns `true` for placeholder entries that declare no paths at all.
    ///
    /// Callers skip pending types instead of processing them.
    pub fn is_pending(&self) -> bool {
        self.primary_keys.is_empty() && self.translatable.is_empty()
    }
}

/// Merge-time adjustment for a single field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOverride {
    /// Read a translation that decodes to one empty item as an empty array.
    #[serde(default)]
    pub empty_list: bool,
}

/// Field path → override for one record type.
pub type FieldOverrides = BTreeMap<String, FieldOverride>;

/// Static table of record schemas and merge overrides.
///
/// # Examples
///
/// ```
/// use record_lens_core::{FieldOverride, RecordSchema, SchemaRegistry};
///
/// let registry = SchemaRegistry::new()
///     .with_type("Tutorial", RecordSchema::new(["tutorialType", "step"], ["texts"]))
///     .with_type("Bgm", RecordSchema::default())
///     .with_override("Tutorial", "texts", FieldOverride { empty_list: true });
///
/// assert_eq!(registry.len(), 2);
/// assert_eq!(registry.active_types().count(), 1);
/// assert!(registry.overrides_for("Tutorial")["texts"].empty_list);
/// assert!(registry.overrides_for("Unknown").is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRegistry {
    /// Registry format version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Record type name → schema.
    #[serde(default)]
    pub types: BTreeMap<String, RecordSchema>,
    /// Record type name → field overrides.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, FieldOverrides>,
}

fn default_version() -> String {
    REGISTRY_FORMAT_VERSION.to_string()
}

impl SchemaRegistry {
    /// Creates an empty registry at the current format version.
    pub fn new() -> Self {
        Self {
            version: default_version(),
            types: BTreeMap::new(),
            overrides: BTreeMap::new(),
        }
    }

    /// Adds or replaces a record type.
    pub fn with_type(mut self, name: impl Into<String>, schema: RecordSchema) -> Self {
        self.insert(name, schema);
        self
    }

    /// Adds a field override for a record type.
    pub fn with_override(
        mut self,
        record_type: impl Into<String>,
        field: impl Into<String>,
        rule: FieldOverride,
    ) -> Self {
        self.overrides
            .entry(record_type.into())
            .or_default()
            .insert(field.into(), rule);
        self
    }

    /// Inserts a record type, replacing any existing entry.
    pub fn insert(&mut self, name: impl Into<String>, schema: RecordSchema) {
        self.types.insert(name.into(), schema);
    }

    /// Looks up a record type.
    pub fn get(&self, name: &str) -> Option<&RecordSchema> {
        self.types.get(name)
    }

    /// Returns the merge overrides of a record type (empty when none).
    pub fn overrides_for(&self, name: &str) -> &FieldOverrides {
        self.overrides.get(name).unwrap_or(&NO_OVERRIDES)
    }

    /// Iterates over types that are not pending, in name order.
    pub fn active_types(&self) -> impl Iterator<Item = (&str, &RecordSchema)> {
        self.types
            .iter()
            .filter(|(_, schema)| !schema.is_pending())
            .map(|(name, schema)| (name.as_str(), schema))
    }

    /// Number of declared record types, pending ones included.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` when no record type is declared.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_paths_deduplicates_keys_declared_twice() {
        let schema = RecordSchema::new(["id", "order"], ["name", "id"]);
        let paths: Vec<String> = schema.field_paths().into_iter().map(String::from).collect();
        assert_eq!(paths, vec!["id", "order", "name"]);
    }

    #[test]
    fn test_registry_document_shape() {
        let raw = r#"{
            "version": "1.0",
            "types": {
                "Item": {"primary_keys": ["id"], "translatable": ["name", "description"]},
                "Bgm": {}
            },
            "overrides": {"Item": {"description": {"empty_list": true}}}
        }"#;
        let registry: SchemaRegistry = serde_json::from_str(raw).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("Bgm").unwrap().is_pending());
        assert!(registry.overrides_for("Item")["description"].empty_list);
        assert_eq!(
            registry.get("Item").unwrap().translatable,
            vec![PathSpec::parse("name"), PathSpec::parse("description")]
        );
    }

    #[test]
    fn test_missing_version_defaults() {
        let registry: SchemaRegistry = serde_json::from_str(r#"{"types": {}}"#).unwrap();
        assert_eq!(registry.version, REGISTRY_FORMAT_VERSION);
        assert!(registry.is_empty());
    }
}
