//! Registry validation.
//!
//! Catches structural mistakes in a [`SchemaRegistry`] before a batch runs:
//! malformed paths, paths declared twice, a field declared as both key and
//! text, and overrides pointing at nothing.
//!
//! # Examples
//!
//! ```
//! use record_lens_core::*;
//!
//! let registry = SchemaRegistry::new()
//!     .with_type("Item", RecordSchema::new(["id"], ["name"]));
//! assert!(validate_registry(&registry).is_empty());
//!
//! // Indexed paths are not valid schema paths
//! let bad = SchemaRegistry::new()
//!     .with_type("Item", RecordSchema::new(["id"], ["items[0].text"]));
//! assert!(!validate_registry(&bad).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{KEY_SEPARATOR, PathSpec, RecordSchema, SchemaRegistry, normalize_indexed_path};

/// Registry validation errors.
///
/// Variants carry the record type and, where relevant, the offending path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Registry version string is empty.
    #[error("registry version cannot be empty")]
    EmptyVersion,
    /// Record type name is empty or whitespace-only.
    #[error("record type name cannot be empty")]
    EmptyTypeName,
    /// A path is empty or has an empty segment (`a..b`, `.a`).
    #[error("{record_type}: empty path segment in '{path}'")]
    EmptySegment { record_type: String, path: String },
    /// A path uses `[n]` indexing; schema paths fan out implicitly.
    #[error("{record_type}: indexed path '{path}' is not allowed, use '{normalized}'")]
    IndexedPath {
        record_type: String,
        path: String,
        normalized: String,
    },
    /// A path contains the flat key separator.
    #[error("{record_type}: path '{path}' contains the key separator '|'")]
    SeparatorInPath { record_type: String, path: String },
    /// The same path appears twice in one list.
    #[error("{record_type}: duplicate path '{path}'")]
    DuplicatePath { record_type: String, path: String },
    /// A path is listed as both primary key and translatable.
    #[error("{record_type}: '{path}' is both a primary key and translatable")]
    KeyAlsoTranslatable { record_type: String, path: String },
    /// Primary keys may be at most one level below the record root.
    #[error("{record_type}: primary key '{path}' is nested too deeply")]
    KeyTooDeep { record_type: String, path: String },
    /// Overrides name a record type the registry does not declare.
    #[error("overrides reference unknown record type: {0}")]
    UnknownOverrideType(String),
    /// Overrides name a field that is not translatable for the type.
    #[error("{record_type}: override for undeclared field '{path}'")]
    UnknownOverrideField { record_type: String, path: String },
}

/// Validates a whole registry, returning every problem found.
///
/// # Examples
///
/// ```
/// use record_lens_core::*;
///
/// let registry = SchemaRegistry::new()
///     .with_type("Item", RecordSchema::new(["id"], ["name"]))
///     .with_override("Missing", "texts", FieldOverride { empty_list: true });
/// let errors = validate_registry(&registry);
/// assert_eq!(errors, vec![ValidationError::UnknownOverrideType("Missing".into())]);
/// ```
pub fn validate_registry(registry: &SchemaRegistry) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if registry.version.trim().is_empty() {
        errors.push(ValidationError::EmptyVersion);
    }

    for (name, schema) in &registry.types {
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyTypeName);
            continue;
        }
        errors.extend(validate_schema(name, schema));
    }

    for (name, fields) in &registry.overrides {
        let Some(schema) = registry.get(name) else {
            errors.push(ValidationError::UnknownOverrideType(name.clone()));
            continue;
        };
        for field in fields.keys() {
            if !schema.is_translatable(&PathSpec::parse(field.as_str())) {
                errors.push(ValidationError::UnknownOverrideField {
                    record_type: name.clone(),
                    path: field.clone(),
                });
            }
        }
    }

    errors
}

/// Validates a single record type's schema.
pub fn validate_schema(record_type: &str, schema: &RecordSchema) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for list in [&schema.primary_keys, &schema.translatable] {
        let mut seen = HashSet::new();
        for path in list {
            check_path(record_type, path, &mut errors);
            if !seen.insert(path.as_str()) {
                errors.push(ValidationError::DuplicatePath {
                    record_type: record_type.to_string(),
                    path: path.to_string(),
                });
            }
        }
    }

    for key in &schema.primary_keys {
        if key.depth() > 2 {
            errors.push(ValidationError::KeyTooDeep {
                record_type: record_type.to_string(),
                path: key.to_string(),
            });
        }
        if schema.is_translatable(key) {
            errors.push(ValidationError::KeyAlsoTranslatable {
                record_type: record_type.to_string(),
                path: key.to_string(),
            });
        }
    }

    errors
}

fn check_path(record_type: &str, path: &PathSpec, errors: &mut Vec<ValidationError>) {
    let raw = path.as_str();
    let error = if raw.is_empty() || raw.split('.').any(str::is_empty) {
        ValidationError::EmptySegment {
            record_type: record_type.to_string(),
            path: raw.to_string(),
        }
    } else if raw.contains('[') || raw.contains(']') {
        ValidationError::IndexedPath {
            record_type: record_type.to_string(),
            path: raw.to_string(),
            normalized: normalize_indexed_path(raw),
        }
    } else if raw.contains(KEY_SEPARATOR) {
        ValidationError::SeparatorInPath {
            record_type: record_type.to_string(),
            path: raw.to_string(),
        }
    } else {
        return;
    };
    errors.push(error);
}
