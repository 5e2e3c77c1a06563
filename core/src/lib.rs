//! Schema-driven projection and merge of nested records.
//!
//! This crate turns nested records (decoded JSON or YAML, held as
//! [`Tree`] values) into flat `key → text` maps that translators can work
//! on, and puts translated text back into the records afterwards:
//!
//! - [`PathSpec`]: dotted field path; resolution fans out across arrays.
//! - [`composite_key`]: joins a record's primary-key values with `|`.
//! - [`needs_translation`]: decides whether a text is worth exporting.
//! - [`encode_list`] / [`decode_list`]: carries string lists through a
//!   single flat value.
//! - [`project`] / [`project_collection`]: record(s) → [`FlatMap`].
//! - [`merge_record`] / [`merge_record_all`]: record + [`FlatMap`] → new
//!   record.
//! - [`SchemaRegistry`]: per record type key and translatable paths, plus
//!   merge overrides; checked by [`validate_registry`].
//! - [`CollectionEnvelope`]: a record collection with its key rules.
//!
//! Engine functions are pure: they borrow their inputs and return new values.
//!
//! # Example
//!
//! ```
//! use record_lens_core::*;
//! use serde_json::json;
//!
//! let schema = RecordSchema::new(["id"], ["name", "items.text"]);
//! let record = json!({"id": "42", "name": "タイトル", "items": [{"text": "あ"}, {"text": "い"}]});
//!
//! let flat = project(&record, &schema.primary_keys, Some(&schema.translatable));
//! assert_eq!(flat["42|name"], "タイトル");
//! assert_eq!(flat["42|items.text"], "[LA_F]あ[LA_N_F]い");
//!
//! let mut translated = FlatMap::new();
//! translated.insert("42|name".into(), "Title".into());
//! translated.insert("42|items.text".into(), "[LA_F]A[LA_N_F]B".into());
//!
//! let merged = merge_record(&record, &schema, &translated, &FieldOverrides::new());
//! assert_eq!(merged, json!({"id": "42", "name": "Title", "items": [{"text": "A"}, {"text": "B"}]}));
//! ```

use std::collections::BTreeMap;

mod codec;
mod envelope;
mod filter;
mod flatmap;
mod key;
mod merge;
mod path;
mod project;
mod registry;
mod select;
mod validate;

/// A decoded record or document.
pub type Tree = serde_json::Value;

/// Flat key → text map, sorted by key.
pub type FlatMap = BTreeMap<String, String>;

pub use codec::{LIST_PREFIX, LIST_SEPARATOR, decode_list, encode_list};
pub use envelope::{CollectionEnvelope, EnvelopeRules};
pub use filter::needs_translation;
pub use flatmap::{apply_dictionary, overlay, pending_entries, source_dictionary};
pub use key::{KEY_SEPARATOR, composite_key, flat_key, split_flat_key, stringify_key_value};
pub use merge::{merge_record, merge_record_all};
pub use path::{PathSpec, fans_out, leaf_paths, normalize_indexed_path, resolve};
pub use project::{CollectionProjection, project, project_collection};
pub use registry::{
    FieldOverride, FieldOverrides, REGISTRY_FORMAT_VERSION, RecordSchema, SchemaRegistry,
};
pub use select::select_record;
pub use validate::{ValidationError, validate_registry, validate_schema};
