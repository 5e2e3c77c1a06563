//! Registry loading, pipeline configuration and document I/O.
//!
//! This crate connects the pure engine in `record-lens-core` to the file
//! system: it loads [`SchemaRegistry`](record_lens_core::SchemaRegistry)
//! documents (or the bundled default registry), reads the pipeline
//! configuration, and reads and writes the documents each stage exchanges.
//!
//! # Quick start
//!
//! ```no_run
//! use record_lens_db::{PipelineConfig, RegistryDatabase, load_source_rows, write_envelope};
//! use record_lens_core::CollectionEnvelope;
//!
//! let config = PipelineConfig::load("record-lens.yml").unwrap();
//! let db = RegistryDatabase::builder()
//!     .from_file("registry.yaml")
//!     .with_bundled()
//!     .build()
//!     .unwrap();
//!
//! let schema = db.get("Achievement").unwrap();
//! let rows = load_source_rows(config.folders.source.join("Achievement.yaml")).unwrap();
//! let envelope = CollectionEnvelope::select(&rows, schema, None);
//! write_envelope(config.folders.collections.join("Achievement.json"), &envelope).unwrap();
//! ```

mod config;
mod document;
mod error;
mod loader;

pub use config::{PipelineConfig, PipelineFolders};
pub use document::{
    CSV_HEADER, FolderComparison, compare_folders, list_documents, load_source_rows,
    parse_source_yaml, read_envelope, read_flat_csv, read_flat_map, read_json, record_type_of,
    write_envelope, write_flat_csv, write_flat_map, write_json,
};
pub use error::{DatabaseError, Result};
pub use loader::{RegistryBuilder, RegistryDatabase, RegistrySource};
