//! Registry loading with builder pattern and fallback chains.
//!
//! Provides [`RegistryDatabase`], a loaded [`SchemaRegistry`] that remembers
//! where it came from, and [`RegistryBuilder`] for trying several sources in
//! order.
//!
//! # Loading patterns
//!
//! ```no_run
//! use record_lens_db::RegistryDatabase;
//!
//! // Load a registry document (YAML or JSON, picked by extension)
//! let db = RegistryDatabase::from_file("registry.yaml").unwrap();
//! assert!(db.get("Achievement").is_some());
//!
//! // Fall back to the bundled default registry
//! let db = RegistryDatabase::builder()
//!     .from_file("registry.yaml")
//!     .with_bundled()
//!     .build()
//!     .unwrap();
//! ```

use std::io::BufReader;
use std::path::{Path, PathBuf};

use record_lens_core::{FieldOverrides, RecordSchema, SchemaRegistry};
use tracing::{debug, warn};

use crate::error::{DatabaseError, Result};

const BUNDLED_REGISTRY: &str = include_str!("../data/default_registry.yaml");

/// Describes where a [`RegistryDatabase`] was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrySource {
    /// Loaded from a registry document on disk.
    File(PathBuf),
    /// Loaded from the registry compiled into the crate.
    Bundled,
    /// Loaded via a fallback chain of multiple sources.
    Multiple(Vec<RegistrySource>),
}

/// A loaded schema registry with its source.
///
/// # Examples
///
/// ```
/// use record_lens_db::{RegistryDatabase, RegistrySource};
///
/// let db = RegistryDatabase::bundled().unwrap();
/// assert_eq!(db.source(), &RegistrySource::Bundled);
///
/// let tutorial = db.get("Tutorial").unwrap();
/// assert_eq!(tutorial.primary_keys.len(), 3);
/// assert!(db.overrides_for("Tutorial")["texts"].empty_list);
/// ```
#[derive(Debug)]
pub struct RegistryDatabase {
    registry: SchemaRegistry,
    source: RegistrySource,
}

impl RegistryDatabase {
    /// Returns a new [`RegistryBuilder`] for configuring a fallback chain.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Loads a registry document.
    ///
    /// `.json` files are parsed as JSON; `.yaml` and `.yml` as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::IoError`] if the file cannot be read,
    /// [`DatabaseError::JsonError`] or [`DatabaseError::YamlError`] if
    /// parsing fails, and [`DatabaseError::UnsupportedFormat`] for any other
    /// extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(std::fs::File::open(path)?);
        let registry: SchemaRegistry = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_reader(reader)?,
            Some("yaml" | "yml") => serde_yaml::from_reader(reader)?,
            _ => return Err(DatabaseError::UnsupportedFormat(path.to_path_buf())),
        };
        debug!(path = %path.display(), types = registry.len(), "loaded registry");

        Ok(Self {
            registry,
            source: RegistrySource::File(path.to_path_buf()),
        })
    }

    /// Loads the registry compiled into this crate.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::YamlError`] if the embedded document does
    /// not parse, or [`DatabaseError::NoSourcesAvailable`] if it is empty.
    pub fn bundled() -> Result<Self> {
        let registry: SchemaRegistry = serde_yaml::from_str(BUNDLED_REGISTRY)?;
        if registry.is_empty() {
            return Err(DatabaseError::NoSourcesAvailable);
        }
        Ok(Self {
            registry,
            source: RegistrySource::Bundled,
        })
    }

    /// Looks up the schema of a record type.
    pub fn get(&self, record_type: &str) -> Option<&RecordSchema> {
        self.registry.get(record_type)
    }

    /// Returns the merge overrides of a record type.
    pub fn overrides_for(&self, record_type: &str) -> &FieldOverrides {
        self.registry.overrides_for(record_type)
    }

    /// Returns `true` if the registry declares `record_type`, pending or not.
    pub fn contains(&self, record_type: &str) -> bool {
        self.registry.get(record_type).is_some()
    }

    /// Returns the number of declared record types.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns `true` if no record type is declared.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Returns the underlying registry.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Returns a reference to the source metadata.
    pub fn source(&self) -> &RegistrySource {
        &self.source
    }
}

/// Builder for constructing a [`RegistryDatabase`] with a fallback chain.
///
/// Sources are tried in the order they are added. The first successful load
/// wins; if all fail, [`DatabaseError::NoSourcesAvailable`] is returned.
///
/// # Example
///
/// ```
/// use record_lens_db::RegistryDatabase;
///
/// let db = RegistryDatabase::builder()
///     .from_file("/nonexistent/registry.yaml")
///     .with_bundled()
///     .build()
///     .unwrap();
/// assert!(db.contains("Achievement"));
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    sources: Vec<RegistrySource>,
}

impl RegistryBuilder {
    /// Creates a new builder with no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a registry document as a source.
    pub fn from_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(RegistrySource::File(path.into()));
        self
    }

    /// Adds the bundled default registry as a source.
    pub fn with_bundled(mut self) -> Self {
        self.sources.push(RegistrySource::Bundled);
        self
    }

    /// Attempts to load the registry from configured sources in order.
    ///
    /// Returns the first successfully loaded database. If all sources fail,
    /// returns [`DatabaseError::NoSourcesAvailable`].
    pub fn build(self) -> Result<RegistryDatabase> {
        if self.sources.is_empty() {
            return Err(DatabaseError::NoSourcesAvailable);
        }

        let all_sources = self.sources.clone();

        for source in &self.sources {
            let result = match source {
                RegistrySource::File(path) => RegistryDatabase::from_file(path),
                RegistrySource::Bundled => RegistryDatabase::bundled(),
                RegistrySource::Multiple(_) => continue,
            };

            match result {
                Ok(mut db) => {
                    db.source = RegistrySource::Multiple(all_sources);
                    return Ok(db);
                }
                Err(err) => warn!(source = ?source, error = %err, "registry source failed"),
            }
        }

        Err(DatabaseError::NoSourcesAvailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use record_lens_core::validate_registry;

    const SAMPLE_YAML: &str = r#"
version: "1.0"
types:
  Item:
    primary_keys: [id]
    translatable: [name, description]
  Bgm: {}
"#;

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.yaml");
        std::fs::write(&path, SAMPLE_YAML).unwrap();

        let db = RegistryDatabase::from_file(&path).unwrap();
        assert_eq!(db.len(), 2);
        assert!(db.get("Bgm").unwrap().is_pending());
        assert_eq!(db.source(), &RegistrySource::File(path));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let registry = SchemaRegistry::new()
            .with_type("Item", RecordSchema::new(["id"], ["name"]));
        std::fs::write(&path, serde_json::to_string(&registry).unwrap()).unwrap();

        let db = RegistryDatabase::from_file(&path).unwrap();
        assert_eq!(db.registry(), &registry);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            RegistryDatabase::from_file(&path),
            Err(DatabaseError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_bundled_registry_is_valid() {
        let db = RegistryDatabase::bundled().unwrap();
        assert!(validate_registry(db.registry()).is_empty());
        assert!(db.registry().active_types().count() > 0);
        assert!(db.get("Bgm").unwrap().is_pending());
    }

    #[test]
    fn test_builder_fallback_first_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.yaml");
        std::fs::write(&path, SAMPLE_YAML).unwrap();

        let db = RegistryDatabase::builder()
            .from_file("/nonexistent/registry.yaml")
            .from_file(&path)
            .build()
            .unwrap();
        assert!(db.contains("Item"));
        assert!(matches!(db.source(), RegistrySource::Multiple(sources) if sources.len() == 2));
    }

    #[test]
    fn test_builder_all_fail() {
        let result = RegistryDatabase::builder()
            .from_file("/nonexistent/a.yaml")
            .from_file("/nonexistent/b.json")
            .build();
        assert!(matches!(result, Err(DatabaseError::NoSourcesAvailable)));
    }

    #[test]
    fn test_builder_without_sources() {
        assert!(RegistryBuilder::new().build().is_err());
    }
}
