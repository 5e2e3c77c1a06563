//! Pipeline configuration for batch runs.
//!
//! Defines the YAML-serializable configuration naming the working folders of
//! the select → export → translate → import pipeline, the parallelism of
//! batch commands, and which record types to process.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! folders:
//!   source: gakumasu-diff/orig
//!   collections: gakumasu-diff/json
//!   exports: exports
//!   translated: pretranslate_todo/translated_out
//!   merged: merged
//! registry: registry.yaml
//! jobs: 4
//! test_suffix: null
//! only: []
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Working folders of the pipeline, one per stage output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineFolders {
    /// Raw source rows (`<RecordType>.yaml` or `.json`).
    pub source: PathBuf,
    /// Collection envelopes written by `select`.
    pub collections: PathBuf,
    /// Flat maps written by `export`.
    pub exports: PathBuf,
    /// Translated flat maps read by `import`.
    pub translated: PathBuf,
    /// Merged envelopes written by `import`.
    pub merged: PathBuf,
}

impl Default for PipelineFolders {
    fn default() -> Self {
        Self {
            source: PathBuf::from("gakumasu-diff/orig"),
            collections: PathBuf::from("gakumasu-diff/json"),
            exports: PathBuf::from("exports"),
            translated: PathBuf::from("pretranslate_todo/translated_out"),
            merged: PathBuf::from("merged"),
        }
    }
}

/// Top-level pipeline configuration.
///
/// Loaded from a YAML file (typically `record-lens.yml` next to the data)
/// and overridden field by field by command-line flags.
///
/// # Examples
///
/// ```
/// use record_lens_db::PipelineConfig;
///
/// let config: PipelineConfig = serde_yaml::from_str("version: \"1.0\"\nonly: [Achievement]").unwrap();
/// assert!(config.is_selected("Achievement"));
/// assert!(!config.is_selected("Costume"));
/// assert_eq!(config.jobs, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Stage folders.
    #[serde(default)]
    pub folders: PipelineFolders,
    /// Registry document; the bundled registry is used when unset.
    #[serde(default)]
    pub registry: Option<PathBuf>,
    /// Worker threads for batch commands (default: available parallelism).
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Suffix appended to translatable text by `select` for test builds.
    #[serde(default)]
    pub test_suffix: Option<String>,
    /// Record types to select (empty = every active type).
    #[serde(default)]
    pub only: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            folders: PipelineFolders::default(),
            registry: None,
            jobs: None,
            test_suffix: None,
            only: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::DatabaseError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::DatabaseError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::DatabaseError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::DatabaseError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Returns `true` if `record_type` should be selected.
    ///
    /// An empty `only` list selects everything.
    pub fn is_selected(&self, record_type: &str) -> bool {
        self.only.is_empty() || self.only.iter().any(|t| t == record_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
version: "1.0"
folders:
  source: data/orig
  collections: data/json
  exports: data/exports
  translated: data/translated
  merged: data/merged
registry: registry.yaml
jobs: 8
test_suffix: TEST
only:
  - Achievement
  - Tutorial
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: PipelineConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.folders.source, PathBuf::from("data/orig"));
        assert_eq!(config.folders.merged, PathBuf::from("data/merged"));
        assert_eq!(config.registry, Some(PathBuf::from("registry.yaml")));
        assert_eq!(config.jobs, Some(8));
        assert_eq!(config.test_suffix.as_deref(), Some("TEST"));
        assert_eq!(config.only, vec!["Achievement", "Tutorial"]);
    }

    #[test]
    fn test_deserialize_minimal_uses_defaults() {
        let config: PipelineConfig = serde_yaml::from_str("version: \"1.0\"").unwrap();
        assert_eq!(config.folders, PipelineFolders::default());
        assert!(config.registry.is_none());
        assert!(config.test_suffix.is_none());
        assert!(config.only.is_empty());
    }

    #[test]
    fn test_is_selected() {
        let config: PipelineConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert!(config.is_selected("Tutorial"));
        assert!(!config.is_selected("Costume"));
        assert!(PipelineConfig::default().is_selected("Costume"));
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record-lens.yml");

        let original: PipelineConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        original.save(&path).unwrap();

        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded, original);
    }
}
