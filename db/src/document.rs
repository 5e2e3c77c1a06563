//! Reading and writing pipeline documents.
//!
//! Source rows come from YAML (or JSON) dumps of master-data tables, one
//! file per record type named after it. Envelopes and flat maps are JSON
//! written with four-space indentation and non-ASCII text kept as is, so
//! files diff cleanly against those produced by earlier tooling. Flat maps
//! can also travel as two-column CSV for spreadsheet-based translation.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use record_lens_core::{CollectionEnvelope, FlatMap, Tree};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, warn};

use crate::error::{DatabaseError, Result};

/// Column headers of the CSV bridge format.
pub const CSV_HEADER: [&str; 2] = ["source", "translatedstr"];

/// Stands in for U+000B while YAML is parsed; the parser rejects the raw
/// control character.
const VERTICAL_TAB_STANDIN: char = '\u{E00B}';

/// Parses a source YAML document, tolerating two quirks of game dumps:
/// vertical tab characters inside scalars, and a bare tab as a mapping
/// value (`key: \t`), which is read as the string `"\t"`.
///
/// # Examples
///
/// ```
/// use record_lens_db::parse_source_yaml;
/// use serde_json::json;
///
/// let rows = parse_source_yaml("- id: a\n  name: \"x\u{b}y\"\n- id: b\n  name: \t\n").unwrap();
/// assert_eq!(rows, json!([{"id": "a", "name": "x\u{b}y"}, {"id": "b", "name": "\t"}]));
/// ```
pub fn parse_source_yaml(text: &str) -> Result<Tree> {
    let prepared = text
        .replace('\u{b}', &VERTICAL_TAB_STANDIN.to_string())
        .replace(": \t", ": \"\t\"");
    let mut tree: Tree = serde_yaml::from_str(&prepared)?;
    restore_vertical_tabs(&mut tree);
    Ok(tree)
}

fn restore_vertical_tabs(node: &mut Tree) {
    match node {
        Tree::String(text) if text.contains(VERTICAL_TAB_STANDIN) => {
            *text = text.replace(VERTICAL_TAB_STANDIN, "\u{b}");
        }
        Tree::Array(items) => items.iter_mut().for_each(restore_vertical_tabs),
        Tree::Object(fields) => fields.values_mut().for_each(restore_vertical_tabs),
        _ => {}
    }
}

/// Loads the rows of one record type from a `.yaml`/`.yml` or `.json` file.
///
/// An empty document yields no rows.
///
/// # Errors
///
/// Returns [`DatabaseError::InvalidDocument`] when the top level is not a
/// sequence, and the usual I/O or parse errors otherwise.
pub fn load_source_rows(path: impl AsRef<Path>) -> Result<Vec<Tree>> {
    let path = path.as_ref();
    let tree = match extension(path) {
        Some("yaml" | "yml") => parse_source_yaml(&std::fs::read_to_string(path)?)?,
        Some("json") => read_json(path)?,
        _ => return Err(DatabaseError::UnsupportedFormat(path.to_path_buf())),
    };
    match tree {
        Tree::Array(rows) => Ok(rows),
        Tree::Null => Ok(Vec::new()),
        other => Err(DatabaseError::InvalidDocument {
            path: path.to_path_buf(),
            reason: format!("expected a sequence of rows, found {}", kind(&other)),
        }),
    }
}

fn kind(value: &Tree) -> &'static str {
    match value {
        Tree::Null => "null",
        Tree::Bool(_) => "a boolean",
        Tree::Number(_) => "a number",
        Tree::String(_) => "a string",
        Tree::Array(_) => "a sequence",
        Tree::Object(_) => "a mapping",
    }
}

/// Reads any JSON document.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Writes `value` as JSON indented by four spaces, creating parent folders.
pub fn write_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    writer.flush()?;
    debug!(path = %path.display(), "wrote JSON document");
    Ok(())
}

/// Reads a collection envelope.
pub fn read_envelope(path: impl AsRef<Path>) -> Result<CollectionEnvelope> {
    read_json(path)
}

/// Writes a collection envelope.
pub fn write_envelope(path: impl AsRef<Path>, envelope: &CollectionEnvelope) -> Result<()> {
    write_json(path, envelope)
}

/// Reads a flat map (`.json` object or two-column `.csv`).
pub fn read_flat_map(path: impl AsRef<Path>) -> Result<FlatMap> {
    let path = path.as_ref();
    match extension(path) {
        Some("json") => read_json(path),
        Some("csv") => read_flat_csv(path),
        _ => Err(DatabaseError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Writes a flat map, picking JSON or CSV by extension.
pub fn write_flat_map(path: impl AsRef<Path>, entries: &FlatMap) -> Result<()> {
    let path = path.as_ref();
    match extension(path) {
        Some("json") => write_json(path, entries),
        Some("csv") => write_flat_csv(path, entries),
        _ => Err(DatabaseError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Reads a CSV flat map with a `source,translatedstr` header.
///
/// A row without a `translatedstr` cell maps its source to `""`. When a
/// source appears twice, the later row wins.
///
/// # Errors
///
/// Returns [`DatabaseError::InvalidDocument`] if the header has no
/// `source` column.
pub fn read_flat_csv(path: impl AsRef<Path>) -> Result<FlatMap> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(BufReader::new(File::open(path)?));

    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);
    let Some(source_column) = position(CSV_HEADER[0]) else {
        return Err(DatabaseError::InvalidDocument {
            path: path.to_path_buf(),
            reason: format!("missing '{}' column", CSV_HEADER[0]),
        });
    };
    let translated_column = position(CSV_HEADER[1]);

    let mut entries = FlatMap::new();
    for row in reader.records() {
        let row = row?;
        let Some(source) = row.get(source_column) else {
            continue;
        };
        let translated = translated_column
            .and_then(|column| row.get(column))
            .unwrap_or_default();
        entries.insert(source.to_string(), translated.to_string());
    }
    Ok(entries)
}

/// Writes a flat map as CSV, one `source,translatedstr` row per entry.
pub fn write_flat_csv(path: impl AsRef<Path>, entries: &FlatMap) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_writer(BufWriter::new(File::create(path)?));
    writer.write_record(CSV_HEADER)?;
    for (source, translated) in entries {
        writer.write_record([source, translated])?;
    }
    writer.flush()?;
    Ok(())
}

/// Lists files directly inside `dir` whose extension is one of
/// `extensions`, sorted by path.
pub fn list_documents(dir: impl AsRef<Path>, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && extension(&path).is_some_and(|ext| extensions.contains(&ext)) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Returns the record type a document is named after (its file stem).
pub fn record_type_of(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|stem| stem.to_str())
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// Result of comparing the JSON documents of two folders by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FolderComparison {
    /// Present in both folders with equal content.
    pub matched: Vec<String>,
    /// Present in both folders with different content.
    pub mismatched: Vec<String>,
    /// Present only in the left folder.
    pub missing_in_right: Vec<String>,
    /// Present only in the right folder.
    pub missing_in_left: Vec<String>,
    /// Present in both folders but unreadable on at least one side.
    pub unreadable: Vec<String>,
}

impl FolderComparison {
    /// Returns `true` when both folders hold the same documents.
    pub fn is_identical(&self) -> bool {
        self.mismatched.is_empty()
            && self.missing_in_left.is_empty()
            && self.missing_in_right.is_empty()
            && self.unreadable.is_empty()
    }
}

/// Compares the `*.json` documents of two folders.
///
/// Documents are compared as parsed values, so formatting and key order do
/// not matter.
///
/// # Errors
///
/// Returns [`DatabaseError::IoError`] if either folder cannot be listed.
/// Unparseable documents are reported in
/// [`unreadable`](FolderComparison::unreadable) instead.
pub fn compare_folders(left: impl AsRef<Path>, right: impl AsRef<Path>) -> Result<FolderComparison> {
    let left = left.as_ref();
    let right = right.as_ref();
    let names = |dir: &Path| -> Result<BTreeSet<String>> {
        Ok(list_documents(dir, &["json"])?
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect())
    };
    let left_names = names(left)?;
    let right_names = names(right)?;

    let mut comparison = FolderComparison {
        missing_in_right: left_names.difference(&right_names).cloned().collect(),
        missing_in_left: right_names.difference(&left_names).cloned().collect(),
        ..FolderComparison::default()
    };

    for name in left_names.intersection(&right_names) {
        let loaded = read_json::<Tree>(left.join(name))
            .and_then(|a| read_json::<Tree>(right.join(name)).map(|b| (a, b)));
        match loaded {
            Ok((a, b)) if a == b => comparison.matched.push(name.clone()),
            Ok(_) => comparison.mismatched.push(name.clone()),
            Err(err) => {
                warn!(file = %name, error = %err, "could not compare document");
                comparison.unreadable.push(name.clone());
            }
        }
    }

    Ok(comparison)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_bare_tab_value_reads_as_tab() {
        let tree = parse_source_yaml("- id: x\n  text: \t\n").unwrap();
        assert_eq!(tree, json!([{"id": "x", "text": "\t"}]));
    }

    #[test]
    fn test_vertical_tab_survives_round_trip() {
        let tree = parse_source_yaml("- text: a\u{b}b\n").unwrap();
        assert_eq!(tree[0]["text"], "a\u{b}b");
    }

    #[test]
    fn test_non_sequence_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Item.yaml");
        std::fs::write(&path, "id: 1\n").unwrap();
        assert!(matches!(
            load_source_rows(&path),
            Err(DatabaseError::InvalidDocument { .. })
        ));
    }

    #[test]
    fn test_empty_source_has_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Item.yaml");
        std::fs::write(&path, "").unwrap();
        assert!(load_source_rows(&path).unwrap().is_empty());
    }

    #[test]
    fn test_json_written_with_four_space_indent_and_raw_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");
        let mut entries = FlatMap::new();
        entries.insert("1|name".into(), "剣".into());
        write_json(&path, &entries).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\n    \"1|name\": \"剣\"\n}"
        );
    }

    #[test]
    fn test_csv_missing_translation_cell_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todo.csv");
        std::fs::write(&path, "source,translatedstr\n剣,Sword\n盾\n").unwrap();
        let entries = read_flat_csv(&path).unwrap();
        assert_eq!(entries["剣"], "Sword");
        assert_eq!(entries["盾"], "");
    }

    #[test]
    fn test_csv_without_source_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "key,value\na,b\n").unwrap();
        assert!(matches!(
            read_flat_csv(&path),
            Err(DatabaseError::InvalidDocument { .. })
        ));
    }

    #[test]
    fn test_csv_round_trip_with_commas_and_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.csv");
        let mut entries = FlatMap::new();
        entries.insert("一、二".into(), "one, two".into());
        entries.insert("行\n改行".into(), "line\nbreak".into());
        write_flat_map(&path, &entries).unwrap();
        assert_eq!(read_flat_map(&path).unwrap(), entries);
    }

    #[test]
    fn test_list_documents_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.yaml", "c.txt", "a.json"] {
            std::fs::write(dir.path().join(name), "[]").unwrap();
        }
        let files = list_documents(dir.path(), &["json", "yaml"]).unwrap();
        let names: Vec<_> = files.iter().filter_map(|p| p.file_name()).collect();
        assert_eq!(names, vec!["a.json", "a.yaml", "b.json"]);
        assert_eq!(record_type_of(&files[0]), Some("a"));
    }
}
