use std::path::Path;

use record_lens_core::{CollectionEnvelope, FlatMap, apply_dictionary, source_dictionary};
use record_lens_db::{
    PipelineConfig, RegistryDatabase, compare_folders, load_source_rows, read_envelope,
    read_flat_map, write_envelope, write_flat_map,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const TUTORIAL_YAML: &str = "\
- tutorialType: TutorialType_Lesson
  step: 1
  subStep: 0
  texts:
    - レッスンを始めましょう
    - \"\"
  assetId: img_tutorial_01
- tutorialType: TutorialType_Lesson
  step: 2
  subStep: 0
  texts: []
";

fn write_source(dir: &Path, name: &str, content: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), content).unwrap();
}

// ---------------------------------------------------------------------------
// Full pipeline on disk
// ---------------------------------------------------------------------------

#[test]
fn test_select_export_translate_import() {
    let root = tempfile::tempdir().unwrap();
    let mut config = PipelineConfig::default();
    config.folders.source = root.path().join("orig");
    config.folders.collections = root.path().join("json");
    config.folders.exports = root.path().join("exports");
    config.folders.merged = root.path().join("merged");

    write_source(&config.folders.source, "Tutorial.yaml", TUTORIAL_YAML);
    let db = RegistryDatabase::bundled().unwrap();
    let schema = db.get("Tutorial").unwrap();

    let rows = load_source_rows(config.folders.source.join("Tutorial.yaml")).unwrap();
    let envelope = CollectionEnvelope::select(&rows, schema, None);
    let collection_path = config.folders.collections.join("Tutorial.json");
    write_envelope(&collection_path, &envelope).unwrap();

    let envelope = read_envelope(&collection_path).unwrap();
    assert_eq!(envelope.data[0].get("assetId"), None);

    let projection = envelope.project(Some(&schema.translatable));
    let export_path = config.folders.exports.join("Tutorial.json");
    write_flat_map(&export_path, &projection.entries).unwrap();

    let exported = read_flat_map(&export_path).unwrap();
    assert_eq!(
        exported["TutorialType_Lesson|1|0|texts"],
        "[LA_F]レッスンを始めましょう[LA_N_F]"
    );
    assert_eq!(exported.len(), 1);

    let mut translated = FlatMap::new();
    translated.insert(
        "TutorialType_Lesson|1|0|texts".into(),
        "[LA_F]Let's start the lesson[LA_N_F]".into(),
    );
    translated.insert("TutorialType_Lesson|2|0|texts".into(), "[LA_F]".into());

    let merged = envelope.merge(
        Some(&schema.translatable),
        &translated,
        db.overrides_for("Tutorial"),
    );
    write_envelope(config.folders.merged.join("Tutorial.json"), &merged).unwrap();

    let merged = read_envelope(config.folders.merged.join("Tutorial.json")).unwrap();
    assert_eq!(
        merged.data,
        vec![
            json!({
                "tutorialType": "TutorialType_Lesson",
                "step": 1,
                "subStep": 0,
                "texts": ["Let's start the lesson", ""],
            }),
            json!({
                "tutorialType": "TutorialType_Lesson",
                "step": 2,
                "subStep": 0,
                "texts": [],
            }),
        ]
    );
}

// ---------------------------------------------------------------------------
// CSV bridge with dictionaries
// ---------------------------------------------------------------------------

#[test]
fn test_dictionary_through_csv() {
    let dir = tempfile::tempdir().unwrap();
    let mut exported = FlatMap::new();
    exported.insert("1|name".into(), "剣".into());
    exported.insert("2|name".into(), "剣".into());
    exported.insert("3|name".into(), "盾, 大".into());

    let csv_path = dir.path().join("todo.csv");
    write_flat_map(&csv_path, &source_dictionary(&exported)).unwrap();

    let filled = std::fs::read_to_string(&csv_path)
        .unwrap()
        .replace("剣,", "剣,Sword");
    std::fs::write(&csv_path, filled).unwrap();

    let dictionary = read_flat_map(&csv_path).unwrap();
    let applied = apply_dictionary(&exported, &dictionary);
    assert_eq!(applied["1|name"], "Sword");
    assert_eq!(applied["2|name"], "Sword");
    assert_eq!(applied["3|name"], "盾, 大");
}

// ---------------------------------------------------------------------------
// Folder comparison
// ---------------------------------------------------------------------------

#[test]
fn test_compare_folders_reports_each_bucket() {
    let left = tempfile::tempdir().unwrap();
    let right = tempfile::tempdir().unwrap();

    std::fs::write(left.path().join("same.json"), r#"{"a": 1, "b": 2}"#).unwrap();
    std::fs::write(right.path().join("same.json"), "{\n  \"b\": 2,\n  \"a\": 1\n}").unwrap();
    std::fs::write(left.path().join("diff.json"), r#"{"a": 1}"#).unwrap();
    std::fs::write(right.path().join("diff.json"), r#"{"a": 2}"#).unwrap();
    std::fs::write(left.path().join("left_only.json"), "{}").unwrap();
    std::fs::write(right.path().join("right_only.json"), "{}").unwrap();
    std::fs::write(left.path().join("broken.json"), "{").unwrap();
    std::fs::write(right.path().join("broken.json"), "{}").unwrap();
    std::fs::write(left.path().join("notes.txt"), "ignored").unwrap();

    let comparison = compare_folders(left.path(), right.path()).unwrap();
    assert_eq!(comparison.matched, vec!["same.json"]);
    assert_eq!(comparison.mismatched, vec!["diff.json"]);
    assert_eq!(comparison.missing_in_right, vec!["left_only.json"]);
    assert_eq!(comparison.missing_in_left, vec!["right_only.json"]);
    assert_eq!(comparison.unreadable, vec!["broken.json"]);
    assert!(!comparison.is_identical());
}

#[test]
fn test_compare_identical_folders() {
    let left = tempfile::tempdir().unwrap();
    let right = tempfile::tempdir().unwrap();
    std::fs::write(left.path().join("x.json"), "[1, 2]").unwrap();
    std::fs::write(right.path().join("x.json"), "[1,2]").unwrap();
    assert!(compare_folders(left.path(), right.path()).unwrap().is_identical());
}

// ---------------------------------------------------------------------------
// Registry document on disk
// ---------------------------------------------------------------------------

#[test]
fn test_registry_file_overrides_bundled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.yaml");
    std::fs::write(
        &path,
        "version: \"1.0\"\ntypes:\n  Item:\n    primary_keys: [id]\n    translatable: [name]\n",
    )
    .unwrap();

    let db = RegistryDatabase::builder()
        .from_file(&path)
        .with_bundled()
        .build()
        .unwrap();
    assert_eq!(db.len(), 1);
    assert!(!db.contains("Tutorial"));
}
