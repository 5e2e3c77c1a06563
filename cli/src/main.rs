use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use record_lens_core::{
    CollectionEnvelope, FlatMap, apply_dictionary, overlay, pending_entries, source_dictionary,
    validate_registry,
};
use record_lens_db::{
    PipelineConfig, RegistryDatabase, compare_folders, list_documents, load_source_rows,
    read_envelope, read_flat_map, record_type_of, write_envelope, write_flat_map,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (falls back to `RUST_LOG`).
const LOG_ENV: &str = "RECORD_LENS_LOG";

const SOURCE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];
const FLAT_MAP_EXTENSIONS: &[&str] = &["json", "csv"];

#[derive(Debug, Parser)]
#[command(name = "record-lens")]
#[command(version, about = "Export and re-import the translatable text of structured game data")]
struct Cli {
    /// Increase log verbosity (-v for info, -vv for debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build collection envelopes from raw source rows, keeping declared fields.
    Select(SelectArgs),
    /// Project collection envelopes into flat key maps.
    Export(ExportArgs),
    /// Merge translated flat maps back into collection envelopes.
    Import(ImportArgs),
    /// Convert a flat map between JSON and CSV (direction from extensions).
    Csv(CsvArgs),
    /// Turn flat maps into source-text dictionaries for translators.
    Dictionary(DictionaryArgs),
    /// Apply filled dictionaries to flat maps.
    ApplyDictionary(ApplyDictionaryArgs),
    /// List source text whose keys are new since a previous export.
    Todo(TodoArgs),
    /// Write one folder of flat maps over another.
    Overlay(OverlayArgs),
    /// Compare the JSON documents of two folders.
    Compare(CompareArgs),
    /// Validate a registry document (the bundled one by default).
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
struct BatchArgs {
    /// Pipeline configuration file (YAML).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of parallel jobs (default: number of CPUs).
    #[arg(long)]
    jobs: Option<usize>,
}

#[derive(Debug, Args)]
struct SelectArgs {
    /// Registry document (YAML or JSON); the bundled registry when omitted.
    #[arg(long)]
    registry: Option<PathBuf>,
    /// Directory of `<RecordType>.yaml` source files.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Output directory for collection envelopes.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Append this suffix to every translatable text (test builds).
    #[arg(long)]
    test_suffix: Option<String>,
    /// Comma-separated record types to process (default: all).
    #[arg(long)]
    only: Option<String>,
    #[command(flatten)]
    batch: BatchArgs,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Registry document; when given, only declared translatable paths are exported.
    #[arg(long)]
    registry: Option<PathBuf>,
    /// Directory of collection envelopes.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Output directory for flat maps.
    #[arg(long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    batch: BatchArgs,
}

#[derive(Debug, Args)]
struct ImportArgs {
    /// Registry document providing merge overrides; the bundled registry when omitted.
    #[arg(long)]
    registry: Option<PathBuf>,
    /// Directory of collection envelopes to merge into.
    #[arg(long)]
    base: Option<PathBuf>,
    /// Directory of translated flat maps (`.json` or `.csv`).
    #[arg(long)]
    translated: Option<PathBuf>,
    /// Output directory for merged envelopes.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Rebuild rows from primary-key and translatable paths only.
    #[arg(long)]
    declared_only: bool,
    #[command(flatten)]
    batch: BatchArgs,
}

#[derive(Debug, Args)]
struct CsvArgs {
    /// Input flat map (`.json` or `.csv`).
    #[arg(long)]
    from: PathBuf,
    /// Output flat map with the other extension.
    #[arg(long)]
    to: PathBuf,
}

#[derive(Debug, Args)]
struct DictionaryArgs {
    /// Directory of exported flat maps.
    #[arg(long)]
    input: PathBuf,
    /// Output directory for dictionaries.
    #[arg(long)]
    output: PathBuf,
    /// Write dictionaries as CSV instead of JSON.
    #[arg(long)]
    csv: bool,
    #[command(flatten)]
    batch: BatchArgs,
}

#[derive(Debug, Args)]
struct ApplyDictionaryArgs {
    /// Directory of exported flat maps.
    #[arg(long)]
    input: PathBuf,
    /// Directory of filled dictionaries, matched by file stem.
    #[arg(long)]
    dictionary: PathBuf,
    /// Output directory for translated flat maps.
    #[arg(long)]
    output: PathBuf,
    #[command(flatten)]
    batch: BatchArgs,
}

#[derive(Debug, Args)]
struct TodoArgs {
    /// Directory of flat maps the existing translations were made from.
    #[arg(long)]
    old: PathBuf,
    /// Directory of freshly exported flat maps.
    #[arg(long)]
    new: PathBuf,
    /// Output directory for todo dictionaries.
    #[arg(long)]
    output: PathBuf,
    /// Write todo dictionaries as CSV instead of JSON.
    #[arg(long)]
    csv: bool,
    #[command(flatten)]
    batch: BatchArgs,
}

#[derive(Debug, Args)]
struct OverlayArgs {
    /// Directory of base flat maps.
    #[arg(long)]
    base: PathBuf,
    /// Directory of flat maps written over the base.
    #[arg(long)]
    top: PathBuf,
    /// Output directory for combined flat maps.
    #[arg(long)]
    output: PathBuf,
    #[command(flatten)]
    batch: BatchArgs,
}

#[derive(Debug, Args)]
struct CompareArgs {
    /// First folder.
    left: PathBuf,
    /// Second folder.
    right: PathBuf,
    /// Print the comparison as JSON.
    #[arg(long)]
    json: bool,
    /// Exit with an error when the folders differ.
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Registry document to validate; the bundled registry when omitted.
    #[arg(long)]
    registry: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Select(args) => run_select(args),
        Command::Export(args) => run_export(args),
        Command::Import(args) => run_import(args),
        Command::Csv(args) => run_csv(args),
        Command::Dictionary(args) => run_dictionary(args),
        Command::ApplyDictionary(args) => run_apply_dictionary(args),
        Command::Todo(args) => run_todo(args),
        Command::Overlay(args) => run_overlay(args),
        Command::Compare(args) => run_compare(args),
        Command::Validate(args) => run_validate(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_select(args: SelectArgs) -> Result<(), String> {
    let mut config = load_config(args.batch.config.as_deref())?;
    let only = parse_csv_list(args.only);
    if !only.is_empty() {
        config.only = only;
    }
    let input = args.input.unwrap_or_else(|| config.folders.source.clone());
    let output = args
        .output
        .unwrap_or_else(|| config.folders.collections.clone());
    let test_suffix = args.test_suffix.or_else(|| config.test_suffix.clone());

    let db = load_registry(args.registry, &config)?;
    warn_invalid_registry(&db);

    let files = list_inputs(&input, SOURCE_EXTENSIONS)?;
    create_output_dir(&output)?;
    let jobs = resolve_jobs(args.batch.jobs, &config, files.len());

    run_batch("select", &files, jobs, |file| {
        let Some(record_type) = record_type_of(file) else {
            return Ok(FileOutcome::Skipped("file name is not valid UTF-8".into()));
        };
        if !config.is_selected(record_type) {
            return Ok(FileOutcome::Skipped("not selected".into()));
        }
        let Some(schema) = db.get(record_type) else {
            return Ok(FileOutcome::Skipped("no registry entry".into()));
        };
        if schema.is_pending() {
            return Ok(FileOutcome::Skipped("registry entry is pending".into()));
        }

        let rows = load_source_rows(file).map_err(|err| err.to_string())?;
        if rows.is_empty() {
            return Ok(FileOutcome::Skipped("no rows".into()));
        }

        let envelope = CollectionEnvelope::select(&rows, schema, test_suffix.as_deref());
        let target = output.join(format!("{record_type}.json"));
        write_envelope(&target, &envelope).map_err(|err| err.to_string())?;
        Ok(FileOutcome::Written(target))
    })
}

fn run_export(args: ExportArgs) -> Result<(), String> {
    let config = load_config(args.batch.config.as_deref())?;
    let input = args
        .input
        .unwrap_or_else(|| config.folders.collections.clone());
    let output = args.output.unwrap_or_else(|| config.folders.exports.clone());

    let db = match args.registry.or_else(|| config.registry.clone()) {
        Some(path) => Some(open_registry(&path)?),
        None => None,
    };

    let files = list_inputs(&input, &["json"])?;
    create_output_dir(&output)?;
    let jobs = resolve_jobs(args.batch.jobs, &config, files.len());

    run_batch("export", &files, jobs, |file| {
        let envelope = read_envelope(file).map_err(|err| err.to_string())?;
        let translatable = db
            .as_ref()
            .zip(record_type_of(file))
            .and_then(|(db, record_type)| db.get(record_type))
            .filter(|schema| !schema.is_pending())
            .map(|schema| schema.translatable.as_slice());

        let projection = envelope.project(translatable);
        if !projection.collisions.is_empty() {
            warn!(
                file = %file.display(),
                count = projection.collisions.len(),
                "records share composite keys; later records win"
            );
        }
        if projection.entries.is_empty() {
            return Ok(FileOutcome::Skipped("nothing to translate".into()));
        }

        let target = output.join(output_name(file, "json"));
        write_flat_map(&target, &projection.entries).map_err(|err| err.to_string())?;
        Ok(FileOutcome::Written(target))
    })
}

fn run_import(args: ImportArgs) -> Result<(), String> {
    let config = load_config(args.batch.config.as_deref())?;
    let base = args
        .base
        .unwrap_or_else(|| config.folders.collections.clone());
    let translated_dir = args
        .translated
        .unwrap_or_else(|| config.folders.translated.clone());
    let output = args.output.unwrap_or_else(|| config.folders.merged.clone());

    let db = load_registry(args.registry, &config)?;

    let files = list_inputs(&base, &["json"])?;
    create_output_dir(&output)?;
    let jobs = resolve_jobs(args.batch.jobs, &config, files.len());

    run_batch("import", &files, jobs, |file| {
        let Some(record_type) = record_type_of(file) else {
            return Ok(FileOutcome::Skipped("file name is not valid UTF-8".into()));
        };
        let envelope = read_envelope(file).map_err(|err| err.to_string())?;

        let translated = match find_flat_map(&translated_dir, record_type) {
            Some(path) => read_flat_map(&path).map_err(|err| err.to_string())?,
            None => {
                info!(record_type, "no translations found, envelope copied unchanged");
                FlatMap::new()
            }
        };

        let unmatched = envelope.unmatched_keys(&translated);
        if let Some(first) = unmatched.first() {
            warn!(
                record_type,
                count = unmatched.len(),
                first = *first,
                "translations match no row and are ignored"
            );
        }

        let translatable = if args.declared_only {
            db.get(record_type)
                .filter(|schema| !schema.is_pending())
                .map(|schema| schema.translatable.as_slice())
        } else {
            None
        };

        let merged = envelope.merge(translatable, &translated, db.overrides_for(record_type));
        let target = output.join(output_name(file, "json"));
        write_envelope(&target, &merged).map_err(|err| err.to_string())?;
        Ok(FileOutcome::Written(target))
    })
}

fn run_csv(args: CsvArgs) -> Result<(), String> {
    let from_ext = args.from.extension().and_then(|ext| ext.to_str());
    let to_ext = args.to.extension().and_then(|ext| ext.to_str());
    if from_ext == to_ext {
        return Err(format!(
            "'{}' and '{}' have the same extension; convert between .json and .csv",
            args.from.display(),
            args.to.display()
        ));
    }

    let entries = read_flat_map(&args.from)
        .map_err(|err| format!("Failed to read '{}': {err}", args.from.display()))?;
    write_flat_map(&args.to, &entries)
        .map_err(|err| format!("Failed to write '{}': {err}", args.to.display()))?;

    println!(
        "Converted {} entries: {} -> {}",
        entries.len(),
        args.from.display(),
        args.to.display()
    );
    Ok(())
}

fn run_dictionary(args: DictionaryArgs) -> Result<(), String> {
    let config = load_config(args.batch.config.as_deref())?;
    let files = list_inputs(&args.input, &["json"])?;
    create_output_dir(&args.output)?;
    let jobs = resolve_jobs(args.batch.jobs, &config, files.len());
    let ext = if args.csv { "csv" } else { "json" };

    run_batch("dictionary", &files, jobs, |file| {
        let entries = read_flat_map(file).map_err(|err| err.to_string())?;
        let dictionary = source_dictionary(&entries);
        if dictionary.is_empty() {
            return Ok(FileOutcome::Skipped("empty flat map".into()));
        }
        let target = args.output.join(output_name(file, ext));
        write_flat_map(&target, &dictionary).map_err(|err| err.to_string())?;
        Ok(FileOutcome::Written(target))
    })
}

fn run_apply_dictionary(args: ApplyDictionaryArgs) -> Result<(), String> {
    let config = load_config(args.batch.config.as_deref())?;
    let files = list_inputs(&args.input, &["json"])?;
    create_output_dir(&args.output)?;
    let jobs = resolve_jobs(args.batch.jobs, &config, files.len());

    run_batch("apply-dictionary", &files, jobs, |file| {
        let Some(stem) = record_type_of(file) else {
            return Ok(FileOutcome::Skipped("file name is not valid UTF-8".into()));
        };
        let Some(dictionary_path) = find_flat_map(&args.dictionary, stem) else {
            return Ok(FileOutcome::Skipped("no dictionary".into()));
        };

        let entries = read_flat_map(file).map_err(|err| err.to_string())?;
        let dictionary = read_flat_map(&dictionary_path).map_err(|err| err.to_string())?;
        let target = args.output.join(output_name(file, "json"));
        write_flat_map(&target, &apply_dictionary(&entries, &dictionary))
            .map_err(|err| err.to_string())?;
        Ok(FileOutcome::Written(target))
    })
}

fn run_todo(args: TodoArgs) -> Result<(), String> {
    let config = load_config(args.batch.config.as_deref())?;
    let files = list_inputs(&args.new, &["json"])?;
    create_output_dir(&args.output)?;
    let jobs = resolve_jobs(args.batch.jobs, &config, files.len());
    let ext = if args.csv { "csv" } else { "json" };

    run_batch("todo", &files, jobs, |file| {
        let current = read_flat_map(file).map_err(|err| err.to_string())?;
        let previous = read_optional_flat_map(&args.old.join(output_name(file, "json")))?;

        let todo = pending_entries(&current, &previous);
        if todo.is_empty() {
            return Ok(FileOutcome::Skipped("up to date".into()));
        }
        let target = args.output.join(output_name(file, ext));
        write_flat_map(&target, &todo).map_err(|err| err.to_string())?;
        Ok(FileOutcome::Written(target))
    })
}

fn run_overlay(args: OverlayArgs) -> Result<(), String> {
    let config = load_config(args.batch.config.as_deref())?;
    let names: BTreeSet<PathBuf> = list_inputs(&args.base, &["json"])?
        .into_iter()
        .chain(list_inputs(&args.top, &["json"])?)
        .filter_map(|path| path.file_name().map(PathBuf::from))
        .collect();
    let names: Vec<PathBuf> = names.into_iter().collect();
    create_output_dir(&args.output)?;
    let jobs = resolve_jobs(args.batch.jobs, &config, names.len());

    run_batch("overlay", &names, jobs, |name| {
        let base = read_optional_flat_map(&args.base.join(name))?;
        let top = read_optional_flat_map(&args.top.join(name))?;
        let target = args.output.join(name);
        write_flat_map(&target, &overlay(&base, &top)).map_err(|err| err.to_string())?;
        Ok(FileOutcome::Written(target))
    })
}

fn run_compare(args: CompareArgs) -> Result<(), String> {
    let comparison = compare_folders(&args.left, &args.right).map_err(|err| {
        format!(
            "Failed to compare '{}' and '{}': {err}",
            args.left.display(),
            args.right.display()
        )
    })?;

    if args.json {
        let json = serde_json::to_string_pretty(&comparison)
            .map_err(|err| format!("Failed to serialize comparison: {err}"))?;
        println!("{json}");
    } else {
        print_bucket("Matched", &comparison.matched, false);
        print_bucket("Mismatched", &comparison.mismatched, true);
        print_bucket(
            &format!("Missing in {}", args.right.display()),
            &comparison.missing_in_right,
            true,
        );
        print_bucket(
            &format!("Missing in {}", args.left.display()),
            &comparison.missing_in_left,
            true,
        );
        print_bucket("Unreadable", &comparison.unreadable, true);
    }

    if args.strict && !comparison.is_identical() {
        return Err("folders differ".to_string());
    }
    Ok(())
}

fn print_bucket(label: &str, files: &[String], list_files: bool) {
    println!("{label}: {}", files.len());
    if list_files {
        for file in files {
            println!("  {file}");
        }
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let db = match args.registry {
        Some(path) => open_registry(&path)?,
        None => RegistryDatabase::bundled()
            .map_err(|err| format!("Failed to load bundled registry: {err}"))?,
    };

    let errors = validate_registry(db.registry());
    if errors.is_empty() {
        println!(
            "Registry is valid: {} record type(s), {} active.",
            db.len(),
            db.registry().active_types().count()
        );
        return Ok(());
    }

    for error in &errors {
        eprintln!("  {error}");
    }
    Err(format!("{} validation error(s)", errors.len()))
}

enum FileOutcome {
    Written(PathBuf),
    Skipped(String),
}

/// Runs `work` over `files` on a pool of `jobs` threads and prints a summary.
///
/// A failing file does not stop the others; the batch fails at the end if
/// any file failed.
fn run_batch<F>(label: &str, files: &[PathBuf], jobs: usize, work: F) -> Result<(), String>
where
    F: Fn(&Path) -> Result<FileOutcome, String> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| format!("Failed to create thread pool: {e}"))?;

    let outcomes: Vec<(&PathBuf, Result<FileOutcome, String>)> = pool.install(|| {
        files
            .par_iter()
            .map(|file| {
                info!(file = %file.display(), "{label}");
                (file, work(file.as_path()))
            })
            .collect()
    });

    let mut written = 0usize;
    let mut skipped = 0usize;
    let mut failures = Vec::new();
    for (file, outcome) in outcomes {
        match outcome {
            Ok(FileOutcome::Written(target)) => {
                written += 1;
                debug!(file = %file.display(), target = %target.display(), "written");
            }
            Ok(FileOutcome::Skipped(reason)) => {
                skipped += 1;
                info!(file = %file.display(), reason = %reason, "skipped");
            }
            Err(err) => {
                warn!(file = %file.display(), error = %err, "failed");
                failures.push((file, err));
            }
        }
    }

    println!(
        "{label}: {written} written, {skipped} skipped, {} failed.",
        failures.len()
    );
    if failures.is_empty() {
        return Ok(());
    }

    eprintln!("\nFailures:");
    for (file, err) in &failures {
        eprintln!("  {}: {err}", file.display());
    }
    Err(format!("{} file(s) failed", failures.len()))
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, String> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

/// Loads the registry named by `--registry`, or else the one named in the
/// config with the bundled registry as fallback, or else the bundled one.
fn load_registry(
    explicit: Option<PathBuf>,
    config: &PipelineConfig,
) -> Result<RegistryDatabase, String> {
    if let Some(path) = explicit {
        return open_registry(&path);
    }

    let mut builder = RegistryDatabase::builder();
    if let Some(path) = &config.registry {
        builder = builder.from_file(path);
    }
    builder
        .with_bundled()
        .build()
        .map_err(|err| format!("Failed to load registry: {err}"))
}

fn open_registry(path: &Path) -> Result<RegistryDatabase, String> {
    RegistryDatabase::from_file(path)
        .map_err(|err| format!("Failed to load registry '{}': {err}", path.display()))
}

fn warn_invalid_registry(db: &RegistryDatabase) {
    for error in validate_registry(db.registry()) {
        warn!(%error, "registry problem");
    }
}

fn list_inputs(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, String> {
    list_documents(dir, extensions)
        .map_err(|err| format!("Failed to read input directory '{}': {err}", dir.display()))
}

fn create_output_dir(dir: &Path) -> Result<(), String> {
    fs::create_dir_all(dir).map_err(|err| {
        format!(
            "Failed to create output directory '{}': {err}",
            dir.display()
        )
    })
}

/// Finds `<stem>.json` or `<stem>.csv` in `dir`.
fn find_flat_map(dir: &Path, stem: &str) -> Option<PathBuf> {
    FLAT_MAP_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|path| path.is_file())
}

fn read_optional_flat_map(path: &Path) -> Result<FlatMap, String> {
    if !path.is_file() {
        return Ok(FlatMap::new());
    }
    read_flat_map(path).map_err(|err| format!("Failed to read '{}': {err}", path.display()))
}

fn output_name(file: &Path, ext: &str) -> PathBuf {
    let stem = file.file_stem().unwrap_or(file.as_os_str());
    PathBuf::from(stem).with_extension(ext)
}

fn resolve_jobs(requested: Option<usize>, config: &PipelineConfig, file_count: usize) -> usize {
    requested
        .or(config.jobs)
        .unwrap_or_else(|| default_parallel_jobs(file_count))
        .max(1)
}

fn default_parallel_jobs(file_count: usize) -> usize {
    let cpu_count = std::thread::available_parallelism()
        .map(|parallelism| parallelism.get())
        .unwrap_or(4);
    cpu_count.max(1).min(file_count.max(1))
}

fn parse_csv_list(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    })
    .unwrap_or_default()
}
