//! High-level import/export API over a [`RecordStore`].
//!
//! Every import runs the whole pipeline first (decode, header check, map,
//! validate, sanitize) and only then replaces the stored collection in one
//! call. Any error leaves the store untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use rd_dashboard::{import_file, CalamineReader, Config, JsonFileStore, RecordKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let mut store = JsonFileStore::new(&config.data_dir);
//!     let report = import_file(
//!         &mut store,
//!         RecordKind::Tasks,
//!         "planner-export.csv",
//!         config.fetch_timeout,
//!         &CalamineReader,
//!     )
//!     .await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::backup::{
    commit_decoded, decode_records, envelope_records, restore_backup, JsonBlob, RejectedRecord,
};
use crate::error::{PipelineError, PipelineResult};
use crate::logs::{log_failure, log_info, log_success, log_warning, log_warning_indent};
use crate::models::{IdSequence, Project, Task};
use crate::parser::decode_bytes;
use crate::source::{first_sheet_to_csv, read_source, SourceKind, WorkbookReader};
use crate::store::{JsonFileStore, RecordStore, StoredRecord};

use super::layout::{ImportBatch, SkippedRow};
use super::project_layout::{export_projects, parse_projects};
use super::task_layout::{export_tasks, parse_tasks};

/// Which collection an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Projects,
    Tasks,
}

/// Outcome of a successful import
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub skipped_rows: Vec<SkippedRow>,
    /// Detected text encoding, when the input was decoded from bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

impl ImportReport {
    pub fn summary(&self) -> String {
        format!("Imported: {} records, {} skipped", self.imported, self.skipped)
    }

    fn with_encoding(mut self, encoding: String) -> Self {
        self.encoding = Some(encoding);
        self
    }

    fn from_restore(imported: usize, rejected: Vec<RejectedRecord>) -> Self {
        Self {
            imported,
            skipped: rejected.len(),
            skipped_rows: rejected
                .into_iter()
                .map(|r| SkippedRow {
                    line: r.index,
                    reason: r.errors.join("; "),
                })
                .collect(),
            encoding: None,
        }
    }
}

/// Replace the stored collection with a batch, unless it holds no records.
fn commit_batch<T, S>(store: &mut S, batch: ImportBatch<T>) -> PipelineResult<ImportReport>
where
    T: StoredRecord,
    S: RecordStore<T>,
{
    for skip in &batch.skipped {
        log_warning_indent(format!("Row {} skipped: {}", skip.line, skip.reason), 1);
    }

    if batch.records.is_empty() {
        return Err(PipelineError::NoValidRecords {
            kind: T::KIND,
            skipped: batch.skipped.len(),
        });
    }

    let report = ImportReport {
        imported: batch.records.len(),
        skipped: batch.skipped.len(),
        skipped_rows: batch.skipped,
        encoding: None,
    };
    store.replace(batch.records)?;

    log_success(format!("{} {}", T::KIND, report.summary()));
    Ok(report)
}

// =============================================================================
// CSV / workbook / JSON imports
// =============================================================================

/// Import project CSV text, replacing all stored projects.
pub fn import_projects_csv<S: RecordStore<Project>>(store: &mut S, text: &str) -> PipelineResult<ImportReport> {
    log_info("Importing projects from CSV...");
    let mut ids = IdSequence::starting_now();
    let result = parse_projects(text, &mut ids)
        .map_err(PipelineError::from)
        .and_then(|batch| commit_batch(store, batch));
    log_failure("Project import", result)
}

/// Import planner CSV text, replacing all stored tasks.
pub fn import_tasks_csv<S: RecordStore<Task>>(store: &mut S, text: &str) -> PipelineResult<ImportReport> {
    log_info("Importing tasks from planner CSV...");
    let result = parse_tasks(text)
        .map_err(PipelineError::from)
        .and_then(|batch| commit_batch(store, batch));
    log_failure("Task import", result)
}

/// Import the first worksheet of a planner workbook.
pub fn import_tasks_workbook<S: RecordStore<Task>>(
    store: &mut S,
    reader: &dyn WorkbookReader,
    bytes: &[u8],
) -> PipelineResult<ImportReport> {
    log_info("Converting first worksheet to CSV...");
    let csv = log_failure("Task import", first_sheet_to_csv(reader, bytes))?;
    import_tasks_csv(store, &csv)
}

/// Import projects from a JSON export: `{"records": [...]}`, or the older
/// `{"projects": [...]}`. Invalid entries are skipped.
pub fn import_projects_json<S: RecordStore<Project>>(
    store: &mut S,
    input: impl Into<JsonBlob>,
) -> PipelineResult<ImportReport> {
    log_info("Importing projects from JSON...");
    let blob: JsonBlob = input.into();
    let result = blob
        .into_value()
        .and_then(|value| envelope_records(rename_legacy_records(value)))
        .map_err(PipelineError::from)
        .and_then(|entries| {
            let mut ids = IdSequence::starting_now();
            commit_decoded(store, decode_records::<Project>(entries, &mut ids))
        })
        .map(|restored| ImportReport::from_restore(restored.imported, restored.rejected));
    log_failure("Project import", result)
}

fn rename_legacy_records(value: Value) -> Value {
    match value {
        Value::Object(mut map) if !map.contains_key("records") => {
            if let Some(projects) = map.remove("projects") {
                map.insert("records".to_string(), projects);
            }
            Value::Object(map)
        }
        other => other,
    }
}

/// Read an import file (local path or URL) and import it by extension.
///
/// CSV bytes are decoded with encoding detection. Workbooks go through
/// `reader`. JSON files are treated as backups of the target collection.
pub async fn import_file<S>(
    store: &mut S,
    kind: RecordKind,
    location: &str,
    timeout: Duration,
    reader: &dyn WorkbookReader,
) -> PipelineResult<ImportReport>
where
    S: RecordStore<Project> + RecordStore<Task>,
{
    let source_kind = log_failure("Import", SourceKind::from_path(location))?;
    let bytes = log_failure("Import", read_source(location, timeout).await)?;

    match (source_kind, kind) {
        (SourceKind::Csv, _) => {
            let decoded = decode_bytes(&bytes);
            log_info(format!("Detected encoding: {}", decoded.encoding));
            let report = match kind {
                RecordKind::Projects => import_projects_csv(store, &decoded.text)?,
                RecordKind::Tasks => import_tasks_csv(store, &decoded.text)?,
            };
            Ok(report.with_encoding(decoded.encoding))
        }
        (SourceKind::Workbook, RecordKind::Tasks) => import_tasks_workbook(store, reader, &bytes),
        (SourceKind::Workbook, RecordKind::Projects) => {
            let csv = log_failure("Project import", first_sheet_to_csv(reader, &bytes))?;
            import_projects_csv(store, &csv)
        }
        (SourceKind::Json, RecordKind::Projects) => {
            import_projects_json(store, decode_bytes(&bytes).text)
        }
        (SourceKind::Json, RecordKind::Tasks) => {
            let report = restore_backup::<Task, S>(store, decode_bytes(&bytes).text)?;
            Ok(ImportReport::from_restore(report.imported, report.rejected))
        }
    }
}

// =============================================================================
// Exports
// =============================================================================

/// Stored projects as CSV text.
pub fn export_projects_csv<S: RecordStore<Project>>(store: &S) -> PipelineResult<String> {
    let projects = store.load()?;
    log_info(format!("Exporting {} projects", projects.len()));
    Ok(export_projects(&projects)?)
}

/// Stored tasks as planner CSV text.
pub fn export_tasks_csv<S: RecordStore<Task>>(store: &S) -> PipelineResult<String> {
    let tasks = store.load()?;
    log_info(format!("Exporting {} tasks", tasks.len()));
    Ok(export_tasks(&tasks)?)
}

// =============================================================================
// Maintenance
// =============================================================================

/// Drop stored projects that no longer pass validation. Returns how many
/// remain. The store is only written when something was removed.
///
/// Entries are read raw, so records that no longer deserialize as a
/// [`Project`] at all (unknown status, missing dates) are removed too.
pub fn cleanup_invalid_projects<S: RecordStore<Project>>(store: &mut S) -> PipelineResult<usize> {
    log_failure("Cleanup", prune_projects(store))
}

fn prune_projects<S: RecordStore<Project>>(store: &mut S) -> PipelineResult<usize> {
    let entries = RecordStore::<Project>::load_entries(store)?;

    let mut ids = IdSequence::starting_now();
    let decoded = decode_records::<Project>(entries, &mut ids);
    let remaining = decoded.records.len();

    if !decoded.rejected.is_empty() {
        for rejected in &decoded.rejected {
            log_warning_indent(
                format!("Removing record {}: {}", rejected.index, rejected.errors.join("; ")),
                1,
            );
        }
        store.replace(decoded.records)?;
        log_warning(format!("Cleaned up {} invalid projects", decoded.rejected.len()));
    }
    Ok(remaining)
}

/// Empty one stored collection.
pub fn reset<T, S>(store: &mut S) -> PipelineResult<()>
where
    T: StoredRecord,
    S: RecordStore<T>,
{
    store.replace(Vec::new())?;
    log_warning(format!("All {} cleared", T::KIND));
    Ok(())
}

/// Open the file store rooted at `dir`.
pub fn open_store(dir: impl AsRef<std::path::Path>) -> JsonFileStore {
    JsonFileStore::new(dir)
}
