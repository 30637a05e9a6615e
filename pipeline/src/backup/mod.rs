//! Backup envelope codec.
//!
//! A backup wraps one full collection:
//!
//! ```json
//! {
//!   "records": [ ... ],
//!   "exportDate": "2025-03-10T09:00:00.000Z",
//!   "version": "1.0",
//!   "totalCount": 2,
//!   "metadata": { "capturedAt": 1741597200000 }
//! }
//! ```
//!
//! Restoring validates every record on its own, keeps the valid ones and
//! replaces the stored collection with them. The store is not touched when
//! the envelope is malformed or no record survives.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FormatError, FormatResult, PipelineError, PipelineResult};
use crate::logs::{log_failure, log_info, log_success, log_warning, log_warning_indent};
use crate::models::{IdSequence, Project, ProjectDraft, Task};
use crate::sanitize::sanitize_project;
use crate::store::{RecordStore, StoredRecord};
use crate::validation::{validate_backup_envelope, validate_project};

/// Envelope format version written by [`create_backup`].
pub const BACKUP_VERSION: &str = "1.0";

// =============================================================================
// Envelope
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    /// Epoch milliseconds at creation
    pub captured_at: i64,
}

/// A full collection plus export metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup<T> {
    pub records: Vec<T>,
    /// ISO-8601 creation time
    pub export_date: String,
    pub version: String,
    pub total_count: usize,
    pub metadata: BackupMetadata,
}

impl<T: Serialize> Backup<T> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Wrap a collection in a backup envelope stamped with the current time.
pub fn create_backup<T: Clone>(records: &[T]) -> Backup<T> {
    create_backup_at(records, Utc::now())
}

pub fn create_backup_at<T: Clone>(records: &[T], now: DateTime<Utc>) -> Backup<T> {
    Backup {
        records: records.to_vec(),
        export_date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        version: BACKUP_VERSION.to_string(),
        total_count: records.len(),
        metadata: BackupMetadata {
            captured_at: now.timestamp_millis(),
        },
    }
}

/// Back up whatever the store currently holds.
pub fn backup_store<T, S>(store: &S) -> PipelineResult<Backup<T>>
where
    T: StoredRecord,
    S: RecordStore<T>,
{
    let records = store.load()?;
    log_info(format!("Backing up {} {}", records.len(), T::KIND));
    Ok(create_backup(&records))
}

// =============================================================================
// Restore
// =============================================================================

/// Restore input: raw JSON text or an already parsed value.
#[derive(Debug, Clone)]
pub enum JsonBlob {
    Text(String),
    Value(Value),
}

impl From<String> for JsonBlob {
    fn from(text: String) -> Self {
        JsonBlob::Text(text)
    }
}

impl From<&str> for JsonBlob {
    fn from(text: &str) -> Self {
        JsonBlob::Text(text.to_string())
    }
}

impl From<Value> for JsonBlob {
    fn from(value: Value) -> Self {
        JsonBlob::Value(value)
    }
}

impl JsonBlob {
    pub fn into_value(self) -> FormatResult<Value> {
        match self {
            JsonBlob::Text(text) => Ok(serde_json::from_str(&text)?),
            JsonBlob::Value(value) => Ok(value),
        }
    }
}

/// A record that can be rebuilt from an untrusted JSON value.
pub trait BackupRecord: StoredRecord {
    /// Validate and build one record, or return why it was rejected.
    fn from_backup_value(value: Value, ids: &mut IdSequence) -> Result<Self, Vec<String>>;
}

impl BackupRecord for Project {
    fn from_backup_value(value: Value, ids: &mut IdSequence) -> Result<Self, Vec<String>> {
        let draft: ProjectDraft =
            serde_json::from_value(value).map_err(|e| vec![format!("Unreadable project: {}", e)])?;

        let errors = validate_project(&draft);
        if !errors.is_empty() {
            return Err(errors);
        }
        sanitize_project(&draft).into_project(ids)
    }
}

impl BackupRecord for Task {
    fn from_backup_value(value: Value, _ids: &mut IdSequence) -> Result<Self, Vec<String>> {
        let task: Task =
            serde_json::from_value(value).map_err(|e| vec![format!("Unreadable task: {}", e)])?;

        if task.task_name.trim().is_empty() {
            return Err(vec!["Task name is required".to_string()]);
        }
        Ok(task)
    }
}

/// A backup entry that failed validation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRecord {
    /// Position in the `records` array
    pub index: usize,
    pub errors: Vec<String>,
}

/// Valid and rejected entries of a decoded envelope
#[derive(Debug, Clone)]
pub struct DecodedRecords<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RejectedRecord>,
}

/// Outcome of a successful restore
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub imported: usize,
    pub skipped: usize,
    pub rejected: Vec<RejectedRecord>,
}

impl RestoreReport {
    pub fn summary(&self) -> String {
        format!("Imported: {} records, {} skipped", self.imported, self.skipped)
    }
}

/// Extract the `records` array of an envelope after checking its shape.
pub fn envelope_records(value: Value) -> FormatResult<Vec<Value>> {
    validate_backup_envelope(&value).map_err(|errors| FormatError::InvalidEnvelope(errors.join("; ")))?;

    match value {
        Value::Object(mut map) => match map.remove("records") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(FormatError::InvalidEnvelope("records is not an array".to_string())),
        },
        _ => Err(FormatError::InvalidEnvelope("expected a JSON object".to_string())),
    }
}

/// Validate every entry of an envelope independently.
pub fn decode_records<T: BackupRecord>(entries: Vec<Value>, ids: &mut IdSequence) -> DecodedRecords<T> {
    let mut decoded = DecodedRecords {
        records: Vec::new(),
        rejected: Vec::new(),
    };

    for (index, entry) in entries.into_iter().enumerate() {
        match T::from_backup_value(entry, ids) {
            Ok(record) => decoded.records.push(record),
            Err(errors) => decoded.rejected.push(RejectedRecord { index, errors }),
        }
    }

    decoded
}

/// Parse an envelope and validate its records. Does not touch any store.
pub fn decode_backup<T: BackupRecord>(
    input: impl Into<JsonBlob>,
    ids: &mut IdSequence,
) -> FormatResult<DecodedRecords<T>> {
    let blob: JsonBlob = input.into();
    let entries = envelope_records(blob.into_value()?)?;
    Ok(decode_records(entries, ids))
}

/// Restore a backup into `store`, replacing the whole collection with the
/// valid records.
///
/// Fails without writing when the envelope is malformed or when no record
/// is valid.
pub fn restore_backup<T, S>(store: &mut S, input: impl Into<JsonBlob>) -> PipelineResult<RestoreReport>
where
    T: BackupRecord,
    S: RecordStore<T>,
{
    let mut ids = IdSequence::starting_now();
    let result = decode_backup::<T>(input, &mut ids)
        .map_err(PipelineError::from)
        .and_then(|decoded| commit_decoded(store, decoded));
    log_failure("Restore", result)
}

/// Replace the stored collection with the decoded records.
pub(crate) fn commit_decoded<T, S>(store: &mut S, decoded: DecodedRecords<T>) -> PipelineResult<RestoreReport>
where
    T: StoredRecord,
    S: RecordStore<T>,
{
    for rejected in &decoded.rejected {
        log_warning_indent(
            format!("Record {} skipped: {}", rejected.index, rejected.errors.join("; ")),
            1,
        );
    }

    if decoded.records.is_empty() {
        log_warning(format!("No valid {} in backup", T::KIND));
        return Err(PipelineError::NoValidRecords {
            kind: T::KIND,
            skipped: decoded.rejected.len(),
        });
    }

    let report = RestoreReport {
        imported: decoded.records.len(),
        skipped: decoded.rejected.len(),
        rejected: decoded.rejected,
    };
    store.replace(decoded.records)?;

    log_success(format!("Restored {}: {}", T::KIND, report.summary()));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn project_json(name: &str) -> Value {
        json!({
            "id": 42,
            "name": name,
            "projectType": "large",
            "status": "active",
            "startDate": "2024-01-01",
            "endDate": "2024-06-30",
            "progress": 40,
            "teamMembers": [" Ana ", ""],
        })
    }

    #[test]
    fn test_create_backup_envelope() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let backup = create_backup_at(&[1, 2, 3], now);

        assert_eq!(backup.version, "1.0");
        assert_eq!(backup.total_count, 3);
        assert_eq!(backup.export_date, "2025-03-10T09:00:00.000Z");
        assert_eq!(backup.metadata.captured_at, now.timestamp_millis());

        let value: Value = serde_json::from_str(&backup.to_json().unwrap()).unwrap();
        assert_eq!(value["totalCount"], 3);
        assert!(value["metadata"]["capturedAt"].is_i64());
    }

    #[test]
    fn test_restore_keeps_valid_records() {
        let mut store: MemoryStore<Project> = MemoryStore::new();
        let blob = json!({ "records": [project_json("Rig"), { "name": "" }, 7] });

        let report = restore_backup(&mut store, blob).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.rejected[0].index, 1);
        assert_eq!(report.rejected[1].index, 2);

        let stored = store.records();
        assert_eq!(stored[0].id, 42);
        assert_eq!(stored[0].team_members, vec!["Ana"]);
    }

    #[test]
    fn test_restore_gives_duplicate_ids_fresh_ones() {
        let mut store: MemoryStore<Project> = MemoryStore::new();
        let mut second = project_json("Cell");
        second["progress"] = json!("55");
        let blob = json!({ "records": [project_json("Rig"), second] });

        let report = restore_backup(&mut store, blob).unwrap();
        assert_eq!(report.imported, 2);

        let stored = store.records();
        assert_eq!(stored[0].id, 42);
        assert_ne!(stored[1].id, 42);
        assert_eq!(stored[1].progress, 55);
    }

    #[test]
    fn test_restore_accepts_text() {
        let mut store: MemoryStore<Project> = MemoryStore::new();
        let text = json!({ "records": [project_json("Rig")], "version": "1.0" }).to_string();
        let report = restore_backup(&mut store, text.as_str()).unwrap();
        assert_eq!(report.summary(), "Imported: 1 records, 0 skipped");
    }

    #[test]
    fn test_restore_rejects_all_invalid() {
        let mut store = MemoryStore::with_records(vec![Task {
            task_id: "keep".into(),
            task_name: "Keep me".into(),
            ..Default::default()
        }]);

        let err = restore_backup::<Task, _>(&mut store, json!({ "records": [{}] })).unwrap_err();
        assert!(matches!(err, PipelineError::NoValidRecords { skipped: 1, .. }));
        assert_eq!(store.records().len(), 1);
    }

    #[test]
    fn test_empty_project_record_fails_with_zero_valid() {
        let mut store: MemoryStore<Project> = MemoryStore::new();
        let err = restore_backup(&mut store, json!({ "records": [{}] })).unwrap_err();
        assert_eq!(err.to_string(), "No valid projects found (1 skipped)");
    }

    #[test]
    fn test_missing_records_is_format_error() {
        let mut store: MemoryStore<Project> = MemoryStore::new();
        for blob in [json!({ "projects": [] }), json!([1, 2]), json!({ "records": "x" })] {
            let err = restore_backup(&mut store, blob).unwrap_err();
            assert!(matches!(err, PipelineError::Format(FormatError::InvalidEnvelope(_))));
        }

        let err = restore_backup(&mut store, "{ not json").unwrap_err();
        assert!(matches!(err, PipelineError::Format(FormatError::Json(_))));
    }

    #[test]
    fn test_backup_then_restore_tasks() {
        let tasks = vec![Task {
            task_id: "t1".into(),
            task_name: "Calibrate".into(),
            labels: vec!["Lab".into()],
            ..Default::default()
        }];
        let source = MemoryStore::with_records(tasks.clone());
        let json = backup_store(&source).unwrap().to_json().unwrap();

        let mut target: MemoryStore<Task> = MemoryStore::new();
        let report = restore_backup(&mut target, json).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(target.records(), tasks.as_slice());
    }
}
