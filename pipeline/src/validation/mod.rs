//! Project validation and JSON envelope checks.
//!
//! [`validate_project`] runs every field check on a [`ProjectDraft`] and
//! returns the human-readable violations; an empty list means the draft is
//! valid. Checks never short-circuit and the function has no side effects,
//! so callers decide whether to reject, skip or report.
//!
//! Backup and JSON import envelopes are checked against an embedded JSON
//! Schema (Draft 7) from `schemas/backup-envelope.json`.
//!
//! # Example
//!
//! ```rust,ignore
//! use rd_dashboard::{validate_project, ProjectDraft};
//!
//! let errors = validate_project(&ProjectDraft::default());
//! assert_eq!(errors.len(), 5);
//! ```

use serde_json::Value;

use crate::models::{parse_date, ProjectDraft, ProjectStatus, ProjectType};

const BACKUP_ENVELOPE_SCHEMA: &str = include_str!("../../schemas/backup-envelope.json");

/// Return every validation error of a project candidate, in check order.
pub fn validate_project(draft: &ProjectDraft) -> Vec<String> {
    let mut errors = Vec::new();

    if draft.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
        errors.push("Project name is required".to_string());
    }

    if draft.project_type.as_deref().and_then(ProjectType::from_code).is_none() {
        errors.push("Project type must be \"large\" or \"small\"".to_string());
    }

    if draft.status.as_deref().and_then(ProjectStatus::from_code).is_none() {
        errors.push("Project status must be \"active\", \"paused\", or \"completed\"".to_string());
    }

    let start = present(&draft.start_date);
    let end = present(&draft.end_date);

    match start {
        None => errors.push("Start date is required".to_string()),
        Some(s) if parse_date(s).is_none() => {
            errors.push(format!("Start date '{}' is not a valid date", s));
        }
        Some(_) => {}
    }

    match end {
        None => errors.push("End date is required".to_string()),
        Some(e) if parse_date(e).is_none() => {
            errors.push(format!("End date '{}' is not a valid date", e));
        }
        Some(_) => {}
    }

    if let (Some(start), Some(end)) = (start.and_then(parse_date), end.and_then(parse_date)) {
        if end <= start {
            errors.push("End date must be after start date".to_string());
        }
    }

    if let Some(progress) = draft.progress {
        if !(0..=100).contains(&progress) {
            errors.push("Progress must be between 0 and 100".to_string());
        }
    }

    errors
}

/// Quick check: true when [`validate_project`] reports nothing.
pub fn is_valid_project(draft: &ProjectDraft) -> bool {
    validate_project(draft).is_empty()
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` when valid
/// * `Err(Vec<String>)` with one message per violation
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check that a backup/import blob is an object carrying a `records` array.
pub fn validate_backup_envelope(data: &Value) -> Result<(), Vec<String>> {
    let schema: Value = serde_json::from_str(BACKUP_ENVELOPE_SCHEMA)
        .map_err(|e| vec![format!("Invalid embedded schema: {}", e)])?;
    validate(&schema, data)
}
