//! Error types for the dashboard data pipeline.
//!
//! Fatal errors are grouped by layer:
//!
//! - [`FormatError`] - structurally malformed input (headers, envelopes, workbooks)
//! - [`StoreError`] - the persistence collaborator failed
//! - [`SourceError`] - reading or fetching the raw input failed
//! - [`WorkbookError`] - the spreadsheet collaborator failed
//! - [`ConfigError`] - invalid environment configuration
//! - [`PipelineError`] - top-level import/restore errors
//!
//! Row-level problems and validation failures are not errors here: they are
//! collected as [`crate::transform::SkippedRow`] and
//! [`crate::backup::RejectedRecord`] values while the import continues.

use thiserror::Error;

use crate::parser::CsvError;

// =============================================================================
// Format Errors
// =============================================================================

/// Whole-file structural problems. Fatal to the current operation.
#[derive(Debug, Error)]
pub enum FormatError {
    /// No header row.
    #[error("CSV file is empty")]
    EmptyFile,

    /// A project header cell does not match the expected layout.
    #[error("Invalid CSV header at column {position}: expected '{expected}', found '{found}'")]
    HeaderMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    /// The header does not look like a planner export.
    #[error(
        "File does not look like a planner export: column {position} should be '{expected}', found '{found}'"
    )]
    NotPlannerExport {
        position: usize,
        expected: String,
        found: String,
    },

    /// Backup or JSON import envelope without a usable `records` array.
    #[error("Invalid backup: records array not found ({0})")]
    InvalidEnvelope(String),

    /// Malformed JSON text.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Workbook without any worksheet.
    #[error("Excel file contains no worksheets")]
    EmptyWorkbook,

    /// First worksheet has no data.
    #[error("The first worksheet '{0}' in the Excel file is empty")]
    EmptyWorksheet(String),

    /// Worksheet rows could not be converted to CSV text.
    #[error("Worksheet conversion failed: {0}")]
    Csv(#[from] CsvError),
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from the record store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing file could not be read or written.
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored blob is not valid JSON for the collection.
    #[error("Store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Source Errors
// =============================================================================

/// Errors while reading raw input bytes.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Local file could not be read.
    #[error("Failed to read '{location}': {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// HTTP request failed.
    #[error("Failed to fetch '{location}': {message}")]
    Http { location: String, message: String },

    /// Non-success HTTP status.
    #[error("Fetching '{location}' returned HTTP {status}")]
    Status { location: String, status: u16 },

    /// Read did not finish in time.
    #[error("Reading '{location}' timed out after {secs}s")]
    Timeout { location: String, secs: u64 },

    /// File extension is not supported.
    #[error("Unsupported file '{0}': please use CSV, XLS, or XLSX files for import")]
    UnsupportedFile(String),
}

// =============================================================================
// Workbook Errors
// =============================================================================

/// Errors from the spreadsheet collaborator.
#[derive(Debug, Error)]
pub enum WorkbookError {
    /// No spreadsheet reader is available in this build.
    #[error("Excel parsing is not available: export the first worksheet as CSV instead")]
    ReaderUnavailable,

    /// The reader could not parse the workbook bytes.
    #[error("Unreadable workbook: {0}")]
    Unreadable(String),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level error of an import, restore or export operation.
///
/// Whenever one of these is returned the store has not been written.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Excel import failed: {0}")]
    Workbook(#[from] WorkbookError),

    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Every candidate record was skipped.
    #[error("No valid {kind} found ({skipped} skipped)")]
    NoValidRecords { kind: &'static str, skipped: usize },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for format checks.
pub type FormatResult<T> = Result<T, FormatError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for source reads.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let format_err = FormatError::EmptyFile;
        let pipeline_err: PipelineError = format_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only data dir");
        let pipeline_err: PipelineError = StoreError::from(io).into();
        assert!(pipeline_err.to_string().contains("read-only data dir"));
    }

    #[test]
    fn test_header_mismatch_names_both_sides() {
        let err = FormatError::HeaderMismatch {
            position: 3,
            expected: "Description".into(),
            found: "Summary".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("column 3"));
        assert!(msg.contains("'Description'"));
        assert!(msg.contains("'Summary'"));
    }

    #[test]
    fn test_no_valid_records_message() {
        let err = PipelineError::NoValidRecords {
            kind: "tasks",
            skipped: 4,
        };
        assert_eq!(err.to_string(), "No valid tasks found (4 skipped)");
    }
}
