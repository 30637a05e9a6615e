//! Shared pieces of the fixed column layouts.
//!
//! Header checks, per-row outcomes, list/number coercion and the
//! always-quoted CSV writer used by both record schemas.

use serde::Serialize;

use crate::error::{FormatError, FormatResult};
use crate::logs::log_warning_indent;
use crate::parser::CsvError;

/// A data row that was not imported
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    /// Line the row starts on
    pub line: usize,
    pub reason: String,
}

/// Outcome of mapping one row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome<T> {
    Mapped(T),
    Skipped(SkippedRow),
}

impl<T> RowOutcome<T> {
    pub fn skipped(line: usize, reason: impl Into<String>) -> Self {
        RowOutcome::Skipped(SkippedRow {
            line,
            reason: reason.into(),
        })
    }
}

/// Records mapped from a table, plus the rows that were skipped
#[derive(Debug, Clone)]
pub struct ImportBatch<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkippedRow>,
}

impl<T> ImportBatch<T> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: RowOutcome<T>) {
        match outcome {
            RowOutcome::Mapped(record) => self.records.push(record),
            RowOutcome::Skipped(skip) => self.skipped.push(skip),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Imported: {} records, {} skipped",
            self.records.len(),
            self.skipped.len()
        )
    }
}

impl<T> Default for ImportBatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<RowOutcome<T>> for ImportBatch<T> {
    fn from_iter<I: IntoIterator<Item = RowOutcome<T>>>(iter: I) -> Self {
        let mut batch = ImportBatch::new();
        for outcome in iter {
            batch.push(outcome);
        }
        batch
    }
}

/// Require every expected header at its position (case-insensitive).
/// Extra trailing columns are allowed.
pub fn verify_headers(found: &[String], expected: &[&str]) -> FormatResult<()> {
    for (idx, expected_name) in expected.iter().enumerate() {
        let found_name = found.get(idx).map(|h| h.trim()).unwrap_or("");
        if !found_name.eq_ignore_ascii_case(expected_name) {
            return Err(FormatError::HeaderMismatch {
                position: idx + 1,
                expected: expected_name.to_string(),
                found: display_header(found_name),
            });
        }
    }
    Ok(())
}

/// Require the first `required` header cells to contain the expected names,
/// in order (case-insensitive).
pub fn verify_header_prefix(found: &[String], expected: &[&str], required: usize) -> FormatResult<()> {
    for (idx, expected_name) in expected.iter().take(required).enumerate() {
        let found_name = found.get(idx).map(|h| h.trim()).unwrap_or("");
        if !found_name.to_lowercase().contains(&expected_name.to_lowercase()) {
            return Err(FormatError::NotPlannerExport {
                position: idx + 1,
                expected: expected_name.to_string(),
                found: display_header(found_name),
            });
        }
    }
    Ok(())
}

fn display_header(found: &str) -> String {
    if found.is_empty() {
        "<missing>".to_string()
    } else {
        found.to_string()
    }
}

/// Field at `idx`, empty when the row is short.
pub fn field(fields: &[String], idx: usize) -> String {
    fields.get(idx).cloned().unwrap_or_default()
}

/// Field at `idx` as `Some` when non-empty.
pub fn optional_field(fields: &[String], idx: usize) -> Option<String> {
    fields.get(idx).filter(|f| !f.is_empty()).cloned()
}

/// Join a list for a single CSV cell.
pub fn join_list(items: &[String]) -> String {
    items.join("; ")
}

/// Split a `;`-delimited cell, trimming and dropping empty entries.
pub fn split_list(cell: &str) -> Vec<String> {
    cell.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Best-effort integer: the leading signed digits of the cell, if any.
///
/// `"40"` and `"40%"` give 40, `"abc"` gives `None`.
pub fn coerce_int(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    if let Ok(n) = cell.parse::<i64>() {
        return Some(n);
    }

    let (sign, digits) = match cell.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, cell.strip_prefix('+').unwrap_or(cell)),
    };
    let leading: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
    leading.parse::<i64>().ok().map(|n| sign * n)
}

/// [`coerce_int`] for a named data cell. A non-empty cell that holds no
/// number is reported as a warning naming the line, column and value.
pub fn coerce_cell(line: usize, column: &str, cell: &str) -> Option<i64> {
    let coerced = coerce_int(cell);
    if coerced.is_none() && !cell.trim().is_empty() {
        let notice = CsvError::new(line, "not a number, using the default")
            .with_column(column)
            .with_value(cell.trim());
        log_warning_indent(notice.to_string(), 1);
    }
    coerced
}

/// `"true"` (any case) is true, everything else false.
pub fn parse_flag(cell: &str) -> bool {
    cell.trim().eq_ignore_ascii_case("true")
}

/// Write a header and rows as CSV: every field quoted, quotes doubled,
/// rows joined with `\n` and no trailing newline.
pub fn write_quoted_table<I>(headers: &[&str], rows: I) -> Result<String, CsvError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(headers)
        .map_err(|e| CsvError::new(1, e.to_string()))?;

    for (idx, row) in rows.into_iter().enumerate() {
        writer
            .write_record(&row)
            .map_err(|e| CsvError::new(idx + 2, e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::new(0, e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|e| CsvError::new(0, e.to_string()))?;

    Ok(text.trim_end_matches('\n').to_string())
}
