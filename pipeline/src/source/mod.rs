//! Raw input acquisition.
//!
//! Reads the bytes of an import file from a local path or an `http(s)` URL,
//! bounded by a timeout, and converts spreadsheet workbooks to CSV text
//! through an injected [`WorkbookReader`]. [`CalamineReader`] handles
//! `.xlsx` and `.xls` files.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use crate::error::{FormatError, PipelineResult, SourceError, SourceResult, WorkbookError};
use crate::logs::log_info;
use crate::parser::CsvError;

// =============================================================================
// Source kind
// =============================================================================

/// What an import file contains, judged by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    /// `.xlsx` or `.xls`
    Workbook,
    Json,
}

impl SourceKind {
    pub fn from_path(location: &str) -> SourceResult<Self> {
        // Ignore any URL query or fragment
        let path = location.split(|c: char| c == '?' || c == '#').next().unwrap_or(location);
        let extension = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(SourceKind::Csv),
            "xlsx" | "xls" => Ok(SourceKind::Workbook),
            "json" => Ok(SourceKind::Json),
            _ => Err(SourceError::UnsupportedFile(location.to_string())),
        }
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

// =============================================================================
// Reading
// =============================================================================

/// Read the full contents of `location`, giving up after `timeout`.
pub async fn read_source(location: &str, timeout: Duration) -> SourceResult<Vec<u8>> {
    log_info(format!("Reading {}", location));

    let read = async {
        if is_remote(location) {
            fetch_remote(location).await
        } else {
            tokio::fs::read(location).await.map_err(|source| SourceError::Io {
                location: location.to_string(),
                source,
            })
        }
    };

    tokio::time::timeout(timeout, read)
        .await
        .map_err(|_| SourceError::Timeout {
            location: location.to_string(),
            secs: timeout.as_secs(),
        })?
}

async fn fetch_remote(url: &str) -> SourceResult<Vec<u8>> {
    let http_error = |e: reqwest::Error| SourceError::Http {
        location: url.to_string(),
        message: e.to_string(),
    };

    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .map_err(http_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            location: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(http_error)?;
    Ok(body.to_vec())
}

// =============================================================================
// Workbooks
// =============================================================================

/// One worksheet as rows of cell text.
#[derive(Debug, Clone, PartialEq)]
pub struct Worksheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Worksheet {
    fn has_data(&self) -> bool {
        self.rows.iter().any(|row| row.iter().any(|cell| !cell.trim().is_empty()))
    }
}

/// Spreadsheet parsing collaborator.
pub trait WorkbookReader {
    /// All worksheets of the workbook, in workbook order.
    fn worksheets(&self, bytes: &[u8]) -> Result<Vec<Worksheet>, WorkbookError>;
}

/// Reader used when no spreadsheet support is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWorkbookSupport;

impl WorkbookReader for NoWorkbookSupport {
    fn worksheets(&self, _bytes: &[u8]) -> Result<Vec<Worksheet>, WorkbookError> {
        Err(WorkbookError::ReaderUnavailable)
    }
}

/// Workbook reader backed by calamine (xlsx, xlsm, xls, ods).
#[derive(Debug, Clone, Copy, Default)]
pub struct CalamineReader;

impl WorkbookReader for CalamineReader {
    fn worksheets(&self, bytes: &[u8]) -> Result<Vec<Worksheet>, WorkbookError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| WorkbookError::Unreadable(e.to_string()))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| WorkbookError::Unreadable(format!("sheet '{}': {}", name, e)))?;
            let rows = range
                .rows()
                .map(|row| row.iter().map(cell_text).collect())
                .collect();
            sheets.push(Worksheet { name, rows });
        }
        Ok(sheets)
    }
}

/// Cell value as the text a CSV export would carry. Date cells use the
/// planner's `MM/DD/YYYY`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%m/%d/%Y").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

/// Convert the first worksheet to CSV text.
pub fn first_sheet_to_csv(reader: &dyn WorkbookReader, bytes: &[u8]) -> PipelineResult<String> {
    let sheets = reader.worksheets(bytes)?;
    let sheet = sheets.into_iter().next().ok_or(FormatError::EmptyWorkbook)?;
    if !sheet.has_data() {
        return Err(FormatError::EmptyWorksheet(sheet.name).into());
    }

    Ok(rows_to_csv(&sheet.rows)?)
}

fn rows_to_csv(rows: &[Vec<String>]) -> Result<String, CsvError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for (idx, row) in rows.iter().enumerate() {
        writer
            .write_record(row)
            .map_err(|e| CsvError::new(idx + 1, e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::new(0, e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CsvError::new(0, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::parser::parse_table;
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct FixedWorkbook(Vec<Worksheet>);

    impl WorkbookReader for FixedWorkbook {
        fn worksheets(&self, _bytes: &[u8]) -> Result<Vec<Worksheet>, WorkbookError> {
            Ok(self.0.clone())
        }
    }

    fn sheet(name: &str, rows: &[&[&str]]) -> Worksheet {
        Worksheet {
            name: name.to_string(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_source_kind_by_extension() {
        assert_eq!(SourceKind::from_path("tasks.CSV").unwrap(), SourceKind::Csv);
        assert_eq!(SourceKind::from_path("plan.xls").unwrap(), SourceKind::Workbook);
        assert_eq!(
            SourceKind::from_path("https://host/export.xlsx?dl=1").unwrap(),
            SourceKind::Workbook
        );
        assert_eq!(SourceKind::from_path("backup.json").unwrap(), SourceKind::Json);

        let err = SourceKind::from_path("notes.txt").unwrap_err();
        assert!(err.to_string().contains("please use CSV, XLS, or XLSX files"));
    }

    #[tokio::test]
    async fn test_read_local_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "ID,Name\n1,Rig").unwrap();

        let location = file.path().to_string_lossy().to_string();
        let bytes = read_source(&location, Duration::from_secs(5)).await.unwrap();
        assert_eq!(bytes, b"ID,Name\n1,Rig");
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let err = read_source("/definitely/not/here.csv", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[test]
    fn test_first_sheet_only() {
        let reader = FixedWorkbook(vec![
            sheet("Tasks", &[&["Task ID", "Task Name"], &["1", "Mix, then cure"]]),
            sheet("Other", &[&["ignored"]]),
        ]);
        let csv = first_sheet_to_csv(&reader, b"").unwrap();
        assert_eq!(csv, "Task ID,Task Name\n1,\"Mix, then cure\"\n");

        let table = parse_table(&csv).unwrap();
        assert_eq!(table.rows[0].fields[1], "Mix, then cure");
    }

    #[test]
    fn test_empty_workbook_and_sheet() {
        let err = first_sheet_to_csv(&FixedWorkbook(vec![]), b"").unwrap_err();
        assert!(matches!(err, PipelineError::Format(FormatError::EmptyWorkbook)));

        let reader = FixedWorkbook(vec![sheet("Blank", &[&["", " "]])]);
        let err = first_sheet_to_csv(&reader, b"").unwrap_err();
        assert!(matches!(err, PipelineError::Format(FormatError::EmptyWorksheet(name)) if name == "Blank"));
    }

    #[test]
    fn test_calamine_reads_first_sheet() {
        let bytes = include_bytes!("../../fixtures/planner-export.xlsx");

        let sheets = CalamineReader.worksheets(bytes).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "Tasks");
        assert_eq!(sheets[0].rows[1][0], "101");
        assert_eq!(sheets[0].rows[1][8], "");

        let csv = first_sheet_to_csv(&CalamineReader, bytes).unwrap();
        let table = parse_table(&csv).unwrap();
        assert_eq!(table.headers[9], "Due Date");
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].fields[1], "Weld, then inspect");
    }

    #[test]
    fn test_calamine_rejects_garbage() {
        let err = CalamineReader.worksheets(b"not a spreadsheet").unwrap_err();
        assert!(matches!(err, WorkbookError::Unreadable(_)));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(40.0)), "40");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::String("Urgent".into())), "Urgent");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_no_workbook_support() {
        let err = first_sheet_to_csv(&NoWorkbookSupport, b"PK").unwrap_err();
        assert!(matches!(err, PipelineError::Workbook(WorkbookError::ReaderUnavailable)));
    }
}
