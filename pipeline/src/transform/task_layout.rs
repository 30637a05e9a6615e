//! Planner task CSV layout.
//!
//! The column order is the planner's own export order, so a file exported
//! here can be opened next to a planner export without remapping.

use crate::error::FormatResult;
use crate::models::Task;
use crate::parser::{parse_table, CsvError};

use super::layout::{
    coerce_cell, field, join_list, parse_flag, split_list, verify_header_prefix, write_quoted_table,
    ImportBatch, RowOutcome,
};

/// Planner export header row.
pub const TASK_HEADERS: [&str; 18] = [
    "Task ID",
    "Task Name",
    "Bucket Name",
    "Progress",
    "Priority",
    "Assigned To",
    "Created By",
    "Created Date",
    "Start Date",
    "Due Date",
    "Is Recurring",
    "Late",
    "Completed Date",
    "Completed By",
    "Completed Checklist Items",
    "Checklist Items",
    "Labels",
    "Description",
];

/// Header columns that must be present for a file to count as a planner
/// export; also the minimum data row width.
pub const REQUIRED_TASK_COLUMNS: usize = 10;

/// Serialize tasks to CSV text.
pub fn export_tasks(tasks: &[Task]) -> Result<String, CsvError> {
    write_quoted_table(&TASK_HEADERS, tasks.iter().map(task_to_row))
}

/// One CSV row for a task.
pub fn task_to_row(task: &Task) -> Vec<String> {
    vec![
        task.task_id.clone(),
        task.task_name.clone(),
        task.bucket_name.clone(),
        task.progress.clone(),
        task.priority.clone(),
        task.assigned_to.clone(),
        task.created_by.clone(),
        task.created_date.clone(),
        task.start_date.clone(),
        task.due_date.clone(),
        task.is_recurring.to_string(),
        task.late.to_string(),
        task.completed_date.clone(),
        task.completed_by.clone(),
        task.completed_checklist_items.to_string(),
        join_list(&task.checklist_items),
        join_list(&task.labels),
        task.description.clone(),
    ]
}

/// Map one data row. Rows that are too narrow or have no task name are skipped.
pub fn row_to_task(line: usize, fields: &[String]) -> RowOutcome<Task> {
    if fields.len() < REQUIRED_TASK_COLUMNS {
        return RowOutcome::skipped(
            line,
            format!(
                "expected at least {} columns, found {}",
                REQUIRED_TASK_COLUMNS,
                fields.len()
            ),
        );
    }

    let task_name = field(fields, 1);
    if task_name.is_empty() {
        return RowOutcome::skipped(line, "missing Task Name");
    }

    RowOutcome::Mapped(Task {
        task_id: field(fields, 0),
        task_name,
        bucket_name: field(fields, 2),
        progress: field(fields, 3),
        priority: field(fields, 4),
        assigned_to: field(fields, 5),
        created_by: field(fields, 6),
        created_date: field(fields, 7),
        start_date: field(fields, 8),
        due_date: field(fields, 9),
        is_recurring: parse_flag(&field(fields, 10)),
        late: parse_flag(&field(fields, 11)),
        completed_date: field(fields, 12),
        completed_by: field(fields, 13),
        completed_checklist_items: coerce_cell(line, TASK_HEADERS[14], &field(fields, 14))
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
        checklist_items: split_list(&field(fields, 15)),
        labels: split_list(&field(fields, 16)),
        description: field(fields, 17),
    })
}

/// Parse planner CSV text into tasks.
pub fn parse_tasks(text: &str) -> FormatResult<ImportBatch<Task>> {
    let table = parse_table(text)?;
    verify_header_prefix(&table.headers, &TASK_HEADERS, REQUIRED_TASK_COLUMNS)?;

    Ok(table
        .rows
        .iter()
        .map(|row| row_to_task(row.line, &row.fields))
        .collect())
}
