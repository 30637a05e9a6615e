//! Project CSV layout.
//!
//! ```text
//! ID, Name, Description, Project Type, Status, Start Date, End Date,
//! Progress(%), Team Members, Notes,
//! Milestone 1 Name, Milestone 1 Due Date, Milestone 1 Completed,
//! ...
//! Milestone 5 Name, Milestone 5 Due Date, Milestone 5 Completed
//! ```
//!
//! Milestones occupy five fixed slots of three columns each. Empty slots are
//! written as three empty fields and only slots with a name are read back.

use crate::error::FormatResult;
use crate::logs::log_warning;
use crate::models::{format_date, IdSequence, MilestoneDraft, Project, ProjectDraft};
use crate::parser::{parse_table, CsvError};
use crate::sanitize::sanitize_project;
use crate::validation::validate_project;

use super::layout::{
    coerce_cell, field, join_list, optional_field, split_list, verify_headers, write_quoted_table,
    ImportBatch, RowOutcome,
};

/// Number of fixed milestone slots.
pub const MILESTONE_SLOTS: usize = 5;

/// Columns before the milestone slots; also the minimum row width.
pub const BASE_COLUMNS: usize = 10;

/// Full header row.
pub const PROJECT_HEADERS: [&str; BASE_COLUMNS + MILESTONE_SLOTS * 3] = [
    "ID",
    "Name",
    "Description",
    "Project Type",
    "Status",
    "Start Date",
    "End Date",
    "Progress(%)",
    "Team Members",
    "Notes",
    "Milestone 1 Name",
    "Milestone 1 Due Date",
    "Milestone 1 Completed",
    "Milestone 2 Name",
    "Milestone 2 Due Date",
    "Milestone 2 Completed",
    "Milestone 3 Name",
    "Milestone 3 Due Date",
    "Milestone 3 Completed",
    "Milestone 4 Name",
    "Milestone 4 Due Date",
    "Milestone 4 Completed",
    "Milestone 5 Name",
    "Milestone 5 Due Date",
    "Milestone 5 Completed",
];

/// Serialize projects to CSV text.
pub fn export_projects(projects: &[Project]) -> Result<String, CsvError> {
    for project in projects.iter().filter(|p| p.milestones.len() > MILESTONE_SLOTS) {
        log_warning(format!(
            "Project '{}' has {} milestones, only the first {} are exported",
            project.name,
            project.milestones.len(),
            MILESTONE_SLOTS
        ));
    }
    write_quoted_table(&PROJECT_HEADERS, projects.iter().map(project_to_row))
}

/// One CSV row for a project.
pub fn project_to_row(project: &Project) -> Vec<String> {
    let mut row = vec![
        project.id.to_string(),
        project.name.clone(),
        project.description.clone(),
        project.project_type.as_str().to_string(),
        project.status.as_str().to_string(),
        format_date(project.start_date),
        format_date(project.end_date),
        project.progress.to_string(),
        join_list(&project.team_members),
        project.notes.clone(),
    ];

    for slot in 0..MILESTONE_SLOTS {
        match project.milestones.get(slot) {
            Some(m) => {
                row.push(m.name.clone());
                row.push(m.due_date.map(format_date).unwrap_or_default());
                row.push(if m.completed { "Yes" } else { "No" }.to_string());
            }
            None => row.extend([String::new(), String::new(), String::new()]),
        }
    }

    row
}

/// Read a data row into an unvalidated draft.
///
/// Rows narrower than [`BASE_COLUMNS`] are skipped. Numbers are coerced on
/// a best-effort basis: a bad id is left out (the project gets a fresh one
/// when it is built), a bad progress becomes 0.
pub fn row_to_draft(line: usize, fields: &[String]) -> RowOutcome<ProjectDraft> {
    if fields.len() < BASE_COLUMNS {
        return RowOutcome::skipped(
            line,
            format!("expected at least {} columns, found {}", BASE_COLUMNS, fields.len()),
        );
    }

    let milestones = (0..MILESTONE_SLOTS)
        .filter_map(|slot| {
            let base = BASE_COLUMNS + slot * 3;
            let name = optional_field(fields, base)?;
            Some(MilestoneDraft {
                name: Some(name),
                due_date: optional_field(fields, base + 1),
                completed: Some(is_yes(&field(fields, base + 2))),
            })
        })
        .collect();

    RowOutcome::Mapped(ProjectDraft {
        id: coerce_cell(line, PROJECT_HEADERS[0], &fields[0]),
        name: Some(field(fields, 1)),
        description: Some(field(fields, 2)),
        project_type: optional_field(fields, 3).map(|t| t.to_lowercase()),
        status: optional_field(fields, 4).map(|s| s.to_lowercase()),
        start_date: optional_field(fields, 5),
        end_date: optional_field(fields, 6),
        progress: Some(coerce_cell(line, PROJECT_HEADERS[7], &fields[7]).unwrap_or(0)),
        team_members: Some(split_list(&fields[8])),
        milestones: Some(milestones),
        notes: Some(field(fields, 9)),
        created_at: None,
    })
}

fn is_yes(cell: &str) -> bool {
    matches!(cell.trim().to_lowercase().as_str(), "yes" | "y" | "true" | "1")
}

/// Parse project CSV text: verify the header, then map, validate and
/// sanitize every row. Invalid rows are skipped, never fatal.
pub fn parse_projects(text: &str, ids: &mut IdSequence) -> FormatResult<ImportBatch<Project>> {
    let table = parse_table(text)?;
    verify_headers(&table.headers, &PROJECT_HEADERS)?;

    let batch = table
        .rows
        .iter()
        .map(|row| match row_to_draft(row.line, &row.fields) {
            RowOutcome::Mapped(draft) => {
                let errors = validate_project(&draft);
                if !errors.is_empty() {
                    return RowOutcome::skipped(row.line, errors.join("; "));
                }
                match sanitize_project(&draft).into_project(ids) {
                    Ok(project) => RowOutcome::Mapped(project),
                    Err(errors) => RowOutcome::skipped(row.line, errors.join("; ")),
                }
            }
            RowOutcome::Skipped(skip) => RowOutcome::Skipped(skip),
        })
        .collect();

    Ok(batch)
}
