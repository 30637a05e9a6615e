//! Domain models for the dashboard pipeline.
//!
//! Two record schemas live side by side and are never converted into each
//! other:
//!
//! - [`Project`] - internally managed R&D projects with milestones
//! - [`Task`] - rows of an external planner export
//!
//! Loosely-typed project input (form submissions, JSON imports, backup
//! entries) is first read into a [`ProjectDraft`], validated and sanitized,
//! and only then turned into a [`Project`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;

// =============================================================================
// Project Type & Status
// =============================================================================

/// Size category of a project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Large,
    Small,
}

impl ProjectType {
    /// Parse the stored code (`large` / `small`), exact match.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "large" => Some(Self::Large),
            "small" => Some(Self::Small),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Large => "large",
            Self::Small => "small",
        }
    }
}

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Paused,
    Completed,
}

impl ProjectStatus {
    /// Parse the stored code (`active` / `paused` / `completed`), exact match.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

// =============================================================================
// Project
// =============================================================================

/// A project milestone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub name: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
}

/// A validated R&D project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub project_type: ProjectType,
    pub status: ProjectStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub progress: u8,
    #[serde(default)]
    pub team_members: Vec<String>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Milestone as it arrives from a form, CSV slot or JSON blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

/// Unvalidated project candidate. Every field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDraft {
    #[serde(default, deserialize_with = "lenient_int")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub progress: Option<i64>,
    #[serde(default)]
    pub team_members: Option<Vec<String>>,
    #[serde(default)]
    pub milestones: Option<Vec<MilestoneDraft>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ProjectDraft {
    /// Build a [`Project`] from a draft that passed validation.
    ///
    /// Returns the validation errors when the draft is not valid. A missing
    /// id is taken from `ids`, a missing progress becomes 0.
    pub fn into_project(self, ids: &mut IdSequence) -> Result<Project, Vec<String>> {
        let errors = crate::validation::validate_project(&self);
        if !errors.is_empty() {
            return Err(errors);
        }

        let project_type = self.project_type.as_deref().and_then(ProjectType::from_code);
        let status = self.status.as_deref().and_then(ProjectStatus::from_code);
        let start_date = self.start_date.as_deref().and_then(parse_date);
        let end_date = self.end_date.as_deref().and_then(parse_date);

        let (Some(project_type), Some(status), Some(start_date), Some(end_date)) =
            (project_type, status, start_date, end_date)
        else {
            return Err(vec!["Project is missing required fields".to_string()]);
        };

        let milestones = self
            .milestones
            .unwrap_or_default()
            .into_iter()
            .map(|m| Milestone {
                name: m.name.unwrap_or_default(),
                due_date: m.due_date.as_deref().and_then(parse_date),
                completed: m.completed.unwrap_or(false),
            })
            .collect();

        Ok(Project {
            id: ids.claim(self.id),
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            project_type,
            status,
            start_date,
            end_date,
            progress: self.progress.unwrap_or(0).clamp(0, 100) as u8,
            team_members: self.team_members.unwrap_or_default(),
            milestones,
            notes: self.notes.unwrap_or_default(),
            created_at: self.created_at,
        })
    }

    /// Build a project from a form submission: stamps `createdAt` and assigns
    /// an id when absent.
    pub fn submit(mut self, ids: &mut IdSequence, now: DateTime<Utc>) -> Result<Project, Vec<String>> {
        self.created_at.get_or_insert(now);
        crate::sanitize::sanitize_project(&self).into_project(ids)
    }
}

impl From<&Project> for ProjectDraft {
    fn from(project: &Project) -> Self {
        Self {
            id: Some(project.id),
            name: Some(project.name.clone()),
            description: Some(project.description.clone()),
            project_type: Some(project.project_type.as_str().to_string()),
            status: Some(project.status.as_str().to_string()),
            start_date: Some(format_date(project.start_date)),
            end_date: Some(format_date(project.end_date)),
            progress: Some(i64::from(project.progress)),
            team_members: Some(project.team_members.clone()),
            milestones: Some(
                project
                    .milestones
                    .iter()
                    .map(|m| MilestoneDraft {
                        name: Some(m.name.clone()),
                        due_date: m.due_date.map(format_date),
                        completed: Some(m.completed),
                    })
                    .collect(),
            ),
            notes: Some(project.notes.clone()),
            created_at: project.created_at,
        }
    }
}

// =============================================================================
// Project IDs
// =============================================================================

/// Monotonic id source for new and imported projects.
///
/// Seeded from the current epoch milliseconds so ids stay time-derived.
/// Remembers every id it has handed out, so one import never yields two
/// projects with the same id.
#[derive(Debug, Clone)]
pub struct IdSequence {
    next: i64,
    issued: HashSet<i64>,
}

impl IdSequence {
    pub fn starting_now() -> Self {
        Self::starting_at(Utc::now().timestamp_millis())
    }

    pub fn starting_at(first: i64) -> Self {
        Self {
            next: first,
            issued: HashSet::new(),
        }
    }

    /// Next unused generated id.
    pub fn next_id(&mut self) -> i64 {
        while self.issued.contains(&self.next) {
            self.next += 1;
        }
        let id = self.next;
        self.issued.insert(id);
        self.next += 1;
        id
    }

    /// Keep `requested` when it is still free, otherwise generate one.
    pub fn claim(&mut self, requested: Option<i64>) -> i64 {
        match requested {
            Some(id) if self.issued.insert(id) => id,
            _ => self.next_id(),
        }
    }
}

/// Best-effort integer for loosely typed JSON: numbers (rounded), numeric
/// strings, or nothing. Anything unreadable is treated as absent.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))
        }
        _ => None,
    })
}

// =============================================================================
// Task (planner export)
// =============================================================================

/// Planner progress label for finished tasks.
pub const PROGRESS_COMPLETED: &str = "Completed";
/// Planner progress label for tasks being worked on.
pub const PROGRESS_IN_PROGRESS: &str = "In progress";
/// Planner progress label for untouched tasks.
pub const PROGRESS_NOT_STARTED: &str = "Not started";

/// One row of a planner export.
///
/// Dates stay as the planner wrote them; use [`parse_date`] to interpret them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: String,
    pub task_name: String,
    #[serde(default)]
    pub bucket_name: String,
    #[serde(default)]
    pub progress: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub assigned_to: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_date: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub late: bool,
    #[serde(default)]
    pub completed_date: String,
    #[serde(default)]
    pub completed_by: String,
    #[serde(default)]
    pub completed_checklist_items: u32,
    #[serde(default)]
    pub checklist_items: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.progress == PROGRESS_COMPLETED
    }
}

// =============================================================================
// Dates
// =============================================================================

/// Parse a calendar date as written by forms, exports or the planner.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps, `YYYY-MM-DD HH:MM:SS` and the
/// planner's `MM/DD/YYYY`. Returns `None` for anything else.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts.date());
        }
    }
    NaiveDate::parse_from_str(value, "%m/%d/%Y").ok()
}

/// ISO-8601 calendar date.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Midnight UTC of a calendar date, the instant a date-only string denotes.
pub fn start_of_day_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_draft() -> ProjectDraft {
        ProjectDraft {
            name: Some("Heat exchanger".into()),
            project_type: Some("large".into()),
            status: Some("active".into()),
            start_date: Some("2024-01-01".into()),
            end_date: Some("2024-06-30".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5);
        assert_eq!(parse_date("2024-03-05"), expected);
        assert_eq!(parse_date("2024-03-05T10:30:00Z"), expected);
        assert_eq!(parse_date("2024-03-05 10:30:00"), expected);
        assert_eq!(parse_date("03/05/2024"), expected);
        assert_eq!(parse_date("  "), None);
        assert_eq!(parse_date("next tuesday"), None);
    }

    #[test]
    fn test_draft_defaults_missing_progress_and_id() {
        let mut ids = IdSequence::starting_at(500);
        let project = valid_draft().into_project(&mut ids).unwrap();

        assert_eq!(project.id, 500);
        assert_eq!(project.progress, 0);
        assert_eq!(project.project_type, ProjectType::Large);
        assert_eq!(project.end_date, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
    }

    #[test]
    fn test_invalid_draft_returns_errors() {
        let mut ids = IdSequence::starting_at(1);
        let draft = ProjectDraft {
            status: Some("archived".into()),
            ..valid_draft()
        };
        let errors = draft.into_project(&mut ids).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("status"));
    }

    #[test]
    fn test_submit_stamps_created_at_and_trims() {
        let mut ids = IdSequence::starting_at(7);
        let now = Utc::now();
        let draft = ProjectDraft {
            name: Some("  Sensor rig  ".into()),
            team_members: Some(vec![" Ana ".into(), "".into()]),
            ..valid_draft()
        };

        let project = draft.submit(&mut ids, now).unwrap();
        assert_eq!(project.name, "Sensor rig");
        assert_eq!(project.team_members, vec!["Ana"]);
        assert_eq!(project.created_at, Some(now));
    }

    #[test]
    fn test_project_json_uses_camel_case() {
        let mut ids = IdSequence::starting_at(1);
        let project = valid_draft().into_project(&mut ids).unwrap();
        let value = serde_json::to_value(&project).unwrap();

        assert_eq!(value["projectType"], "large");
        assert_eq!(value["startDate"], "2024-01-01");
        assert_eq!(value["teamMembers"], json!([]));
        assert!(value.get("createdAt").is_none());
    }

    #[test]
    fn test_draft_round_trips_through_project() {
        let project = valid_draft().into_project(&mut IdSequence::starting_at(1)).unwrap();
        let again = ProjectDraft::from(&project)
            .into_project(&mut IdSequence::starting_at(1))
            .unwrap();
        assert_eq!(project, again);
    }

    #[test]
    fn test_id_sequence_is_monotonic() {
        let mut ids = IdSequence::starting_at(10);
        assert_eq!(ids.next_id(), 10);
        assert_eq!(ids.next_id(), 11);
    }

    #[test]
    fn test_id_sequence_never_repeats() {
        let mut ids = IdSequence::starting_at(5);
        assert_eq!(ids.claim(Some(1)), 1);
        assert_eq!(ids.claim(Some(6)), 6);
        assert_eq!(ids.claim(Some(1)), 5);
        assert_eq!(ids.claim(None), 7);
        assert_eq!(ids.claim(Some(7)), 8);
    }

    #[test]
    fn test_draft_numbers_are_lenient() {
        let draft: ProjectDraft = serde_json::from_value(json!({
            "id": "1700000000000",
            "name": "Rig",
            "progress": "40"
        }))
        .unwrap();
        assert_eq!(draft.id, Some(1700000000000));
        assert_eq!(draft.progress, Some(40));

        let draft: ProjectDraft = serde_json::from_value(json!({ "progress": 39.6 })).unwrap();
        assert_eq!(draft.progress, Some(40));

        let draft: ProjectDraft =
            serde_json::from_value(json!({ "id": null, "progress": "lots" })).unwrap();
        assert_eq!(draft.id, None);
        assert_eq!(draft.progress, None);
    }
}
