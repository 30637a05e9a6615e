//! Aggregate statistics over record collections.
//!
//! All functions are pure. The `*_at` variants take the evaluation instant
//! explicitly; the plain variants use the current time.
//!
//! - [`project_stats`] - counts, average progress, team size, overdue projects
//! - [`tasks`] - planner task report, KPIs and the bucket completion heuristic

pub mod tasks;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::models::{start_of_day_utc, Project, ProjectStatus, ProjectType};

pub use tasks::{
    bucket_completion, recent_activity, task_kpis, task_kpis_on, task_report, task_report_at,
    CountEntry, PriorityCounts, ProgressCounts, TaskKpis, TaskReport, Timeline, BUCKET_RULES,
};

/// Projects per type
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeCounts {
    pub large: usize,
    pub small: usize,
}

/// Projects per status
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    pub active: usize,
    pub paused: usize,
    pub completed: usize,
}

/// Summary of a project collection
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub total: usize,
    pub by_type: TypeCounts,
    pub by_status: StatusCounts,
    /// Mean progress, rounded; 0 for an empty collection
    pub avg_progress: u32,
    /// Distinct team member names (exact match)
    pub total_team_members: usize,
    pub total_milestones: usize,
    pub overdue_projects: usize,
}

/// Compute project statistics as of now.
pub fn project_stats(projects: &[Project]) -> ProjectStats {
    project_stats_at(projects, Utc::now())
}

/// Compute project statistics as of `now`.
///
/// A project is overdue when it is not completed and midnight UTC of its
/// end date is before `now`. The current instant is not truncated to a
/// day, so a project ending today counts as overdue for the whole day.
pub fn project_stats_at(projects: &[Project], now: DateTime<Utc>) -> ProjectStats {
    let mut stats = ProjectStats {
        total: projects.len(),
        ..Default::default()
    };
    if projects.is_empty() {
        return stats;
    }

    let mut total_progress: u64 = 0;
    let mut members: HashSet<&str> = HashSet::new();

    for project in projects {
        match project.project_type {
            ProjectType::Large => stats.by_type.large += 1,
            ProjectType::Small => stats.by_type.small += 1,
        }
        match project.status {
            ProjectStatus::Active => stats.by_status.active += 1,
            ProjectStatus::Paused => stats.by_status.paused += 1,
            ProjectStatus::Completed => stats.by_status.completed += 1,
        }

        total_progress += u64::from(project.progress);
        members.extend(project.team_members.iter().map(String::as_str));
        stats.total_milestones += project.milestones.len();

        if project.status != ProjectStatus::Completed && start_of_day_utc(project.end_date) < now {
            stats.overdue_projects += 1;
        }
    }

    stats.avg_progress = (total_progress as f64 / projects.len() as f64).round() as u32;
    stats.total_team_members = members.len();
    stats
}

/// Delivery gates shown as a checklist on project cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChecklistGate {
    EngineeringDocs,
    AlphaPrototype,
    BetaPrototype,
    Production,
}

impl ChecklistGate {
    pub const ALL: [ChecklistGate; 4] = [
        ChecklistGate::EngineeringDocs,
        ChecklistGate::AlphaPrototype,
        ChecklistGate::BetaPrototype,
        ChecklistGate::Production,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChecklistGate::EngineeringDocs => "engineering-docs",
            ChecklistGate::AlphaPrototype => "alpha-prototype",
            ChecklistGate::BetaPrototype => "beta-prototype",
            ChecklistGate::Production => "production",
        }
    }

    /// Whether the project has passed this gate.
    pub fn is_reached(self, project: &Project) -> bool {
        match self {
            ChecklistGate::EngineeringDocs => project.progress >= 25,
            ChecklistGate::AlphaPrototype => project.progress >= 50,
            ChecklistGate::BetaPrototype => project.progress >= 75,
            ChecklistGate::Production => {
                project.progress >= 100 || project.status == ProjectStatus::Completed
            }
        }
    }
}

/// Every gate with its state, in delivery order.
pub fn checklist_status(project: &Project) -> Vec<(ChecklistGate, bool)> {
    ChecklistGate::ALL
        .iter()
        .map(|gate| (*gate, gate.is_reached(project)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Milestone;
    use chrono::{NaiveDate, TimeZone};

    fn project(status: ProjectStatus, progress: u8, end: (i32, u32, u32)) -> Project {
        Project {
            id: 1,
            name: "P".into(),
            description: String::new(),
            project_type: ProjectType::Small,
            status,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            progress,
            team_members: vec![],
            milestones: vec![],
            notes: String::new(),
            created_at: None,
        }
    }

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_two_project_example() {
        let projects = vec![
            project(ProjectStatus::Active, 40, (2030, 1, 1)),
            project(ProjectStatus::Completed, 100, (2030, 1, 1)),
        ];
        let stats = project_stats_at(&projects, noon(2024, 6, 1));

        assert_eq!(stats.total, 2);
        assert_eq!(
            stats.by_status,
            StatusCounts { active: 1, paused: 0, completed: 1 }
        );
        assert_eq!(stats.by_type.small, 2);
        assert_eq!(stats.avg_progress, 70);
    }

    #[test]
    fn test_empty_collection() {
        let stats = project_stats(&[]);
        assert_eq!(stats, ProjectStats::default());
    }

    #[test]
    fn test_average_rounds_half_up() {
        let projects = vec![
            project(ProjectStatus::Active, 0, (2030, 1, 1)),
            project(ProjectStatus::Active, 1, (2030, 1, 1)),
        ];
        assert_eq!(project_stats_at(&projects, noon(2024, 1, 1)).avg_progress, 1);
    }

    #[test]
    fn test_team_members_and_milestones() {
        let mut a = project(ProjectStatus::Active, 0, (2030, 1, 1));
        a.team_members = vec!["Ana".into(), "Bo".into(), "Ana".into()];
        a.milestones = vec![Milestone { name: "M1".into(), due_date: None, completed: false }];
        let mut b = project(ProjectStatus::Paused, 0, (2030, 1, 1));
        b.team_members = vec!["ana".into(), "Bo".into()];
        b.milestones = a.milestones.clone();

        let stats = project_stats_at(&[a, b], noon(2024, 1, 1));
        assert_eq!(stats.total_team_members, 3);
        assert_eq!(stats.total_milestones, 2);
    }

    #[test]
    fn test_overdue_uses_full_timestamp() {
        let ending_today = project(ProjectStatus::Active, 10, (2024, 6, 1));
        let done = project(ProjectStatus::Completed, 100, (2024, 1, 1));
        let future = project(ProjectStatus::Paused, 10, (2024, 6, 2));

        let projects = vec![ending_today, done, future];

        // Midday on the end date: already past midnight of that date
        assert_eq!(project_stats_at(&projects, noon(2024, 6, 1)).overdue_projects, 1);

        // Exactly midnight of the end date is not yet overdue
        let midnight = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(project_stats_at(&projects, midnight).overdue_projects, 0);
    }

    #[test]
    fn test_checklist_gates() {
        let mut p = project(ProjectStatus::Active, 60, (2030, 1, 1));
        let gates: Vec<bool> = checklist_status(&p).into_iter().map(|(_, ok)| ok).collect();
        assert_eq!(gates, vec![true, true, false, false]);

        assert_eq!(checklist_status(&p)[1].0.as_str(), "alpha-prototype");

        p.status = ProjectStatus::Completed;
        assert!(ChecklistGate::Production.is_reached(&p));
        assert!(!ChecklistGate::BetaPrototype.is_reached(&p));
    }
}
