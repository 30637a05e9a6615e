//! Planner task aggregation.

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{
    parse_date, start_of_day_utc, Task, PROGRESS_COMPLETED, PROGRESS_IN_PROGRESS,
    PROGRESS_NOT_STARTED,
};

/// Rows shown in the bucket and assignee rankings.
pub const TOP_N: usize = 10;

/// Label for tasks with an empty bucket.
pub const NO_BUCKET: &str = "No Bucket";

/// Label for tasks nobody is assigned to.
pub const UNASSIGNED: &str = "Unassigned";

// =============================================================================
// Bucket completion heuristic
// =============================================================================

/// Ordered keyword rules mapping a bucket name to a completion percentage.
///
/// Evaluated top to bottom with a case-insensitive substring match; the
/// first rule whose keyword occurs wins. `None` means the bucket has no
/// meaningful percentage.
pub const BUCKET_RULES: &[(&str, Option<u8>)] = &[
    ("production based", None),
    ("in house", None),
    ("potential", Some(0)),
    ("research", Some(10)),
    ("progress", Some(30)),
    ("handover", Some(80)),
];

/// Completion percentage implied by a bucket name.
pub fn bucket_completion(bucket_name: &str) -> Option<u8> {
    let name = bucket_name.to_lowercase();
    BUCKET_RULES
        .iter()
        .find(|(keyword, _)| name.contains(keyword))
        .and_then(|(_, pct)| *pct)
}

// =============================================================================
// Report
// =============================================================================

/// Tasks per planner progress label
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCounts {
    pub completed: usize,
    pub in_progress: usize,
    pub not_started: usize,
    pub other: usize,
}

/// Tasks per planner priority label
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriorityCounts {
    pub urgent: usize,
    pub important: usize,
    pub medium: usize,
    pub low: usize,
    pub other: usize,
}

/// A label and how many tasks carry it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountEntry {
    pub name: String,
    pub count: usize,
}

/// Due-date bucketing relative to the evaluation instant
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub overdue: usize,
    pub due_within_week: usize,
    pub due_next_week: usize,
    pub no_due_date: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    pub total: usize,
    pub by_progress: ProgressCounts,
    pub by_priority: PriorityCounts,
    pub top_buckets: Vec<CountEntry>,
    pub top_assignees: Vec<CountEntry>,
    pub timeline: Timeline,
}

pub fn task_report(tasks: &[Task]) -> TaskReport {
    task_report_at(tasks, Utc::now())
}

/// Build the task report as of `now`.
///
/// Timeline buckets only consider unfinished tasks with a parseable due
/// date, compared at midnight UTC against the full `now`. The no-due-date
/// count includes finished tasks.
pub fn task_report_at(tasks: &[Task], now: DateTime<Utc>) -> TaskReport {
    let mut report = TaskReport {
        total: tasks.len(),
        ..Default::default()
    };

    for task in tasks {
        match task.progress.as_str() {
            PROGRESS_COMPLETED => report.by_progress.completed += 1,
            PROGRESS_IN_PROGRESS => report.by_progress.in_progress += 1,
            PROGRESS_NOT_STARTED => report.by_progress.not_started += 1,
            _ => report.by_progress.other += 1,
        }

        match task.priority.as_str() {
            "Urgent" => report.by_priority.urgent += 1,
            "Important" => report.by_priority.important += 1,
            "Medium" => report.by_priority.medium += 1,
            "Low" => report.by_priority.low += 1,
            _ => report.by_priority.other += 1,
        }
    }

    report.top_buckets = rank(tasks.iter().map(|t| label_or(&t.bucket_name, NO_BUCKET)));
    report.top_assignees = rank(tasks.iter().map(|t| label_or(&t.assigned_to, UNASSIGNED)));
    report.timeline = timeline(tasks, now);
    report
}

fn label_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Count labels in encounter order, then keep the `TOP_N` largest. The sort
/// is stable so ties keep their first-seen order.
fn rank<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<CountEntry> {
    let mut counts: Vec<CountEntry> = Vec::new();
    for label in labels {
        match counts.iter_mut().find(|e| e.name == label) {
            Some(entry) => entry.count += 1,
            None => counts.push(CountEntry {
                name: label.to_string(),
                count: 1,
            }),
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(TOP_N);
    counts
}

fn timeline(tasks: &[Task], now: DateTime<Utc>) -> Timeline {
    let one_week = now + Duration::days(7);
    let two_weeks = now + Duration::days(14);
    let mut timeline = Timeline::default();

    for task in tasks {
        if task.due_date.is_empty() {
            timeline.no_due_date += 1;
            continue;
        }
        if task.is_completed() {
            continue;
        }
        let Some(due) = parse_date(&task.due_date).map(start_of_day_utc) else {
            continue;
        };

        if due < now {
            timeline.overdue += 1;
        } else if due <= one_week {
            timeline.due_within_week += 1;
        } else if due <= two_weeks {
            timeline.due_next_week += 1;
        }
    }

    timeline
}

// =============================================================================
// KPIs
// =============================================================================

/// Headline counters for the task dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskKpis {
    pub total: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub not_started: usize,
    pub urgent: usize,
    pub overdue: usize,
    /// `completed / total` as a rounded percentage, 0 without tasks
    pub completion_rate: u32,
}

/// KPIs as of the current local date.
pub fn task_kpis(tasks: &[Task]) -> TaskKpis {
    task_kpis_on(tasks, Local::now().date_naive())
}

/// KPIs as of `today`. Unlike the report timeline, overdue here compares
/// whole days: a task due today is not overdue.
pub fn task_kpis_on(tasks: &[Task], today: NaiveDate) -> TaskKpis {
    let count = |pred: fn(&Task) -> bool| tasks.iter().filter(|t| pred(t)).count();

    let completed = count(|t| t.progress == PROGRESS_COMPLETED);
    let completion_rate = if tasks.is_empty() {
        0
    } else {
        (completed as f64 / tasks.len() as f64 * 100.0).round() as u32
    };

    TaskKpis {
        total: tasks.len(),
        in_progress: count(|t| t.progress == PROGRESS_IN_PROGRESS),
        completed,
        not_started: count(|t| t.progress == PROGRESS_NOT_STARTED),
        urgent: count(|t| t.priority == "Urgent"),
        overdue: tasks
            .iter()
            .filter(|t| !t.is_completed() && parse_date(&t.due_date).is_some_and(|due| due < today))
            .count(),
        completion_rate,
    }
}

/// The `limit` most recently created tasks, newest first. Tasks without a
/// readable creation date are left out.
pub fn recent_activity(tasks: &[Task], limit: usize) -> Vec<&Task> {
    let mut dated: Vec<(NaiveDate, &Task)> = tasks
        .iter()
        .filter_map(|t| parse_date(&t.created_date).map(|d| (d, t)))
        .collect();

    dated.sort_by(|a, b| b.0.cmp(&a.0));
    dated.into_iter().take(limit).map(|(_, t)| t).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task(name: &str, progress: &str, priority: &str) -> Task {
        Task {
            task_id: name.to_lowercase(),
            task_name: name.to_string(),
            progress: progress.to_string(),
            priority: priority.to_string(),
            ..Default::default()
        }
    }

    fn due(mut t: Task, date: &str) -> Task {
        t.due_date = date.to_string();
        t
    }

    #[test]
    fn test_bucket_rule_precedence() {
        // "potential" is listed before "research"
        assert_eq!(bucket_completion("Research & Potential"), Some(0));
        assert_eq!(bucket_completion("In House Research"), None);
        assert_eq!(bucket_completion("PRODUCTION BASED progress"), None);
        assert_eq!(bucket_completion("Work in progress"), Some(30));
        assert_eq!(bucket_completion("Handover"), Some(80));
        assert_eq!(bucket_completion("research"), Some(10));
        assert_eq!(bucket_completion("Backlog"), None);
        assert_eq!(bucket_completion(""), None);
    }

    #[test]
    fn test_progress_and_priority_counts() {
        let tasks = vec![
            task("A", "Completed", "Urgent"),
            task("B", "In progress", "Medium"),
            task("C", "Not started", "Low"),
            task("D", "Blocked", "Important"),
            task("E", "Completed", ""),
        ];
        let report = task_report(&tasks);

        assert_eq!(report.total, 5);
        assert_eq!(
            report.by_progress,
            ProgressCounts { completed: 2, in_progress: 1, not_started: 1, other: 1 }
        );
        assert_eq!(
            report.by_priority,
            PriorityCounts { urgent: 1, important: 1, medium: 1, low: 1, other: 1 }
        );
    }

    #[test]
    fn test_rankings_are_stable_and_labelled() {
        let mut tasks = Vec::new();
        for (bucket, who) in [("B1", "Ana"), ("", "Bo"), ("B1", ""), ("B2", "Bo"), ("", "Ana")] {
            let mut t = task("x", "", "");
            t.bucket_name = bucket.to_string();
            t.assigned_to = who.to_string();
            tasks.push(t);
        }
        let report = task_report(&tasks);

        let buckets: Vec<(&str, usize)> =
            report.top_buckets.iter().map(|e| (e.name.as_str(), e.count)).collect();
        assert_eq!(buckets, vec![("B1", 2), (NO_BUCKET, 2), ("B2", 1)]);

        let people: Vec<&str> = report.top_assignees.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(people, vec!["Ana", "Bo", UNASSIGNED]);
    }

    #[test]
    fn test_rankings_keep_top_ten() {
        let tasks: Vec<Task> = (0..12)
            .map(|i| {
                let mut t = task("x", "", "");
                t.bucket_name = format!("Bucket {i}");
                t
            })
            .collect();
        let report = task_report(&tasks);
        assert_eq!(report.top_buckets.len(), TOP_N);
        assert_eq!(report.top_buckets[0].name, "Bucket 0");
    }

    #[test]
    fn test_timeline_buckets() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let tasks = vec![
            due(task("late", "In progress", ""), "03/09/2025"),
            due(task("today", "Not started", ""), "2025-03-10"),
            due(task("soon", "Not started", ""), "03/17/2025"),
            due(task("next", "In progress", ""), "2025-03-24"),
            due(task("far", "In progress", ""), "2025-04-30"),
            due(task("done", "Completed", ""), "2025-01-01"),
            due(task("garbled", "In progress", ""), "next week"),
            task("undated", "In progress", ""),
            task("undated done", "Completed", ""),
        ];
        let timeline = task_report_at(&tasks, now).timeline;

        // Midnight of today is already before 09:00
        assert_eq!(timeline.overdue, 2);
        assert_eq!(timeline.due_within_week, 1);
        assert_eq!(timeline.due_next_week, 1);
        assert_eq!(timeline.no_due_date, 2);
    }

    #[test]
    fn test_kpis_truncate_to_day() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let tasks = vec![
            due(task("late", "In progress", "Urgent"), "2025-03-09"),
            due(task("today", "Not started", ""), "2025-03-10"),
            due(task("done", "Completed", "Urgent"), "2025-01-01"),
            task("no date", "In progress", ""),
        ];
        let kpis = task_kpis_on(&tasks, today);

        assert_eq!(kpis.total, 4);
        assert_eq!(kpis.in_progress, 2);
        assert_eq!(kpis.completed, 1);
        assert_eq!(kpis.not_started, 1);
        assert_eq!(kpis.urgent, 2);
        assert_eq!(kpis.overdue, 1);
        assert_eq!(kpis.completion_rate, 25);
    }

    #[test]
    fn test_kpis_empty() {
        assert_eq!(task_kpis(&[]), TaskKpis::default());
    }

    #[test]
    fn test_recent_activity_newest_first() {
        let mut tasks = Vec::new();
        for (name, created) in [("a", "01/02/2025"), ("b", ""), ("c", "2025-02-01"), ("d", "01/20/2025")] {
            let mut t = task(name, "", "");
            t.created_date = created.to_string();
            tasks.push(t);
        }

        let recent: Vec<&str> = recent_activity(&tasks, 2)
            .iter()
            .map(|t| t.task_name.as_str())
            .collect();
        assert_eq!(recent, vec!["c", "d"]);
        assert_eq!(recent_activity(&tasks, 5).len(), 3);
    }
}
