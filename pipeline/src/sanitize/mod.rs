//! Normalization of project candidates.
//!
//! Sanitizing never fails and is idempotent. Only free text and nested
//! collections are touched; every other field passes through unchanged.

use crate::models::{MilestoneDraft, ProjectDraft};

/// Return a normalized copy of a project candidate.
///
/// - `name`, `description`, `notes` are trimmed (empty when absent)
/// - team members are trimmed and empty names removed
/// - milestones without a non-blank name are dropped, not repaired
pub fn sanitize_project(draft: &ProjectDraft) -> ProjectDraft {
    ProjectDraft {
        name: Some(trimmed(&draft.name)),
        description: Some(trimmed(&draft.description)),
        notes: Some(trimmed(&draft.notes)),
        team_members: Some(
            draft
                .team_members
                .iter()
                .flatten()
                .map(|m| m.trim())
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        milestones: Some(
            draft
                .milestones
                .iter()
                .flatten()
                .filter(|m| has_name(m))
                .cloned()
                .collect(),
        ),
        ..draft.clone()
    }
}

fn trimmed(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn has_name(milestone: &MilestoneDraft) -> bool {
    milestone.name.as_deref().is_some_and(|n| !n.trim().is_empty())
}
