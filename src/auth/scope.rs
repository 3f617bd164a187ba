//! Ownership scoping.
//!
//! A task is visible to its creator and to every member of the task's team.
//! A time entry may only be changed by the creator of its parent task.
//! Storage backends apply these rules inside their lookups, so an entity
//! outside the caller's scope reads exactly like a missing one.

use sqlx::{MySql, QueryBuilder};

use crate::models::{AccountId, Task, TeamId};

/// Task visibility. `is_member` is only asked about the task's own team.
pub fn can_access_task<F>(actor: AccountId, task: &Task, is_member: F) -> bool
where
    F: FnOnce(TeamId) -> bool,
{
    can_access(actor, task.created_by, task.team_id, is_member)
}

pub fn can_access<F>(
    actor: AccountId,
    created_by: AccountId,
    team_id: Option<TeamId>,
    is_member: F,
) -> bool
where
    F: FnOnce(TeamId) -> bool,
{
    created_by == actor || team_id.map_or(false, is_member)
}

/// Time entries follow the parent task's creator only, never the team
pub fn can_mutate_time_entry(actor: AccountId, parent_task: &Task) -> bool {
    parent_task.created_by == actor
}

/// `LEFT JOIN` of the actor's membership in the team of task alias `t`
pub fn push_task_membership_join(builder: &mut QueryBuilder<'_, MySql>, actor: AccountId) {
    builder
        .push(" LEFT JOIN team_memberships AS m ON m.team_id = t.team_id AND m.account_id = ")
        .push_bind(actor);
}

/// Task visibility predicate for alias `t`, requires the membership join
pub fn push_task_access_predicate(builder: &mut QueryBuilder<'_, MySql>, actor: AccountId) {
    builder
        .push(" (t.created_by = ")
        .push_bind(actor)
        .push(" OR m.account_id IS NOT NULL) ");
}

/// Join from time entry alias `e` to a parent task the actor created
pub fn push_time_entry_owner_join(builder: &mut QueryBuilder<'_, MySql>, actor: AccountId) {
    builder
        .push(" INNER JOIN tasks AS t ON t.id = e.task_id AND t.created_by = ")
        .push_bind(actor);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use chrono::Utc;

    fn task(created_by: AccountId, team_id: Option<TeamId>) -> Task {
        Task {
            id: 1,
            project_id: None,
            team_id,
            name: "Review".into(),
            description: String::new(),
            estimation_secs: None,
            status: TaskStatus::Todo,
            created_at: Utc::now(),
            created_by,
            assignee_id: None,
            due_date: None,
        }
    }

    #[test]
    fn creator_always_has_access() {
        assert!(can_access_task(1, &task(1, None), |_| false));
        assert!(can_access_task(1, &task(1, Some(9)), |_| false));
    }

    #[test]
    fn teammate_has_access_outsider_does_not() {
        let shared = task(1, Some(9));
        assert!(can_access_task(2, &shared, |team| team == 9));
        assert!(!can_access_task(3, &shared, |_| false));
    }

    #[test]
    fn teamless_task_is_private() {
        assert!(!can_access_task(2, &task(1, None), |_| true));
    }

    #[test]
    fn time_entries_ignore_team_membership() {
        let shared = task(1, Some(9));
        assert!(can_mutate_time_entry(1, &shared));
        assert!(!can_mutate_time_entry(2, &shared));
    }

    #[test]
    fn predicate_renders_bound_placeholders() {
        let mut builder = QueryBuilder::<MySql>::new("SELECT t.id FROM tasks AS t");
        push_task_membership_join(&mut builder, 5);
        builder.push(" WHERE");
        push_task_access_predicate(&mut builder, 5);
        let sql = builder.sql();
        assert!(sql.contains("m.account_id = ?"));
        assert!(sql.contains("(t.created_by = ? OR m.account_id IS NOT NULL)"));
    }
}
