// Task visibility across accounts and teams

use taskafarian::error::{DeleteError, TaskError};
use taskafarian::models::{NewTask, TaskChanges, TaskStatus, TeamRole};
use taskafarian::AppError;

mod common;

use common::{app_with_memory, signed_in};

fn task(name: &str, team_id: Option<i64>) -> NewTask {
    NewTask {
        name: name.to_string(),
        team_id,
        ..Default::default()
    }
}

#[tokio::test]
async fn teammates_share_team_tasks() {
    let (state, _) = app_with_memory();
    let a = signed_in(&state, "alice").await.account_id();
    let b = signed_in(&state, "bob").await.account_id();
    state.teams.add_member(a, 7, TeamRole::Member).await.unwrap();
    state.teams.add_member(b, 7, TeamRole::Owner).await.unwrap();

    let created = state.tasks.create(b, task("Shared chore", Some(7))).await.unwrap();
    assert_eq!(created.created_by, b);

    assert_eq!(state.tasks.fetch(a, created.id).await.unwrap().id, created.id);

    let updated = state
        .tasks
        .update(
            a,
            created.id,
            TaskChanges {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, TaskStatus::InProgress);

    assert_eq!(state.tasks.delete(a, &[created.id], true).await.unwrap(), vec![created.id]);
    assert!(matches!(
        state.tasks.fetch(b, created.id).await,
        Err(TaskError::EntityNotFound)
    ));
}

#[tokio::test]
async fn strangers_see_not_found_exactly_like_missing() {
    let (state, _) = app_with_memory();
    let a = signed_in(&state, "alice").await.account_id();
    let b = signed_in(&state, "bob").await.account_id();
    state.teams.add_member(b, 7, TeamRole::Member).await.unwrap();

    let foreign = state.tasks.create(b, task("Private", Some(7))).await.unwrap();
    let missing_id = foreign.id + 1000;

    let foreign_err = AppError::from(state.tasks.fetch(a, foreign.id).await.unwrap_err());
    let missing_err = AppError::from(state.tasks.fetch(a, missing_id).await.unwrap_err());
    assert_eq!(foreign_err.http_status_code(), 404);
    assert_eq!(foreign_err.to_json(), missing_err.to_json());

    let err = state
        .tasks
        .update(
            a,
            foreign.id,
            TaskChanges {
                name: Some("Hijacked".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::EntityNotFound));
    assert_eq!(state.tasks.fetch(b, foreign.id).await.unwrap().name, "Private");
}

#[tokio::test]
async fn tasks_without_team_stay_with_creator() {
    let (state, _) = app_with_memory();
    let a = signed_in(&state, "alice").await.account_id();
    let b = signed_in(&state, "bob").await.account_id();
    state.teams.add_member(a, 1, TeamRole::Member).await.unwrap();
    state.teams.add_member(b, 1, TeamRole::Member).await.unwrap();

    let solo = state.tasks.create(b, task("Solo work", None)).await.unwrap();
    assert!(state.tasks.fetch(a, solo.id).await.is_err());
    assert!(state.tasks.fetch(b, solo.id).await.is_ok());
}

#[tokio::test]
async fn bulk_delete_all_or_nothing_keeps_everything() {
    let (state, _) = app_with_memory();
    let a = signed_in(&state, "alice").await.account_id();
    let b = signed_in(&state, "bob").await.account_id();
    let owned = state.tasks.create(a, task("Mine", None)).await.unwrap();
    let foreign = state.tasks.create(b, task("Theirs", None)).await.unwrap();

    let err = state
        .tasks
        .delete(a, &[owned.id, foreign.id], true)
        .await
        .unwrap_err();
    let DeleteError::Deletion(deletion) = err else {
        panic!("expected a deletion error");
    };
    assert_eq!(deletion.ids, vec![foreign.id]);
    assert!(state.tasks.fetch(a, owned.id).await.is_ok());
    assert!(state.tasks.fetch(b, foreign.id).await.is_ok());
}

#[tokio::test]
async fn bulk_delete_partial_commits_what_is_in_scope() {
    let (state, _) = app_with_memory();
    let a = signed_in(&state, "alice").await.account_id();
    let b = signed_in(&state, "bob").await.account_id();
    let owned = state.tasks.create(a, task("Mine", None)).await.unwrap();
    let foreign = state.tasks.create(b, task("Theirs", None)).await.unwrap();

    let deleted = state
        .tasks
        .delete(a, &[owned.id, foreign.id], false)
        .await
        .unwrap();
    assert_eq!(deleted, vec![owned.id]);
    assert!(state.tasks.fetch(a, owned.id).await.is_err());
    assert!(state.tasks.fetch(b, foreign.id).await.is_ok());
}

#[tokio::test]
async fn listing_is_limited_to_own_tasks_newest_first() {
    let (state, _) = app_with_memory();
    let a = signed_in(&state, "alice").await.account_id();
    let b = signed_in(&state, "bob").await.account_id();
    state.teams.add_member(a, 3, TeamRole::Member).await.unwrap();
    state.teams.add_member(b, 3, TeamRole::Member).await.unwrap();

    let first = state.tasks.create(a, task("First", None)).await.unwrap();
    let second = state.tasks.create(a, task("Second", Some(3))).await.unwrap();
    state.tasks.create(b, task("Teammate's", Some(3))).await.unwrap();

    let page = state.tasks.list(a, None, None).await.unwrap();
    let ids: Vec<i64> = page.entities.iter().map(|t| t.task.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
    assert_eq!(page.meta.count, 2);
    assert_eq!(page.meta.offset, 0);
    assert_eq!(page.meta.limit, 20);
}
