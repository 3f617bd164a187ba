// Time entries follow the parent task's creator

use chrono::{Duration, Utc};

use taskafarian::error::{DeleteError, TimeEntryError};
use taskafarian::models::{NewTask, TeamRole, TimeEntryChanges};
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
async fn inverted_interval_is_invalid_value() {
    let (state, _) = app_with_memory();
    let a = signed_in(&state, "alice").await.account_id();
    let parent = state.tasks.create(a, task("Estimate", None)).await.unwrap();
    let start = Utc::now();

    let err = state
        .time_entries
        .create(a, parent.id, a, start, Some(start - Duration::seconds(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, TimeEntryError::InvalidValue(_)));
    assert_eq!(AppError::from(err).http_status_code(), 422);

    let listed = state.tasks.list(a, None, None).await.unwrap();
    assert!(listed.entities[0].time_entries.is_empty());
}

#[tokio::test]
async fn teammate_can_log_time_but_not_change_it() {
    let (state, _) = app_with_memory();
    let a = signed_in(&state, "alice").await.account_id();
    let b = signed_in(&state, "bob").await.account_id();
    state.teams.add_member(a, 5, TeamRole::Member).await.unwrap();
    state.teams.add_member(b, 5, TeamRole::Member).await.unwrap();

    let parent = state.tasks.create(b, task("Team chore", Some(5))).await.unwrap();
    let start = Utc::now();
    let entry = state
        .time_entries
        .create(a, parent.id, a, start, Some(start + Duration::minutes(45)))
        .await
        .unwrap();

    let err = state
        .time_entries
        .update(
            a,
            entry.id,
            TimeEntryChanges {
                end: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TimeEntryError::EntityNotFound));

    let err = state.time_entries.delete(a, &[entry.id], true).await.unwrap_err();
    assert!(matches!(err, DeleteError::Deletion(_)));

    let reopened = state
        .time_entries
        .update(
            b,
            entry.id,
            TimeEntryChanges {
                end: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(reopened.end, None);
}

#[tokio::test]
async fn stranger_cannot_log_time() {
    let (state, _) = app_with_memory();
    let a = signed_in(&state, "alice").await.account_id();
    let b = signed_in(&state, "bob").await.account_id();
    let parent = state.tasks.create(b, task("Private", None)).await.unwrap();

    let err = state
        .time_entries
        .create(a, parent.id, a, Utc::now(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, TimeEntryError::EntityNotFound));
}

#[tokio::test]
async fn entries_are_listed_newest_start_first_and_go_with_their_task() {
    let (state, _) = app_with_memory();
    let a = signed_in(&state, "alice").await.account_id();
    let parent = state.tasks.create(a, task("Deep work", None)).await.unwrap();
    let base = Utc::now();

    let early = state
        .time_entries
        .create(a, parent.id, a, base - Duration::hours(3), Some(base - Duration::hours(2)))
        .await
        .unwrap();
    let late = state
        .time_entries
        .create(a, parent.id, a, base - Duration::hours(1), None)
        .await
        .unwrap();

    let page = state.tasks.list(a, None, None).await.unwrap();
    let ids: Vec<i64> = page.entities[0].time_entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![late.id, early.id]);

    state.tasks.delete(a, &[parent.id], true).await.unwrap();
    let err = state
        .time_entries
        .update(a, early.id, TimeEntryChanges::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TimeEntryError::EntityNotFound));
}

#[tokio::test]
async fn partial_delete_of_entries() {
    let (state, _) = app_with_memory();
    let a = signed_in(&state, "alice").await.account_id();
    let b = signed_in(&state, "bob").await.account_id();
    let mine = state.tasks.create(a, task("Mine", None)).await.unwrap();
    let theirs = state.tasks.create(b, task("Theirs", None)).await.unwrap();
    let now = Utc::now();

    let own_entry = state.time_entries.create(a, mine.id, a, now, None).await.unwrap();
    let foreign_entry = state.time_entries.create(b, theirs.id, b, now, None).await.unwrap();

    let err = state
        .time_entries
        .delete(a, &[own_entry.id, foreign_entry.id], true)
        .await
        .unwrap_err();
    let body = AppError::from(err).to_json();
    assert_eq!(body["ids"], serde_json::json!([foreign_entry.id]));

    let deleted = state
        .time_entries
        .delete(a, &[own_entry.id, foreign_entry.id], false)
        .await
        .unwrap();
    assert_eq!(deleted, vec![own_entry.id]);
}
