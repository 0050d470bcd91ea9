use std::time::Duration;

use tracknest::{
    Capability, CommitOutcome, ControllerConfig, ControllerError, Fault, ListController,
    RestorePosition, Role, StagingConflict, UndoOutcome,
};

use crate::support::{
    admin, ids, ids_of, Groups, loaded, numbered, pass, past_deadline, seeded, user_store, users,
    visible,
};

#[tokio::test(start_paused = true)]
async fn removal_is_visible_before_any_remote_call() {
    let gateway = seeded(&["A", "B", "C"]);
    let groups = admin(&gateway).await;

    groups.remove_one(&2).unwrap();

    assert_eq!(visible(&groups), vec![1, 3]);
    assert_eq!(groups.pending_removal().unwrap(), vec![2]);
    assert!(gateway.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn undo_before_deadline_restores_at_head() {
    let gateway = seeded(&["A", "B", "C"]);
    let groups = admin(&gateway).await;

    groups.remove_one(&2).unwrap();
    pass(Duration::from_millis(4999)).await;
    assert!(gateway.deletes().is_empty());

    assert_eq!(groups.undo().await.unwrap(), UndoOutcome::Restored(1));
    assert_eq!(ids(&groups), vec![2, 1, 3]);

    pass(Duration::from_secs(10)).await;
    assert!(gateway.calls().is_empty());
    assert!(groups.pending_removal().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn undo_can_restore_original_positions() {
    let gateway = seeded(&["A", "B", "C", "D"]);
    let config = ControllerConfig::default()
        .with_restore_position(RestorePosition::OriginalIndex)
        .with_staging_conflict(StagingConflict::Fold);
    let groups = loaded(&gateway, Role::Admin, config).await;

    groups.remove_one(&2).unwrap();
    groups.remove_one(&4).unwrap();
    assert_eq!(ids(&groups), vec![1, 3]);

    assert_eq!(groups.undo().await.unwrap(), UndoOutcome::Restored(2));
    assert_eq!(ids(&groups), vec![1, 2, 3, 4]);
}

#[tokio::test(start_paused = true)]
async fn undo_with_nothing_pending_is_a_no_op() {
    let gateway = seeded(&["A"]);
    let groups = admin(&gateway).await;

    assert_eq!(groups.undo().await.unwrap(), UndoOutcome::NothingPending);
    assert_eq!(ids(&groups), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn deadline_commits_exactly_once() {
    let gateway = seeded(&["A", "B", "C"]);
    let groups = admin(&gateway).await;

    groups.remove_one(&2).unwrap();
    past_deadline().await;

    assert_eq!(gateway.deletes(), vec![2]);
    assert!(groups.pending_removal().unwrap().is_empty());

    groups.load().await.unwrap();
    assert_eq!(ids(&groups), vec![1, 3]);

    pass(Duration::from_secs(30)).await;
    assert_eq!(gateway.deletes(), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn load_while_pending_keeps_the_record_hidden() {
    let gateway = seeded(&["A", "B", "C"]);
    let groups = admin(&gateway).await;

    groups.remove_one(&1).unwrap();
    groups.load().await.unwrap();

    assert_eq!(ids(&groups), vec![2, 3]);
    assert_eq!(groups.pending_removal().unwrap(), vec![1]);

    past_deadline().await;
    assert_eq!(gateway.deletes(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn second_removal_while_pending_is_rejected() {
    let gateway = seeded(&["A", "B", "C"]);
    let groups = admin(&gateway).await;

    let batch = groups.remove_one(&1).unwrap();
    let err = groups.remove_one(&3).unwrap_err();
    assert_eq!(
        err,
        ControllerError::RemovalPending {
            batch,
            committing: false
        }
    );
    assert_eq!(ids(&groups), vec![2, 3]);

    pass(Duration::from_secs(11)).await;
    assert_eq!(gateway.deletes(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn fold_joins_the_pending_batch_under_its_deadline() {
    let gateway = seeded(&["A", "B", "C"]);
    let config = ControllerConfig::default().with_staging_conflict(StagingConflict::Fold);
    let groups = loaded(&gateway, Role::Admin, config).await;

    let first = groups.remove_one(&1).unwrap();
    pass(Duration::from_secs(2)).await;
    let second = groups.remove_one(&3).unwrap();
    assert_eq!(first, second);

    pass(Duration::from_millis(3001)).await;
    assert_eq!(gateway.deletes(), vec![1, 3]);
    assert_eq!(ids(&groups), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn removal_is_rejected_while_a_commit_is_in_flight() {
    let gateway = seeded(&["A", "B", "C"]).with_latency(Duration::from_secs(1));
    let config = ControllerConfig::default().with_staging_conflict(StagingConflict::Fold);
    let groups = loaded(&gateway, Role::Admin, config).await;

    let batch = groups.remove_one(&1).unwrap();
    pass(Duration::from_millis(5500)).await;

    assert_eq!(
        groups.remove_one(&3).unwrap_err(),
        ControllerError::RemovalPending {
            batch,
            committing: true
        }
    );
}

#[tokio::test(start_paused = true)]
async fn partial_bulk_failure_resyncs_to_a_fresh_load() {
    let gateway = seeded(&["A", "B", "C", "D"]);
    let groups = admin(&gateway).await;

    groups.select(&1).unwrap();
    groups.select(&2).unwrap();
    groups.remove_selected().unwrap();
    gateway.inject(Fault::Delete(2));

    past_deadline().await;

    let fresh = loaded(&gateway, Role::Admin, ControllerConfig::default()).await;
    assert_eq!(ids(&groups), ids(&fresh));
    assert_eq!(ids(&groups), vec![2, 3, 4]);
    assert!(groups.pending_removal().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn bulk_removal_requires_the_capability() {
    let gateway = seeded(&["A", "B"]);
    let groups = loaded(&gateway, Role::User, ControllerConfig::default()).await;

    groups.select_all_visible(true).unwrap();
    assert_eq!(
        groups.remove_selected().unwrap_err(),
        ControllerError::Forbidden(Capability::BulkDelete)
    );
    assert_eq!(ids(&groups), vec![1, 2]);

    // Single removal stays available.
    groups.remove_one(&1).unwrap();
    assert_eq!(ids(&groups), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn bulk_removal_needs_a_selection() {
    let gateway = seeded(&["A", "B"]);
    let groups = admin(&gateway).await;

    assert_eq!(
        groups.remove_selected().unwrap_err(),
        ControllerError::NothingSelected
    );
}

#[tokio::test(start_paused = true)]
async fn removing_an_unknown_id_fails() {
    let gateway = seeded(&["A"]);
    let groups = admin(&gateway).await;

    assert!(matches!(
        groups.remove_one(&42).unwrap_err(),
        ControllerError::NotFound(_)
    ));
    assert!(groups.pending_removal().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn removing_the_last_row_of_a_page_moves_back() {
    let gateway = numbered(11);
    let groups = admin(&gateway).await;

    assert_eq!(groups.set_page(2).unwrap(), 2);
    groups.remove_one(&11).unwrap();

    let view = groups.view().unwrap();
    assert_eq!(view.current_page, 1);
    assert_eq!(view.total_pages, 1);
    assert_eq!(groups.page().unwrap().current_page, 1);
}

#[tokio::test(start_paused = true)]
async fn undo_after_commit_fired_recreates_remotely() {
    let gateway = seeded(&["A", "B", "C"]).with_latency(Duration::from_secs(1));
    let groups = admin(&gateway).await;

    groups.remove_one(&2).unwrap();
    pass(Duration::from_millis(5500)).await;
    assert_eq!(gateway.deletes(), Vec::<i64>::new());

    assert_eq!(groups.undo().await.unwrap(), UndoOutcome::Recreated(1));

    assert_eq!(gateway.deletes(), vec![2]);
    assert_eq!(gateway.creates(), 1);
    let names: Vec<String> = groups.records().unwrap().into_iter().map(|g| g.name).collect();
    assert_eq!(names, vec!["B", "A", "C"]);
    assert!(gateway.records().iter().any(|g| g.name == "B"));
}

#[tokio::test(start_paused = true)]
async fn late_undo_keeps_records_whose_delete_failed() {
    let gateway = seeded(&["A", "B", "C"]).with_latency(Duration::from_secs(1));
    let groups = admin(&gateway).await;

    groups.remove_one(&2).unwrap();
    gateway.inject(Fault::Delete(2));
    pass(Duration::from_millis(5500)).await;

    assert_eq!(groups.undo().await.unwrap(), UndoOutcome::Recreated(1));

    assert_eq!(gateway.creates(), 0);
    assert_eq!(ids_of(&gateway.records()), vec![1, 2, 3]);
    let mut local = ids(&groups);
    local.sort();
    assert_eq!(local, vec![1, 2, 3]);

    pass(Duration::from_secs(10)).await;
    assert_eq!(gateway.records().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn late_undo_of_a_natural_key_waits_for_the_delete() {
    let gateway = user_store(&["alice", "bob"]).with_latency(Duration::from_secs(1));
    let users = users(&gateway, Role::Admin).await;

    users.remove_one(&"bob".to_string()).unwrap();
    pass(Duration::from_millis(5500)).await;

    assert_eq!(users.undo().await.unwrap(), UndoOutcome::Recreated(1));

    let stored: Vec<String> = gateway.records().into_iter().map(|u| u.username).collect();
    assert_eq!(stored.iter().filter(|name| *name == "bob").count(), 1);
    assert_eq!(gateway.creates(), 1);
    assert!(users.records().unwrap().iter().any(|u| u.username == "bob"));
}

#[tokio::test(start_paused = true)]
async fn resync_failure_is_flagged_until_the_next_load() {
    let gateway = seeded(&["A", "B", "C"]);
    let groups = admin(&gateway).await;

    groups.remove_one(&1).unwrap();
    gateway.inject(Fault::Delete(1));
    gateway.inject(Fault::List);
    past_deadline().await;

    assert!(groups.sync_error().unwrap().is_some());
    assert!(groups.pending_removal().unwrap().is_empty());

    groups.load().await.unwrap();
    assert_eq!(groups.sync_error().unwrap(), None);
    assert_eq!(ids(&groups), vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn commit_pending_reports_a_failed_resync() {
    let gateway = seeded(&["A", "B"]);
    let groups = admin(&gateway).await;

    groups.remove_one(&2).unwrap();
    gateway.inject(Fault::Delete(2));
    gateway.inject(Fault::List);

    assert_eq!(
        groups.commit_pending().await.unwrap(),
        CommitOutcome::Failed {
            failed: 1,
            resynced: false
        }
    );
    assert!(groups.sync_error().unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn failed_recreate_reports_the_lost_records() {
    let gateway = seeded(&["A", "B", "C"]).with_latency(Duration::from_secs(1));
    let groups = admin(&gateway).await;

    groups.remove_one(&2).unwrap();
    pass(Duration::from_millis(5500)).await;
    gateway.inject(Fault::Create);

    match groups.undo().await.unwrap_err() {
        ControllerError::RecreateFailed { restored, lost, .. } => {
            assert_eq!(restored, 0);
            assert_eq!(lost, vec!["2".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn commit_pending_does_not_wait_for_the_deadline() {
    let gateway = seeded(&["A", "B", "C"]);
    let groups = admin(&gateway).await;

    groups.remove_one(&3).unwrap();
    assert_eq!(
        groups.commit_pending().await.unwrap(),
        CommitOutcome::Committed { count: 1 }
    );
    assert_eq!(gateway.deletes(), vec![3]);

    pass(Duration::from_secs(10)).await;
    assert_eq!(gateway.deletes(), vec![3]);
    assert_eq!(
        groups.commit_pending().await.unwrap(),
        CommitOutcome::Skipped
    );
}

#[tokio::test(start_paused = true)]
async fn dispose_cancels_the_countdown() {
    let gateway = seeded(&["A", "B", "C"]);
    let groups = admin(&gateway).await;

    groups.remove_one(&2).unwrap();
    groups.dispose();
    pass(Duration::from_secs(10)).await;

    assert!(gateway.calls().is_empty());
    assert_eq!(gateway.records().len(), 3);
    assert!(groups.is_disposed());
    assert_eq!(groups.view().unwrap_err(), ControllerError::Disposed);
    assert_eq!(groups.load().await.unwrap_err(), ControllerError::Disposed);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_controller_cancels_the_countdown() {
    let gateway = seeded(&["A", "B", "C"]);
    let groups = admin(&gateway).await;

    groups.remove_one(&2).unwrap();
    drop(groups);
    pass(Duration::from_secs(10)).await;

    assert!(gateway.deletes().is_empty());
}

#[test]
fn removal_requires_a_runtime() {
    let groups: Groups = ListController::new(seeded(&["A"]), Role::Admin, ControllerConfig::default());
    assert_eq!(groups.remove_one(&1).unwrap_err(), ControllerError::NoRuntime);
}
