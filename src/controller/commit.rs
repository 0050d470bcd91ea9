//! The asynchronous half of staged removal: the countdown, the concurrent
//! remote deletes, the resync after a failed commit and the best-effort
//! recreate behind a late undo.
//!
//! None of these hold the state lock across an await.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use serde_json::json;
use tokio::time::Instant;

use super::events::ListEvent;
use super::state::ListState;
use super::ControllerError;
use crate::gateway::{GatewayError, RemoteSyncGateway};
use crate::removal::BatchId;
use crate::store::Removed;
use crate::Record;

pub(crate) type Shared<R> = Arc<Mutex<ListState<R>>>;

/// How a commit attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Every remote delete succeeded; the records stay gone.
    Committed { count: usize },
    /// At least one delete failed. When `resynced`, the store was replaced
    /// with a fresh fetch.
    Failed { failed: usize, resynced: bool },
    /// Nothing to do: no batch, or it was undone or is already committing.
    Skipped,
}

/// Whether a failed commit refetches the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OnFailure {
    Resync,
    /// The caller is about to replace the store anyway.
    Ignore,
}

pub(crate) fn lock<'a, R: Record>(
    shared: &'a Shared<R>,
    operation: &'static str,
) -> Result<MutexGuard<'a, ListState<R>>, ControllerError> {
    let state = shared
        .lock()
        .map_err(|_| ControllerError::LockPoisoned(operation))?;
    if state.disposed {
        return Err(ControllerError::Disposed);
    }
    Ok(state)
}

/// Body of the countdown task: wait for the deadline, then commit.
pub(crate) async fn countdown<R, G>(
    shared: Shared<R>,
    gateway: Arc<G>,
    batch: BatchId,
    deadline: Instant,
) where
    R: Record,
    G: RemoteSyncGateway<R>,
{
    tokio::time::sleep_until(deadline).await;
    tracing::debug!(collection = R::COLLECTION, batch, "undo window elapsed");
    if let Err(err) = commit_batch(&shared, &gateway, batch, OnFailure::Resync).await {
        tracing::warn!(collection = R::COLLECTION, batch, error = %err, "scheduled commit failed");
    }
}

/// Issue one delete per record of `batch`, concurrently, and resolve the
/// batch once all of them settled.
pub(crate) async fn commit_batch<R, G>(
    shared: &Shared<R>,
    gateway: &Arc<G>,
    batch: BatchId,
    on_failure: OnFailure,
) -> Result<CommitOutcome, ControllerError>
where
    R: Record,
    G: RemoteSyncGateway<R>,
{
    let (records, settle) = {
        let mut state = lock(shared, "commit")?;
        match state.removal.begin_commit(batch) {
            Some(begun) => begun,
            None => return Ok(CommitOutcome::Skipped),
        }
    };

    tracing::info!(collection = R::COLLECTION, batch, count = records.len(), "committing removal");
    let results = join_all(
        records
            .iter()
            .map(|record| gateway.delete(R::COLLECTION, record.id())),
    )
    .await;

    let mut deleted = Vec::new();
    let mut failures = Vec::new();
    for (record, result) in records.iter().zip(results) {
        match result {
            Ok(()) => deleted.push(record.id().clone()),
            Err(err) => failures.push(err),
        }
    }
    // A late undo waits on this before recreating anything.
    settle.send_replace(Some(deleted));

    let undone = {
        let mut state = lock(shared, "commit")?;
        if !state.removal.finish_commit(batch) {
            tracing::debug!(collection = R::COLLECTION, batch, "batch undone while its deletes were in flight");
            true
        } else if failures.is_empty() {
            state.events.emit(
                ListEvent::RemovalCommitted,
                json!({ "batch": batch, "count": records.len() }),
            );
            false
        } else {
            state.events.emit(
                ListEvent::CommitFailed,
                json!({ "batch": batch, "failed": failures.len() }),
            );
            false
        }
    };

    if failures.is_empty() {
        tracing::info!(collection = R::COLLECTION, batch, "removal committed");
        return Ok(CommitOutcome::Committed {
            count: records.len(),
        });
    }

    for failure in &failures {
        tracing::warn!(collection = R::COLLECTION, batch, error = %failure, "remote delete failed");
    }

    // An undo that took the batch back resyncs on its own.
    let resynced = match on_failure {
        OnFailure::Resync if !undone => resync_or_flag(shared, gateway, batch).await?,
        _ => false,
    };

    Ok(CommitOutcome::Failed {
        failed: failures.len(),
        resynced,
    })
}

/// Resync, and when the fetch fails leave the store as it is but record
/// the error and emit `ResyncFailed`. Returns whether the resync succeeded.
async fn resync_or_flag<R, G>(
    shared: &Shared<R>,
    gateway: &Arc<G>,
    batch: BatchId,
) -> Result<bool, ControllerError>
where
    R: Record,
    G: RemoteSyncGateway<R>,
{
    let err = match resync(shared, gateway).await {
        Ok(_) => return Ok(true),
        Err(ControllerError::Gateway(err)) => err,
        Err(err) => return Err(err),
    };

    tracing::error!(collection = R::COLLECTION, batch, error = %err, "resync failed, local store may be stale");
    let mut state = lock(shared, "resync")?;
    state.sync_error = Some(err.to_string());
    state.events.emit(
        ListEvent::ResyncFailed,
        json!({ "batch": batch, "error": err.to_string() }),
    );
    Ok(false)
}

/// Discard local state and rebuild the view from a full fetch.
pub(crate) async fn resync<R, G>(shared: &Shared<R>, gateway: &Arc<G>) -> Result<usize, ControllerError>
where
    R: Record,
    G: RemoteSyncGateway<R>,
{
    tracing::warn!(collection = R::COLLECTION, "resyncing collection");
    let records = gateway.list(R::COLLECTION).await?;

    let mut state = lock(shared, "resync")?;
    state.search = None;
    let count = state.apply_snapshot(records);
    state
        .events
        .emit(ListEvent::Resynced, json!({ "count": count }));
    Ok(count)
}

/// Recreate records whose deletes already fired. Returns the server's
/// copies (with their new ids) at the original indexes, and the failures.
pub(crate) async fn recreate<R, G>(
    gateway: &Arc<G>,
    records: &[Removed<R>],
) -> (Vec<Removed<R>>, Vec<(R::Id, GatewayError)>)
where
    R: Record,
    G: RemoteSyncGateway<R>,
{
    let results = join_all(
        records
            .iter()
            .map(|removed| gateway.create(R::COLLECTION, &removed.record)),
    )
    .await;

    let mut created = Vec::new();
    let mut failed = Vec::new();
    for (removed, result) in records.iter().zip(results) {
        match result {
            Ok(record) => created.push(Removed {
                index: removed.index,
                record,
            }),
            Err(err) => {
                tracing::warn!(collection = R::COLLECTION, id = %removed.record.id(), error = %err, "recreate failed");
                failed.push((removed.record.id().clone(), err));
            }
        }
    }
    (created, failed)
}
