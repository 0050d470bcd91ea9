//! ListController - the operation surface a list screen consumes.
//!
//! Composes the collection store, the derived view, the page-scoped
//! selection and the staged removal buffer over one `RemoteSyncGateway`.
//! Local optimistic edits (`remove_one`, `remove_selected`, `undo` before the
//! deadline) apply synchronously; remote calls happen at `load`, `search`,
//! `clear_search`, `create`, `update` and when a removal batch commits.
//!
//! ## Example
//!
//! ```ignore
//! use tracknest::{ControllerConfig, EntryGroup, InMemoryGateway, ListController, Role};
//!
//! let gateway = InMemoryGateway::<EntryGroup>::sequential();
//! let groups = ListController::new(gateway, Role::Admin, ControllerConfig::default());
//!
//! groups.load().await?;
//! groups.set_sort("name")?;
//! groups.remove_one(&2)?;      // gone from the view now
//! groups.undo().await?;        // back at the head, no remote call
//! ```

mod commit;
mod config;
mod error;
mod events;
mod state;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::json;
use tokio::runtime::Handle;
use tokio::time::Instant;

use crate::gateway::{GatewayError, RemoteSyncGateway};
use crate::removal::{BatchId, UndoPlan};
use crate::session::{Capability, Role, Session};
use crate::store::Position;
use crate::view::{DerivedView, PageSpec, SortSpec};
use crate::Record;

use commit::{OnFailure, Shared};
use state::ListState;

pub use commit::CommitOutcome;
pub use config::{ControllerConfig, PageResetPolicy, RestorePosition, StagingConflict};
pub use error::ControllerError;
pub use events::ListEvent;

/// The remote query currently backing the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub field: String,
    pub term: String,
}

/// What `undo` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoOutcome {
    NothingPending,
    /// Re-inserted locally before the deadline.
    Restored(usize),
    /// The deletes had already fired; the records were created again and
    /// may carry new ids.
    Recreated(usize),
}

/// Controller for one collection of `R`.
///
/// Dropping the controller cancels the removal countdown; a pending batch
/// is abandoned without any remote call.
pub struct ListController<R: Record, G: RemoteSyncGateway<R>> {
    gateway: Arc<G>,
    shared: Shared<R>,
    config: ControllerConfig,
    role: Role,
}

impl<R: Record, G: RemoteSyncGateway<R>> ListController<R, G> {
    /// Create a controller. `role` is derived once from the session and
    /// gates the bulk operations.
    pub fn new(gateway: G, role: Role, config: ControllerConfig) -> Self {
        Self::with_shared_gateway(Arc::new(gateway), role, config)
    }

    /// Create a controller over a gateway shared with other controllers.
    pub fn with_shared_gateway(gateway: Arc<G>, role: Role, config: ControllerConfig) -> Self {
        let page_size = config.page_size;
        let config = config.with_page_size(page_size);
        Self {
            gateway,
            shared: Arc::new(Mutex::new(ListState::new(config.page_size))),
            config,
            role,
        }
    }

    /// Create a controller for the user behind `session`.
    pub fn from_session(gateway: G, session: &Session, config: ControllerConfig) -> Self {
        Self::new(gateway, session.role(), config)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    fn lock(&self, operation: &'static str) -> Result<MutexGuard<'_, ListState<R>>, ControllerError> {
        commit::lock(&self.shared, operation)
    }

    fn ensure_live(&self, operation: &'static str) -> Result<(), ControllerError> {
        self.lock(operation).map(|_| ())
    }

    /// Refuse record edits the role may not make on this collection.
    fn authorize(&self, operation: &'static str) -> Result<(), ControllerError> {
        match R::REQUIRES {
            Some(capability) if !self.role.allows(capability) => {
                tracing::warn!(collection = R::COLLECTION, role = ?self.role, operation, "edit refused");
                Err(ControllerError::Forbidden(capability))
            }
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Fetching
    // ========================================================================

    /// Replace the store with the full remote collection.
    ///
    /// Records of a pending removal batch stay hidden.
    pub async fn load(&self) -> Result<usize, ControllerError> {
        self.ensure_live("load")?;
        let records = self.gateway.list(R::COLLECTION).await?;

        let mut state = self.lock("load")?;
        state.search = None;
        let count = state.apply_snapshot(records);
        tracing::info!(collection = R::COLLECTION, count, "collection loaded");
        Ok(count)
    }

    /// Replace the store with the records whose `field` contains `term`.
    ///
    /// On success the pending removal batch is committed right away and the
    /// view returns to page 1. If the first query fails nothing changes. If
    /// a delete of the pending batch fails and the query cannot be repeated,
    /// the store is resynced from a full fetch before the error is returned.
    pub async fn search(&self, field: &str, term: &str) -> Result<usize, ControllerError> {
        let field = field.trim();
        let term = term.trim();
        if field.is_empty() {
            return Err(ControllerError::InvalidSearch("search field is blank".into()));
        }
        if term.is_empty() {
            return Err(ControllerError::InvalidSearch("search term is blank".into()));
        }
        self.ensure_live("search")?;

        let records = self.gateway.search(R::COLLECTION, field, term).await?;
        let records = match self.resolve_pending().await? {
            Some((ids, CommitOutcome::Committed { .. })) => records
                .into_iter()
                .filter(|r| !ids.contains(r.id()))
                .collect(),
            Some((_, CommitOutcome::Failed { .. })) => {
                match self.gateway.search(R::COLLECTION, field, term).await {
                    Ok(records) => records,
                    Err(err) => return Err(self.recover_after_failed_commit(err).await),
                }
            }
            _ => records,
        };

        let query = SearchQuery {
            field: field.to_string(),
            term: term.to_string(),
        };
        let count = self.replace_from_query(records, Some(query))?;
        tracing::info!(collection = R::COLLECTION, field, term, count, "search applied");
        Ok(count)
    }

    /// Drop the active search and show the full collection again.
    ///
    /// Resolves the pending removal batch the way `search` does.
    pub async fn clear_search(&self) -> Result<usize, ControllerError> {
        self.ensure_live("clear_search")?;

        let records = self.gateway.list(R::COLLECTION).await?;
        let records = match self.resolve_pending().await? {
            Some((ids, CommitOutcome::Committed { .. })) => records
                .into_iter()
                .filter(|r| !ids.contains(r.id()))
                .collect(),
            Some((_, CommitOutcome::Failed { .. })) => match self.gateway.list(R::COLLECTION).await {
                Ok(records) => records,
                Err(err) => return Err(self.recover_after_failed_commit(err).await),
            },
            _ => records,
        };

        let count = self.replace_from_query(records, None)?;
        tracing::info!(collection = R::COLLECTION, count, "search cleared");
        Ok(count)
    }

    /// A delete failed while resolving the pending batch and the query that
    /// would have replaced the store failed too: the store still lacks the
    /// records the server kept, so resync before surfacing `err`.
    async fn recover_after_failed_commit(&self, err: GatewayError) -> ControllerError {
        tracing::warn!(collection = R::COLLECTION, error = %err, "re-query after failed commit failed");
        if let Err(resync) = commit::resync(&self.shared, &self.gateway).await {
            tracing::error!(collection = R::COLLECTION, error = %resync, "resync after failed commit failed");
            if let Ok(mut state) = self.lock("search") {
                state.sync_error = Some(resync.to_string());
            }
        }
        err.into()
    }

    fn replace_from_query(
        &self,
        records: Vec<R>,
        query: Option<SearchQuery>,
    ) -> Result<usize, ControllerError> {
        let mut state = self.lock("search")?;
        state.search = query;
        state.selection.clear();
        state.page.current_page = 1;
        Ok(state.apply_snapshot(records))
    }

    /// Commit the pending batch now, ahead of a store replacement. Returns
    /// the batch's ids and the outcome, or `None` when nothing is pending.
    async fn resolve_pending(&self) -> Result<Option<(Vec<R::Id>, CommitOutcome)>, ControllerError> {
        let (batch, ids) = {
            let mut state = self.lock("search")?;
            let Some(pending) = state.removal.pending() else {
                return Ok(None);
            };
            let resolved = (pending.id, pending.ids());
            state.removal.cancel_timer();
            resolved
        };

        tracing::debug!(collection = R::COLLECTION, batch, "resolving pending removal before replacing the store");
        let outcome = commit::commit_batch(&self.shared, &self.gateway, batch, OnFailure::Ignore).await?;
        Ok(Some((ids, outcome)))
    }

    // ========================================================================
    // Sorting and paging
    // ========================================================================

    /// Sort by `key`, or flip the direction if already sorted by it.
    pub fn set_sort(&self, key: &str) -> Result<SortSpec, ControllerError> {
        let mut state = self.lock("set_sort")?;
        state.sort = state.sort.toggled(key);

        match self.config.page_reset {
            PageResetPolicy::FirstPage => {
                state.go_to_page(1);
            }
            PageResetPolicy::KeepPage => {
                let current = state.page.current_page;
                state.go_to_page(current);
            }
        }

        // Rows that moved off the page leave the selection.
        let visible = state.visible_ids();
        state.selection.retain(|id| visible.contains(id));

        tracing::debug!(collection = R::COLLECTION, key, direction = ?state.sort.direction, "sort changed");
        Ok(state.sort.clone())
    }

    /// Go to page `page` (1-based, clamped). Returns the page shown.
    pub fn set_page(&self, page: usize) -> Result<usize, ControllerError> {
        let mut state = self.lock("set_page")?;
        Ok(state.go_to_page(page))
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Toggle the selection of a row on the current page. Returns whether the
    /// row is now selected; rows off the page cannot be selected.
    pub fn select(&self, id: &R::Id) -> Result<bool, ControllerError> {
        let mut state = self.lock("select")?;
        if !state.visible_ids().contains(id) {
            return Ok(false);
        }
        Ok(state.selection.toggle(id))
    }

    /// Select every row on the current page, or clear the selection.
    pub fn select_all_visible(&self, selected: bool) -> Result<(), ControllerError> {
        let mut state = self.lock("select_all_visible")?;
        if selected {
            let visible = state.visible_ids();
            state.selection.select_all(&visible);
        } else {
            state.selection.clear();
        }
        Ok(())
    }

    pub fn is_selected(&self, id: &R::Id) -> Result<bool, ControllerError> {
        Ok(self.lock("is_selected")?.selection.is_selected(id))
    }

    /// Whether every row of a non-empty page is selected.
    pub fn all_visible_selected(&self) -> Result<bool, ControllerError> {
        let state = self.lock("all_visible_selected")?;
        Ok(state.selection.all_selected(&state.visible_ids()))
    }

    pub fn selected_count(&self) -> Result<usize, ControllerError> {
        Ok(self.lock("selected_count")?.selection.len())
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Remove one record locally and start the undo countdown.
    pub fn remove_one(&self, id: &R::Id) -> Result<BatchId, ControllerError> {
        self.authorize("remove_one")?;
        let mut state = self.lock("remove_one")?;
        self.stage(&mut state, vec![id.clone()])
    }

    /// Remove the selected rows of the current page locally and start the
    /// undo countdown. Requires `Capability::BulkDelete`.
    pub fn remove_selected(&self) -> Result<BatchId, ControllerError> {
        if !self.role.allows(Capability::BulkDelete) {
            tracing::warn!(collection = R::COLLECTION, role = ?self.role, "bulk removal refused");
            return Err(ControllerError::Forbidden(Capability::BulkDelete));
        }
        self.authorize("remove_selected")?;

        let mut state = self.lock("remove_selected")?;
        let visible = state.visible_ids();
        let ids = state.selection.visible_selection(&visible);
        if ids.is_empty() {
            return Err(ControllerError::NothingSelected);
        }
        self.stage(&mut state, ids)
    }

    fn stage(&self, state: &mut ListState<R>, ids: Vec<R::Id>) -> Result<BatchId, ControllerError> {
        let runtime = Handle::try_current().map_err(|_| ControllerError::NoRuntime)?;

        let fold = match state.removal.pending() {
            Some(pending) if pending.committed => {
                return Err(ControllerError::RemovalPending {
                    batch: pending.id,
                    committing: true,
                })
            }
            Some(pending) => match self.config.staging_conflict {
                StagingConflict::Reject => {
                    return Err(ControllerError::RemovalPending {
                        batch: pending.id,
                        committing: false,
                    })
                }
                StagingConflict::Fold => true,
            },
            None => false,
        };

        let removed = state.store.remove(&ids);
        if removed.is_empty() {
            let wanted: Vec<String> = ids.iter().map(ToString::to_string).collect();
            return Err(ControllerError::NotFound(wanted.join(", ")));
        }
        let removed_ids: Vec<R::Id> = removed.iter().map(|r| r.record.id().clone()).collect();

        let batch = if fold {
            state.removal.fold(removed)?
        } else {
            let deadline = Instant::now() + self.config.undo_window;
            let batch = state.removal.stage(removed, deadline)?;
            let countdown = runtime.spawn(commit::countdown(
                Arc::clone(&self.shared),
                Arc::clone(&self.gateway),
                batch,
                deadline,
            ));
            state.removal.arm(countdown.abort_handle());
            batch
        };

        state.selection.retain(|id| !removed_ids.contains(id));
        let current = state.page.current_page;
        state.go_to_page(current);

        let labels: Vec<String> = removed_ids.iter().map(ToString::to_string).collect();
        tracing::info!(collection = R::COLLECTION, batch, ids = ?labels, "records removed pending commit");
        state.events.emit(
            ListEvent::RemovalStaged,
            json!({ "batch": batch, "ids": labels }),
        );
        Ok(batch)
    }

    /// Take back the pending batch.
    ///
    /// Before the deadline the records are re-inserted locally with no
    /// remote call. Once the deletes have fired, undo waits for them to
    /// settle, then creates again each record whose delete succeeded; records
    /// whose delete failed are picked up by a resync. Records that cannot be
    /// recreated are reported in `ControllerError::RecreateFailed`.
    pub async fn undo(&self) -> Result<UndoOutcome, ControllerError> {
        let plan = {
            let mut state = self.lock("undo")?;
            match state.removal.take_for_undo() {
                Some(plan) => plan,
                None => return Ok(UndoOutcome::NothingPending),
            }
        };

        match plan {
            UndoPlan::Restore(records) => {
                let count = records.len();
                let mut state = self.lock("undo")?;
                state.restore(records, self.config.restore_position);
                state.events.emit(
                    ListEvent::RemovalUndone,
                    json!({ "count": count, "recreated": false }),
                );
                tracing::info!(collection = R::COLLECTION, count, "removal undone");
                Ok(UndoOutcome::Restored(count))
            }
            UndoPlan::Recreate { records, mut settled } => {
                tracing::warn!(collection = R::COLLECTION, count = records.len(), "undo after commit fired, waiting for deletes");
                // The sender is dropped without a value only if the commit
                // task died mid-flight; treat that as unknown.
                let deleted = match settled.wait_for(Option::is_some).await {
                    Ok(deleted) => deleted.clone(),
                    Err(_) => None,
                };

                let (gone, kept): (Vec<_>, Vec<_>) = match &deleted {
                    Some(ids) => records
                        .into_iter()
                        .partition(|removed| ids.contains(removed.record.id())),
                    None => (Vec::new(), records),
                };

                let (mut created, mut failed) = commit::recreate(&self.gateway, &gone).await;
                let count = created.len() + kept.len();
                {
                    let mut state = self.lock("undo")?;
                    // Records whose delete failed never left the server.
                    if deleted.is_some() {
                        created.extend(kept);
                    }
                    state.restore(created, self.config.restore_position);
                    state.events.emit(
                        ListEvent::RemovalUndone,
                        json!({ "count": count, "recreated": true }),
                    );
                }

                if deleted.is_none() {
                    commit::resync(&self.shared, &self.gateway).await?;
                }

                if failed.is_empty() {
                    return Ok(UndoOutcome::Recreated(count));
                }
                let lost = failed.iter().map(|(id, _)| id.to_string()).collect();
                let (_, cause) = failed.remove(0);
                Err(ControllerError::RecreateFailed {
                    restored: count,
                    lost,
                    cause,
                })
            }
        }
    }

    /// Commit the pending batch now instead of waiting for the deadline.
    pub async fn commit_pending(&self) -> Result<CommitOutcome, ControllerError> {
        let batch = {
            let mut state = self.lock("commit_pending")?;
            let Some(pending) = state.removal.pending() else {
                return Ok(CommitOutcome::Skipped);
            };
            let batch = pending.id;
            state.removal.cancel_timer();
            batch
        };
        commit::commit_batch(&self.shared, &self.gateway, batch, OnFailure::Resync).await
    }

    /// Ids removed locally and still waiting for their remote delete.
    pub fn pending_removal(&self) -> Result<Vec<R::Id>, ControllerError> {
        Ok(self.lock("pending_removal")?.removal.pending_ids())
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Create a record remotely and append the server's copy to the store.
    pub async fn create(&self, record: R) -> Result<R, ControllerError> {
        self.authorize("create")?;
        self.ensure_live("create")?;
        let created = self.gateway.create(R::COLLECTION, &record).await?;

        let mut state = self.lock("create")?;
        state.store.insert(created.clone(), Position::Tail);
        tracing::info!(collection = R::COLLECTION, id = %created.id(), "record created");
        Ok(created)
    }

    /// Update a record remotely and replace the local copy in place.
    pub async fn update(&self, id: &R::Id, record: R) -> Result<R, ControllerError> {
        self.authorize("update")?;
        self.ensure_live("update")?;
        let updated = self.gateway.update(R::COLLECTION, id, &record).await?;

        let mut state = self.lock("update")?;
        state.store.upsert(updated.clone());
        tracing::info!(collection = R::COLLECTION, id = %id, "record updated");
        Ok(updated)
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// The current page, sorted.
    pub fn view(&self) -> Result<DerivedView<R>, ControllerError> {
        Ok(self.lock("view")?.view())
    }

    pub fn sort(&self) -> Result<SortSpec, ControllerError> {
        Ok(self.lock("sort")?.sort.clone())
    }

    pub fn page(&self) -> Result<PageSpec, ControllerError> {
        Ok(self.lock("page")?.page)
    }

    /// Every record in the store, in collection order.
    pub fn records(&self) -> Result<Vec<R>, ControllerError> {
        Ok(self.lock("records")?.store.records().to_vec())
    }

    pub fn active_search(&self) -> Result<Option<SearchQuery>, ControllerError> {
        Ok(self.lock("active_search")?.search.clone())
    }

    /// Why the last resync failed, while the store may be stale. Cleared by
    /// the next successful load, search or resync.
    pub fn sync_error(&self) -> Result<Option<String>, ControllerError> {
        Ok(self.lock("sync_error")?.sync_error.clone())
    }

    /// Register a listener. The payload is a JSON string.
    #[cfg(feature = "emitter")]
    pub fn on<F>(&self, event: ListEvent, listener: F) -> Result<String, ControllerError>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        Ok(self.lock("on")?.events.on(event, listener))
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Cancel the countdown and abandon the pending batch without a remote
    /// call. Every later operation fails with `ControllerError::Disposed`.
    pub fn dispose(&self) {
        // A panic elsewhere must not keep the countdown alive.
        let mut state = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        if state.disposed {
            return;
        }
        state.disposed = true;
        if let Some(batch) = state.removal.abandon() {
            tracing::debug!(collection = R::COLLECTION, batch = batch.id, "pending removal abandoned on dispose");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock().map(|s| s.disposed).unwrap_or(true)
    }
}

impl<R: Record, G: RemoteSyncGateway<R>> Drop for ListController<R, G> {
    fn drop(&mut self) {
        self.dispose();
    }
}
