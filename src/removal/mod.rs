//! StagedRemovalBuffer - optimistic delete with a grace period.
//!
//! The caller removes records from the store first, then stages them here.
//! The buffer owns the single pending batch and the handle of the countdown
//! task that will commit it. Cancelling the countdown is an explicit call,
//! never a side effect of dropping a closure.
//!
//! Lifecycle of a batch:
//!
//! ```text
//! stage ──► pending ──(deadline)──► begin_commit ──► finish_commit
//!              │                         │
//!              └──── take_for_undo ◄─────┘
//!              (Restore)           (Recreate)
//! ```

mod batch;

use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::store::Removed;
use crate::Record;

pub use batch::{BatchId, RemovalBatch, SettleSender, Settled, StageConflict, UndoPlan};

/// Single-slot holder of the pending removal batch and its countdown.
#[derive(Debug)]
pub struct StagedRemovalBuffer<R: Record> {
    slot: Option<RemovalBatch<R>>,
    timer: Option<AbortHandle>,
    next_batch: BatchId,
}

impl<R: Record> Default for StagedRemovalBuffer<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> StagedRemovalBuffer<R> {
    pub fn new() -> Self {
        Self {
            slot: None,
            timer: None,
            next_batch: 1,
        }
    }

    /// Whether a batch occupies the slot (committing or not).
    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    pub fn pending(&self) -> Option<&RemovalBatch<R>> {
        self.slot.as_ref()
    }

    /// Ids held by the pending batch.
    pub fn pending_ids(&self) -> Vec<R::Id> {
        self.slot.as_ref().map(RemovalBatch::ids).unwrap_or_default()
    }

    /// Record a new batch due at `deadline`. Rejected while the slot is
    /// occupied.
    pub fn stage(
        &mut self,
        records: Vec<Removed<R>>,
        deadline: Instant,
    ) -> Result<BatchId, StageConflict> {
        if let Some(conflict) = self.conflict() {
            return Err(conflict);
        }

        let id = self.next_batch;
        self.next_batch += 1;
        tracing::debug!(collection = R::COLLECTION, batch = id, count = records.len(), "removal staged");
        self.slot = Some(RemovalBatch {
            id,
            records,
            deadline,
            committed: false,
            settled: None,
        });
        Ok(id)
    }

    /// Add records to the pending batch under its existing deadline. Only
    /// possible before the commit has fired.
    ///
    /// `records` carry indexes into the store as it is now, without the
    /// pending records; they are shifted so every index in the batch refers
    /// to the store before the batch was staged.
    pub fn fold(&mut self, records: Vec<Removed<R>>) -> Result<BatchId, StageConflict> {
        match self.slot.as_mut() {
            Some(batch) if !batch.committed => {
                tracing::debug!(collection = R::COLLECTION, batch = batch.id, added = records.len(), "removal folded into pending batch");
                let mut taken: Vec<usize> = batch.records.iter().map(|r| r.index).collect();
                taken.sort_unstable();
                let shifted: Vec<Removed<R>> = records
                    .into_iter()
                    .map(|removed| Removed {
                        index: original_index(&taken, removed.index),
                        record: removed.record,
                    })
                    .collect();
                batch.records.extend(shifted);
                Ok(batch.id)
            }
            Some(batch) => Err(StageConflict {
                pending: batch.id,
                committing: true,
            }),
            None => Err(StageConflict {
                pending: 0,
                committing: false,
            }),
        }
    }

    fn conflict(&self) -> Option<StageConflict> {
        self.slot.as_ref().map(|batch| StageConflict {
            pending: batch.id,
            committing: batch.committed,
        })
    }

    /// Hand over the countdown task. A previously armed countdown is
    /// cancelled.
    pub fn arm(&mut self, timer: AbortHandle) {
        self.cancel_timer();
        self.timer = Some(timer);
    }

    /// Cancel the countdown, if any. The batch stays in the slot.
    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Mark `batch` committed and return its records for the remote
    /// deletes, with the sender that reports which deletes went through.
    /// `None` if the batch was undone, abandoned or already committing.
    ///
    /// Releases the countdown handle without aborting it: the countdown
    /// task itself is usually the caller.
    pub fn begin_commit(&mut self, batch: BatchId) -> Option<(Vec<R>, SettleSender<R::Id>)> {
        let pending = self.slot.as_mut()?;
        if pending.id != batch || pending.committed {
            return None;
        }
        let (settle, settled) = watch::channel(None);
        pending.committed = true;
        pending.settled = Some(settled);
        self.timer = None;
        let records = pending.records.iter().map(|r| r.record.clone()).collect();
        Some((records, settle))
    }

    /// Discard `batch` after its deletes resolved. Returns false when the
    /// slot no longer holds it (undone while the deletes were in flight).
    pub fn finish_commit(&mut self, batch: BatchId) -> bool {
        match &self.slot {
            Some(pending) if pending.id == batch => {
                self.slot = None;
                true
            }
            _ => false,
        }
    }

    /// Cancel the countdown and take the batch back.
    pub fn take_for_undo(&mut self) -> Option<UndoPlan<R>> {
        self.cancel_timer();
        let batch = self.slot.take()?;
        tracing::debug!(collection = R::COLLECTION, batch = batch.id, committed = batch.committed, "removal undone");
        Some(match batch.settled {
            Some(settled) => UndoPlan::Recreate {
                records: batch.records,
                settled,
            },
            None => UndoPlan::Restore(batch.records),
        })
    }

    /// Cancel the countdown and drop the batch without any remote call.
    pub fn abandon(&mut self) -> Option<RemovalBatch<R>> {
        self.cancel_timer();
        self.slot.take()
    }
}

/// Map an index into a store missing the `taken` positions back to the
/// store that still had them. `taken` is sorted.
fn original_index(taken: &[usize], index: usize) -> usize {
    let mut original = index;
    for &position in taken {
        if position <= original {
            original += 1;
        } else {
            break;
        }
    }
    original
}
