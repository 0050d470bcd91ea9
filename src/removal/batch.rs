use tokio::sync::watch;
use tokio::time::Instant;

use crate::store::Removed;
use crate::Record;

/// Identifies a batch across the await points of its commit.
pub type BatchId = u64;

/// Ids whose remote delete succeeded, published once every delete of a
/// committing batch has settled.
pub type Settled<I> = watch::Receiver<Option<Vec<I>>>;

/// Publishing half of [`Settled`], held by whoever issues the deletes.
pub type SettleSender<I> = watch::Sender<Option<Vec<I>>>;

/// Records removed locally and waiting for their remote delete.
#[derive(Debug, Clone)]
pub struct RemovalBatch<R: Record> {
    pub id: BatchId,
    /// Removed records in collection order, with their former indexes.
    pub records: Vec<Removed<R>>,
    /// When the commit fires unless undone.
    pub deadline: Instant,
    /// Set once the remote deletes have been issued.
    pub committed: bool,
    /// Present while committing; resolves when the deletes have settled.
    pub settled: Option<Settled<R::Id>>,
}

impl<R: Record> RemovalBatch<R> {
    pub fn ids(&self) -> Vec<R::Id> {
        self.records.iter().map(|r| r.record.id().clone()).collect()
    }

    pub fn contains(&self, id: &R::Id) -> bool {
        self.records.iter().any(|r| r.record.id() == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// What `undo` has to do for the batch it took back.
#[derive(Debug, Clone)]
pub enum UndoPlan<R: Record> {
    /// The commit has not fired: re-insert locally, no remote call.
    Restore(Vec<Removed<R>>),
    /// The deletes are already on the wire. Once `settled` resolves, the
    /// records whose delete went through are recreated remotely.
    Recreate {
        records: Vec<Removed<R>>,
        settled: Settled<R::Id>,
    },
}

/// A second batch was staged while one is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageConflict {
    pub pending: BatchId,
    pub committing: bool,
}
