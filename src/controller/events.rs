//! Change notifications for the presentation layer.
//!
//! With the `emitter` feature, listeners registered through
//! `ListController::on` receive a JSON string payload for each event.
//! Without it, emitting is a no-op.

#[cfg(feature = "emitter")]
use event_emitter_rs::EventEmitter;
use serde_json::Value;

/// Events a list controller emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListEvent {
    /// The store was replaced by a fetch or search. `{ "count": n }`
    CollectionReplaced,
    /// Records were removed locally and the countdown started.
    /// `{ "batch": id, "ids": [...] }`
    RemovalStaged,
    /// Every remote delete of a batch succeeded. `{ "batch": id, "count": n }`
    RemovalCommitted,
    /// A batch was taken back. `{ "count": n, "recreated": bool }`
    RemovalUndone,
    /// At least one remote delete failed. `{ "batch": id, "failed": n }`
    CommitFailed,
    /// The store was refetched after a failed commit. `{ "count": n }`
    Resynced,
    /// The refetch after a failed commit failed too; the store may be
    /// stale until the next load. `{ "batch": id, "error": "..." }`
    ResyncFailed,
}

impl ListEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            ListEvent::CollectionReplaced => "collection_replaced",
            ListEvent::RemovalStaged => "removal_staged",
            ListEvent::RemovalCommitted => "removal_committed",
            ListEvent::RemovalUndone => "removal_undone",
            ListEvent::CommitFailed => "commit_failed",
            ListEvent::Resynced => "resynced",
            ListEvent::ResyncFailed => "resync_failed",
        }
    }
}

pub(crate) struct ListEvents {
    #[cfg(feature = "emitter")]
    emitter: EventEmitter,
}

impl ListEvents {
    pub(crate) fn new() -> Self {
        Self {
            #[cfg(feature = "emitter")]
            emitter: EventEmitter::new(),
        }
    }

    #[cfg(feature = "emitter")]
    pub(crate) fn on<F>(&mut self, event: ListEvent, listener: F) -> String
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.emitter.on(event.as_str(), listener)
    }

    #[cfg(feature = "emitter")]
    pub(crate) fn emit(&mut self, event: ListEvent, payload: Value) {
        self.emitter.emit(event.as_str(), payload.to_string());
    }

    #[cfg(not(feature = "emitter"))]
    pub(crate) fn emit(&mut self, _event: ListEvent, _payload: Value) {}
}
