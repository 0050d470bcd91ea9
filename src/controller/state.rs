use serde_json::json;

use super::config::RestorePosition;
use super::events::{ListEvent, ListEvents};
use super::SearchQuery;
use crate::removal::StagedRemovalBuffer;
use crate::selection::SelectionManager;
use crate::store::{Position, Removed, ResourceCollectionStore};
use crate::view::{self, DerivedView, PageSpec, SortSpec};
use crate::Record;

/// Everything a controller mutates, behind one lock shared with the
/// countdown task.
pub(crate) struct ListState<R: Record> {
    pub(crate) store: ResourceCollectionStore<R>,
    pub(crate) sort: SortSpec,
    pub(crate) page: PageSpec,
    pub(crate) selection: SelectionManager<R::Id>,
    pub(crate) removal: StagedRemovalBuffer<R>,
    pub(crate) search: Option<SearchQuery>,
    /// Set when a resync failed; cleared by the next snapshot.
    pub(crate) sync_error: Option<String>,
    pub(crate) events: ListEvents,
    pub(crate) disposed: bool,
}

impl<R: Record> ListState<R> {
    pub(crate) fn new(page_size: usize) -> Self {
        Self {
            store: ResourceCollectionStore::new(),
            sort: SortSpec::none(),
            page: PageSpec::new(page_size),
            selection: SelectionManager::new(),
            removal: StagedRemovalBuffer::new(),
            search: None,
            sync_error: None,
            events: ListEvents::new(),
            disposed: false,
        }
    }

    pub(crate) fn view(&self) -> DerivedView<R> {
        view::derive(self.store.records(), &self.sort, &self.page)
    }

    pub(crate) fn visible_ids(&self) -> Vec<R::Id> {
        self.view().ids()
    }

    /// Move to `page` (clamped). A real page change clears the selection.
    pub(crate) fn go_to_page(&mut self, page: usize) -> usize {
        let target = self.page.clamp(page, self.store.len());
        if target != self.page.current_page {
            self.page.current_page = target;
            self.selection.clear();
        }
        target
    }

    /// Replace the store with an authoritative snapshot, re-applying the
    /// pending optimistic removal on top of it.
    pub(crate) fn apply_snapshot(&mut self, records: Vec<R>) -> usize {
        let pending = self.removal.pending();
        let records: Vec<R> = match pending {
            Some(batch) => records
                .into_iter()
                .filter(|r| !batch.contains(r.id()))
                .collect(),
            None => records,
        };

        self.store.replace_all(records);
        self.sync_error = None;
        self.prune_selection();
        let current = self.page.current_page;
        self.go_to_page(current);

        let count = self.store.len();
        self.events
            .emit(ListEvent::CollectionReplaced, json!({ "count": count }));
        count
    }

    pub(crate) fn prune_selection(&mut self) {
        let store = &self.store;
        self.selection.retain(|id| store.contains(id));
    }

    /// Put undone records back into the store.
    pub(crate) fn restore(&mut self, mut records: Vec<Removed<R>>, position: RestorePosition) {
        match position {
            RestorePosition::Head => {
                for removed in records.into_iter().rev() {
                    self.store.insert(removed.record, Position::Head);
                }
            }
            RestorePosition::OriginalIndex => {
                records.sort_by_key(|r| r.index);
                for removed in records {
                    self.store
                        .insert(removed.record, Position::Index(removed.index));
                }
            }
        }
    }
}
