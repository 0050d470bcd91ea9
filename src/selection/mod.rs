//! SelectionManager - the set of checked rows.
//!
//! Selection is scoped to the rendered page: "select all" selects the
//! visible rows only, and the controller clears the set whenever the page
//! changes. Ids whose records leave the store are pruned.

use std::collections::HashSet;
use std::hash::Hash;

/// Set of selected record ids.
#[derive(Debug, Clone)]
pub struct SelectionManager<I> {
    selected: HashSet<I>,
}

impl<I> Default for SelectionManager<I> {
    fn default() -> Self {
        Self {
            selected: HashSet::new(),
        }
    }
}

impl<I: Clone + Eq + Hash> SelectionManager<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip one id. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, id: &I) -> bool {
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.clone());
            true
        }
    }

    /// Select exactly the visible ids.
    pub fn select_all(&mut self, visible: &[I]) {
        self.selected = visible.iter().cloned().collect();
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, id: &I) -> bool {
        self.selected.contains(id)
    }

    /// Whether every visible id is selected. False for an empty page.
    pub fn all_selected(&self, visible: &[I]) -> bool {
        !visible.is_empty() && visible.iter().all(|id| self.selected.contains(id))
    }

    /// Drop every id for which `present` is false.
    pub fn retain(&mut self, present: impl Fn(&I) -> bool) {
        self.selected.retain(|id| present(id));
    }

    /// Selected ids among `visible`, in visible order.
    pub fn visible_selection(&self, visible: &[I]) -> Vec<I> {
        visible
            .iter()
            .filter(|id| self.selected.contains(*id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
