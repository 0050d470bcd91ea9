//! SortFilterPaginator - the derived, rendered view of a collection.
//!
//! Pure derivation: sorting and paging never touch the store.

mod page;
mod sort;

use crate::Record;

pub use page::PageSpec;
pub use sort::{SortDirection, SortSpec};

/// One rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedView<R> {
    /// Rows of the current page, in display order.
    pub page_items: Vec<R>,
    pub total_pages: usize,
    /// The page actually shown, clamped into `1..=total_pages`.
    pub current_page: usize,
    pub total_count: usize,
    /// `"Showing rows {first} - {last} of {total}"`.
    pub range_label: String,
}

impl<R: Record> DerivedView<R> {
    /// Ids of the rows on this page.
    pub fn ids(&self) -> Vec<R::Id> {
        self.page_items.iter().map(|r| r.id().clone()).collect()
    }
}

/// Sort `records` under `sort`, then cut out the page described by `page`.
pub fn derive<R: Record>(records: &[R], sort: &SortSpec, page: &PageSpec) -> DerivedView<R> {
    let sorted = sort.apply(records);
    let total_count = sorted.len();
    let (start, end) = page.bounds(total_count);

    let range_label = if total_count == 0 {
        "Showing rows 0 - 0 of 0".to_string()
    } else {
        format!("Showing rows {} - {} of {}", start + 1, end, total_count)
    };

    DerivedView {
        page_items: sorted[start..end].iter().map(|r| (*r).clone()).collect(),
        total_pages: page.total_pages(total_count),
        current_page: page.clamp(page.current_page, total_count),
        total_count,
        range_label,
    }
}
