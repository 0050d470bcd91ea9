use serde::{Deserialize, Serialize};

/// Page size and 1-based current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    pub page_size: usize,
    pub current_page: usize,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PageSpec {
    /// First page of `page_size` rows. A zero size is treated as one.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            current_page: 1,
        }
    }

    pub fn at(mut self, page: usize) -> Self {
        self.current_page = page.max(1);
        self
    }

    /// `ceil(count / page_size)`, never less than one.
    pub fn total_pages(&self, count: usize) -> usize {
        count.div_ceil(self.page_size.max(1)).max(1)
    }

    /// Clamp `page` into `1..=total_pages(count)`.
    pub fn clamp(&self, page: usize, count: usize) -> usize {
        page.clamp(1, self.total_pages(count))
    }

    /// Index range of the current page within `count` rows.
    pub fn bounds(&self, count: usize) -> (usize, usize) {
        let page = self.clamp(self.current_page, count);
        let start = ((page - 1) * self.page_size).min(count);
        let end = (page * self.page_size).min(count);
        (start, end)
    }
}
