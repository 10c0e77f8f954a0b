#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TotalCount {
    Known(u64),
    NeedsLastPage(u32),
}

// Assumes every page before the last holds exactly `per_page` items.
pub(crate) fn count_from_page(page: u32, total_pages: u32, per_page: u32, items: usize) -> TotalCount {
    if total_pages <= 1 {
        return TotalCount::Known(items as u64);
    }
    if page >= total_pages {
        return TotalCount::Known(total_from_last_page(total_pages, per_page, items));
    }
    TotalCount::NeedsLastPage(total_pages)
}

pub(crate) fn total_from_last_page(total_pages: u32, per_page: u32, last_page_items: usize) -> u64 {
    u64::from(total_pages.saturating_sub(1)) * u64::from(per_page) + last_page_items as u64
}
