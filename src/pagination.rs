// src/pagination.rs - fixed-size page slicing for ordered listings

use std::num::IntErrorKind;

use actix_web::web;
use serde::Serialize;

pub const POSTS_PER_PAGE: u64 = 10;

/// Raw query string pairs. Repeated keys never fail extraction.
pub type QueryPairs = web::Query<Vec<(String, String)>>;

/// `?page=N` query. Kept as a string so junk values fall back to page 1
/// instead of failing extraction.
#[derive(Debug, Default, PartialEq)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    /// The last `page` value wins when the key is repeated.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let page = pairs
            .iter()
            .rev()
            .find(|(key, _)| key == "page")
            .map(|(_, value)| value.clone());
        Self { page }
    }
}

/// Offset/limit of the requested page inside the ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    /// Cut this window out of an already ordered, fully loaded sequence.
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(count: u64, per_page: u64) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Always at least 1: an empty sequence has one empty page.
    pub fn num_pages(&self) -> u64 {
        self.count.div_ceil(self.per_page).max(1)
    }

    /// Resolve a raw page number. Missing or non-integer input gives page 1;
    /// anything below 1 or past the end gives the last page.
    pub fn get_page(&self, raw: Option<&str>) -> PageWindow {
        let last = self.num_pages();
        let number = match raw.map(str::trim).map(str::parse::<i64>) {
            Some(Ok(n)) if n >= 1 && (n as u64) <= last => n as u64,
            Some(Ok(_)) => last,
            // Still an integer, just too far out to fit.
            Some(Err(e))
                if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) =>
            {
                last
            }
            Some(Err(_)) | None => 1,
        };
        let offset = (number - 1) * self.per_page;
        let limit = self.per_page.min(self.count.saturating_sub(offset));
        PageWindow {
            number,
            offset,
            limit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub per_page: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub has_other_pages: bool,
    pub is_empty: bool,
    /// 1-based index of the first item, 0 when the page is empty.
    pub start_index: u64,
    pub end_index: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow, paginator: &Paginator) -> Self {
        let num_pages = paginator.num_pages();
        let len = items.len() as u64;
        let (start_index, end_index) = if len == 0 {
            (0, 0)
        } else {
            (window.offset + 1, window.offset + len)
        };
        Page {
            is_empty: items.is_empty(),
            items,
            number: window.number,
            num_pages,
            count: paginator.count(),
            per_page: paginator.per_page(),
            has_next: window.number < num_pages,
            has_previous: window.number > 1,
            has_other_pages: num_pages > 1,
            start_index,
            end_index,
        }
    }
}
