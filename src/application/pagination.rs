//! Page-number pagination shared by every feed.

use serde::Deserialize;

/// Posts shown per feed page.
pub const PAGE_SIZE: u32 = 10;

/// Page requested by a client, 1-indexed.
///
/// Unparseable input and values below one both resolve to the first page;
/// clamping against the last page happens in [`PageWindow::resolve`] once the
/// candidate count is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageNumber(u32);

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber(1);

    pub fn new(value: i64) -> Self {
        if value < 1 {
            return Self::FIRST;
        }
        Self(u32::try_from(value).unwrap_or(u32::MAX))
    }

    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.trim().parse::<i64>().ok())
            .map(Self::new)
            .unwrap_or(Self::FIRST)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

/// `?page=` query string accepted by feed routes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

impl PageQuery {
    pub fn page_number(&self) -> PageNumber {
        PageNumber::parse(self.page.as_deref())
    }
}

/// Resolved position of one page inside a candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u32,
    pub num_pages: u32,
    pub total: u64,
    pub page_size: u32,
}

impl PageWindow {
    /// Clamp `requested` into `1..=num_pages`. An empty set still has one
    /// (empty) page.
    pub fn resolve(requested: PageNumber, total: u64, page_size: u32) -> Self {
        let size = u64::from(page_size.max(1));
        let pages = total.div_ceil(size).max(1);
        let num_pages = u32::try_from(pages).unwrap_or(u32::MAX);
        let number = requested.get().min(num_pages);
        Self {
            number,
            num_pages,
            total,
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_number(&self) -> Option<u32> {
        self.has_next().then_some(self.number + 1)
    }

    pub fn previous_number(&self) -> Option<u32> {
        self.has_previous().then_some(self.number - 1)
    }
}

/// One page of items plus its window.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.window.has_next()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
