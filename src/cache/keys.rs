use crate::application::pagination::PageNumber;

/// Feed a cached fragment belongs to. Only the global feed is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheScope {
    GlobalFeed,
}

impl CacheScope {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheScope::GlobalFeed => "global",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedCacheKey {
    pub scope: CacheScope,
    pub page: PageNumber,
}

impl FeedCacheKey {
    pub fn global(page: PageNumber) -> Self {
        Self {
            scope: CacheScope::GlobalFeed,
            page,
        }
    }
}
