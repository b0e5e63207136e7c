//! Global feed served through the fragment cache.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::feed::{FeedError, FeedScope, FeedService};
use crate::application::pagination::PageNumber;
use crate::cache::{FeedCacheKey, PageCache};
use crate::presentation::views::{self, TemplateRenderError};

#[derive(Debug, Error)]
pub enum FrontPageError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Render(#[from] TemplateRenderError),
}

/// Rendered global feed fragment and whether it came from the cache.
#[derive(Debug, Clone)]
pub struct RenderedFeed {
    pub html: Arc<str>,
    pub from_cache: bool,
}

/// Owns the page cache for the global feed.
#[derive(Clone)]
pub struct FrontPageService {
    feed: FeedService,
    cache: Arc<PageCache>,
}

impl FrontPageService {
    pub fn new(feed: FeedService, cache: Arc<PageCache>) -> Self {
        Self { feed, cache }
    }

    pub fn cache(&self) -> &Arc<PageCache> {
        &self.cache
    }

    /// Serve the stored snapshot for `page` while it is fresh; otherwise
    /// compose the feed, render it and store the result.
    ///
    /// Post writes do not touch the cache, so a snapshot can be up to one
    /// TTL behind the database.
    pub async fn get_or_render_global_feed(
        &self,
        page: PageNumber,
    ) -> Result<RenderedFeed, FrontPageError> {
        let key = FeedCacheKey::global(page);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(RenderedFeed {
                html: hit.html,
                from_cache: true,
            });
        }

        let feed = self.feed.compose_feed(&FeedScope::Global, page).await?;
        let html = views::render_feed_fragment(&feed, "/")?;
        let stored = self.cache.insert(key, html);
        debug!(
            target = "yatube::front_page",
            page = page.get(),
            resolved_page = feed.window.number,
            "global feed rendered"
        );
        Ok(RenderedFeed {
            html: stored.html,
            from_cache: false,
        })
    }

    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}
