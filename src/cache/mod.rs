//! Fragment cache for the global feed.
//!
//! Rendered feed fragments are kept per page number for a fixed window.
//! Writes to posts never invalidate an entry; it simply ages out.
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_seconds = 20
//! capacity = 64
//! ```

mod config;
mod keys;
mod lock;
mod store;

pub use config::{CacheConfig, MAX_TTL_SECONDS};
pub use keys::{CacheScope, FeedCacheKey};
pub use store::{CachedFragment, PageCache};
