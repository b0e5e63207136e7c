//! Cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_TTL_SECONDS: u64 = 20;
const DEFAULT_CAPACITY: usize = 64;
/// Longest window a fragment may be served for.
pub const MAX_TTL_SECONDS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve the global feed from the fragment cache.
    pub enabled: bool,
    /// Lifetime of a stored fragment in seconds.
    pub ttl_seconds: u64,
    /// Maximum number of fragments kept at once.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl_seconds: settings.ttl.as_secs(),
            capacity: settings.capacity.get(),
        }
    }
}

impl CacheConfig {
    /// Fragment lifetime, capped at [`MAX_TTL_SECONDS`].
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds.min(MAX_TTL_SECONDS))
    }

    /// Capacity as `NonZeroUsize`, clamping zero to one.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_twenty_second_window() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.ttl(), Duration::from_secs(20));
        assert_eq!(config.capacity_non_zero().get(), 64);
    }

    #[test]
    fn oversized_ttl_is_capped() {
        let config = CacheConfig {
            ttl_seconds: u64::MAX,
            ..CacheConfig::default()
        };
        assert_eq!(config.ttl(), Duration::from_secs(MAX_TTL_SECONDS));
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let config = CacheConfig {
            capacity: 0,
            ..CacheConfig::default()
        };
        assert_eq!(config.capacity_non_zero().get(), 1);
    }
}
