mod clock;
mod negative_cache;
mod resolution_handler;

pub use clock::Clock;
pub use negative_cache::{NegCacheEntry, NegativeCachePort};
pub use resolution_handler::ResolutionHandler;

// Re-export for convenience
pub use proxyscan_domain::DnsResult;
