/// A cleared address as remembered by the negative cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegCacheEntry {
    /// Seconds since the epoch at which the address was last confirmed clean.
    pub seen: u64,
}

/// What the scanning side needs from the negative cache.
pub trait NegativeCachePort {
    /// Returns the entry only while it is still fresh.
    fn check(&self, ip: &str) -> Option<NegCacheEntry>;

    /// Records `ip` as clean; a no-op if it is already present or malformed.
    fn insert(&mut self, ip: &str);

    /// Physically drops every stale entry, returning how many went.
    fn sweep(&mut self) -> usize;
}
