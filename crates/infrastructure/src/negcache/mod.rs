//! Cache of addresses recently confirmed clean.
//!
//! Entries live in a patricia trie keyed by address prefix. A side list of
//! node ids gives the sweep an ordered walk without traversing the trie; the
//! two are updated together on every insert and removal.

pub mod patricia;

use patricia::{NodeId, PatriciaTrie, Prefix};
use proxyscan_application::ports::{Clock, NegCacheEntry, NegativeCachePort};
use proxyscan_domain::NegCacheConfig;
use std::sync::Arc;
use tracing::{debug, info};

pub struct NegativeCache {
    trie: PatriciaTrie<NegCacheEntry>,
    order: Vec<NodeId>,
    ttl: Option<u64>,
    clock: Arc<dyn Clock>,
}

impl NegativeCache {
    pub fn new(config: &NegCacheConfig, clock: Arc<dyn Clock>) -> Self {
        let ttl = config.ttl_secs();
        match ttl {
            Some(ttl) => info!(ttl_secs = ttl, "Negative cache enabled"),
            None => info!("Negative cache disabled"),
        }

        Self {
            trie: PatriciaTrie::new(),
            order: Vec::new(),
            ttl,
            clock,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.ttl.is_some()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drops every entry regardless of age.
    pub fn clear(&mut self) {
        self.trie.clear();
        self.order.clear();
    }

    fn is_fresh(entry: &NegCacheEntry, now: u64, ttl: u64) -> bool {
        now.saturating_sub(entry.seen) <= ttl
    }
}

impl NegativeCachePort for NegativeCache {
    fn check(&self, ip: &str) -> Option<NegCacheEntry> {
        let ttl = self.ttl?;
        let prefix: Prefix = ip.parse().ok()?;

        let id = self.trie.search_exact(&prefix)?;
        let entry = self.trie.data(id)?;

        Self::is_fresh(entry, self.clock.now_secs(), ttl).then_some(*entry)
    }

    fn insert(&mut self, ip: &str) {
        if self.ttl.is_none() {
            return;
        }

        let prefix: Prefix = match ip.parse() {
            Ok(prefix) => prefix,
            Err(e) => {
                debug!(address = %ip, error = %e, "Ignoring malformed negative cache key");
                return;
            }
        };

        let id = self.trie.make_and_lookup(prefix);
        if self.trie.data(id).is_some() {
            return;
        }

        self.trie.set_data(
            id,
            NegCacheEntry {
                seen: self.clock.now_secs(),
            },
        );
        self.order.push(id);
    }

    fn sweep(&mut self) -> usize {
        let Some(ttl) = self.ttl else {
            let leftover = self.order.len();
            self.clear();
            return leftover;
        };

        let now = self.clock.now_secs();
        let Self { trie, order, .. } = self;
        let before = order.len();

        order.retain(|&id| {
            let fresh = trie
                .data(id)
                .is_some_and(|entry| Self::is_fresh(entry, now, ttl));
            if !fresh {
                if let Some(prefix) = trie.prefix(id) {
                    debug!(prefix = %prefix, "Negative cache entry expired");
                }
                trie.remove(id);
            }
            fresh
        });

        let removed = before - order.len();
        if removed > 0 {
            debug!(removed, remaining = order.len(), "Negative cache swept");
        }
        removed
    }
}
