use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NegCacheConfig {
    /// Seconds an address stays cleared; zero or negative turns the cache off.
    #[serde(default)]
    pub ttl: i64,

    #[serde(default = "default_rebuild_interval")]
    pub rebuild_interval: u64,
}

impl NegCacheConfig {
    pub fn ttl_secs(&self) -> Option<u64> {
        u64::try_from(self.ttl).ok().filter(|ttl| *ttl > 0)
    }

    pub fn is_enabled(&self) -> bool {
        self.ttl_secs().is_some()
    }
}

impl Default for NegCacheConfig {
    fn default() -> Self {
        Self {
            ttl: 0,
            rebuild_interval: default_rebuild_interval(),
        }
    }
}

fn default_rebuild_interval() -> u64 {
    3600
}
