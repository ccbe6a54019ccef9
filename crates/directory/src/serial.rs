//! Per-session checkpoints against the cache's serial counters
//!: equal to the cache value means the session's cached
//! view is authoritative; unequal means a refetch is required before the
//! checkpoint is advanced to the newly-observed value.

use std::collections::HashMap;

use store::cache::CacheBackend;
use store::meta::ObjectClass;

#[derive(Default)]
pub struct Checkpoints {
    observed: HashMap<ObjectClass, u64>,
}

impl Checkpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the session's view of `class` is stale relative
    /// to the cache and must be refetched, and advances the checkpoint to
    /// match regardless (the caller re-reads only when this returns true).
    pub fn check_and_advance(&mut self, cache: &dyn CacheBackend, usernum: u64, class: ObjectClass) -> bool {
        let current = cache.serial_get(class, usernum);
        let checkpoint = self.observed.get(&class).copied().unwrap_or(0);
        let stale = store::cache::is_stale(checkpoint, current);
        self.observed.insert(class, current);
        stale
    }

    pub fn get(&self, class: ObjectClass) -> u64 {
        self.observed.get(&class).copied().unwrap_or(0)
    }
}
