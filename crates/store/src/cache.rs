//! Object cache and distributed-coordination client:
//! serials, named locks, and reply dedup. `CacheBackend` is the trait
//! boundary to an external memcached-compatible cluster; `InProcessCache`
//! implements it with an `ahash`-keyed `DashMap`, standing in for the
//! out-of-scope external service.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::meta::ObjectClass;

pub trait CacheBackend: Send + Sync {
    fn serial_get(&self, class: ObjectClass, usernum: u64) -> u64;
    fn serial_increment(&self, class: ObjectClass, usernum: u64) -> u64;
    fn lock_try_acquire(&self, name: &str, ttl: Duration) -> bool;
    fn lock_release(&self, name: &str);
    /// Returns `true` if a reply may be sent (and records the attempt),
    /// `false` if one was already sent within `window`.
    fn reply_dedup_try(&self, usernum: u64, autoreply: u64, to: &str, window: Duration) -> bool;
}

pub struct InProcessCache {
    serials: DashMap<(ObjectClass, u64), u64>,
    locks: DashMap<String, Instant>,
    replies: DashMap<(u64, u64, String), Instant>,
}

impl Default for InProcessCache {
    fn default() -> Self {
        InProcessCache {
            serials: DashMap::new(),
            locks: DashMap::new(),
            replies: DashMap::new(),
        }
    }
}

impl InProcessCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks with a short retry loop until the lock is acquired or
    /// `timeout` elapses "blocks (with retry)".
    pub async fn lock_acquire_blocking(&self, name: &str, ttl: Duration, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.lock_try_acquire(name, ttl) {
                return true;
            }
            if Instant::now() >= deadline {
                trc::Event::new(trc::EventType::CacheLockTimeout)
                    .ctx("name", name.to_string())
                    .log();
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl CacheBackend for InProcessCache {
    fn serial_get(&self, class: ObjectClass, usernum: u64) -> u64 {
        self.serials.get(&(class, usernum)).map(|v| *v).unwrap_or(0)
    }

    fn serial_increment(&self, class: ObjectClass, usernum: u64) -> u64 {
        let mut entry = self.serials.entry((class, usernum)).or_insert(0);
        *entry += 1;
        *entry
    }

    fn lock_try_acquire(&self, name: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let expiry = now + ttl;
        match self.locks.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(expiry);
                true
            }
            dashmap::mapref::entry::Entry::Occupied(mut slot) => {
                if *slot.get() <= now {
                    slot.insert(expiry);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn lock_release(&self, name: &str) {
        self.locks.remove(name);
    }

    fn reply_dedup_try(&self, usernum: u64, autoreply: u64, to: &str, window: Duration) -> bool {
        let now = Instant::now();
        let key = (usernum, autoreply, to.to_string());
        match self.replies.entry(key) {
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
            dashmap::mapref::entry::Entry::Occupied(mut slot) => {
                if now.duration_since(*slot.get()) >= window {
                    slot.insert(now);
                    true
                } else {
                    false
                }
            }
        }
    }
}

/// A serial value paired with a session's last-observed checkpoint;
/// unequal means the session must re-read the class from the database
///.
pub fn is_stale(checkpoint: u64, cache_value: u64) -> bool {
    checkpoint != cache_value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serials_increment_independently_per_user_and_class() {
        let cache = InProcessCache::new();
        assert_eq!(cache.serial_increment(ObjectClass::Messages, 1), 1);
        assert_eq!(cache.serial_increment(ObjectClass::Messages, 1), 2);
        assert_eq!(cache.serial_get(ObjectClass::Messages, 2), 0);
        assert_eq!(cache.serial_get(ObjectClass::Folders, 1), 0);
    }

    #[test]
    fn checkpoint_staleness_matches_equality_rule() {
        let cache = InProcessCache::new();
        let serial = cache.serial_increment(ObjectClass::Folders, 9);
        assert!(!is_stale(serial, cache.serial_get(ObjectClass::Folders, 9)));
        assert!(is_stale(serial - 1, cache.serial_get(ObjectClass::Folders, 9)));
    }

    #[test]
    fn lock_try_acquire_rejects_while_held() {
        let cache = InProcessCache::new();
        assert!(cache.lock_try_acquire("dedup:1", Duration::from_secs(5)));
        assert!(!cache.lock_try_acquire("dedup:1", Duration::from_secs(5)));
        cache.lock_release("dedup:1");
        assert!(cache.lock_try_acquire("dedup:1", Duration::from_secs(5)));
    }

    #[test]
    fn reply_dedup_suppresses_within_window() {
        let cache = InProcessCache::new();
        assert!(cache.reply_dedup_try(1, 7, "a@b.com", Duration::from_secs(86400)));
        assert!(!cache.reply_dedup_try(1, 7, "a@b.com", Duration::from_secs(86400)));
        assert!(cache.reply_dedup_try(1, 7, "c@d.com", Duration::from_secs(86400)));
    }

    #[tokio::test]
    async fn lock_acquire_blocking_times_out_when_held() {
        let cache = InProcessCache::new();
        assert!(cache.lock_try_acquire("busy", Duration::from_secs(5)));
        let acquired = cache
            .lock_acquire_blocking("busy", Duration::from_secs(5), Duration::from_millis(120))
            .await;
        assert!(!acquired);
    }
}
