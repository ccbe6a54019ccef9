//! Inbound connection/session throttling, grounded in the same
//! DashMap-of-atomics shape used by `directory::model::UserState`'s
//! refcounts: a small in-flight counter keyed by throttle scope, checked
//! before admitting a new connection or session and released on drop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::RandomState;
use dashmap::DashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ThrottleKey {
    RemoteIp(std::net::IpAddr),
    Usernum(u64),
}

#[derive(Debug)]
pub struct ConcurrencyLimiter {
    concurrent: AtomicU64,
    max_concurrent: u64,
}

impl ConcurrencyLimiter {
    pub fn new(max_concurrent: u64) -> Self {
        ConcurrencyLimiter {
            concurrent: AtomicU64::new(0),
            max_concurrent,
        }
    }

    /// Attempts to reserve a slot; returns a guard that releases on drop,
    /// or `None` if the limiter is already at capacity.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConcurrencyGuard> {
        loop {
            let current = self.concurrent.load(Ordering::Relaxed);
            if current >= self.max_concurrent {
                return None;
            }
            if self
                .concurrent
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return Some(ConcurrencyGuard {
                    limiter: self.clone(),
                });
            }
        }
    }

    pub fn in_flight(&self) -> u64 {
        self.concurrent.load(Ordering::Relaxed)
    }
}

pub struct ConcurrencyGuard {
    limiter: Arc<ConcurrencyLimiter>,
}

impl Drop for ConcurrencyGuard {
    fn drop(&mut self) {
        self.limiter.concurrent.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct ThrottleTable {
    sessions: DashMap<ThrottleKey, Arc<ConcurrencyLimiter>, RandomState>,
    default_max: u64,
}

impl ThrottleTable {
    pub fn new(default_max: u64) -> Self {
        ThrottleTable {
            sessions: DashMap::with_hasher(RandomState::default()),
            default_max,
        }
    }

    pub fn limiter_for(&self, key: ThrottleKey) -> Arc<ConcurrencyLimiter> {
        self.sessions
            .entry(key)
            .or_insert_with(|| Arc::new(ConcurrencyLimiter::new(self.default_max)))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_rejects_past_capacity() {
        let limiter = Arc::new(ConcurrencyLimiter::new(2));
        let g1 = limiter.try_acquire();
        let g2 = limiter.try_acquire();
        let g3 = limiter.try_acquire();
        assert!(g1.is_some());
        assert!(g2.is_some());
        assert!(g3.is_none());
    }

    #[test]
    fn dropping_guard_frees_a_slot() {
        let limiter = Arc::new(ConcurrencyLimiter::new(1));
        {
            let _guard = limiter.try_acquire().unwrap();
            assert_eq!(limiter.in_flight(), 1);
        }
        assert_eq!(limiter.in_flight(), 0);
        assert!(limiter.try_acquire().is_some());
    }

    #[test]
    fn throttle_table_reuses_limiter_per_key() {
        let table = ThrottleTable::new(1);
        let key = ThrottleKey::RemoteIp("127.0.0.1".parse().unwrap());
        let a = table.limiter_for(key.clone());
        let _guard = a.try_acquire().unwrap();
        let b = table.limiter_for(key);
        assert!(b.try_acquire().is_none());
    }
}
