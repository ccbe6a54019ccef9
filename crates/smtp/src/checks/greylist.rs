//! Greylisting: on first sighting of a
//! `(from, to, ip)` tuple within a window, respond temp-fail and
//! remember the tuple; accept on retry after `greytime` has elapsed.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tuple {
    pub from: String,
    pub to: String,
    pub ip: IpAddr,
}

pub struct Greylist {
    seen: DashMap<Tuple, Instant, RandomState>,
    greytime: Duration,
}

impl Greylist {
    pub fn new(greytime: Duration) -> Self {
        Greylist {
            seen: DashMap::with_hasher(RandomState::default()),
            greytime,
        }
    }

    /// Returns `true` if this attempt should be accepted: either a
    /// repeat after `greytime` has elapsed, or first sighting is
    /// recorded and `false` is returned.
    pub fn should_accept(&self, tuple: &Tuple, now: Instant) -> bool {
        match self.seen.get(tuple) {
            Some(first_seen) => now.duration_since(*first_seen) >= self.greytime,
            None => {
                self.seen.insert(tuple.clone(), now);
                false
            }
        }
    }
}

static DEFAULT_GREYLIST: Mutex<Option<Greylist>> = Mutex::new(None);

/// Module-level convenience matching the pipeline's call shape; a real
/// deployment wires a `Greylist` instance through shared server state
/// instead of a lazily-initialized global.
pub fn should_accept(tuple: &Tuple) -> bool {
    let mut guard = DEFAULT_GREYLIST.lock();
    let list = guard.get_or_insert_with(|| Greylist::new(Duration::from_secs(300)));
    list.should_accept(tuple, instant_now())
}

fn instant_now() -> Instant {
    Instant::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple() -> Tuple {
        Tuple {
            from: "a@b.com".into(),
            to: "c@d.com".into(),
            ip: "127.0.0.1".parse().unwrap(),
        }
    }

    #[test]
    fn first_sighting_is_deferred_then_accepted_after_greytime() {
        let list = Greylist::new(Duration::from_millis(10));
        let t = tuple();
        let t0 = Instant::now();
        assert!(!list.should_accept(&t, t0));
        assert!(!list.should_accept(&t, t0 + Duration::from_millis(5)));
        assert!(list.should_accept(&t, t0 + Duration::from_millis(15)));
    }

    #[test]
    fn distinct_tuples_are_tracked_independently() {
        let list = Greylist::new(Duration::from_secs(60));
        let t0 = Instant::now();
        let a = tuple();
        let mut b = tuple();
        b.to = "other@d.com".into();
        assert!(!list.should_accept(&a, t0));
        assert!(!list.should_accept(&b, t0));
    }
}
