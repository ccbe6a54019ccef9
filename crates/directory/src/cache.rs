//! Process-wide user cache: lazily materialized on first
//! authenticated access, keyed by username, pruned when every protocol
//! reference count reaches zero and the user has been idle.

use std::sync::Arc;

use dashmap::DashMap;

use crate::model::UserState;

pub struct DirectoryCache {
    users: DashMap<String, Arc<UserState>>,
    idle_secs: i64,
}

impl DirectoryCache {
    pub fn new(idle_secs: i64) -> Self {
        DirectoryCache {
            users: DashMap::new(),
            idle_secs,
        }
    }

    pub fn get(&self, username: &str) -> Option<Arc<UserState>> {
        self.users.get(username).map(|entry| entry.clone())
    }

    pub fn insert(&self, user: Arc<UserState>) {
        trc::Event::new(trc::EventType::DirectoryUserLoaded)
            .ctx("username", user.username.clone())
            .log();
        self.users.insert(user.username.clone(), user);
    }

    pub fn get_or_insert_with(&self, username: &str, load: impl FnOnce() -> Arc<UserState>) -> Arc<UserState> {
        if let Some(existing) = self.get(username) {
            return existing;
        }
        let user = load();
        self.insert(user.clone());
        user
    }

    /// Sweeps unreferenced, idle users out of the cache. Returns the
    /// number pruned.
    pub fn prune(&self) -> u64 {
        let mut pruned = 0u64;
        self.users.retain(|_, user| {
            let keep = !user.is_prunable(self.idle_secs);
            if !keep {
                trc::Event::new(trc::EventType::DirectoryUserPruned)
                    .ctx("username", user.username.clone())
                    .log();
                pruned += 1;
            }
            keep
        });
        pruned
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Protocol;

    #[test]
    fn prune_removes_only_idle_unreferenced_users() {
        let cache = DirectoryCache::new(0);
        let active = Arc::new(UserState::new(1, "active@a.com".into(), vec![], vec![], 0));
        active.acquire(Protocol::Imap);
        let idle = Arc::new(UserState::new(2, "idle@a.com".into(), vec![], vec![], 0));

        cache.insert(active.clone());
        cache.insert(idle);

        let pruned = cache.prune();
        assert_eq!(pruned, 1);
        assert!(cache.get("active@a.com").is_some());
        assert!(cache.get("idle@a.com").is_none());
    }

    #[test]
    fn get_or_insert_with_only_loads_once() {
        let cache = DirectoryCache::new(0);
        let mut loads = 0;
        for _ in 0..3 {
            cache.get_or_insert_with("a@b.com", || {
                loads += 1;
                Arc::new(UserState::new(1, "a@b.com".into(), vec![], vec![], 0))
            });
        }
        assert_eq!(loads, 1);
    }
}
