//! The in-memory mailbox-state mirror: a reader-preferring lock guards
//! mutation, a per-protocol reference count drives cache pruning, and a
//! flag bitmask tracks TLS/quota/encryption posture.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use parking_lot::RwLock;

pub const FLAG_TLS_REQUIRED: u32 = 1 << 0;
pub const FLAG_OVERQUOTA: u32 = 1 << 1;
pub const FLAG_ENCRYPT_AT_REST: u32 = 1 << 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Smtp,
    Pop,
    Imap,
    Web,
    Dmtp,
    Generic,
}

const PROTOCOL_COUNT: usize = 6;

impl Protocol {
    fn index(self) -> usize {
        match self {
            Protocol::Smtp => 0,
            Protocol::Pop => 1,
            Protocol::Imap => 2,
            Protocol::Web => 3,
            Protocol::Dmtp => 4,
            Protocol::Generic => 5,
        }
    }
}

pub struct UserState {
    pub usernum: u64,
    pub username: String,
    pub public_key: Vec<u8>,
    pub private_key_blob: Vec<u8>,
    flags: AtomicU32,
    refcounts: [AtomicU32; PROTOCOL_COUNT],
    last_activity: AtomicI64,
    /// Mutations (folder/alias/message writes originating from this
    /// process) must hold the write side; reads may proceed concurrently.
    pub lock: RwLock<()>,
}

impl UserState {
    pub fn new(usernum: u64, username: String, public_key: Vec<u8>, private_key_blob: Vec<u8>, flags: u32) -> Self {
        UserState {
            usernum,
            username,
            public_key,
            private_key_blob,
            flags: AtomicU32::new(flags),
            refcounts: Default::default(),
            last_activity: AtomicI64::new(now_secs()),
            lock: RwLock::new(()),
        }
    }

    pub fn flags(&self) -> u32 {
        self.flags.load(Ordering::Relaxed)
    }

    pub fn has_flag(&self, bit: u32) -> bool {
        self.flags() & bit != 0
    }

    pub fn set_flags(&self, flags: u32) {
        self.flags.store(flags, Ordering::Relaxed);
    }

    pub fn acquire(&self, protocol: Protocol) -> u32 {
        self.last_activity.store(now_secs(), Ordering::Relaxed);
        self.refcounts[protocol.index()].fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn release(&self, protocol: Protocol) -> u32 {
        self.last_activity.store(now_secs(), Ordering::Relaxed);
        self.refcounts[protocol.index()]
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                Some(v.saturating_sub(1))
            })
            .unwrap_or(0)
    }

    pub fn total_refs(&self) -> u32 {
        self.refcounts.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    pub fn last_activity(&self) -> i64 {
        self.last_activity.load(Ordering::Relaxed)
    }

    /// Eligible for eviction once every protocol's refcount is zero and
    /// there has been no activity for `idle_secs`.
    pub fn is_prunable(&self, idle_secs: i64) -> bool {
        self.total_refs() == 0 && now_secs() - self.last_activity() >= idle_secs
    }
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refcounts_are_tracked_per_protocol() {
        let user = UserState::new(1, "a@b.com".into(), vec![], vec![], 0);
        assert_eq!(user.acquire(Protocol::Smtp), 1);
        assert_eq!(user.acquire(Protocol::Imap), 1);
        assert_eq!(user.total_refs(), 2);
        user.release(Protocol::Smtp);
        assert_eq!(user.total_refs(), 1);
        user.release(Protocol::Imap);
        assert_eq!(user.total_refs(), 0);
    }

    #[test]
    fn prunable_only_when_idle_and_unreferenced() {
        let user = UserState::new(1, "a@b.com".into(), vec![], vec![], 0);
        assert!(user.is_prunable(0));
        user.acquire(Protocol::Pop);
        assert!(!user.is_prunable(0));
        user.release(Protocol::Pop);
        assert!(user.is_prunable(0));
    }

    #[test]
    fn flags_round_trip() {
        let user = UserState::new(1, "a@b.com".into(), vec![], vec![], FLAG_OVERQUOTA);
        assert!(user.has_flag(FLAG_OVERQUOTA));
        assert!(!user.has_flag(FLAG_TLS_REQUIRED));
        user.set_flags(FLAG_TLS_REQUIRED | FLAG_ENCRYPT_AT_REST);
        assert!(!user.has_flag(FLAG_OVERQUOTA));
        assert!(user.has_flag(FLAG_ENCRYPT_AT_REST));
    }
}
