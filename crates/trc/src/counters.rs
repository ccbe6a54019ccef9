//! Named, per-counter statistics, grounded in the original engine's
//! `stats` table (`src/engine/status/statistics.c`): a fixed set of named
//! counters, each independently lockable so a hot counter (connection
//! totals) never contends with a cold one (virus signature count).

use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use parking_lot::RwLock;

macro_rules! define_counters {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Counter {
            $($variant),+
        }

        impl Counter {
            pub fn name(&self) -> &'static str {
                match self {
                    $(Counter::$variant => $name),+
                }
            }

            pub const ALL: &'static [Counter] = &[$(Counter::$variant),+];
        }
    };
}

define_counters! {
    SmtpConnectionsTotal => "smtp.connections.total",
    SmtpConnectionsSecure => "smtp.connections.secure",
    ImapConnectionsTotal => "imap.connections.total",
    PopConnectionsTotal => "pop.connections.total",
    ObjectsUsersTotal => "objects.users.total",
    ObjectsUsersExpired => "objects.users.expired",
    StoreObjectsStored => "store.objects.stored",
    StoreObjectsLoaded => "store.objects.loaded",
    StoreObjectsCorrupt => "store.objects.corrupt",
    StoreObjectsMissing => "store.objects.missing",
    SmtpMessagesAccepted => "smtp.messages.accepted",
    SmtpMessagesRejected => "smtp.messages.rejected",
    SmtpMessagesGreylisted => "smtp.messages.greylisted",
    SmtpBouncesQueued => "smtp.bounces.queued",
}

/// A process-wide table of named counters, each a lock-free atomic. The
/// outer `RwLock` only guards the (effectively static, populated once at
/// startup) map itself, not the counter updates.
#[derive(Default)]
pub struct Statistics {
    values: RwLock<AHashMap<&'static str, AtomicU64>>,
}

impl Statistics {
    pub fn new() -> Self {
        let mut values = AHashMap::with_capacity(Counter::ALL.len());
        for counter in Counter::ALL {
            values.insert(counter.name(), AtomicU64::new(0));
        }
        Statistics {
            values: RwLock::new(values),
        }
    }

    pub fn increment(&self, counter: Counter) {
        self.increment_by(counter, 1);
    }

    pub fn increment_by(&self, counter: Counter, amount: u64) {
        if let Some(value) = self.values.read().get(counter.name()) {
            value.fetch_add(amount, Ordering::Relaxed);
        }
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.values
            .read()
            .get(counter.name())
            .map(|v| v.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_independently() {
        let stats = Statistics::new();
        stats.increment(Counter::SmtpMessagesAccepted);
        stats.increment(Counter::SmtpMessagesAccepted);
        stats.increment(Counter::SmtpMessagesRejected);
        assert_eq!(stats.get(Counter::SmtpMessagesAccepted), 2);
        assert_eq!(stats.get(Counter::SmtpMessagesRejected), 1);
        assert_eq!(stats.get(Counter::StoreObjectsStored), 0);
    }
}
