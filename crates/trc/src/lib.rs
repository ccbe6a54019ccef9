//! Structured event logging and process-wide failure counters.
//!
//! Every subsystem in this workspace reports through `trc::Event` rather
//! than ad hoc `println!`/`eprintln!` calls: a small closed set of event
//! kinds, each carrying key/value context, dispatched to a collector
//! that both prints and tallies per-kind counters for `/health`-style
//! introspection.

use std::{
    fmt,
    sync::OnceLock,
    time::{SystemTime, UNIX_EPOCH},
};

use ahash::AHashMap;
use parking_lot::Mutex;

pub mod counters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        })
    }
}

/// The closed set of event kinds every subsystem may report. New kinds are
/// added here rather than letting callers invent unstructured strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    CryptoDeriveFailed,
    CryptoEncryptFailed,
    CryptoDecryptFailed,
    CryptoIntegrityFailed,
    StoreWriteFailed,
    StoreReadFailed,
    StoreCorrupt,
    StoreCommitted,
    SpoolCleanup,
    CacheMiss,
    CacheLockTimeout,
    DirectoryAuthFailed,
    DirectoryUserLoaded,
    DirectoryUserPruned,
    SmtpSessionStarted,
    SmtpProtocolViolation,
    SmtpCheckOutcome,
    SmtpMessageAccepted,
    SmtpMessageRejected,
    SmtpBounceQueued,
    SmtpRelayFailed,
    MailboxExpunged,
    MailboxFlagsChanged,
    ConfigValidationFailed,
    ServerShuttingDown,
    Internal,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::CryptoDeriveFailed => "crypto.derive-failed",
            EventType::CryptoEncryptFailed => "crypto.encrypt-failed",
            EventType::CryptoDecryptFailed => "crypto.decrypt-failed",
            EventType::CryptoIntegrityFailed => "crypto.integrity-failed",
            EventType::StoreWriteFailed => "store.write-failed",
            EventType::StoreReadFailed => "store.read-failed",
            EventType::StoreCorrupt => "store.corrupt",
            EventType::StoreCommitted => "store.committed",
            EventType::SpoolCleanup => "spool.cleanup",
            EventType::CacheMiss => "cache.miss",
            EventType::CacheLockTimeout => "cache.lock-timeout",
            EventType::DirectoryAuthFailed => "directory.auth-failed",
            EventType::DirectoryUserLoaded => "directory.user-loaded",
            EventType::DirectoryUserPruned => "directory.user-pruned",
            EventType::SmtpSessionStarted => "smtp.session-started",
            EventType::SmtpProtocolViolation => "smtp.protocol-violation",
            EventType::SmtpCheckOutcome => "smtp.check-outcome",
            EventType::SmtpMessageAccepted => "smtp.message-accepted",
            EventType::SmtpMessageRejected => "smtp.message-rejected",
            EventType::SmtpBounceQueued => "smtp.bounce-queued",
            EventType::SmtpRelayFailed => "smtp.relay-failed",
            EventType::MailboxExpunged => "mailbox.expunged",
            EventType::MailboxFlagsChanged => "mailbox.flags-changed",
            EventType::ConfigValidationFailed => "config.validation-failed",
            EventType::ServerShuttingDown => "server.shutting-down",
            EventType::Internal => "internal",
        }
    }

    fn default_level(&self) -> Level {
        match self {
            EventType::StoreCommitted
            | EventType::SmtpSessionStarted
            | EventType::SmtpMessageAccepted
            | EventType::DirectoryUserLoaded
            | EventType::DirectoryUserPruned
            | EventType::SmtpCheckOutcome
            | EventType::MailboxExpunged
            | EventType::MailboxFlagsChanged
            | EventType::SpoolCleanup => Level::Info,
            EventType::CacheMiss | EventType::SmtpMessageRejected => Level::Debug,
            EventType::CryptoDeriveFailed
            | EventType::CryptoEncryptFailed
            | EventType::CryptoDecryptFailed
            | EventType::CryptoIntegrityFailed
            | EventType::StoreWriteFailed
            | EventType::StoreReadFailed
            | EventType::StoreCorrupt
            | EventType::CacheLockTimeout
            | EventType::DirectoryAuthFailed
            | EventType::SmtpProtocolViolation
            | EventType::SmtpBounceQueued
            | EventType::SmtpRelayFailed
            | EventType::ConfigValidationFailed => Level::Warn,
            EventType::ServerShuttingDown => Level::Info,
            EventType::Internal => Level::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    UInt(u64),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_value_from {
    ($t:ty, $variant:ident) => {
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant(v.into())
            }
        }
    };
}

impl_value_from!(&str, String);
impl_value_from!(String, String);
impl_value_from!(u64, UInt);
impl_value_from!(u32, UInt);
impl_value_from!(usize, UInt);
impl_value_from!(i64, Int);
impl_value_from!(i32, Int);
impl_value_from!(bool, Bool);

#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: EventType,
    pub level: Level,
    pub ctx: Vec<(&'static str, Value)>,
}

impl Event {
    pub fn new(event_type: EventType) -> Self {
        Event {
            level: event_type.default_level(),
            event_type,
            ctx: Vec::new(),
        }
    }

    pub fn ctx(mut self, key: &'static str, value: impl Into<Value>) -> Self {
        self.ctx.push((key, value.into()));
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Dispatches the event to the global collector: increments its
    /// per-kind counter and prints it if its level clears the configured
    /// threshold. Consumes `self` for fire-and-forget call sites.
    pub fn log(self) {
        Collector::global().record(&self);
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.event_type.as_str())?;
        for (key, value) in &self.ctx {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

/// Process-wide event sink. A single instance is shared via [`Collector::global`].
pub struct Collector {
    min_level: Level,
    counts: Mutex<AHashMap<EventType, u64>>,
}

static COLLECTOR: OnceLock<Collector> = OnceLock::new();

impl Collector {
    pub fn global() -> &'static Collector {
        COLLECTOR.get_or_init(|| Collector {
            min_level: Level::Debug,
            counts: Mutex::new(AHashMap::new()),
        })
    }

    fn record(&self, event: &Event) {
        *self.counts.lock().entry(event.event_type).or_insert(0) += 1;
        if event.level >= self.min_level {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            eprintln!("{}.{:03} {event}", now.as_secs(), now.subsec_millis());
        }
    }

    /// Returns the number of times an event kind has fired since startup.
    pub fn count(&self, event_type: EventType) -> u64 {
        self.counts.lock().get(&event_type).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> AHashMap<EventType, u64> {
        self.counts.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_kind() {
        let before = Collector::global().count(EventType::StoreCommitted);
        Event::new(EventType::StoreCommitted)
            .ctx("onum", 42u64)
            .log();
        assert_eq!(
            Collector::global().count(EventType::StoreCommitted),
            before + 1
        );
    }

    #[test]
    fn display_includes_context() {
        let event = Event::new(EventType::Internal).ctx("reason", "test");
        let rendered = event.to_string();
        assert!(rendered.contains("internal"));
        assert!(rendered.contains("reason=test"));
    }
}
