//! Process-wide server state: the `Server`/`Inner`/`Core` composition
//! wires config, caches, and IPC into one shared handle cloned into
//! every accepted connection. `Core` carries the parsed configuration;
//! `Inner` carries live, mutable process state (storage engine,
//! directory cache, throttles, shutdown signal).

use std::sync::Arc;

use arc_swap::ArcSwap;
use smtp::relay::RelayPool;
use smtp::throttle::ThrottleTable;
use tokio::sync::Notify;

pub mod config;
pub mod error;

pub use config::Core;
pub use error::MagmaError;

#[derive(Clone)]
pub struct Server {
    pub inner: Arc<Inner>,
}

pub struct Inner {
    pub shared_core: ArcSwap<Core>,
    pub data: Data,
}

pub struct Data {
    pub storage: store::Engine,
    pub directory: directory::cache::DirectoryCache,
    pub smtp_session_throttle: ThrottleTable,
    pub relay_pool: RelayPool,
    pub shutdown: Arc<Notify>,
}

impl Server {
    pub fn new(core: Core, storage: store::Engine, directory_idle_secs: i64) -> Self {
        let relay_pool = core.relay_pool();
        let session_throttle = ThrottleTable::new(64);
        Server {
            inner: Arc::new(Inner {
                shared_core: ArcSwap::from_pointee(core),
                data: Data {
                    storage,
                    directory: directory::cache::DirectoryCache::new(directory_idle_secs),
                    smtp_session_throttle: session_throttle,
                    relay_pool,
                    shutdown: Arc::new(Notify::new()),
                },
            }),
        }
    }

    pub fn core(&self) -> Arc<Core> {
        self.inner.shared_core.load_full()
    }

    pub fn reload_core(&self, core: Core) {
        self.inner.shared_core.store(Arc::new(core));
        trc::Event::new(trc::EventType::Internal)
            .ctx("reason", "configuration reloaded")
            .log();
    }

    /// Signals all accepted connections to begin a graceful shutdown;
    /// listeners stop accepting new connections on receipt.
    pub fn begin_shutdown(&self) {
        self.inner.data.shutdown.notify_waiters();
    }
}
