//! Process entry point: loads the flat key-value configuration file,
//! opens the storage engine, wires a `common::Server`, and runs until a
//! shutdown signal arrives. Wire-level protocol dispatch (SMTP/IMAP/POP3
//! command parsing, the HTTP/webmail surface) is an out-of-scope
//! external dispatcher layered on top of the session and
//! mailbox primitives this binary wires together.

use std::path::Path;
use std::time::Duration;

use common::{Core, Server};
use utils::config::Config;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

const DEFAULT_CONFIG_PATH: &str = "/etc/magma/config.toml";
const DIRECTORY_IDLE_SECS: i64 = 900;
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let text = match std::fs::read_to_string(&config_path) {
        Ok(text) => text,
        Err(err) => {
            trc::Event::new(trc::EventType::ConfigValidationFailed)
                .ctx("path", config_path.clone())
                .ctx("reason", err.to_string())
                .log();
            return std::process::ExitCode::FAILURE;
        }
    };

    let mut config = Config::parse(&text);
    let core = Core::parse(&mut config);
    if !config.is_valid() {
        for error in &config.errors {
            trc::Event::new(trc::EventType::ConfigValidationFailed)
                .ctx("key", error.key.clone())
                .ctx("reason", error.message.clone())
                .log();
        }
        return std::process::ExitCode::FAILURE;
    }

    let index = match store::index::Index::open(Path::new(&core.database.path)) {
        Ok(index) => index,
        Err(err) => {
            trc::Event::new(trc::EventType::StoreReadFailed)
                .ctx("path", core.database.path.clone())
                .ctx("reason", err.to_string())
                .log();
            return std::process::ExitCode::FAILURE;
        }
    };
    let tanks = store::tank::TankBank::open(Path::new(&core.storage.tank_paths[0]), core.storage.tank_paths.len() as u64);
    let engine = store::Engine::new(tanks, index);

    let server = Server::new(core, engine, DIRECTORY_IDLE_SECS);

    trc::Event::new(trc::EventType::Internal)
        .ctx("reason", "server started")
        .ctx("hostname", server.core().smtp_hostname.clone())
        .log();

    run_until_shutdown(server).await;

    std::process::ExitCode::SUCCESS
}

/// Runs the background directory-cache pruning sweep until `ctrl_c` or
/// an internal shutdown notification arrives, then logs and returns.
async fn run_until_shutdown(server: Server) {
    let shutdown = server.inner.data.shutdown.clone();
    let mut prune_interval = tokio::time::interval(PRUNE_INTERVAL);

    loop {
        tokio::select! {
            _ = prune_interval.tick() => {
                let pruned = server.inner.data.directory.prune();
                if pruned > 0 {
                    trc::Event::new(trc::EventType::SpoolCleanup)
                        .ctx("pruned_users", pruned)
                        .log();
                }
            }
            _ = tokio::signal::ctrl_c() => break,
            _ = shutdown.notified() => break,
        }
    }

    trc::Event::new(trc::EventType::ServerShuttingDown).log();
}
