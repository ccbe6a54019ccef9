//! Parses the named subsystems out of `utils::config::Config`: each
//! required key without a default fails startup validation by recording
//! a `ConfigError` on the config rather than aborting parsing early.

use smtp::relay::{RelayClass, RelayPool, RelayTarget};
use utils::config::Config;

#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct CacheHostConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default)]
pub struct SpoolConfig {
    pub base_path: String,
}

#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub tank_paths: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SecureConfig {
    pub salt: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct RelayEntryConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub premium: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Core {
    pub database: DatabaseConfig,
    pub cache_hosts: Vec<CacheHostConfig>,
    pub spool: SpoolConfig,
    pub storage: StorageConfig,
    pub secure: SecureConfig,
    pub relays: Vec<RelayEntryConfig>,
    pub smtp_hostname: String,
    pub smtp_max_size: u64,
    pub smtp_violation_limit: u32,
}

impl Core {
    pub fn parse(config: &mut Config) -> Self {
        let database = DatabaseConfig {
            path: config.value_require("iface.database.path").unwrap_or_default(),
        };

        let mut cache_hosts = Vec::new();
        for index in config.indices("iface.cache.host") {
            let name_key = Config::indexed_key("iface.cache.host", index, "name");
            let host_key = Config::indexed_key("iface.cache.host", index, "host");
            let port_key = Config::indexed_key("iface.cache.host", index, "port");
            cache_hosts.push(CacheHostConfig {
                name: config.value(&name_key).unwrap_or_default().to_string(),
                host: config.value(&host_key).unwrap_or("127.0.0.1").to_string(),
                port: config.property_or(&port_key, 11211),
            });
        }

        let mut relays = Vec::new();
        for index in config.indices("relay") {
            let name_key = Config::indexed_key("relay", index, "name");
            let host_key = Config::indexed_key("relay", index, "host");
            let port_key = Config::indexed_key("relay", index, "port");
            let secure_key = Config::indexed_key("relay", index, "secure");
            let premium_key = Config::indexed_key("relay", index, "premium");
            relays.push(RelayEntryConfig {
                name: config.value(&name_key).unwrap_or_default().to_string(),
                host: config.value(&host_key).unwrap_or("127.0.0.1").to_string(),
                port: config.property_or(&port_key, 25),
                secure: config.property_or(&secure_key, false),
                premium: config.property_or(&premium_key, false),
            });
        }

        let tank_paths = (0..config.property_or("storage.tank.count", 1u32))
            .map(|i| {
                config
                    .value(&format!("storage.tank[{i}].path"))
                    .unwrap_or("data/tank")
                    .to_string()
            })
            .collect();

        let salt = config
            .value_require("secure.salt")
            .map(|s| s.into_bytes())
            .unwrap_or_default();

        Core {
            database,
            cache_hosts,
            spool: SpoolConfig {
                base_path: config.value_require("spool.path").unwrap_or_default(),
            },
            storage: StorageConfig { tank_paths },
            secure: SecureConfig { salt },
            relays,
            smtp_hostname: config
                .value("smtp.hostname")
                .unwrap_or("mail.magma.invalid")
                .to_string(),
            smtp_max_size: config.property_or("smtp.max-size", 50 * 1024 * 1024),
            smtp_violation_limit: config.property_or("smtp.violation-limit", 5),
        }
    }

    pub fn relay_pool(&self) -> RelayPool {
        RelayPool {
            targets: self
                .relays
                .iter()
                .map(|r| RelayTarget {
                    name: r.name.clone(),
                    host: r.host.clone(),
                    port: r.port,
                    secure: r.secure,
                    class: if r.premium { RelayClass::Premium } else { RelayClass::Standard },
                })
                .collect(),
        }
    }
}
