//! Typed configuration sections parsed from the flat key-value format
//!: `iface.database`,
//! `iface.cache.host[0..N]`, `relay[0..M]`, `spool`, `storage.tank`,
//! `secure.salt`. The webmail HTTP surface is an out-of-scope external
//! dispatcher and carries no configuration section here.

pub mod inner;

pub use inner::{CacheHostConfig, Core, DatabaseConfig, RelayEntryConfig, SecureConfig, SpoolConfig, StorageConfig};
