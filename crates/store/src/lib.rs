//! Durable storage: content-addressed tanks, the relational index, the
//! assembly spool, the object cache client, and the engine tying them
//! into the `store`/`load`/`delete` contract.

pub mod cache;
pub mod compress;
pub mod engine;
pub mod error;
pub mod format;
pub mod index;
pub mod meta;
pub mod schema;
pub mod spool;
pub mod tank;

pub use engine::{Engine, StoreRequest, StoredObject};
pub use error::StoreError;
