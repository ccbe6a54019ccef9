//! The user/folder/message/alias data model's in-memory mirror: the
//! per-user state cache, reference counting, checkpoint tracking, and
//! authentication against the STACIE verification token.

pub mod auth;
pub mod cache;
pub mod error;
pub mod model;
pub mod serial;

pub use error::DirectoryError;
