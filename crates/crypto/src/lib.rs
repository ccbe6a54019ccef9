//! Credential derivation and at-rest/in-transit object encryption: STACIE
//! password stretching, the PRIME authenticated object format, and the
//! P-256 envelope used to hand a PRIME key to a specific recipient.

pub mod envelope;
pub mod error;
pub mod prime;
pub mod stacie;

pub use error::CryptoError;
