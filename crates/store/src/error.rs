use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    Database(rusqlite::Error),
    Pool(r2d2::Error),
    Io(std::io::Error),
    /// The blob's declared length disagreed with what was read back, or
    /// the key triplet embedded in the record didn't match the request:
    /// the object is considered corrupted.
    Corrupt { onum: u64, reason: &'static str },
    /// `load` was asked for an object whose index row has been hidden.
    Hidden { onum: u64 },
    NotFound { onum: u64 },
    Compression(&'static str),
    Crypto(crypto::CryptoError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(err) => write!(f, "database error: {err}"),
            StoreError::Pool(err) => write!(f, "connection pool error: {err}"),
            StoreError::Io(err) => write!(f, "I/O error: {err}"),
            StoreError::Corrupt { onum, reason } => {
                write!(f, "object {onum} is corrupt: {reason}")
            }
            StoreError::Hidden { onum } => write!(f, "object {onum} is hidden"),
            StoreError::NotFound { onum } => write!(f, "object {onum} not found"),
            StoreError::Compression(engine) => write!(f, "compression engine {engine} failed"),
            StoreError::Crypto(err) => write!(f, "crypto error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err)
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> Self {
        StoreError::Pool(err)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

impl From<crypto::CryptoError> for StoreError {
    fn from(err: crypto::CryptoError) -> Self {
        StoreError::Crypto(err)
    }
}
