use std::fmt;

#[derive(Debug)]
pub enum DirectoryError {
    UnknownUser,
    AuthenticationFailed,
    Store(store::StoreError),
    Crypto(crypto::CryptoError),
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::UnknownUser => write!(f, "unknown user"),
            DirectoryError::AuthenticationFailed => write!(f, "authentication failed"),
            DirectoryError::Store(err) => write!(f, "store error: {err}"),
            DirectoryError::Crypto(err) => write!(f, "crypto error: {err}"),
        }
    }
}

impl std::error::Error for DirectoryError {}

impl From<store::StoreError> for DirectoryError {
    fn from(err: store::StoreError) -> Self {
        DirectoryError::Store(err)
    }
}

impl From<crypto::CryptoError> for DirectoryError {
    fn from(err: crypto::CryptoError) -> Self {
        DirectoryError::Crypto(err)
    }
}
