use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    InvalidUtf8,
    EmptyPassword,
    InvalidSaltLength { expected: usize, found: usize },
    InvalidBaseLength { expected: usize, found: usize },
    InvalidRounds(u32),
    AuthenticationFailed,
    TruncatedObject,
    UnsupportedObjectType(u16),
    KeyLength { expected: usize, found: usize },
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::InvalidUtf8 => write!(f, "input is not valid UTF-8"),
            CryptoError::EmptyPassword => write!(f, "password is empty"),
            CryptoError::InvalidSaltLength { expected, found } => {
                write!(f, "salt must be {expected} bytes, found {found}")
            }
            CryptoError::InvalidBaseLength { expected, found } => {
                write!(f, "base value must be {expected} bytes, found {found}")
            }
            CryptoError::InvalidRounds(rounds) => write!(f, "invalid round count: {rounds}"),
            CryptoError::AuthenticationFailed => {
                write!(f, "authenticated decryption failed: tag mismatch")
            }
            CryptoError::TruncatedObject => write!(f, "PRIME object is truncated"),
            CryptoError::UnsupportedObjectType(t) => write!(f, "unsupported PRIME object type {t}"),
            CryptoError::KeyLength { expected, found } => {
                write!(f, "key must be {expected} bytes, found {found}")
            }
        }
    }
}

impl std::error::Error for CryptoError {}
