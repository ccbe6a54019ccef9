//! The process-wide error taxonomy every session-handling call site
//! ultimately reports through: protocol violations, authentication
//! failures, transient (retry-eligible) conditions, permanent
//! rejections, on-disk integrity faults, and everything else. Each
//! per-crate error type (`store::StoreError`, `crypto::CryptoError`,
//! `directory::DirectoryError`, `imap::ImapError`, `pop3::Pop3Error`)
//! folds into one of these variants via `From`, so `?` composes across
//! crate boundaries without callers matching on every subsystem's own
//! enum.

use std::fmt;

#[derive(Debug)]
pub enum MagmaError {
    Protocol(String),
    Authentication,
    Transient(String),
    Permanent(String),
    Integrity(String),
    Internal(String),
}

impl fmt::Display for MagmaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MagmaError::Protocol(reason) => write!(f, "protocol violation: {reason}"),
            MagmaError::Authentication => write!(f, "authentication failed"),
            MagmaError::Transient(reason) => write!(f, "transient failure: {reason}"),
            MagmaError::Permanent(reason) => write!(f, "permanent failure: {reason}"),
            MagmaError::Integrity(reason) => write!(f, "integrity fault: {reason}"),
            MagmaError::Internal(reason) => write!(f, "internal error: {reason}"),
        }
    }
}

impl std::error::Error for MagmaError {}

impl From<store::StoreError> for MagmaError {
    fn from(err: store::StoreError) -> Self {
        match err {
            store::StoreError::Corrupt { .. } => MagmaError::Integrity(err.to_string()),
            store::StoreError::Hidden { .. } | store::StoreError::NotFound { .. } => {
                MagmaError::Permanent(err.to_string())
            }
            store::StoreError::Crypto(_) => MagmaError::Integrity(err.to_string()),
            store::StoreError::Database(_) | store::StoreError::Pool(_) | store::StoreError::Io(_) => {
                MagmaError::Transient(err.to_string())
            }
            store::StoreError::Compression(_) => MagmaError::Internal(err.to_string()),
        }
    }
}

impl From<crypto::CryptoError> for MagmaError {
    fn from(err: crypto::CryptoError) -> Self {
        MagmaError::Integrity(err.to_string())
    }
}

impl From<directory::DirectoryError> for MagmaError {
    fn from(err: directory::DirectoryError) -> Self {
        match err {
            directory::DirectoryError::UnknownUser | directory::DirectoryError::AuthenticationFailed => {
                MagmaError::Authentication
            }
            directory::DirectoryError::Store(err) => err.into(),
            directory::DirectoryError::Crypto(err) => err.into(),
        }
    }
}

impl From<imap::ImapError> for MagmaError {
    fn from(err: imap::ImapError) -> Self {
        match err {
            imap::ImapError::Store(err) => err.into(),
            imap::ImapError::UnknownSequenceNumber(_)
            | imap::ImapError::UnknownUid(_)
            | imap::ImapError::FolderDepthExceeded => MagmaError::Protocol(err.to_string()),
        }
    }
}

impl From<pop3::Pop3Error> for MagmaError {
    fn from(err: pop3::Pop3Error) -> Self {
        match err {
            pop3::Pop3Error::Store(err) => err.into(),
            pop3::Pop3Error::NoSuchMessage(_) | pop3::Pop3Error::AlreadyDeleted(_) => {
                MagmaError::Protocol(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_becomes_permanent() {
        let err: MagmaError = store::StoreError::NotFound { onum: 7 }.into();
        assert!(matches!(err, MagmaError::Permanent(_)));
    }

    #[test]
    fn store_corrupt_becomes_integrity() {
        let err: MagmaError = store::StoreError::Corrupt { onum: 7, reason: "bad key" }.into();
        assert!(matches!(err, MagmaError::Integrity(_)));
    }

    #[test]
    fn directory_auth_failure_becomes_authentication() {
        let err: MagmaError = directory::DirectoryError::AuthenticationFailed.into();
        assert!(matches!(err, MagmaError::Authentication));
    }

    #[test]
    fn imap_unknown_uid_becomes_protocol() {
        let err: MagmaError = imap::ImapError::UnknownUid(4).into();
        assert!(matches!(err, MagmaError::Protocol(_)));
    }
}
