use std::fmt;

#[derive(Debug)]
pub enum ImapError {
    Store(store::StoreError),
    UnknownSequenceNumber(u32),
    UnknownUid(u32),
    FolderDepthExceeded,
}

impl fmt::Display for ImapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImapError::Store(err) => write!(f, "storage error: {err}"),
            ImapError::UnknownSequenceNumber(seq) => write!(f, "no such sequence number {seq}"),
            ImapError::UnknownUid(uid) => write!(f, "no such UID {uid}"),
            ImapError::FolderDepthExceeded => write!(f, "folder depth limit exceeded"),
        }
    }
}

impl std::error::Error for ImapError {}

impl From<store::StoreError> for ImapError {
    fn from(err: store::StoreError) -> Self {
        ImapError::Store(err)
    }
}
