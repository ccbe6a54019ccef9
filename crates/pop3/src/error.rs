use std::fmt;

#[derive(Debug)]
pub enum Pop3Error {
    Store(store::StoreError),
    NoSuchMessage(u32),
    AlreadyDeleted(u32),
}

impl fmt::Display for Pop3Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pop3Error::Store(err) => write!(f, "storage error: {err}"),
            Pop3Error::NoSuchMessage(n) => write!(f, "no such message {n}"),
            Pop3Error::AlreadyDeleted(n) => write!(f, "message {n} already deleted"),
        }
    }
}

impl std::error::Error for Pop3Error {}

impl From<store::StoreError> for Pop3Error {
    fn from(err: store::StoreError) -> Self {
        Pop3Error::Store(err)
    }
}
