//! Mailbox view operations shared by the IMAP session layer:
//! FETCH/STORE/COPY/SEARCH/EXPUNGE over a selected folder. Wire
//! parsing and response formatting are an out-of-scope external
//! dispatcher; this crate is the core the dispatcher calls into.

pub mod error;
pub mod view;

pub use error::ImapError;
pub use view::{apply_store, copy_message, expunge, search, FlagOp, ImapId, MailboxView, SearchCriteria};
