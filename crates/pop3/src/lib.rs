//! POP3 session snapshot semantics, built atop `imap`'s
//! mailbox-view flag-mutation primitives. Wire parsing is an
//! out-of-scope external dispatcher.

pub mod error;
pub mod session;

pub use error::Pop3Error;
pub use session::Pop3Session;
