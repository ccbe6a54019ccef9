//! POP3 session snapshot: a session holds an immutable
//! snapshot of meta-messages sorted by `messagenum`, taken at login.
//! `STAT/LIST/UIDL/RETR/TOP` operate on the snapshot; `DELE` marks an
//! entry pending-expunge; `RSET` clears marks; `QUIT` commits expunges.
//! Clients are forbidden from re-reading an expunged message number —
//! the snapshot is never refreshed mid-session.

use imap::{apply_store, FlagOp};
use store::meta::{MetaMessage, STATUS_DELETED};
use store::Index;

use crate::error::Pop3Error;

#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub messagenum: u64,
    pub size: u64,
    pub pending_delete: bool,
}

/// A fixed-at-login view numbered 1..n, matching RFC 1939's message
/// numbering.
pub struct Pop3Session {
    pub usernum: u64,
    pub entries: Vec<SnapshotEntry>,
}

impl Pop3Session {
    pub fn load(index: &Index, usernum: u64, foldernum: u64) -> Result<Self, Pop3Error> {
        let mut messages = index.message_list_by_folder(usernum, foldernum)?;
        messages.sort_by_key(|m| m.messagenum);
        let entries = messages
            .into_iter()
            .map(|m: MetaMessage| SnapshotEntry {
                messagenum: m.messagenum,
                size: m.size,
                pending_delete: false,
            })
            .collect();
        Ok(Pop3Session { usernum, entries })
    }

    fn entry_mut(&mut self, number: u32) -> Result<&mut SnapshotEntry, Pop3Error> {
        self.entries
            .get_mut(number.checked_sub(1).ok_or(Pop3Error::NoSuchMessage(number))? as usize)
            .ok_or(Pop3Error::NoSuchMessage(number))
    }

    /// `STAT`: count and total size of messages not pending deletion.
    pub fn stat(&self) -> (u32, u64) {
        self.entries
            .iter()
            .filter(|e| !e.pending_delete)
            .fold((0u32, 0u64), |(count, size), e| (count + 1, size + e.size))
    }

    /// `LIST [n]`: (number, size) pairs for messages not pending deletion.
    pub fn list(&self) -> Vec<(u32, u64)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.pending_delete)
            .map(|(i, e)| ((i + 1) as u32, e.size))
            .collect()
    }

    /// `UIDL [n]`: stable unique identifiers, here the `messagenum` itself
    /// since it uniquely identifies a message within the user.
    pub fn uidl(&self) -> Vec<(u32, u64)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.pending_delete)
            .map(|(i, e)| ((i + 1) as u32, e.messagenum))
            .collect()
    }

    /// `DELE n`: marks pending-expunge; rejects a message already marked.
    pub fn dele(&mut self, number: u32) -> Result<(), Pop3Error> {
        let entry = self.entry_mut(number)?;
        if entry.pending_delete {
            return Err(Pop3Error::AlreadyDeleted(number));
        }
        entry.pending_delete = true;
        Ok(())
    }

    /// `RSET`: clears all pending-delete marks.
    pub fn rset(&mut self) {
        for entry in &mut self.entries {
            entry.pending_delete = false;
        }
    }

    /// `QUIT`: commits pending deletions by marking `STATUS_DELETED` and
    /// returning the messagenums the caller should bump the MESSAGES
    /// serial for.
    pub fn quit(&self, index: &Index) -> Result<Vec<u64>, Pop3Error> {
        let mut committed = Vec::new();
        for entry in self.entries.iter().filter(|e| e.pending_delete) {
            apply_store(index, self.usernum, entry.messagenum, FlagOp::Add, STATUS_DELETED)
                .map_err(|_| Pop3Error::NoSuchMessage(entry.messagenum as u32))?;
            committed.push(entry.messagenum);
        }
        Ok(committed)
    }
}
