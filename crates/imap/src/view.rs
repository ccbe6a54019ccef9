//! Mailbox view operations: FETCH/STORE/COPY/SEARCH/EXPUNGE
//! over a selected folder's sorted sequence of messages. Sequence-number
//! to UID mapping follows RFC 3501 semantics (sequence numbers renumber
//! on expunge, UIDs are stable).

use ahash::AHashMap;
use store::meta::{MetaMessage, STATUS_DELETED};
use store::Index;

use crate::error::ImapError;

/// A message's dual addressing within a selected mailbox: IMAP sequence
/// number (renumbers on expunge) and UID (stable for the mailbox's
/// lifetime).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImapId {
    pub uid: u64,
    pub seqnum: u32,
}

#[derive(Debug, Clone, Default)]
pub struct MailboxView {
    pub usernum: u64,
    pub foldernum: u64,
    pub uid_next: u64,
    pub uid_validity: u64,
    pub id_to_imap: AHashMap<u64, ImapId>,
    pub uid_to_messagenum: AHashMap<u64, u64>,
    pub ordered: Vec<u64>,
}

impl MailboxView {
    /// Rebuilds the view from the current index state: each selected
    /// folder's sorted sequence of messages. UIDs are assigned as the
    /// messagenum itself since messagenums are already monotonic and
    /// unique within a user.
    pub fn load(index: &Index, usernum: u64, foldernum: u64, uid_validity: u64) -> Result<Self, ImapError> {
        let messages = index.message_list_by_folder(usernum, foldernum)?;
        let mut view = MailboxView {
            usernum,
            foldernum,
            uid_next: messages.iter().map(|m| m.messagenum + 1).max().unwrap_or(1),
            uid_validity,
            id_to_imap: AHashMap::default(),
            uid_to_messagenum: AHashMap::default(),
            ordered: Vec::with_capacity(messages.len()),
        };
        for (i, msg) in messages.iter().enumerate() {
            let seqnum = (i + 1) as u32;
            view.id_to_imap.insert(msg.messagenum, ImapId { uid: msg.messagenum, seqnum });
            view.uid_to_messagenum.insert(msg.messagenum, msg.messagenum);
            view.ordered.push(msg.messagenum);
        }
        Ok(view)
    }

    pub fn total_messages(&self) -> usize {
        self.ordered.len()
    }

    pub fn seqnum_to_messagenum(&self, seqnum: u32) -> Result<u64, ImapError> {
        self.ordered
            .get(seqnum.checked_sub(1).ok_or(ImapError::UnknownSequenceNumber(seqnum))? as usize)
            .copied()
            .ok_or(ImapError::UnknownSequenceNumber(seqnum))
    }

    pub fn uid_to_messagenum(&self, uid: u64) -> Result<u64, ImapError> {
        self.uid_to_messagenum
            .get(&uid)
            .copied()
            .ok_or(ImapError::UnknownUid(uid as u32))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FlagOp {
    Add,
    Remove,
    Replace,
}

/// Applies a STORE operation to one message's status bitmask:
/// add/remove/replace, optionally silent (the caller decides
/// whether to suppress the untagged FETCH response; that's a wire
/// concern outside this crate).
pub fn apply_store(index: &Index, usernum: u64, messagenum: u64, op: FlagOp, flags: u32) -> Result<u32, ImapError> {
    let current = index
        .message_by_num(usernum, messagenum)?
        .ok_or(ImapError::UnknownUid(messagenum as u32))?;
    let new_status = match op {
        FlagOp::Add => current.status | flags,
        FlagOp::Remove => current.status & !flags,
        FlagOp::Replace => flags | (current.status & !flag_mask()),
    };
    index.message_update_status(usernum, messagenum, new_status)?;
    Ok(new_status)
}

/// The set of status bits STORE is allowed to touch; internal-only bits
/// (hidden, infected, spoofed, phishing, encrypted, blackholed) are
/// never client-settable.
fn flag_mask() -> u32 {
    use store::meta::*;
    STATUS_SEEN | STATUS_ANSWERED | STATUS_FLAGGED | STATUS_DELETED | STATUS_DRAFT | STATUS_RECENT
}

/// Copies a message into `destination_folder`, replicating its meta row
/// under a freshly-allocated `messagenum`.
pub fn copy_message(index: &Index, usernum: u64, messagenum: u64, destination_folder: u64) -> Result<u64, ImapError> {
    Ok(index.message_copy(usernum, messagenum, destination_folder)?)
}

/// Removes DELETED messages from the view and the index,
/// returning the UIDs removed in ascending order for the caller's
/// untagged `EXPUNGE` responses.
pub fn expunge(index: &Index, view: &MailboxView) -> Result<Vec<u64>, ImapError> {
    let mut removed = Vec::new();
    for &messagenum in &view.ordered {
        if let Some(msg) = index.message_by_num(view.usernum, messagenum)? {
            if msg.status & STATUS_DELETED != 0 {
                index.message_expunge(view.usernum, messagenum)?;
                removed.push(messagenum);
            }
        }
    }
    Ok(removed)
}

#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    pub flags_all: u32,
    pub flags_none: u32,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub created_after: Option<i64>,
    pub created_before: Option<i64>,
}

fn matches(msg: &MetaMessage, criteria: &SearchCriteria) -> bool {
    if msg.status & criteria.flags_all != criteria.flags_all {
        return false;
    }
    if msg.status & criteria.flags_none != 0 {
        return false;
    }
    if let Some(min) = criteria.min_size {
        if msg.size < min {
            return false;
        }
    }
    if let Some(max) = criteria.max_size {
        if msg.size > max {
            return false;
        }
    }
    if let Some(after) = criteria.created_after {
        if msg.created < after {
            return false;
        }
    }
    if let Some(before) = criteria.created_before {
        if msg.created > before {
            return false;
        }
    }
    true
}

/// Evaluates `criteria` over the view's messages, returning matching
/// sequence numbers.
pub fn search(index: &Index, view: &MailboxView, criteria: &SearchCriteria) -> Result<Vec<u32>, ImapError> {
    let mut hits = Vec::new();
    for (i, &messagenum) in view.ordered.iter().enumerate() {
        if let Some(msg) = index.message_by_num(view.usernum, messagenum)? {
            if matches(&msg, criteria) {
                hits.push((i + 1) as u32);
            }
        }
    }
    Ok(hits)
}
