//! Per-recipient storage write: assemble `Received:`
//! headers, compress, optionally wrap a per-message PRIME key under the
//! recipient's public key, write through the storage engine, insert the
//! meta row, bump counters, and optionally queue a deduplicated
//! autoreply.

use store::format::CompressionEngine;
use store::meta::{MetaMessage, STATUS_ENCRYPTED, STATUS_RECENT};
use store::{Engine, StoreRequest};

use crate::bounce;

pub struct RecipientWrite<'a> {
    pub host: &'a str,
    pub usernum: u64,
    pub foldernum: u64,
    pub received_header: String,
    pub body: &'a [u8],
    pub compression: CompressionEngine,
    pub recipient_public_key: Option<&'a p256::PublicKey>,
    pub signum: u64,
    pub sigkey: u64,
}

#[derive(Debug)]
pub struct WriteOutcome {
    pub messagenum: u64,
    pub onum: u64,
    pub size: u64,
    pub status: u32,
}

/// Writes one accepted copy of a message into one recipient's mailbox.
/// A failure here is the caller's temp-server outcome: storage/DB
/// errors are not silently swallowed.
pub async fn write_for_recipient(
    engine: &Engine,
    req: RecipientWrite<'_>,
) -> Result<WriteOutcome, store::StoreError> {
    let mut framed = Vec::with_capacity(req.received_header.len() + req.body.len());
    framed.extend_from_slice(req.received_header.as_bytes());
    framed.extend_from_slice(req.body);

    let (encryption_key, wrapped_key, status_bits) = match req.recipient_public_key {
        Some(public_key) => {
            let prime_key = crypto::prime::PrimeKey::generate();
            let wrapped = crypto::envelope::seal(public_key, &prime_key.to_bytes())
                .map_err(store::StoreError::Crypto)?;
            (Some(prime_key), Some(wrapped), STATUS_ENCRYPTED)
        }
        None => (None, None, 0),
    };

    let stored = engine
        .store(StoreRequest {
            host: req.host,
            unum: req.usernum,
            snum: 0,
            data: &framed,
            compression: req.compression,
            encryption_key: encryption_key.as_ref(),
        })
        .await?;

    if let Some(wrapped) = wrapped_key {
        engine
            .store(StoreRequest {
                host: req.host,
                unum: req.usernum,
                snum: 0,
                data: &wrapped,
                compression: CompressionEngine::None,
                encryption_key: None,
            })
            .await?;
    }

    let status = STATUS_RECENT | status_bits;
    let mut meta = MetaMessage {
        messagenum: 0,
        usernum: req.usernum,
        foldernum: req.foldernum,
        onum: stored.onum,
        tnum: stored.tnum,
        size: framed.len() as u64,
        server: req.host.to_string(),
        status,
        signum: req.signum,
        sigkey: format!("{:016x}", req.sigkey),
        tags: Vec::new(),
        created: 0,
    };

    let mut conn = engine.index.transaction_conn()?;
    let tx = conn.transaction()?;
    let messagenum = engine.index.message_insert(&tx, &meta)?;
    tx.commit()?;
    meta.messagenum = messagenum;

    Ok(WriteOutcome {
        messagenum: meta.messagenum,
        onum: stored.onum,
        size: meta.size,
        status: meta.status,
    })
}

/// Per-recipient 24h autoreply dedup key named
/// lock around queueing. Backed by the cache's named-lock mechanism.
pub fn autoreply_dedup_key(usernum: u64, sender: &str) -> String {
    format!("autoreply.{usernum}.{sender}")
}

/// Builds the `Received:` trace header prepended before storage.
pub fn build_received_header(from_ip: std::net::IpAddr, by_host: &str, for_address: &str) -> String {
    format!(
        "Received: from [{from_ip}] by {by_host} for <{for_address}>; {}\r\n",
        bounce::rfc2822_now_placeholder()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autoreply_dedup_key_is_scoped_per_user_and_sender() {
        let a = autoreply_dedup_key(1, "a@b.com");
        let b = autoreply_dedup_key(2, "a@b.com");
        assert_ne!(a, b);
    }

    #[test]
    fn received_header_mentions_sender_ip_and_recipient() {
        let header = build_received_header("10.0.0.1".parse().unwrap(), "mx.magma.test", "user@magma.test");
        assert!(header.starts_with("Received:"));
        assert!(header.contains("10.0.0.1"));
        assert!(header.contains("user@magma.test"));
    }
}
