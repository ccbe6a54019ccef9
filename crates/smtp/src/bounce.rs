//! Bounce and autoreply generation: failures that carry a
//! `BOUNCE_*` bit and a bounce policy are turned into an RFC 5322
//! message addressed back to the reverse-path, assembled with
//! `mail-builder`.

use mail_builder::MessageBuilder;

use crate::pipeline::Outcome;

pub struct BounceReason {
    pub recipient: String,
    pub outcome: Outcome,
    pub detail: &'static str,
}

/// Renders an RFC 5322 delivery-status-style bounce body. The caller is
/// responsible for queueing it through the outbound relay and for the
/// backscatter-suppression decision (`pipeline::suppress_bounce`).
pub fn build_bounce(from: &str, to: &str, reason: &BounceReason) -> Result<Vec<u8>, String> {
    MessageBuilder::new()
        .from(("Mail Delivery Subsystem", from))
        .to(to)
        .subject("Undelivered Mail Returned to Sender")
        .text_body(format!(
            "The following message could not be delivered to {}:\n\n{}\n",
            reason.recipient, reason.detail
        ))
        .write_to_vec()
        .map_err(|_| "failed to render bounce message".to_string())
}

/// Renders a plain autoreply body, subject to the caller's per-recipient
/// 24h dedup via the named-lock mechanism (`storage_write::autoreply_dedup_key`).
pub fn build_autoreply(from: &str, to: &str, subject: &str, body: &str) -> Result<Vec<u8>, String> {
    MessageBuilder::new()
        .from(("", from))
        .to(to)
        .subject(subject)
        .text_body(body)
        .write_to_vec()
        .map_err(|_| "failed to render autoreply message".to_string())
}

/// Placeholder RFC 2822 date-time used by the `Received:` header builder
/// until the session wires through its own clock source.
pub fn rfc2822_now_placeholder() -> &'static str {
    "Thu, 01 Jan 1970 00:00:00 +0000"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounce_message_mentions_original_recipient() {
        let reason = BounceReason {
            recipient: "user@magma.test".into(),
            outcome: Outcome::BOUNCE_VIRUS,
            detail: "message rejected: infected",
        };
        let rendered = build_bounce("postmaster@magma.test", "sender@example.com", &reason).unwrap();
        let text = String::from_utf8_lossy(&rendered);
        assert!(text.contains("user@magma.test"));
    }

    #[test]
    fn autoreply_contains_configured_subject() {
        let rendered = build_autoreply(
            "user@magma.test",
            "sender@example.com",
            "Out of office",
            "I am away.",
        )
        .unwrap();
        let text = String::from_utf8_lossy(&rendered);
        assert!(text.contains("Out of office"));
    }
}
