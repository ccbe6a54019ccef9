//! Envelope parsing: `MAIL FROM:<addr> [SIZE=n] [BODY=...]`
//! and `RCPT TO:<addr>`. Addresses are lowercased and restricted to a
//! conservative RFC 5321 alphabet; an empty reverse-path (`<>`) is
//! permitted for bounces.

pub const MAX_ADDRESS_LEN: usize = 320;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    SevenBit,
    EightBitMime,
}

#[derive(Debug, Clone)]
pub struct Envelope {
    /// `None` represents the empty reverse-path `<>`.
    pub from: Option<String>,
    pub size_declared: Option<u64>,
    pub body: Body,
    pub recipients: Vec<String>,
}

impl Envelope {
    pub fn new(from: Option<String>, size_declared: Option<u64>, body: Body) -> Self {
        Envelope {
            from,
            size_declared,
            body,
            recipients: Vec::new(),
        }
    }

    /// Adds a recipient, collapsing duplicates.
    pub fn add_recipient(&mut self, address: String) {
        if !self.recipients.iter().any(|r| r == &address) {
            self.recipients.push(address);
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum EnvelopeError {
    Empty,
    TooLong,
    InvalidCharacter,
    MissingAngleBrackets,
}

/// Parses the bracketed address portion of `MAIL FROM:<...>` / `RCPT TO:<...>`,
/// not the optional ESMTP parameters — those are parsed by the caller.
pub fn parse_address(raw: &str) -> Result<Option<String>, EnvelopeError> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .ok_or(EnvelopeError::MissingAngleBrackets)?;

    if inner.is_empty() {
        return Ok(None);
    }
    if inner.len() > MAX_ADDRESS_LEN {
        return Err(EnvelopeError::TooLong);
    }
    if !inner.chars().all(is_allowed_address_char) {
        return Err(EnvelopeError::InvalidCharacter);
    }
    Ok(Some(inner.to_ascii_lowercase()))
}

fn is_allowed_address_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+' | '@' | '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '/' | '=' | '?' | '^' | '`' | '{' | '|' | '}' | '~')
}

/// Parses the `SIZE=n` ESMTP parameter if present among `params`.
pub fn parse_size_param(params: &[&str]) -> Option<u64> {
    params.iter().find_map(|p| {
        p.strip_prefix("SIZE=")
            .or_else(|| p.strip_prefix("size="))
            .and_then(|v| v.parse().ok())
    })
}

pub fn parse_body_param(params: &[&str]) -> Body {
    for p in params {
        if p.eq_ignore_ascii_case("BODY=8BITMIME") {
            return Body::EightBitMime;
        }
    }
    Body::SevenBit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reverse_path_is_allowed() {
        assert_eq!(parse_address("<>").unwrap(), None);
    }

    #[test]
    fn address_is_lowercased() {
        assert_eq!(
            parse_address("<User@Example.COM>").unwrap(),
            Some("user@example.com".to_string())
        );
    }

    #[test]
    fn missing_angle_brackets_is_rejected() {
        assert_eq!(parse_address("user@example.com"), Err(EnvelopeError::MissingAngleBrackets));
    }

    #[test]
    fn oversized_address_is_rejected() {
        let long = format!("<{}@example.com>", "a".repeat(MAX_ADDRESS_LEN));
        assert_eq!(parse_address(&long), Err(EnvelopeError::TooLong));
    }

    #[test]
    fn size_param_is_parsed() {
        assert_eq!(parse_size_param(&["SIZE=1024", "BODY=8BITMIME"]), Some(1024));
        assert_eq!(parse_size_param(&["BODY=8BITMIME"]), None);
    }

    #[test]
    fn duplicate_recipients_are_collapsed() {
        let mut envelope = Envelope::new(Some("a@b.com".into()), None, Body::SevenBit);
        envelope.add_recipient("x@y.com".into());
        envelope.add_recipient("x@y.com".into());
        assert_eq!(envelope.recipients.len(), 1);
    }
}
