//! Antivirus scanning, per-recipient: streams the
//! body to an external scanner (e.g. ClamAV, named out of scope) and
//! reports infection by signature name.

#[derive(Debug, Clone, Default)]
pub struct VirusVerdict {
    pub infected: bool,
    pub signature: Option<String>,
}

pub trait VirusScanner: Send + Sync {
    fn scan(&self, body: &[u8]) -> VirusVerdict;
}

/// EICAR-only scanner, standing in for a real engine: treats the
/// standard antivirus test string as the sole known signature.
pub struct EicarScanner;

const EICAR_MARKER: &[u8] = b"X5O!P%@AP[4\\PZX54(P^)7CC)7}$EICAR";

impl VirusScanner for EicarScanner {
    fn scan(&self, body: &[u8]) -> VirusVerdict {
        if body
            .windows(EICAR_MARKER.len())
            .any(|w| w == EICAR_MARKER)
        {
            VirusVerdict {
                infected: true,
                signature: Some("Eicar-Test-Signature".to_string()),
            }
        } else {
            VirusVerdict::default()
        }
    }
}

pub async fn scan(body: &[u8]) -> VirusVerdict {
    EicarScanner.scan(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clean_body_is_not_infected() {
        let verdict = scan(b"hello world").await;
        assert!(!verdict.infected);
    }

    #[tokio::test]
    async fn eicar_marker_is_flagged() {
        let mut body = b"prefix ".to_vec();
        body.extend_from_slice(EICAR_MARKER);
        let verdict = scan(&body).await;
        assert!(verdict.infected);
        assert_eq!(verdict.signature.as_deref(), Some("Eicar-Test-Signature"));
    }
}
