//! DNS real-time blocklist lookup: session-scoped,
//! cached across recipients by the caller. The actual DNS query against
//! an RBL zone is an out-of-scope external collaborator; this is the
//! contract the pipeline depends on.

use std::net::IpAddr;

#[derive(Debug, Clone, Default)]
pub struct RblVerdict {
    pub listed: bool,
    pub zone: Option<String>,
}

pub trait RblResolver: Send + Sync {
    fn lookup(&self, ip: IpAddr) -> RblVerdict;
}

/// Placeholder resolver used until a real RBL zone is wired in; always
/// reports clean, matching the fail-open default a missing external
/// service should have.
pub struct NullResolver;

impl RblResolver for NullResolver {
    fn lookup(&self, _ip: IpAddr) -> RblVerdict {
        RblVerdict::default()
    }
}

pub async fn check(ip: IpAddr) -> RblVerdict {
    NullResolver.lookup(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_resolver_is_fail_open() {
        let verdict = check("127.0.0.1".parse().unwrap()).await;
        assert!(!verdict.listed);
    }
}
