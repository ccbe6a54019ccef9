//! SPF evaluation of the return-path against the sender domain's
//! published policy, session-scoped like RBL.

use std::net::IpAddr;

#[derive(Debug, Clone, Default)]
pub struct SpfVerdict {
    pub failed: bool,
}

pub trait SpfEvaluator: Send + Sync {
    fn evaluate(&self, sender: Option<&str>, ip: IpAddr) -> SpfVerdict;
}

pub struct PermissiveEvaluator;

impl SpfEvaluator for PermissiveEvaluator {
    fn evaluate(&self, _sender: Option<&str>, _ip: IpAddr) -> SpfVerdict {
        SpfVerdict::default()
    }
}

pub async fn check(sender: Option<&str>, ip: IpAddr) -> SpfVerdict {
    PermissiveEvaluator.evaluate(sender, ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permissive_evaluator_is_fail_open() {
        let verdict = check(Some("a@b.com"), "127.0.0.1".parse().unwrap()).await;
        assert!(!verdict.failed);
        let verdict = check(None, "127.0.0.1".parse().unwrap()).await;
        assert!(!verdict.failed);
    }
}
