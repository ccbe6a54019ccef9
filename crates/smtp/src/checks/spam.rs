//! Statistical spam classification, per-recipient:
//! the classifier produces a verdict plus a signature id/key retained in
//! meta for later per-user retraining via a signed URL. The classifier
//! itself (e.g. DSPAM) is an out-of-scope external collaborator; this is
//! the contract it fulfils.

#[derive(Debug, Clone, Default)]
pub struct SpamVerdict {
    pub is_spam: bool,
    pub signum: u64,
    pub sigkey: u64,
}

pub trait SpamClassifier: Send + Sync {
    fn classify(&self, body: &[u8]) -> SpamVerdict;
}

/// Placeholder classifier: never flags spam but still mints a
/// signature/key pair so the retraining reference can be stored.
pub struct NullClassifier;

impl SpamClassifier for NullClassifier {
    fn classify(&self, body: &[u8]) -> SpamVerdict {
        use std::hash::Hasher;
        let mut signum_hasher = ahash::AHasher::default();
        signum_hasher.write(body);
        let mut sigkey_hasher = ahash::AHasher::default();
        sigkey_hasher.write(body);
        sigkey_hasher.write_u8(1);
        SpamVerdict {
            is_spam: false,
            signum: signum_hasher.finish(),
            sigkey: sigkey_hasher.finish(),
        }
    }
}

pub fn classify(body: &[u8]) -> SpamVerdict {
    NullClassifier.classify(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_mints_stable_signature_for_same_body() {
        let a = classify(b"hello");
        let b = classify(b"hello");
        assert_eq!(a.signum, b.signum);
        assert_eq!(a.sigkey, b.sigkey);
        assert!(!a.is_spam);
    }

    #[test]
    fn different_bodies_get_different_signatures() {
        let a = classify(b"hello");
        let b = classify(b"goodbye");
        assert_ne!(a.signum, b.signum);
    }
}
