//! ECIES-style asymmetric envelope over P-256, used to wrap a per-message
//! PRIME key under a recipient's public key so the symmetric key itself
//! never touches disk in the clear. Built on the same p256/aes-gcm/hkdf
//! stack used elsewhere in this crate for at-rest encryption.
//!
//! Wire layout: `[1B curve-id][33B compressed pubkey][12B nonce][ciphertext‖16B tag]`.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use hkdf::Hkdf;
use p256::ecdh::diffie_hellman;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{EncodedPoint, PublicKey, SecretKey};
use rand::RngCore;
use sha2::Sha256;

use crate::error::CryptoError;

const CURVE_ID_P256: u8 = 1;
const COMPRESSED_POINT_LEN: usize = 33;
const NONCE_LEN: usize = 12;
const HKDF_INFO: &[u8] = b"magma-envelope-v1";

pub struct KeyPair {
    pub secret: SecretKey,
    pub public: PublicKey,
}

pub fn generate_keypair() -> KeyPair {
    let secret = SecretKey::random(&mut rand::thread_rng());
    let public = secret.public_key();
    KeyPair { secret, public }
}

/// Encrypts `plaintext` (typically a 64-byte PRIME key) so only the holder
/// of `recipient`'s private key can recover it.
pub fn seal(recipient: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let ephemeral = SecretKey::random(&mut rand::thread_rng());
    let shared = diffie_hellman(&ephemeral.to_nonzero_scalar(), recipient.as_affine());

    let mut symmetric_key = [0u8; 32];
    Hkdf::<Sha256>::new(None, shared.raw_secret_bytes().as_slice())
        .expand(HKDF_INFO, &mut symmetric_key)
        .expect("32-byte okm is within HKDF-SHA256's output limit");

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(&symmetric_key).expect("32-byte key is valid for AES-256");
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: &[],
            },
        )
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    let ephemeral_public = ephemeral.public_key();
    let encoded_point = ephemeral_public.to_encoded_point(true);
    let compressed = encoded_point.as_bytes();
    if compressed.len() != COMPRESSED_POINT_LEN {
        return Err(CryptoError::KeyLength {
            expected: COMPRESSED_POINT_LEN,
            found: compressed.len(),
        });
    }

    let mut out = Vec::with_capacity(1 + COMPRESSED_POINT_LEN + NONCE_LEN + ciphertext.len());
    out.push(CURVE_ID_P256);
    out.extend_from_slice(compressed);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Recovers the plaintext sealed with [`seal`] using the matching secret key.
pub fn open(secret: &SecretKey, envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if envelope.len() < 1 + COMPRESSED_POINT_LEN + NONCE_LEN + 16 {
        return Err(CryptoError::TruncatedObject);
    }
    if envelope[0] != CURVE_ID_P256 {
        return Err(CryptoError::UnsupportedObjectType(envelope[0] as u16));
    }

    let pubkey_bytes = &envelope[1..1 + COMPRESSED_POINT_LEN];
    let encoded_point =
        EncodedPoint::from_bytes(pubkey_bytes).map_err(|_| CryptoError::TruncatedObject)?;
    let ephemeral_public =
        PublicKey::from_encoded_point(&encoded_point).into_option().ok_or(CryptoError::TruncatedObject)?;

    let nonce_start = 1 + COMPRESSED_POINT_LEN;
    let nonce_bytes = &envelope[nonce_start..nonce_start + NONCE_LEN];
    let ciphertext = &envelope[nonce_start + NONCE_LEN..];

    let shared = diffie_hellman(&secret.to_nonzero_scalar(), ephemeral_public.as_affine());

    let mut symmetric_key = [0u8; 32];
    Hkdf::<Sha256>::new(None, shared.raw_secret_bytes().as_slice())
        .expand(HKDF_INFO, &mut symmetric_key)
        .expect("32-byte okm is within HKDF-SHA256's output limit");

    let cipher = Aes256Gcm::new_from_slice(&symmetric_key).expect("32-byte key is valid for AES-256");
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad: &[],
            },
        )
        .map_err(|_| CryptoError::AuthenticationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_sealed_key() {
        let recipient = generate_keypair();
        let plaintext = vec![0x11u8; 64];
        let envelope = seal(&recipient.public, &plaintext).unwrap();
        let opened = open(&recipient.secret, &envelope).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn wrong_secret_key_fails_to_open() {
        let recipient = generate_keypair();
        let other = generate_keypair();
        let envelope = seal(&recipient.public, b"top secret").unwrap();
        let err = open(&other.secret, &envelope).unwrap_err();
        assert_eq!(err, CryptoError::AuthenticationFailed);
    }

    #[test]
    fn envelope_starts_with_curve_id_and_compressed_point() {
        let recipient = generate_keypair();
        let envelope = seal(&recipient.public, b"key material").unwrap();
        assert_eq!(envelope[0], CURVE_ID_P256);
        assert!(envelope[1] == 0x02 || envelope[1] == 0x03);
    }

    #[test]
    fn tampered_envelope_fails_authentication() {
        let recipient = generate_keypair();
        let mut envelope = seal(&recipient.public, b"key material").unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0xff;
        let err = open(&recipient.secret, &envelope).unwrap_err();
        assert_eq!(err, CryptoError::AuthenticationFailed);
    }
}
