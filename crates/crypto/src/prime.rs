//! PRIME authenticated object format: messages and at-rest
//! secrets are wrapped in a self-describing, tamper-evident envelope built
//! on AES-256-GCM. The composite 64-byte key splits into three shards —
//! a 16-byte IV shard, a 16-byte tag shard, and a 32-byte cipher key — so
//! that the on-wire IV and tag never appear in the clear even though the
//! underlying AES-GCM nonce and tag are not secret by themselves.
//!
//! Wire layout: `[BE16 type][BE32 total-size][16B IV⊕shard][16B TAG⊕shard][ciphertext‖tag]`.
//! Plaintext is framed before encryption as `[BE24 length][u8 pad-count][payload‖padding]`,
//! padded to a multiple of 16 bytes.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;

use crate::error::CryptoError;

pub const KEY_LENGTH: usize = 64;
const IV_SHARD_LEN: usize = 16;
const TAG_SHARD_LEN: usize = 16;
const CIPHER_KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = 2 + 4;
const BLOCK_SIZE: usize = 16;
const MAX_PLAINTEXT_LEN: usize = (1 << 24) - 1;

pub struct PrimeKey {
    iv_shard: [u8; IV_SHARD_LEN],
    tag_shard: [u8; TAG_SHARD_LEN],
    cipher_key: [u8; CIPHER_KEY_LEN],
}

impl PrimeKey {
    pub fn from_bytes(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_LENGTH {
            return Err(CryptoError::KeyLength {
                expected: KEY_LENGTH,
                found: key.len(),
            });
        }
        let mut iv_shard = [0u8; IV_SHARD_LEN];
        let mut tag_shard = [0u8; TAG_SHARD_LEN];
        let mut cipher_key = [0u8; CIPHER_KEY_LEN];
        iv_shard.copy_from_slice(&key[0..16]);
        tag_shard.copy_from_slice(&key[16..32]);
        cipher_key.copy_from_slice(&key[32..64]);
        Ok(PrimeKey {
            iv_shard,
            tag_shard,
            cipher_key,
        })
    }

    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LENGTH];
        rand::thread_rng().fill_bytes(&mut key);
        PrimeKey::from_bytes(&key).expect("generated key has the exact required length")
    }

    pub fn to_bytes(&self) -> [u8; KEY_LENGTH] {
        let mut out = [0u8; KEY_LENGTH];
        out[0..16].copy_from_slice(&self.iv_shard);
        out[16..32].copy_from_slice(&self.tag_shard);
        out[32..64].copy_from_slice(&self.cipher_key);
        out
    }
}

/// Object type tags for the objects PRIME wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Message = 1,
    MasterKeyEnvelope = 2,
    Attachment = 3,
}

impl ObjectType {
    fn from_u16(value: u16) -> Result<Self, CryptoError> {
        match value {
            1 => Ok(ObjectType::Message),
            2 => Ok(ObjectType::MasterKeyEnvelope),
            3 => Ok(ObjectType::Attachment),
            other => Err(CryptoError::UnsupportedObjectType(other)),
        }
    }
}

pub fn encrypt(object_type: ObjectType, key: &PrimeKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(CryptoError::TruncatedObject);
    }

    let framed = frame_plaintext(plaintext);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(&key.cipher_key).expect("32-byte key is valid for AES-256");
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: &framed,
                aad: &[],
            },
        )
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    let (ct_body, tag) = ciphertext.split_at(ciphertext.len() - 16);

    let mut wire_iv = [0u8; IV_SHARD_LEN];
    wire_iv[0..NONCE_LEN].copy_from_slice(&nonce_bytes);
    for i in 0..IV_SHARD_LEN {
        wire_iv[i] ^= key.iv_shard[i];
    }

    let mut wire_tag = [0u8; TAG_SHARD_LEN];
    for i in 0..TAG_SHARD_LEN {
        wire_tag[i] = tag[i] ^ key.tag_shard[i];
    }

    let total_size = HEADER_LEN + IV_SHARD_LEN + TAG_SHARD_LEN + ct_body.len() + 16;
    let mut out = Vec::with_capacity(total_size);
    out.extend_from_slice(&(object_type as u16).to_be_bytes());
    out.extend_from_slice(&(total_size as u32).to_be_bytes());
    out.extend_from_slice(&wire_iv);
    out.extend_from_slice(&wire_tag);
    out.extend_from_slice(ct_body);
    out.extend_from_slice(tag);

    Ok(out)
}

pub fn decrypt(key: &PrimeKey, object: &[u8]) -> Result<(ObjectType, Vec<u8>), CryptoError> {
    if object.len() < HEADER_LEN + IV_SHARD_LEN + TAG_SHARD_LEN + 16 {
        return Err(CryptoError::TruncatedObject);
    }

    let object_type = ObjectType::from_u16(u16::from_be_bytes([object[0], object[1]]))?;
    let total_size = u32::from_be_bytes([object[2], object[3], object[4], object[5]]) as usize;
    if total_size != object.len() {
        return Err(CryptoError::TruncatedObject);
    }

    let wire_iv = &object[HEADER_LEN..HEADER_LEN + IV_SHARD_LEN];
    let wire_tag_start = HEADER_LEN + IV_SHARD_LEN;
    let wire_tag = &object[wire_tag_start..wire_tag_start + TAG_SHARD_LEN];
    let body_start = wire_tag_start + TAG_SHARD_LEN;
    let ct_body = &object[body_start..object.len() - 16];
    let wire_embedded_tag = &object[object.len() - 16..];

    let mut nonce_bytes = [0u8; NONCE_LEN];
    for i in 0..NONCE_LEN {
        nonce_bytes[i] = wire_iv[i] ^ key.iv_shard[i];
    }

    let mut tag = [0u8; 16];
    for i in 0..TAG_SHARD_LEN {
        tag[i] = wire_tag[i] ^ key.tag_shard[i];
    }
    if tag != wire_embedded_tag {
        return Err(CryptoError::AuthenticationFailed);
    }

    let cipher = Aes256Gcm::new_from_slice(&key.cipher_key).expect("32-byte key is valid for AES-256");
    let nonce = Nonce::from_slice(&nonce_bytes);
    let mut ciphertext_and_tag = Vec::with_capacity(ct_body.len() + 16);
    ciphertext_and_tag.extend_from_slice(ct_body);
    ciphertext_and_tag.extend_from_slice(&tag);

    let framed = cipher
        .decrypt(
            nonce,
            Payload {
                msg: &ciphertext_and_tag,
                aad: &[],
            },
        )
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    let plaintext = unframe_plaintext(&framed)?;
    Ok((object_type, plaintext))
}

fn frame_plaintext(plaintext: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(4 + plaintext.len() + BLOCK_SIZE);
    let len_be24 = (plaintext.len() as u32).to_be_bytes();
    framed.extend_from_slice(&len_be24[1..4]);

    let unpadded_len = 4 + plaintext.len();
    let remainder = unpadded_len % BLOCK_SIZE;
    let pad_count = if remainder == 0 { 0 } else { BLOCK_SIZE - remainder };

    framed.push(pad_count as u8);
    framed.extend_from_slice(plaintext);
    framed.extend(std::iter::repeat(0u8).take(pad_count));
    framed
}

fn unframe_plaintext(framed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if framed.len() < 4 {
        return Err(CryptoError::TruncatedObject);
    }
    let len = u32::from_be_bytes([0, framed[0], framed[1], framed[2]]) as usize;
    let pad_count = framed[3] as usize;
    if framed.len() != 4 + len + pad_count {
        return Err(CryptoError::TruncatedObject);
    }
    Ok(framed[4..4 + len].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_payload() {
        let key = PrimeKey::generate();
        let plaintext = b"the quick brown fox jumps over the lazy dog";
        let object = encrypt(ObjectType::Message, &key, plaintext).unwrap();
        let (object_type, decoded) = decrypt(&key, &object).unwrap();
        assert_eq!(object_type, ObjectType::Message);
        assert_eq!(decoded, plaintext);
    }

    #[test]
    fn round_trips_empty_payload() {
        let key = PrimeKey::generate();
        let object = encrypt(ObjectType::Attachment, &key, b"").unwrap();
        let (_, decoded) = decrypt(&key, &object).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn round_trips_exact_block_multiple() {
        let key = PrimeKey::generate();
        let plaintext = vec![0x42u8; 12];
        let object = encrypt(ObjectType::Message, &key, &plaintext).unwrap();
        let (_, decoded) = decrypt(&key, &object).unwrap();
        assert_eq!(decoded, plaintext);
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let key = PrimeKey::generate();
        let other_key = PrimeKey::generate();
        let object = encrypt(ObjectType::Message, &key, b"secret").unwrap();
        let err = decrypt(&other_key, &object).unwrap_err();
        assert_eq!(err, CryptoError::AuthenticationFailed);
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let key = PrimeKey::generate();
        let mut object = encrypt(ObjectType::Message, &key, b"secret message").unwrap();
        let last = object.len() - 1;
        object[last] ^= 0xff;
        let err = decrypt(&key, &object).unwrap_err();
        assert_eq!(err, CryptoError::AuthenticationFailed);
    }

    #[test]
    fn header_declares_total_size() {
        let key = PrimeKey::generate();
        let object = encrypt(ObjectType::Message, &key, b"hi").unwrap();
        let declared = u32::from_be_bytes([object[2], object[3], object[4], object[5]]) as usize;
        assert_eq!(declared, object.len());
    }

    #[test]
    fn rejects_unknown_object_type() {
        let key = PrimeKey::generate();
        let mut object = encrypt(ObjectType::Message, &key, b"hi").unwrap();
        object[0] = 0xff;
        object[1] = 0xff;
        let err = decrypt(&key, &object).unwrap_err();
        assert_eq!(err, CryptoError::UnsupportedObjectType(0xffff));
    }
}
