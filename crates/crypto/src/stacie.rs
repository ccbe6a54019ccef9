//! STACIE credential derivation: a password-stretching scheme that
//! turns a plaintext password, username, and 128-byte salt into a
//! master key, a password key (sent to the server instead of the
//! plaintext password), and a verification token (what the server
//! actually stores).

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

use crate::error::CryptoError;

pub const SALT_LENGTH: usize = 128;
pub const KEY_LENGTH: usize = 64;
pub const ROUNDS_MIN: u32 = 8;
pub const ROUNDS_MAX: u32 = 16_777_216;

/// Number of key-derivation rounds to run before yielding to a cancellation
/// check, matching the original's shutdown poll cadence.
pub const YIELD_INTERVAL: u32 = 100_000;

type HmacSha512 = Hmac<Sha512>;

/// `rounds = clamp(8, 2^(24 - clamp(1,23,len)) + bonus, 2^24)`.
pub fn derive_rounds(password: &str, bonus: u32) -> Result<u32, CryptoError> {
    let len = password.chars().count() as u64;
    if len == 0 {
        return Err(CryptoError::EmptyPassword);
    }
    let exponent = 24 - len.clamp(1, 23);
    let dynamic: u64 = 1u64 << exponent;
    let rounds = (dynamic + bonus as u64).clamp(ROUNDS_MIN as u64, ROUNDS_MAX as u64);
    Ok(rounds as u32)
}

/// `seed = HMAC_SHA512(key = salt)` with the password absorbed `rounds` times.
pub fn derive_seed(
    rounds: u32,
    password: &str,
    salt: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if !(ROUNDS_MIN..=ROUNDS_MAX).contains(&rounds) {
        return Err(CryptoError::InvalidRounds(rounds));
    }
    if salt.len() != SALT_LENGTH {
        return Err(CryptoError::InvalidSaltLength {
            expected: SALT_LENGTH,
            found: salt.len(),
        });
    }
    if password.is_empty() {
        return Err(CryptoError::EmptyPassword);
    }

    let password_bytes = password.as_bytes();
    let mut mac = HmacSha512::new_from_slice(salt).expect("HMAC accepts keys of any length");
    for _ in 0..rounds {
        mac.update(password_bytes);
    }
    Ok(Zeroizing::new(mac.finalize().into_bytes().to_vec()))
}

/// Iterated-hash derivation shared by the master-key and password-key
/// stages: `key_n = SHA512(key_{n-1} || base || username || salt || password || BE24(n))`,
/// with `key_{-1}` omitted on the first round.
pub fn derive_key(
    base: &[u8],
    rounds: u32,
    username: &str,
    password: &str,
    salt: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    derive_key_cancellable(base, rounds, username, password, salt, || true)
}

pub fn derive_key_cancellable(
    base: &[u8],
    rounds: u32,
    username: &str,
    password: &str,
    salt: &[u8],
    mut should_continue: impl FnMut() -> bool,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if !(ROUNDS_MIN..=ROUNDS_MAX).contains(&rounds) {
        return Err(CryptoError::InvalidRounds(rounds));
    }
    if base.len() != KEY_LENGTH {
        return Err(CryptoError::InvalidBaseLength {
            expected: KEY_LENGTH,
            found: base.len(),
        });
    }
    if salt.len() != SALT_LENGTH {
        return Err(CryptoError::InvalidSaltLength {
            expected: SALT_LENGTH,
            found: salt.len(),
        });
    }
    if username.is_empty() || password.is_empty() {
        return Err(CryptoError::EmptyPassword);
    }

    let username_bytes = username.as_bytes();
    let password_bytes = password.as_bytes();
    let mut key = Zeroizing::new(Vec::<u8>::new());

    for count in 0..rounds {
        if count != 0 && count % YIELD_INTERVAL == 0 && !should_continue() {
            return Err(CryptoError::InvalidRounds(rounds));
        }

        let mut hasher = Sha512::new();
        if count != 0 {
            hasher.update(&key[..]);
        }
        hasher.update(base);
        hasher.update(username_bytes);
        hasher.update(salt);
        hasher.update(password_bytes);
        let count_be24 = count.to_be_bytes();
        hasher.update(&count_be24[1..4]);
        key = Zeroizing::new(hasher.finalize().to_vec());
    }

    Ok(key)
}

pub struct StacieKeys {
    pub master_key: Zeroizing<Vec<u8>>,
    pub password_key: Zeroizing<Vec<u8>>,
    pub verification_token: Vec<u8>,
    pub rounds: u32,
}

/// Runs the full STACIE pipeline: rounds → seed → master key → password key
/// → verification token. `password` must already be UTF-8 and NFC-normalized
/// by the caller
pub fn derive(
    password: &str,
    username: &str,
    salt: &[u8],
    bonus: u32,
) -> Result<StacieKeys, CryptoError> {
    let rounds = derive_rounds(password, bonus)?;
    let seed = derive_seed(rounds, password, salt)?;
    let master_key = derive_key(&seed, rounds, username, password, salt)?;
    let password_key = derive_key(&master_key, rounds, username, password, salt)?;
    let verification_token = verification_token(&master_key, username, salt);

    Ok(StacieKeys {
        master_key,
        password_key,
        verification_token,
        rounds,
    })
}

/// `HMAC-SHA512(master_key, "verification" || username || salt)` — what the
/// directory persists and compares against on login.
pub fn verification_token(master_key: &[u8], username: &str, salt: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha512::new_from_slice(master_key).expect("HMAC accepts keys of any length");
    mac.update(b"verification");
    mac.update(username.as_bytes());
    mac.update(salt);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_at_length_one_is_maximal_dynamic() {
        // exponent = 24 - clamp(1,23,1) = 23 => dynamic = 2^23
        assert_eq!(derive_rounds("a", 0).unwrap(), 1 << 23);
    }

    #[test]
    fn rounds_at_length_23_and_above_floor_to_two() {
        let long_password = "a".repeat(23);
        assert_eq!(derive_rounds(&long_password, 0).unwrap(), 2u32.clamp(ROUNDS_MIN, ROUNDS_MAX));
        let longer_password = "a".repeat(100);
        assert_eq!(derive_rounds(&longer_password, 0).unwrap(), 2u32.clamp(ROUNDS_MIN, ROUNDS_MAX));
    }

    #[test]
    fn rounds_are_clamped_to_bounds() {
        assert_eq!(derive_rounds("aaaaaaaaaaaaaaaaaaaaaaaaaaaa", 0).unwrap(), ROUNDS_MIN);
        assert_eq!(
            derive_rounds("a", u32::MAX).unwrap(),
            ROUNDS_MAX
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        let salt = vec![7u8; SALT_LENGTH];
        let a = derive("hunter2", "user@example.com", &salt, 0).unwrap();
        let b = derive("hunter2", "user@example.com", &salt, 0).unwrap();
        assert_eq!(a.master_key.as_slice(), b.master_key.as_slice());
        assert_eq!(a.verification_token, b.verification_token);
    }

    #[test]
    fn different_usernames_yield_different_keys() {
        let salt = vec![7u8; SALT_LENGTH];
        let a = derive("hunter2", "alice@example.com", &salt, 0).unwrap();
        let b = derive("hunter2", "bob@example.com", &salt, 0).unwrap();
        assert_ne!(a.master_key.as_slice(), b.master_key.as_slice());
    }

    #[test]
    fn wrong_salt_length_fails() {
        let err = derive_seed(ROUNDS_MIN, "pw", &[0u8; 16]).unwrap_err();
        assert_eq!(
            err,
            CryptoError::InvalidSaltLength {
                expected: SALT_LENGTH,
                found: 16
            }
        );
    }

    #[test]
    fn wrong_base_length_fails() {
        let salt = vec![0u8; SALT_LENGTH];
        let err = derive_key(&[0u8; 32], ROUNDS_MIN, "u", "p", &salt).unwrap_err();
        assert_eq!(
            err,
            CryptoError::InvalidBaseLength {
                expected: KEY_LENGTH,
                found: 32
            }
        );
    }

    #[test]
    fn key_output_is_64_bytes() {
        let salt = vec![3u8; SALT_LENGTH];
        let keys = derive("correct horse battery staple", "user", &salt, 0).unwrap();
        assert_eq!(keys.master_key.len(), KEY_LENGTH);
        assert_eq!(keys.password_key.len(), KEY_LENGTH);
    }
}
