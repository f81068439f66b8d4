//! DISCLAIMER: This is a toy key-derivation function, kept *EXCLUSIVELY* for demonstration
//! and compatibility with the container formats in this crate. It is not a password hash:
//! there is no salt, no memory hardness, and the mixing has never been analysed. Use a
//! vetted KDF (Argon2, scrypt, PBKDF2) for anything that matters.
//!
//! The passphrase is folded into eight 32-bit words by XOR-rotate-accumulate, then
//! stirred for 1000 rounds. The nonce is a prefix of the same digest, so a given
//! passphrase always yields the same key and nonce.

use std::fmt;
use zeroize::Zeroize;

/// Size of the digest produced by [`simple_hash`].
pub const DIGEST_SIZE: usize = 32;

const INITIAL_STATE: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab,
    0x5be0cd19,
];
const MIXING_ROUNDS: usize = 1000;

/// Folds an arbitrary-length input into a 32-byte digest.
pub fn simple_hash(input: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut state = INITIAL_STATE;

    for (i, &byte) in input.iter().enumerate() {
        let idx = i % 8;
        state[idx] ^= byte as u32;
        state[idx] = state[idx].rotate_left(7);
        state[(idx + 1) % 8] = state[(idx + 1) % 8].wrapping_add(state[idx]);
    }

    for _ in 0..MIXING_ROUNDS {
        for i in 0..8 {
            state[i] = state[i].wrapping_add(state[(i + 1) % 8]);
            state[i] = state[i].rotate_left(11);
        }
    }

    let mut out = [0u8; DIGEST_SIZE];
    for (chunk, word) in out.chunks_exact_mut(4).zip(state.iter()) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    state.zeroize();
    out
}

/// Key material derived from a passphrase, wiped when dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey<const N: usize>([u8; N]);

impl<const N: usize> DerivedKey<N> {
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> Drop for DerivedKey<N> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<const N: usize> fmt::Debug for DerivedKey<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derives an `N`-byte key (`N <= 32`) from `passphrase` as a prefix of its digest.
pub fn derive_key<const N: usize>(passphrase: &[u8]) -> DerivedKey<N> {
    let mut digest = simple_hash(passphrase);
    let mut key = [0u8; N];
    key.copy_from_slice(&digest[..N]);
    digest.zeroize();
    DerivedKey(key)
}

/// Derives an `N`-byte nonce (`N <= 32`) from `passphrase`.
pub fn derive_nonce<const N: usize>(passphrase: &[u8]) -> [u8; N] {
    let mut digest = simple_hash(passphrase);
    let mut nonce = [0u8; N];
    nonce.copy_from_slice(&digest[..N]);
    digest.zeroize();
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_still_mixes() {
        let digest = simple_hash(b"");
        assert_ne!(&digest[..4], &INITIAL_STATE[0].to_le_bytes());
    }

    #[test]
    fn test_deterministic_and_sensitive() {
        assert_eq!(simple_hash(b"hunter2"), simple_hash(b"hunter2"));
        assert_ne!(simple_hash(b"hunter2"), simple_hash(b"hunter3"));
        assert_ne!(simple_hash(b"ab"), simple_hash(b"ba"));
    }

    #[test]
    fn test_key_and_nonce_are_digest_prefixes() {
        let digest = simple_hash(b"passphrase");
        let key32: DerivedKey<32> = derive_key(b"passphrase");
        let key16: DerivedKey<16> = derive_key(b"passphrase");
        let nonce: [u8; 12] = derive_nonce(b"passphrase");
        assert_eq!(key32.as_bytes(), &digest);
        assert_eq!(key16.as_bytes()[..], digest[..16]);
        assert_eq!(nonce[..], digest[..12]);
    }

    #[test]
    fn test_debug_is_redacted() {
        let key: DerivedKey<16> = derive_key(b"secret");
        assert_eq!(format!("{:?}", key), "DerivedKey([REDACTED])");
    }
}
