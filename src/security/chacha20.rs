//! DISCLAIMER: This library is a toy example of the ChaCha20 stream cipher in pure Rust.
//! It is *EXCLUSIVELY* for demonstration and educational purposes. The block function
//! follows RFC 8439, but the surrounding key and nonce handling in this crate is weak
//! (deterministic nonce, toy KDF). If you need ChaCha20 in production, use a vetted,
//! well-reviewed cryptography library.
//!
//! State layout: words 0-3 constants, 4-11 key, 12 block counter, 13-15 nonce.

use super::StreamCipher;
use crate::error::{Error, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;
pub const BLOCK_SIZE: usize = 64;
/// Counter value the container format starts encrypting at.
pub const INITIAL_COUNTER: u32 = 1;

const CONSTANTS: [u32; 4] = [0x61707865, 0x3320646e, 0x79622d32, 0x6b206574];

#[inline(always)]
fn quarter_round(s: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    s[a] = s[a].wrapping_add(s[b]);
    s[d] = (s[d] ^ s[a]).rotate_left(16);
    s[c] = s[c].wrapping_add(s[d]);
    s[b] = (s[b] ^ s[c]).rotate_left(12);
    s[a] = s[a].wrapping_add(s[b]);
    s[d] = (s[d] ^ s[a]).rotate_left(8);
    s[c] = s[c].wrapping_add(s[d]);
    s[b] = (s[b] ^ s[c]).rotate_left(7);
}

/// Runs the 20-round block function and serializes the result little-endian.
pub fn block(input: &[u32; 16]) -> [u8; BLOCK_SIZE] {
    let mut x = *input;
    for _ in 0..10 {
        // Column rounds
        quarter_round(&mut x, 0, 4, 8, 12);
        quarter_round(&mut x, 1, 5, 9, 13);
        quarter_round(&mut x, 2, 6, 10, 14);
        quarter_round(&mut x, 3, 7, 11, 15);
        // Diagonal rounds
        quarter_round(&mut x, 0, 5, 10, 15);
        quarter_round(&mut x, 1, 6, 11, 12);
        quarter_round(&mut x, 2, 7, 8, 13);
        quarter_round(&mut x, 3, 4, 9, 14);
    }

    let mut out = [0u8; BLOCK_SIZE];
    for (i, chunk) in out.chunks_exact_mut(4).enumerate() {
        chunk.copy_from_slice(&x[i].wrapping_add(input[i]).to_le_bytes());
    }
    x.zeroize();
    out
}

/// Longest payload that can be encrypted starting at `initial_counter`
/// before the 32-bit block counter would have to wrap.
pub fn max_payload_len(initial_counter: u32) -> u64 {
    (u32::MAX as u64 - initial_counter as u64 + 1) * BLOCK_SIZE as u64
}

/// A ChaCha20 keystream generator. Wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ChaCha20 {
    state: [u32; 16],
    keystream: [u8; BLOCK_SIZE],
    position: usize,
    exhausted: bool,
}

impl ChaCha20 {
    pub fn new(key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE], counter: u32) -> Self {
        let mut state = [0u32; 16];
        state[..4].copy_from_slice(&CONSTANTS);
        for (i, chunk) in key.chunks_exact(4).enumerate() {
            state[4 + i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        state[12] = counter;
        for (i, chunk) in nonce.chunks_exact(4).enumerate() {
            state[13 + i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        ChaCha20 {
            state,
            keystream: [0u8; BLOCK_SIZE],
            position: BLOCK_SIZE,
            exhausted: false,
        }
    }

    /// Counter of the next block to be generated.
    pub fn counter(&self) -> u32 {
        self.state[12]
    }

    fn refill(&mut self) -> Result<()> {
        if self.exhausted {
            return Err(Error::Encryption(
                "ChaCha20 block counter exhausted; refusing to reuse keystream".into(),
            ));
        }
        self.keystream = block(&self.state);
        self.position = 0;
        match self.state[12].checked_add(1) {
            Some(next) => self.state[12] = next,
            None => self.exhausted = true,
        }
        Ok(())
    }
}

impl StreamCipher for ChaCha20 {
    fn apply_keystream(&mut self, data: &mut [u8]) -> Result<()> {
        for byte in data.iter_mut() {
            if self.position == BLOCK_SIZE {
                self.refill()?;
            }
            *byte ^= self.keystream[self.position];
            self.position += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    fn keystream(key: &[u8; 32], nonce: &[u8; 12], counter: u32, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        ChaCha20::new(key, nonce, counter)
            .apply_keystream(&mut buf)
            .unwrap();
        buf
    }

    #[test]
    fn test_quarter_round_vector() {
        // RFC 8439 section 2.1.1
        let mut s = [0u32; 16];
        s[0] = 0x11111111;
        s[1] = 0x01020304;
        s[2] = 0x9b8d6f43;
        s[3] = 0x01234567;
        quarter_round(&mut s, 0, 1, 2, 3);
        assert_eq!(&s[..4], &[0xea2a92f4, 0xcb1cf8ce, 0x4581472e, 0x5881c4bb]);
    }

    #[test]
    fn test_zero_key_keystream() {
        let expected = hex::decode(
            "76b8e0ada0f13d90405d6ae55386bd28bdd219b8a08ded1aa836efcc8b770dc7\
             da41597c5157488d7724e03fb8d84a376a43b8f41518a11cc387b669b2ee6586",
        )
        .unwrap();
        assert_eq!(keystream(&[0; 32], &[0; 12], 0, 64), expected);
    }

    #[test]
    fn test_block_function_vector() {
        // RFC 8439 section 2.3.2
        let key: [u8; 32] = core::array::from_fn(|i| i as u8);
        let nonce = [0, 0, 0, 0x09, 0, 0, 0, 0x4a, 0, 0, 0, 0];
        let stream = keystream(&key, &nonce, 1, 16);
        assert_eq!(hex::encode(stream), "10f1e7e4d13b5915500fdd1fa32071c4");
    }

    #[test]
    fn test_matches_rand_chacha() {
        let key: [u8; 32] = core::array::from_fn(|i| (i * 7 + 3) as u8);
        let mut reference = vec![0u8; 300];
        ChaCha20Rng::from_seed(key).fill_bytes(&mut reference);
        assert_eq!(keystream(&key, &[0; 12], 0, 300), reference);
    }

    #[test]
    fn test_chunked_equals_one_shot() {
        let key = [0x42u8; 32];
        let nonce = [7u8; 12];
        let mut data: Vec<u8> = (0..200u8).collect();
        let mut expected = data.clone();
        ChaCha20::new(&key, &nonce, 1)
            .apply_keystream(&mut expected)
            .unwrap();

        let mut cipher = ChaCha20::new(&key, &nonce, 1);
        let (a, b) = data.split_at_mut(70);
        cipher.apply_keystream(a).unwrap();
        cipher.apply_keystream(b).unwrap();
        assert_eq!(data, expected);
        assert_eq!(cipher.counter(), 5);
    }

    #[test]
    fn test_counter_exhaustion_is_an_error() {
        let mut cipher = ChaCha20::new(&[1; 32], &[2; 12], u32::MAX);
        let mut last_block = [0u8; BLOCK_SIZE];
        cipher.apply_keystream(&mut last_block).unwrap();
        let mut one_more = [0u8; 1];
        assert!(matches!(
            cipher.apply_keystream(&mut one_more),
            Err(Error::Encryption(_))
        ));

        let mut too_long = [0u8; BLOCK_SIZE + 1];
        assert!(ChaCha20::new(&[1; 32], &[2; 12], u32::MAX)
            .apply_keystream(&mut too_long)
            .is_err());
    }

    #[test]
    fn test_max_payload_len() {
        assert_eq!(max_payload_len(u32::MAX), 64);
        assert_eq!(max_payload_len(INITIAL_COUNTER), (u32::MAX as u64) * 64);
    }
}
