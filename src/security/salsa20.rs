//! DISCLAIMER: This library is a toy example of the Salsa20/20 stream cipher in pure Rust.
//! It is *EXCLUSIVELY* for demonstration and educational purposes. Absolutely DO NOT use it
//! for real cryptographic or security-sensitive operations; the nonce handling in this crate
//! is deterministic and the key derivation is a toy.
//!
//! State layout (words):
//!
//! ```text
//!  0: const   1: key     2: key     3: key
//!  4: key     5: const   6: nonce   7: nonce
//!  8: ctr lo  9: ctr hi 10: const  11: key
//! 12: key    13: key    14: key    15: const
//! ```

use super::StreamCipher;
use crate::error::{Error, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 8;
pub const BLOCK_SIZE: usize = 64;
/// Counter value the container format starts encrypting at.
pub const INITIAL_COUNTER: u64 = 0;

const CONSTANTS: [u32; 4] = [0x61707865, 0x3320646e, 0x79622d32, 0x6b206574];

#[inline(always)]
fn quarter_round(y: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    y[b] ^= y[a].wrapping_add(y[d]).rotate_left(7);
    y[c] ^= y[b].wrapping_add(y[a]).rotate_left(9);
    y[d] ^= y[c].wrapping_add(y[b]).rotate_left(13);
    y[a] ^= y[d].wrapping_add(y[c]).rotate_left(18);
}

fn column_round(x: &mut [u32; 16]) {
    quarter_round(x, 0, 4, 8, 12);
    quarter_round(x, 5, 9, 13, 1);
    quarter_round(x, 10, 14, 2, 6);
    quarter_round(x, 15, 3, 7, 11);
}

fn row_round(y: &mut [u32; 16]) {
    quarter_round(y, 0, 1, 2, 3);
    quarter_round(y, 5, 6, 7, 4);
    quarter_round(y, 10, 11, 8, 9);
    quarter_round(y, 15, 12, 13, 14);
}

/// Runs the 20-round core and serializes the result little-endian.
pub fn block(input: &[u32; 16]) -> [u8; BLOCK_SIZE] {
    let mut x = *input;
    for _ in 0..10 {
        column_round(&mut x);
        row_round(&mut x);
    }

    let mut out = [0u8; BLOCK_SIZE];
    for (i, chunk) in out.chunks_exact_mut(4).enumerate() {
        chunk.copy_from_slice(&x[i].wrapping_add(input[i]).to_le_bytes());
    }
    x.zeroize();
    out
}

/// A Salsa20 keystream generator with a 64-bit block counter. Wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Salsa20 {
    state: [u32; 16],
    counter: u64,
    keystream: [u8; BLOCK_SIZE],
    position: usize,
}

impl Salsa20 {
    pub fn new(key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE], counter: u64) -> Self {
        let word = |b: &[u8], i: usize| {
            u32::from_le_bytes([b[4 * i], b[4 * i + 1], b[4 * i + 2], b[4 * i + 3]])
        };
        let mut state = [0u32; 16];
        state[0] = CONSTANTS[0];
        for i in 0..4 {
            state[1 + i] = word(key, i);
            state[11 + i] = word(key, 4 + i);
        }
        state[5] = CONSTANTS[1];
        state[6] = word(nonce, 0);
        state[7] = word(nonce, 1);
        state[8] = counter as u32;
        state[9] = (counter >> 32) as u32;
        state[10] = CONSTANTS[2];
        state[15] = CONSTANTS[3];

        Salsa20 {
            state,
            counter,
            keystream: [0u8; BLOCK_SIZE],
            position: BLOCK_SIZE,
        }
    }

    /// Counter of the next block to be generated.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    fn refill(&mut self) -> Result<()> {
        self.keystream = block(&self.state);
        self.position = 0;
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or_else(|| Error::Encryption("Salsa20 block counter exhausted".into()))?;
        self.state[8] = self.counter as u32;
        self.state[9] = (self.counter >> 32) as u32;
        Ok(())
    }
}

impl StreamCipher for Salsa20 {
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

    #[test]
    fn test_quarter_round_vector() {
        let mut y = [0u32; 16];
        y[0] = 1;
        quarter_round(&mut y, 0, 1, 2, 3);
        assert_eq!(&y[..4], &[0x08008145, 0x00000080, 0x00010200, 0x20500000]);
    }

    #[test]
    fn test_zero_state_is_fixed_point() {
        assert_eq!(block(&[0u32; 16]), [0u8; BLOCK_SIZE]);
    }

    #[test]
    fn test_state_layout() {
        let key: [u8; 32] = core::array::from_fn(|i| i as u8);
        let cipher = Salsa20::new(&key, &[0xAA; 8], 0x1_0000_0002);
        assert_eq!(cipher.state[0], 0x61707865);
        assert_eq!(cipher.state[1], 0x03020100);
        assert_eq!(cipher.state[11], 0x13121110);
        assert_eq!(cipher.state[8], 2);
        assert_eq!(cipher.state[9], 1);
        assert_eq!(cipher.state[15], 0x6b206574);
    }

    #[test]
    fn test_counter_carries_into_high_word() {
        let key = [9u8; 32];
        let nonce = [3u8; 8];
        let start = u32::MAX as u64;

        let mut joined = [0u8; 128];
        Salsa20::new(&key, &nonce, start)
            .apply_keystream(&mut joined)
            .unwrap();

        let mut second = [0u8; 64];
        Salsa20::new(&key, &nonce, start + 1)
            .apply_keystream(&mut second)
            .unwrap();
        assert_eq!(&joined[64..], &second[..]);
    }

    #[test]
    fn test_involution_and_nonce_sensitivity() {
        let key = [0x5Au8; 32];
        let plain = b"Salsa20 keystream xor is its own inverse".to_vec();

        let mut data = plain.clone();
        Salsa20::new(&key, &[1; 8], 0).apply_keystream(&mut data).unwrap();
        assert_ne!(data, plain);

        let mut other = plain.clone();
        Salsa20::new(&key, &[2; 8], 0).apply_keystream(&mut other).unwrap();
        assert_ne!(data, other);

        Salsa20::new(&key, &[1; 8], 0).apply_keystream(&mut data).unwrap();
        assert_eq!(data, plain);
    }
}
