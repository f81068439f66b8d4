//! DISCLAIMER: This library is a toy example of the RC4 stream cipher in pure Rust.
//! RC4 is broken: its keystream has well-known biases and it must never be used to protect
//! real data. It is here *EXCLUSIVELY* for demonstration and educational purposes.

use super::StreamCipher;
use crate::error::{Error, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key length the container format derives from the passphrase.
pub const KEY_SIZE: usize = 16;
pub const STATE_SIZE: usize = 256;

/// RC4 permutation state plus the two PRGA indices. Wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Rc4 {
    s: [u8; STATE_SIZE],
    i: u8,
    j: u8,
}

impl Rc4 {
    /// Runs the key-scheduling algorithm.
    ///
    /// # Errors
    /// `InvalidInput` if `key` is empty or longer than 256 bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.is_empty() || key.len() > STATE_SIZE {
            return Err(Error::InvalidInput(format!(
                "RC4 key must be 1..=256 bytes, got {}",
                key.len()
            )));
        }

        let mut s = [0u8; STATE_SIZE];
        for (i, slot) in s.iter_mut().enumerate() {
            *slot = i as u8;
        }
        let mut j: u8 = 0;
        for i in 0..STATE_SIZE {
            j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }
        Ok(Rc4 { s, i: 0, j: 0 })
    }

    fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.s[self.i as usize]);
        self.s.swap(self.i as usize, self.j as usize);
        let k = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
        self.s[k as usize]
    }
}

impl StreamCipher for Rc4 {
    fn apply_keystream(&mut self, data: &mut [u8]) -> Result<()> {
        for byte in data.iter_mut() {
            *byte ^= self.next_byte();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encrypt(key: &[u8], plaintext: &[u8]) -> String {
        let mut data = plaintext.to_vec();
        Rc4::new(key).unwrap().apply_keystream(&mut data).unwrap();
        hex::encode_upper(data)
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(encrypt(b"Key", b"Plaintext"), "BBF316E8D940AF0AD3");
        assert_eq!(encrypt(b"Wiki", b"pedia"), "1021BF0420");
        assert_eq!(
            encrypt(b"Secret", b"Attack at dawn"),
            "45A01F645FC35B383552544B9BF5"
        );
    }

    #[test]
    fn test_involution() {
        let mut data = b"round and round".to_vec();
        Rc4::new(b"k").unwrap().apply_keystream(&mut data).unwrap();
        Rc4::new(b"k").unwrap().apply_keystream(&mut data).unwrap();
        assert_eq!(data, b"round and round");
    }

    #[test]
    fn test_invalid_key_lengths() {
        assert!(matches!(Rc4::new(b""), Err(Error::InvalidInput(_))));
        assert!(Rc4::new(&[0u8; 257]).is_err());
        assert!(Rc4::new(&[0u8; 256]).is_ok());
    }
}
