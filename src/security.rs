//! DISCLAIMER: The ciphers in this module are toy implementations kept *EXCLUSIVELY* for
//! demonstration and educational purposes. The key derivation is a home-grown mixing
//! function, the nonce is derived from the passphrase (so it repeats for every file
//! encrypted with the same passphrase), and there is no authentication. RC4 is broken
//! outright. Do not protect real data with anything in here.
//!
//! Three stream ciphers are available, all driven through [`StreamCipher`]:
//! - ChaCha20 (RFC 8439 block function, 96-bit nonce, 32-bit counter starting at 1)
//! - Salsa20/20 (64-bit nonce, 64-bit counter starting at 0)
//! - RC4
//!
//! Container layout:
//!
//! | Cipher   | Layout                                          |
//! |----------|-------------------------------------------------|
//! | ChaCha20 | `nonce:12 | orig_size:u64 LE | ciphertext`      |
//! | Salsa20  | `nonce:8  | orig_size:u64 LE | ciphertext`      |
//! | RC4      | `orig_size:u64 LE | ciphertext`                 |
//!
//! # Examples
//!
//! ```rust
//! use packcrypt::security::{decrypt, encrypt, CipherAlgorithm};
//!
//! let sealed = encrypt(b"attack at dawn", CipherAlgorithm::Salsa20, b"hunter2").unwrap();
//! let opened = decrypt(&sealed, CipherAlgorithm::Salsa20, b"hunter2").unwrap();
//! assert_eq!(opened.as_slice(), b"attack at dawn");
//! ```

use crate::buffer::{ByteBuffer, Reader};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

pub mod chacha20;
pub mod kdf;
pub mod rc4;
pub mod salsa20;

pub use chacha20::ChaCha20;
pub use rc4::Rc4;
pub use salsa20::Salsa20;

/// Longest passphrase accepted by [`encrypt`] and [`decrypt`].
pub const MAX_PASSPHRASE_LEN: usize = 256;

/// A keystream generator that XORs its output into a buffer in place.
///
/// Applying the same freshly initialised cipher twice restores the input.
pub trait StreamCipher {
    /// XOR the next `data.len()` keystream bytes into `data`.
    fn apply_keystream(&mut self, data: &mut [u8]) -> Result<()>;
}

/// Selects one of the stream ciphers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CipherAlgorithm {
    #[default]
    ChaCha20,
    Salsa20,
    Rc4,
}

impl CipherAlgorithm {
    pub const ALL: [CipherAlgorithm; 3] = [
        CipherAlgorithm::ChaCha20,
        CipherAlgorithm::Salsa20,
        CipherAlgorithm::Rc4,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CipherAlgorithm::ChaCha20 => "chacha20",
            CipherAlgorithm::Salsa20 => "salsa20",
            CipherAlgorithm::Rc4 => "rc4",
        }
    }

    /// Bytes of nonce stored at the front of the container.
    pub fn nonce_len(self) -> usize {
        match self {
            CipherAlgorithm::ChaCha20 => chacha20::NONCE_SIZE,
            CipherAlgorithm::Salsa20 => salsa20::NONCE_SIZE,
            CipherAlgorithm::Rc4 => 0,
        }
    }

    /// Bytes of header (nonce plus size field) before the ciphertext.
    pub fn header_len(self) -> usize {
        self.nonce_len() + 8
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CipherAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chacha20" | "chacha" => Ok(CipherAlgorithm::ChaCha20),
            "salsa20" | "salsa" => Ok(CipherAlgorithm::Salsa20),
            "rc4" => Ok(CipherAlgorithm::Rc4),
            name @ ("aes128" | "aes" | "des" | "vigenere") => Err(Error::InvalidInput(format!(
                "encryption algorithm '{}' is not implemented",
                name
            ))),
            other => Err(Error::InvalidInput(format!(
                "unknown encryption algorithm '{}' (expected chacha20, salsa20 or rc4)",
                other
            ))),
        }
    }
}

/// A parsed cipher container, borrowing from the input bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub algorithm: CipherAlgorithm,
    pub nonce: &'a [u8],
    pub original_size: u64,
    pub ciphertext: &'a [u8],
}

impl<'a> Envelope<'a> {
    /// Splits a container into nonce, declared size and ciphertext.
    ///
    /// # Errors
    /// `Encryption` if the header is short or the declared size does not match
    /// the ciphertext actually present.
    pub fn parse(bytes: &'a [u8], algorithm: CipherAlgorithm) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let short = || {
            Error::Encryption(format!(
                "{} container is {} bytes, header alone needs {}",
                algorithm,
                bytes.len(),
                algorithm.header_len()
            ))
        };
        let nonce = reader.take(algorithm.nonce_len()).ok_or_else(short)?;
        let original_size = reader.u64_le().ok_or_else(short)?;
        let ciphertext = reader.rest();
        if ciphertext.len() as u64 != original_size {
            return Err(Error::Encryption(format!(
                "{} container declares {} bytes but carries {}",
                algorithm,
                original_size,
                ciphertext.len()
            )));
        }
        Ok(Envelope {
            algorithm,
            nonce,
            original_size,
            ciphertext,
        })
    }
}

fn check_passphrase(passphrase: &[u8]) -> Result<()> {
    if passphrase.is_empty() {
        return Err(Error::InvalidInput("encryption key must not be empty".into()));
    }
    if passphrase.len() > MAX_PASSPHRASE_LEN {
        return Err(Error::InvalidInput(format!(
            "encryption key is {} bytes, limit is {}",
            passphrase.len(),
            MAX_PASSPHRASE_LEN
        )));
    }
    Ok(())
}

fn derive_nonce(algorithm: CipherAlgorithm, passphrase: &[u8]) -> Vec<u8> {
    match algorithm {
        CipherAlgorithm::ChaCha20 => kdf::derive_nonce::<{ chacha20::NONCE_SIZE }>(passphrase).to_vec(),
        CipherAlgorithm::Salsa20 => kdf::derive_nonce::<{ salsa20::NONCE_SIZE }>(passphrase).to_vec(),
        CipherAlgorithm::Rc4 => Vec::new(),
    }
}

/// Builds a freshly keyed cipher positioned at the container's starting counter.
fn keyed_cipher(
    algorithm: CipherAlgorithm,
    passphrase: &[u8],
    nonce: &[u8],
) -> Result<Box<dyn StreamCipher>> {
    let bad_nonce = || {
        Error::Encryption(format!(
            "{} nonce must be {} bytes, got {}",
            algorithm,
            algorithm.nonce_len(),
            nonce.len()
        ))
    };
    Ok(match algorithm {
        CipherAlgorithm::ChaCha20 => {
            let key = kdf::derive_key::<{ chacha20::KEY_SIZE }>(passphrase);
            let nonce: [u8; chacha20::NONCE_SIZE] = nonce.try_into().map_err(|_| bad_nonce())?;
            Box::new(ChaCha20::new(key.as_bytes(), &nonce, chacha20::INITIAL_COUNTER))
        }
        CipherAlgorithm::Salsa20 => {
            let key = kdf::derive_key::<{ salsa20::KEY_SIZE }>(passphrase);
            let nonce: [u8; salsa20::NONCE_SIZE] = nonce.try_into().map_err(|_| bad_nonce())?;
            Box::new(Salsa20::new(key.as_bytes(), &nonce, salsa20::INITIAL_COUNTER))
        }
        CipherAlgorithm::Rc4 => {
            let key = kdf::derive_key::<{ rc4::KEY_SIZE }>(passphrase);
            Box::new(Rc4::new(key.as_bytes())?)
        }
    })
}

/// Encrypts `data` under a key derived from `passphrase` and frames it.
///
/// # Errors
/// - `InvalidInput` if the passphrase is empty or longer than 256 bytes
/// - `Encryption` if the payload exceeds the ChaCha20 counter range
pub fn encrypt(data: &[u8], algorithm: CipherAlgorithm, passphrase: &[u8]) -> Result<ByteBuffer> {
    check_passphrase(passphrase)?;
    if algorithm == CipherAlgorithm::ChaCha20
        && data.len() as u64 > chacha20::max_payload_len(chacha20::INITIAL_COUNTER)
    {
        return Err(Error::Encryption(format!(
            "{} bytes exceeds the ChaCha20 limit of {} bytes per nonce",
            data.len(),
            chacha20::max_payload_len(chacha20::INITIAL_COUNTER)
        )));
    }

    let nonce = derive_nonce(algorithm, passphrase);
    if !nonce.is_empty() {
        log::debug!("{}: nonce {}", algorithm, hex::encode(&nonce));
    }

    let mut out = ByteBuffer::with_capacity(algorithm.header_len() + data.len())?;
    out.extend_from_slice(&nonce)?;
    out.put_u64_le(data.len() as u64)?;
    let start = out.len();
    out.extend_from_slice(data)?;

    keyed_cipher(algorithm, passphrase, &nonce)?.apply_keystream(&mut out.as_mut_slice()[start..])?;
    log::debug!("{}: encrypted {} -> {} bytes", algorithm, data.len(), out.len());
    Ok(out)
}

/// Opens a container produced by [`encrypt`].
///
/// A wrong passphrase is not detected here; it produces wrong plaintext of the
/// right length.
///
/// # Errors
/// - `InvalidInput` if the passphrase is empty or longer than 256 bytes
/// - `Encryption` if the container is short or its size field is inconsistent
pub fn decrypt(data: &[u8], algorithm: CipherAlgorithm, passphrase: &[u8]) -> Result<ByteBuffer> {
    check_passphrase(passphrase)?;
    let envelope = Envelope::parse(data, algorithm)?;

    let mut out = ByteBuffer::with_capacity(envelope.ciphertext.len())?;
    out.extend_from_slice(envelope.ciphertext)?;
    keyed_cipher(algorithm, passphrase, envelope.nonce)?.apply_keystream(out.as_mut_slice())?;
    log::debug!("{}: decrypted {} -> {} bytes", algorithm, data.len(), out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"correct horse battery staple";

    #[test]
    fn test_all_ciphers_roundtrip() {
        let plain: Vec<u8> = (0..1000u32).map(|i| (i * 31 % 251) as u8).collect();
        for alg in CipherAlgorithm::ALL {
            let sealed = encrypt(&plain, alg, KEY).unwrap();
            assert_eq!(sealed.len(), alg.header_len() + plain.len());
            assert_ne!(&sealed[alg.header_len()..], &plain[..]);
            assert_eq!(decrypt(&sealed, alg, KEY).unwrap().as_slice(), &plain[..], "{}", alg);
        }
    }

    #[test]
    fn test_nonce_is_digest_prefix() {
        let sealed = encrypt(b"x", CipherAlgorithm::ChaCha20, KEY).unwrap();
        let digest = kdf::simple_hash(KEY);
        assert_eq!(&sealed[..12], &digest[..12]);

        let sealed = encrypt(b"x", CipherAlgorithm::Salsa20, KEY).unwrap();
        assert_eq!(&sealed[..8], &digest[..8]);
    }

    #[test]
    fn test_chacha_container_uses_counter_one() {
        let plain = [0u8; 64];
        let sealed = encrypt(&plain, CipherAlgorithm::ChaCha20, KEY).unwrap();
        let key = kdf::derive_key::<32>(KEY);
        let nonce: [u8; 12] = kdf::derive_nonce(KEY);
        let mut expected = plain;
        ChaCha20::new(key.as_bytes(), &nonce, 1)
            .apply_keystream(&mut expected)
            .unwrap();
        assert_eq!(&sealed[20..], &expected[..]);
    }

    #[test]
    fn test_empty_payload() {
        for alg in CipherAlgorithm::ALL {
            let sealed = encrypt(b"", alg, KEY).unwrap();
            assert_eq!(sealed.len(), alg.header_len());
            assert!(decrypt(&sealed, alg, KEY).unwrap().is_empty());
        }
    }

    #[test]
    fn test_envelope_parse() {
        let sealed = encrypt(b"hello", CipherAlgorithm::Rc4, KEY).unwrap();
        let env = Envelope::parse(&sealed, CipherAlgorithm::Rc4).unwrap();
        assert!(env.nonce.is_empty());
        assert_eq!(env.original_size, 5);
        assert_eq!(env.ciphertext.len(), 5);
    }

    #[test]
    fn test_size_mismatch_is_encryption_error() {
        for alg in CipherAlgorithm::ALL {
            let sealed = encrypt(b"some plaintext", alg, KEY).unwrap();
            assert!(matches!(
                decrypt(&sealed[..sealed.len() - 1], alg, KEY),
                Err(Error::Encryption(_))
            ));
            assert!(matches!(
                decrypt(&sealed[..3], alg, KEY),
                Err(Error::Encryption(_))
            ));
        }
    }

    #[test]
    fn test_bad_passphrase_lengths() {
        assert!(matches!(
            encrypt(b"data", CipherAlgorithm::ChaCha20, b""),
            Err(Error::InvalidInput(_))
        ));
        let long = vec![b'k'; MAX_PASSPHRASE_LEN + 1];
        assert!(matches!(
            decrypt(b"data", CipherAlgorithm::Rc4, &long),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_wrong_passphrase_gives_wrong_plaintext() {
        let sealed = encrypt(b"top secret", CipherAlgorithm::ChaCha20, KEY).unwrap();
        let opened = decrypt(&sealed, CipherAlgorithm::ChaCha20, b"guess").unwrap();
        assert_ne!(opened.as_slice(), b"top secret");
    }

    #[test]
    fn test_parse_cipher_names() {
        assert_eq!("ChaCha20".parse::<CipherAlgorithm>().unwrap(), CipherAlgorithm::ChaCha20);
        assert_eq!("rc4".parse::<CipherAlgorithm>().unwrap(), CipherAlgorithm::Rc4);
        for name in ["aes128", "aes", "des", "vigenere"] {
            let err = name.parse::<CipherAlgorithm>().unwrap_err();
            assert!(err.to_string().contains("not implemented"), "{}", err);
        }
        assert!(matches!(
            "blowfish".parse::<CipherAlgorithm>(),
            Err(Error::InvalidInput(_))
        ));
    }
}
