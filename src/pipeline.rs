//! Ordering and execution of compression and encryption stages.
//!
//! A request is a set of [`Operations`]. [`plan`] turns it into at most two
//! [`Stage`]s so that whatever was built as `compress -> encrypt` is undone as
//! `decrypt -> decompress`:
//!
//! - COMPRESS runs first, followed by ENCRYPT if requested
//! - DECRYPT runs first, followed by DECOMPRESS if requested
//! - otherwise a lone DECOMPRESS or a lone ENCRYPT
//!
//! Any requested operation that cannot be placed under these rules is an
//! error rather than being dropped.

use crate::buffer::ByteBuffer;
use crate::compression::{self, CompressionAlgorithm};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::security::{self, CipherAlgorithm};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A set of requested operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Operations(u8);

impl Operations {
    pub const NONE: Operations = Operations(0);
    pub const COMPRESS: Operations = Operations(1 << 0);
    pub const DECOMPRESS: Operations = Operations(1 << 1);
    pub const ENCRYPT: Operations = Operations(1 << 2);
    pub const DECRYPT: Operations = Operations(1 << 3);

    const NAMES: [(Operations, &'static str); 4] = [
        (Operations::COMPRESS, "compress"),
        (Operations::DECOMPRESS, "decompress"),
        (Operations::ENCRYPT, "encrypt"),
        (Operations::DECRYPT, "decrypt"),
    ];

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Builds a set from raw bits, ignoring unknown ones.
    pub fn from_bits_truncate(bits: u8) -> Self {
        Operations(bits & 0x0F)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Operations) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Operations) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Operations) {
        self.0 |= other.0;
    }

    pub fn difference(self, other: Operations) -> Operations {
        Operations(self.0 & !other.0)
    }

    /// True if any operation needs a key.
    pub fn needs_key(self) -> bool {
        self.intersects(Operations::ENCRYPT | Operations::DECRYPT)
    }
}

impl BitOr for Operations {
    type Output = Operations;

    fn bitor(self, rhs: Operations) -> Operations {
        Operations(self.0 | rhs.0)
    }
}

impl BitOrAssign for Operations {
    fn bitor_assign(&mut self, rhs: Operations) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Operations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (op, name) in Operations::NAMES {
            if self.contains(op) {
                if !first {
                    f.write_str("+")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// One step of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Compress(CompressionAlgorithm),
    Decompress(CompressionAlgorithm),
    Encrypt(CipherAlgorithm),
    Decrypt(CipherAlgorithm),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Compress(alg) => write!(f, "compress({})", alg),
            Stage::Decompress(alg) => write!(f, "decompress({})", alg),
            Stage::Encrypt(alg) => write!(f, "encrypt({})", alg),
            Stage::Decrypt(alg) => write!(f, "decrypt({})", alg),
        }
    }
}

/// Orders the requested operations into stages.
///
/// # Errors
/// `InvalidInput` if nothing is requested or an operation cannot be placed,
/// e.g. COMPRESS together with DECRYPT.
pub fn plan(
    operations: Operations,
    compression: CompressionAlgorithm,
    cipher: CipherAlgorithm,
) -> Result<Vec<Stage>> {
    if operations.is_empty() {
        return Err(Error::InvalidInput(
            "no operation requested; use compress, decompress, encrypt or decrypt".into(),
        ));
    }

    let (stages, scheduled) = if operations.contains(Operations::COMPRESS) {
        let mut stages = vec![Stage::Compress(compression)];
        if operations.contains(Operations::ENCRYPT) {
            stages.push(Stage::Encrypt(cipher));
        }
        (stages, Operations::COMPRESS | Operations::ENCRYPT)
    } else if operations.contains(Operations::DECRYPT) {
        let mut stages = vec![Stage::Decrypt(cipher)];
        if operations.contains(Operations::DECOMPRESS) {
            stages.push(Stage::Decompress(compression));
        }
        (stages, Operations::DECRYPT | Operations::DECOMPRESS)
    } else if operations.contains(Operations::DECOMPRESS) {
        (vec![Stage::Decompress(compression)], Operations::DECOMPRESS)
    } else {
        (vec![Stage::Encrypt(cipher)], Operations::ENCRYPT)
    };

    let leftover = operations.difference(scheduled);
    if !leftover.is_empty() {
        return Err(Error::InvalidInput(format!(
            "cannot combine {} with {}",
            operations.difference(leftover),
            leftover
        )));
    }
    Ok(stages)
}

/// Runs one stage, consuming its input buffer.
pub fn run_stage(data: ByteBuffer, stage: Stage, key: Option<&[u8]>) -> Result<ByteBuffer> {
    let require_key =
        || key.ok_or_else(|| Error::InvalidInput(format!("{} requires a key", stage)));
    match stage {
        Stage::Compress(alg) => compression::compress(&data, alg),
        Stage::Decompress(alg) => compression::decompress(&data, alg),
        Stage::Encrypt(alg) => security::encrypt(&data, alg, require_key()?),
        Stage::Decrypt(alg) => security::decrypt(&data, alg, require_key()?),
    }
}

/// Threads `data` through the stages planned for `operations`.
///
/// Stops at the first failing stage and returns its error; the partial
/// buffer is dropped.
pub fn run_pipeline(data: ByteBuffer, operations: Operations, config: &Config) -> Result<ByteBuffer> {
    let stages = plan(operations, config.compression, config.cipher)?;
    let key = config.key.as_ref().map(|k| k.as_bytes());

    let mut buffer = data;
    for stage in stages {
        let before = buffer.len();
        buffer = run_stage(buffer, stage, key).map_err(|err| {
            log::debug!("{} failed: {}", stage, err);
            err
        })?;
        log::debug!("{}: {} -> {} bytes", stage, before, buffer.len());
    }
    Ok(buffer)
}
