//! LZW dictionary compression with fixed 16-bit codes.
//!
//! Container: `orig_size: u64 LE | code_count: u64 LE | code_count x u16 LE`.
//!
//! Codes 0..=255 are the single bytes. Code 256 is reserved (a clear code that
//! is never emitted), so learned sequences start at 257. The dictionary stops
//! growing at 4096 entries; after that the encoder keeps emitting codes from
//! the frozen dictionary.

use crate::buffer::{ByteBuffer, Reader};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Number of single-byte codes the dictionary starts with.
pub const INITIAL_DICT_SIZE: usize = 256;
/// Reserved code, never emitted.
pub const CLEAR_CODE: u16 = 256;
/// First code assigned to a learned sequence.
pub const FIRST_FREE_CODE: usize = 257;
/// The dictionary never grows past this many entries.
pub const MAX_DICT_SIZE: usize = 4096;

/// The native result of LZW compression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LzwCompressed {
    pub original_size: u64,
    pub codes: Vec<u16>,
}

/// Compresses `input` into a sequence of dictionary codes.
///
/// The encoder dictionary maps `(prefix code, next byte)` to the code of the
/// extended sequence, so lookups do not materialize byte strings.
///
/// # Example
///
/// ```
/// use packcrypt::compression::lzw::{compress, decompress};
///
/// let compressed = compress(b"TOBEORNOTTOBEORTOBEORNOT");
/// assert!(compressed.codes.len() < 24);
/// assert_eq!(decompress(&compressed).unwrap().as_slice(), b"TOBEORNOTTOBEORTOBEORNOT");
/// ```
pub fn compress(input: &[u8]) -> LzwCompressed {
    let original_size = input.len() as u64;
    let Some((&first, rest)) = input.split_first() else {
        return LzwCompressed {
            original_size,
            codes: Vec::new(),
        };
    };

    let mut dict: HashMap<(u16, u8), u16> = HashMap::with_capacity(MAX_DICT_SIZE);
    let mut next_code = FIRST_FREE_CODE;
    let mut codes = Vec::with_capacity(input.len() / 2 + 1);

    let mut w = first as u16;
    for &k in rest {
        if let Some(&code) = dict.get(&(w, k)) {
            w = code;
            continue;
        }
        codes.push(w);
        if next_code < MAX_DICT_SIZE {
            dict.insert((w, k), next_code as u16);
            next_code += 1;
        }
        w = k as u16;
    }
    codes.push(w);

    log::debug!(
        "lzw: {} bytes -> {} codes, dictionary size {}",
        input.len(),
        codes.len(),
        next_code
    );
    LzwCompressed {
        original_size,
        codes,
    }
}

/// Decompresses a code sequence.
///
/// Handles the case where a code refers to the entry about to be defined
/// (`code == next code`): that sequence is the previous entry plus its own
/// first byte.
///
/// # Errors
/// `Corrupt` on an out-of-range or reserved code, on output overrunning the
/// declared size, or on a final size mismatch.
pub fn decompress(compressed: &LzwCompressed) -> Result<ByteBuffer> {
    let declared = usize::try_from(compressed.original_size)
        .map_err(|_| Error::Corrupt("LZW original size exceeds address space".into()))?;
    let Some((&first, rest)) = compressed.codes.split_first() else {
        if declared != 0 {
            return Err(Error::Corrupt(format!(
                "LZW stream has no codes but declares {} bytes",
                declared
            )));
        }
        return Ok(ByteBuffer::new());
    };

    if first as usize >= INITIAL_DICT_SIZE {
        return Err(Error::Corrupt(format!(
            "LZW stream must start with a literal code, got {}",
            first
        )));
    }

    // Index = code; slot 256 stays empty because the clear code is never emitted.
    let mut dict: Vec<Vec<u8>> = (0..INITIAL_DICT_SIZE).map(|i| vec![i as u8]).collect();
    dict.push(Vec::new());

    let bound = compressed.codes.len().saturating_mul(MAX_DICT_SIZE);
    let mut output = ByteBuffer::with_capacity(declared.min(bound))?;
    output.push(first as u8)?;
    let mut previous = first as usize;

    for &code in rest {
        let code = code as usize;
        let entry = if code < dict.len() && code != CLEAR_CODE as usize {
            dict[code].clone()
        } else if code == dict.len() && dict.len() < MAX_DICT_SIZE {
            let mut entry = dict[previous].clone();
            entry.push(dict[previous][0]);
            entry
        } else {
            return Err(Error::Corrupt(format!(
                "LZW code {} out of range (next code {})",
                code,
                dict.len()
            )));
        };

        if output.len() + entry.len() > declared {
            return Err(Error::Corrupt(format!(
                "LZW output overruns declared size {}",
                declared
            )));
        }
        output.extend_from_slice(&entry)?;

        if dict.len() < MAX_DICT_SIZE {
            let mut learned = dict[previous].clone();
            learned.push(entry[0]);
            dict.push(learned);
        }
        previous = code;
    }

    if output.len() != declared {
        return Err(Error::Corrupt(format!(
            "LZW decoded {} bytes, expected {}",
            output.len(),
            declared
        )));
    }
    Ok(output)
}

impl LzwCompressed {
    pub fn to_bytes(&self) -> Result<ByteBuffer> {
        let mut out = ByteBuffer::with_capacity(16 + self.codes.len() * 2)?;
        out.put_u64_le(self.original_size)?;
        out.put_u64_le(self.codes.len() as u64)?;
        for &code in &self.codes {
            out.put_u16_le(code)?;
        }
        Ok(out)
    }

    /// # Errors
    /// `Corrupt` if the header is short or the code area length disagrees with
    /// the stored code count.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let short = || Error::Corrupt("LZW container shorter than its header".into());
        let mut reader = Reader::new(bytes);
        let original_size = reader.u64_le().ok_or_else(short)?;
        let code_count = reader.u64_le().ok_or_else(short)?;
        if code_count.checked_mul(2) != Some(reader.remaining() as u64) {
            return Err(Error::Corrupt(format!(
                "LZW code area is {} bytes, header declares {} codes",
                reader.remaining(),
                code_count
            )));
        }
        let mut codes = Vec::new();
        codes.try_reserve_exact(code_count as usize)?;
        while let Some(code) = reader.u16_le() {
            codes.push(code);
        }
        Ok(LzwCompressed {
            original_size,
            codes,
        })
    }
}
