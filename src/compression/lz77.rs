//! LZ77 sliding-window compression with a single-candidate hash index.
//!
//! The stream is an 8-byte big-endian original size followed by 4-byte tokens
//! `{offset: u16 BE, length: u8, literal: u8}`. A token with `offset == 0` is a
//! pure literal; otherwise the decoder copies `length` bytes from `offset` bytes
//! back and then appends the literal, unless the output is already complete.
//!
//! Match search hashes the next three bytes and consults exactly one candidate
//! per bucket (the most recent position with that hash). This misses longer
//! matches further back in the window in exchange for O(n) search. The index is
//! owned by a single `compress` call, so concurrent calls never share buckets.

use crate::buffer::{ByteBuffer, Reader};
use crate::error::{Error, Result};

/// Bytes behind the current position a match may start in.
pub const WINDOW_SIZE: usize = 4096;
/// Longest match the encoder looks for.
pub const LOOKAHEAD_SIZE: usize = 18;
/// Shorter matches are emitted as literals.
pub const MIN_MATCH_LENGTH: usize = 3;
/// Number of hash buckets (16-bit hash).
pub const HASH_TABLE_SIZE: usize = 1 << 16;

const HEADER_SIZE: usize = 8;
const TOKEN_SIZE: usize = 4;
const NO_CANDIDATE: usize = usize::MAX;

/// An LZ77 token.
///
/// `offset == 0` encodes a literal-only token; otherwise `length` bytes are
/// copied from `offset` bytes back before `literal` is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub offset: u16,
    pub length: u8,
    pub literal: u8,
}

impl Token {
    fn literal(byte: u8) -> Self {
        Token {
            offset: 0,
            length: 0,
            literal: byte,
        }
    }

    fn is_reference(&self) -> bool {
        self.offset > 0 && self.length > 0
    }
}

/// Hash index mapping a 3-byte prefix hash to the last position seen with it.
///
/// Holds one candidate per bucket; every probe overwrites the bucket with the
/// probing position, hit or miss.
pub struct HashIndex {
    buckets: Vec<usize>,
}

impl Default for HashIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl HashIndex {
    pub fn new() -> Self {
        Self {
            buckets: vec![NO_CANDIDATE; HASH_TABLE_SIZE],
        }
    }

    fn hash(prefix: &[u8]) -> usize {
        let h = ((prefix[0] as u32) << 16) | ((prefix[1] as u32) << 8) | prefix[2] as u32;
        (h as usize) & (HASH_TABLE_SIZE - 1)
    }

    /// Returns the previous candidate for the prefix at `pos` and records `pos`.
    fn probe(&mut self, data: &[u8], pos: usize) -> Option<usize> {
        let slot = Self::hash(&data[pos..pos + 3]);
        let candidate = self.buckets[slot];
        self.buckets[slot] = pos;
        (candidate != NO_CANDIDATE).then_some(candidate)
    }
}

/// The native result of LZ77 compression: declared size plus token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lz77Compressed {
    pub original_size: u64,
    pub tokens: Vec<Token>,
}

/// Finds the longest match for `pos` using the single candidate in `index`.
///
/// Returns `(offset, length)`; length is 0 when there is no usable candidate.
fn find_longest_match(index: &mut HashIndex, data: &[u8], pos: usize) -> (usize, usize) {
    // A hash needs three bytes.
    if pos + 2 >= data.len() {
        return (0, 0);
    }
    let window_start = pos.saturating_sub(WINDOW_SIZE);
    let lookahead_end = (pos + LOOKAHEAD_SIZE).min(data.len());

    let Some(candidate) = index.probe(data, pos) else {
        return (0, 0);
    };
    if candidate < window_start || candidate >= pos {
        return (0, 0);
    }
    if data[candidate..candidate + 3] != data[pos..pos + 3] {
        return (0, 0);
    }

    let mut length = 3;
    while pos + length < lookahead_end && data[candidate + length] == data[pos + length] {
        length += 1;
    }
    (pos - candidate, length)
}

/// Compresses `input` with a caller-supplied hash index.
///
/// The index is not reset first: entries left by an earlier input can yield
/// back-references that a fresh index would not find. The output still decodes
/// correctly, but it is only reproducible when `index` is fresh.
pub fn compress_with_index(input: &[u8], index: &mut HashIndex) -> Lz77Compressed {
    let mut tokens = Vec::with_capacity(input.len() / 2 + 1);
    let mut pos = 0;
    while pos < input.len() {
        let (offset, length) = find_longest_match(index, input, pos);
        if length >= MIN_MATCH_LENGTH {
            let literal = input.get(pos + length).copied().unwrap_or(0);
            tokens.push(Token {
                offset: offset as u16,
                length: length as u8,
                literal,
            });
            pos += length + 1;
        } else {
            tokens.push(Token::literal(input[pos]));
            pos += 1;
        }
    }
    Lz77Compressed {
        original_size: input.len() as u64,
        tokens,
    }
}

/// Compresses `input` with a freshly allocated hash index.
pub fn compress(input: &[u8]) -> Lz77Compressed {
    let mut index = HashIndex::new();
    compress_with_index(input, &mut index)
}

/// Rebuilds the original bytes from a token stream.
///
/// # Errors
/// - `Corrupt` if a back-reference points before the start of the output or
///   would run past the declared size.
/// - `Compression` if the tokens end before producing the declared size.
pub fn decompress(compressed: &Lz77Compressed) -> Result<ByteBuffer> {
    let declared = usize::try_from(compressed.original_size)
        .map_err(|_| Error::Corrupt("LZ77 original size exceeds address space".into()))?;
    let reachable = compressed.tokens.len().saturating_mul(256);
    let mut output = ByteBuffer::with_capacity(declared.min(reachable))?;

    for token in &compressed.tokens {
        if output.len() >= declared {
            break;
        }
        if token.is_reference() {
            let offset = token.offset as usize;
            let length = token.length as usize;
            if offset > output.len() {
                return Err(Error::Corrupt(format!(
                    "LZ77 back-reference offset {} exceeds output size {}",
                    offset,
                    output.len()
                )));
            }
            if output.len() + length > declared {
                return Err(Error::Corrupt(format!(
                    "LZ77 back-reference overruns declared size {}",
                    declared
                )));
            }
            output.copy_back(offset, length)?;
        }
        if output.len() < declared {
            output.push(token.literal)?;
        }
    }

    if output.len() != declared {
        return Err(Error::Compression(format!(
            "LZ77 size mismatch: expected {}, got {}",
            declared,
            output.len()
        )));
    }
    Ok(output)
}

impl Lz77Compressed {
    /// Serializes as `orig_size: u64 BE` followed by the tokens.
    pub fn to_bytes(&self) -> Result<ByteBuffer> {
        let mut out = ByteBuffer::with_capacity(HEADER_SIZE + self.tokens.len() * TOKEN_SIZE)?;
        out.put_u64_be(self.original_size)?;
        for token in &self.tokens {
            out.extend_from_slice(&token.offset.to_be_bytes())?;
            out.push(token.length)?;
            out.push(token.literal)?;
        }
        Ok(out)
    }

    /// Parses a stream produced by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    /// `Corrupt` if the header is missing, the stream ends mid-token, or the
    /// declared size is larger than the tokens could possibly produce.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let original_size = reader
            .u64_be()
            .ok_or_else(|| Error::Corrupt("LZ77 stream shorter than its header".into()))?;
        let body = reader.rest();
        if body.len() % TOKEN_SIZE != 0 {
            return Err(Error::Corrupt(format!(
                "LZ77 stream truncated mid-token ({} trailing bytes)",
                body.len() % TOKEN_SIZE
            )));
        }

        let tokens: Vec<Token> = body
            .chunks_exact(TOKEN_SIZE)
            .map(|t| Token {
                offset: u16::from_be_bytes([t[0], t[1]]),
                length: t[2],
                literal: t[3],
            })
            .collect();

        // Each token yields at most 255 copied bytes plus one literal.
        let ceiling = tokens.len() as u64 * 256;
        if original_size > ceiling {
            return Err(Error::Corrupt(format!(
                "LZ77 declared size {} unreachable with {} tokens",
                original_size,
                tokens.len()
            )));
        }
        Ok(Lz77Compressed {
            original_size,
            tokens,
        })
    }
}
