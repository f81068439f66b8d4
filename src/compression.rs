//! Lossless compression engines and the dispatcher that selects between them.
//!
//! Four engines are provided:
//! - LZ77 with a call-local, single-candidate hash index
//! - Huffman coding with a frequency table stored in the container
//! - Run-length encoding with one-byte counts
//! - LZW with fixed 16-bit codes
//!
//! Every engine produces its own native representation. [`CompressedPayload`]
//! wraps those so the rest of the crate only handles serialized containers in a
//! [`ByteBuffer`]. Every container records the original size, so decoding
//! never depends on outside context.
//!
//! # Examples
//!
//! ```rust
//! use packcrypt::compression::{compress, decompress, CompressionAlgorithm};
//!
//! let data = b"abracadabra abracadabra abracadabra";
//! for alg in CompressionAlgorithm::ALL {
//!     let packed = compress(data, alg).unwrap();
//!     assert_eq!(decompress(&packed, alg).unwrap().as_slice(), data);
//! }
//! ```

use crate::buffer::{ByteBuffer, Reader};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

pub mod huffman;
pub mod lz77;
pub mod lzw;
pub mod rle;

pub use huffman::HuffmanCompressed;
pub use lz77::Lz77Compressed;
pub use lzw::LzwCompressed;
pub use rle::RleCompressed;

/// Trait for compression algorithms
pub trait Compression {
    /// Compress the input data into a self-describing container
    fn compress(&self, data: &[u8]) -> Result<ByteBuffer>;

    /// Decompress a container produced by [`Compression::compress`]
    fn decompress(&self, data: &[u8]) -> Result<ByteBuffer>;
}

/// Selects one of the compression engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionAlgorithm {
    #[default]
    Lz77,
    Huffman,
    Rle,
    Lzw,
}

impl CompressionAlgorithm {
    pub const ALL: [CompressionAlgorithm; 4] = [
        CompressionAlgorithm::Lz77,
        CompressionAlgorithm::Huffman,
        CompressionAlgorithm::Rle,
        CompressionAlgorithm::Lzw,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CompressionAlgorithm::Lz77 => "lz77",
            CompressionAlgorithm::Huffman => "huffman",
            CompressionAlgorithm::Rle => "rle",
            CompressionAlgorithm::Lzw => "lzw",
        }
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lz77" => Ok(CompressionAlgorithm::Lz77),
            "huffman" => Ok(CompressionAlgorithm::Huffman),
            "rle" => Ok(CompressionAlgorithm::Rle),
            "lzw" => Ok(CompressionAlgorithm::Lzw),
            other => Err(Error::InvalidInput(format!(
                "unknown compression algorithm '{}' (expected lz77, huffman, rle or lzw)",
                other
            ))),
        }
    }
}

/// The native output of one engine, tagged by algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressedPayload {
    Lz77(Lz77Compressed),
    Huffman(HuffmanCompressed),
    Rle(RleCompressed),
    Lzw(LzwCompressed),
}

impl CompressedPayload {
    /// Runs the selected engine over `data`.
    pub fn encode(data: &[u8], algorithm: CompressionAlgorithm) -> Result<Self> {
        Ok(match algorithm {
            CompressionAlgorithm::Lz77 => CompressedPayload::Lz77(lz77::compress(data)),
            CompressionAlgorithm::Huffman => CompressedPayload::Huffman(huffman::compress(data)?),
            CompressionAlgorithm::Rle => CompressedPayload::Rle(rle::compress(data)?),
            CompressionAlgorithm::Lzw => CompressedPayload::Lzw(lzw::compress(data)),
        })
    }

    /// Parses a serialized container of the given algorithm.
    pub fn from_bytes(bytes: &[u8], algorithm: CompressionAlgorithm) -> Result<Self> {
        Ok(match algorithm {
            CompressionAlgorithm::Lz77 => CompressedPayload::Lz77(Lz77Compressed::from_bytes(bytes)?),
            CompressionAlgorithm::Huffman => {
                CompressedPayload::Huffman(HuffmanCompressed::from_bytes(bytes)?)
            }
            CompressionAlgorithm::Rle => CompressedPayload::Rle(RleCompressed::from_bytes(bytes)?),
            CompressionAlgorithm::Lzw => CompressedPayload::Lzw(LzwCompressed::from_bytes(bytes)?),
        })
    }

    pub fn to_bytes(&self) -> Result<ByteBuffer> {
        match self {
            CompressedPayload::Lz77(p) => p.to_bytes(),
            CompressedPayload::Huffman(p) => p.to_bytes(),
            CompressedPayload::Rle(p) => p.to_bytes(),
            CompressedPayload::Lzw(p) => p.to_bytes(),
        }
    }

    /// Restores the original bytes.
    pub fn decode(&self) -> Result<ByteBuffer> {
        match self {
            CompressedPayload::Lz77(p) => lz77::decompress(p),
            CompressedPayload::Huffman(p) => huffman::decompress(p),
            CompressedPayload::Rle(p) => rle::decompress(p),
            CompressedPayload::Lzw(p) => lzw::decompress(p),
        }
    }

    pub fn original_size(&self) -> u64 {
        match self {
            CompressedPayload::Lz77(p) => p.original_size,
            CompressedPayload::Huffman(p) => p.original_size,
            CompressedPayload::Rle(p) => p.original_size,
            CompressedPayload::Lzw(p) => p.original_size,
        }
    }

    pub fn algorithm(&self) -> CompressionAlgorithm {
        match self {
            CompressedPayload::Lz77(_) => CompressionAlgorithm::Lz77,
            CompressedPayload::Huffman(_) => CompressionAlgorithm::Huffman,
            CompressedPayload::Rle(_) => CompressionAlgorithm::Rle,
            CompressedPayload::Lzw(_) => CompressionAlgorithm::Lzw,
        }
    }
}

impl Compression for CompressionAlgorithm {
    fn compress(&self, data: &[u8]) -> Result<ByteBuffer> {
        compress(data, *self)
    }

    fn decompress(&self, data: &[u8]) -> Result<ByteBuffer> {
        decompress(data, *self)
    }
}

/// Compresses `data` and serializes the result into its container format.
pub fn compress(data: &[u8], algorithm: CompressionAlgorithm) -> Result<ByteBuffer> {
    let container = CompressedPayload::encode(data, algorithm)?.to_bytes()?;
    log::debug!(
        "{}: compressed {} -> {} bytes",
        algorithm,
        data.len(),
        container.len()
    );
    Ok(container)
}

/// Parses and decodes a container produced by [`compress`].
///
/// # Errors
/// `Corrupt` for malformed containers; see each engine for the exact checks.
pub fn decompress(data: &[u8], algorithm: CompressionAlgorithm) -> Result<ByteBuffer> {
    let output = CompressedPayload::from_bytes(data, algorithm)?.decode()?;
    log::debug!(
        "{}: decompressed {} -> {} bytes",
        algorithm,
        data.len(),
        output.len()
    );
    Ok(output)
}

/// Reads the original size recorded in a container header without decoding it.
pub fn original_size(data: &[u8], algorithm: CompressionAlgorithm) -> Result<u64> {
    let mut reader = Reader::new(data);
    let size = match algorithm {
        CompressionAlgorithm::Lz77 => reader.u64_be(),
        _ => reader.u64_le(),
    };
    size.ok_or_else(|| {
        Error::Corrupt(format!("{} container shorter than its size header", algorithm))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"It was the best of times, it was the worst of times, \
        it was the age of wisdom, it was the age of foolishness";

    #[test]
    fn test_all_algorithms_roundtrip() {
        for alg in CompressionAlgorithm::ALL {
            let packed = compress(SAMPLE, alg).unwrap();
            assert_eq!(decompress(&packed, alg).unwrap().as_slice(), SAMPLE, "{}", alg);
        }
    }

    #[test]
    fn test_trait_dispatch() {
        let codec: &dyn Compression = &CompressionAlgorithm::Huffman;
        let packed = codec.compress(SAMPLE).unwrap();
        assert_eq!(codec.decompress(&packed).unwrap().as_slice(), SAMPLE);
    }

    #[test]
    fn test_original_size_header() {
        for alg in CompressionAlgorithm::ALL {
            let packed = compress(SAMPLE, alg).unwrap();
            assert_eq!(original_size(&packed, alg).unwrap(), SAMPLE.len() as u64);
            let payload = CompressedPayload::from_bytes(&packed, alg).unwrap();
            assert_eq!(payload.original_size(), SAMPLE.len() as u64);
            assert_eq!(payload.algorithm(), alg);
        }
    }

    #[test]
    fn test_empty_input_roundtrips() {
        for alg in CompressionAlgorithm::ALL {
            let packed = compress(b"", alg).unwrap();
            assert!(!packed.is_empty());
            assert!(decompress(&packed, alg).unwrap().is_empty());
        }
    }

    #[test]
    fn test_parse_algorithm_names() {
        assert_eq!("LZW".parse::<CompressionAlgorithm>().unwrap(), CompressionAlgorithm::Lzw);
        for alg in CompressionAlgorithm::ALL {
            assert_eq!(alg.to_string().parse::<CompressionAlgorithm>().unwrap(), alg);
        }
        let err = "bzip2".parse::<CompressionAlgorithm>().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_short_header_is_corrupt() {
        for alg in CompressionAlgorithm::ALL {
            assert!(matches!(
                decompress(&[0u8; 5], alg),
                Err(Error::Corrupt(_))
            ));
            assert!(matches!(original_size(&[1, 2], alg), Err(Error::Corrupt(_))));
        }
    }
}
