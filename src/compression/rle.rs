//! Run-length encoding with one-byte run counts.
//!
//! Container: `orig_size: u64 LE | compressed_size: u64 LE | {count, value}*`
//! with `count` in `1..=255`. Longer runs are split into several pairs.

use crate::buffer::{ByteBuffer, Reader};
use crate::error::{Error, Result};

/// Longest run a single pair can describe.
pub const MAX_RUN_LENGTH: usize = 255;

/// A single `{count, value}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub count: u8,
    pub value: u8,
}

/// The native result of RLE compression: declared size plus packed pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RleCompressed {
    pub original_size: u64,
    pub data: Vec<u8>,
}

impl RleCompressed {
    /// Iterates over complete pairs; a trailing odd byte is not yielded.
    pub fn runs(&self) -> impl Iterator<Item = Run> + '_ {
        self.data.chunks_exact(2).map(|pair| Run {
            count: pair[0],
            value: pair[1],
        })
    }
}

/// Splits `input` into maximal runs capped at [`MAX_RUN_LENGTH`].
pub fn compress(input: &[u8]) -> Result<RleCompressed> {
    let mut data = Vec::new();
    data.try_reserve(input.len().min(1 << 20) * 2)?;

    let mut i = 0;
    while i < input.len() {
        let value = input[i];
        let run = input[i..]
            .iter()
            .take(MAX_RUN_LENGTH)
            .take_while(|&&b| b == value)
            .count();
        data.push(run as u8);
        data.push(value);
        i += run;
    }
    data.shrink_to_fit();

    Ok(RleCompressed {
        original_size: input.len() as u64,
        data,
    })
}

/// Expands the runs back into bytes.
///
/// # Errors
/// `Corrupt` if the pairs are truncated, a count is zero, a run would exceed
/// the declared size, or the total decoded length differs from it.
pub fn decompress(compressed: &RleCompressed) -> Result<ByteBuffer> {
    let declared = usize::try_from(compressed.original_size)
        .map_err(|_| Error::Corrupt("RLE original size exceeds address space".into()))?;
    if compressed.data.len() % 2 != 0 {
        return Err(Error::Corrupt("RLE payload truncated mid-pair".into()));
    }

    let mut output = ByteBuffer::with_capacity(declared.min(compressed.data.len() / 2 * MAX_RUN_LENGTH))?;
    for run in compressed.runs() {
        if run.count == 0 {
            return Err(Error::Corrupt("RLE run with zero count".into()));
        }
        if output.len() + run.count as usize > declared {
            return Err(Error::Corrupt(format!(
                "RLE runs overflow declared size {}",
                declared
            )));
        }
        output.fill(run.value, run.count as usize)?;
    }

    if output.len() != declared {
        return Err(Error::Corrupt(format!(
            "RLE decoded {} bytes, expected {}",
            output.len(),
            declared
        )));
    }
    Ok(output)
}

impl RleCompressed {
    pub fn to_bytes(&self) -> Result<ByteBuffer> {
        let mut out = ByteBuffer::with_capacity(16 + self.data.len())?;
        out.put_u64_le(self.original_size)?;
        out.put_u64_le(self.data.len() as u64)?;
        out.extend_from_slice(&self.data)?;
        Ok(out)
    }

    /// # Errors
    /// `Corrupt` if the header is short or the payload length disagrees with it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let short = || Error::Corrupt("RLE container shorter than its header".into());
        let mut reader = Reader::new(bytes);
        let original_size = reader.u64_le().ok_or_else(short)?;
        let compressed_size = reader.u64_le().ok_or_else(short)?;
        let data = reader.rest();
        if data.len() as u64 != compressed_size {
            return Err(Error::Corrupt(format!(
                "RLE payload is {} bytes, header says {}",
                data.len(),
                compressed_size
            )));
        }
        Ok(RleCompressed {
            original_size,
            data: data.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(input: &[u8]) -> Vec<u8> {
        let bytes = compress(input).unwrap().to_bytes().unwrap();
        decompress(&RleCompressed::from_bytes(&bytes).unwrap())
            .unwrap()
            .into_vec()
    }

    #[test]
    fn test_runs() {
        let compressed = compress(b"aaabccdddd").unwrap();
        assert_eq!(compressed.data, vec![3, b'a', 1, b'b', 2, b'c', 4, b'd']);
        assert_eq!(roundtrip(b"aaabccdddd"), b"aaabccdddd");
    }

    #[test]
    fn test_long_run_is_split_at_255() {
        let input = vec![9u8; 600];
        let compressed = compress(&input).unwrap();
        let counts: Vec<u8> = compressed.runs().map(|r| r.count).collect();
        assert_eq!(counts, vec![255, 255, 90]);
        assert_eq!(roundtrip(&input), input);
    }

    #[test]
    fn test_no_runs_doubles_size() {
        let input = b"abcdef";
        assert_eq!(compress(input).unwrap().data.len(), 12);
        assert_eq!(roundtrip(input), input);
    }

    #[test]
    fn test_empty_input() {
        let bytes = compress(b"").unwrap().to_bytes().unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(roundtrip(b""), b"");
    }

    #[test]
    fn test_truncated_container_is_corrupt() {
        let bytes = compress(b"aaaabbbb").unwrap().to_bytes().unwrap();
        assert!(matches!(
            RleCompressed::from_bytes(&bytes[..bytes.len() - 1]),
            Err(Error::Corrupt(_))
        ));
    }

    #[test]
    fn test_odd_payload_is_corrupt() {
        let compressed = RleCompressed {
            original_size: 3,
            data: vec![3, b'a', 1],
        };
        assert!(matches!(decompress(&compressed), Err(Error::Corrupt(_))));
    }

    #[test]
    fn test_overflowing_run_is_corrupt() {
        let compressed = RleCompressed {
            original_size: 2,
            data: vec![3, b'a'],
        };
        assert!(matches!(decompress(&compressed), Err(Error::Corrupt(_))));
    }

    #[test]
    fn test_short_total_is_corrupt() {
        let compressed = RleCompressed {
            original_size: 5,
            data: vec![3, b'a'],
        };
        assert!(matches!(decompress(&compressed), Err(Error::Corrupt(_))));
    }

    #[test]
    fn test_zero_count_is_corrupt() {
        let compressed = RleCompressed {
            original_size: 0,
            data: vec![0, b'a'],
        };
        assert!(matches!(decompress(&compressed), Err(Error::Corrupt(_))));
    }
}
