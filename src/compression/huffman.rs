//! Huffman coding over bytes with a stored 256-entry frequency table.
//!
//! The container is
//! `orig_size: u64 LE | compressed_size: u64 LE | freq: 256 x u32 LE | bitstream`.
//! The decoder rebuilds the tree from the stored frequencies, so tree
//! construction must be deterministic: leaves enter the queue in symbol order
//! and ties between equal frequencies are broken by insertion order.
//!
//! Input with a single distinct symbol has no meaningful code. It is stored as
//! that one symbol byte; the frequency table (exactly one nonzero entry) carries
//! the repeat count.

use crate::buffer::{ByteBuffer, Reader};
use crate::error::{Error, Result};
use bitvec::prelude::*;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Number of distinct symbols (bytes).
pub const SYMBOLS: usize = 256;

const HEADER_SIZE: usize = 16 + SYMBOLS * 4;

/// Symbol stored in internal nodes.
const INTERNAL_SYMBOL: u8 = 0;

/// A node in the arena-backed Huffman tree.
///
/// Leaves have no children; internal nodes reference their children by index
/// into [`HuffmanTree::nodes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanNode {
    pub symbol: u8,
    pub frequency: u64,
    pub left: Option<usize>,
    pub right: Option<usize>,
}

impl HuffmanNode {
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Heap entry ordered by frequency, then by insertion sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    frequency: u64,
    sequence: usize,
    node: usize,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frequency
            .cmp(&other.frequency)
            .then(self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A Huffman tree stored as a flat vector of nodes.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    pub nodes: Vec<HuffmanNode>,
    pub root: usize,
}

impl HuffmanTree {
    /// Builds the tree for a frequency table, or `None` if every entry is zero.
    pub fn from_frequencies(freq: &[u32; SYMBOLS]) -> Option<Self> {
        let mut nodes = Vec::with_capacity(SYMBOLS * 2);
        let mut heap = BinaryHeap::with_capacity(SYMBOLS);
        let mut sequence = 0;

        for (symbol, &count) in freq.iter().enumerate() {
            if count == 0 {
                continue;
            }
            nodes.push(HuffmanNode {
                symbol: symbol as u8,
                frequency: count as u64,
                left: None,
                right: None,
            });
            heap.push(Reverse(QueueEntry {
                frequency: count as u64,
                sequence,
                node: nodes.len() - 1,
            }));
            sequence += 1;
        }

        while heap.len() > 1 {
            let Reverse(left) = heap.pop()?;
            let Reverse(right) = heap.pop()?;
            let frequency = left.frequency + right.frequency;
            nodes.push(HuffmanNode {
                symbol: INTERNAL_SYMBOL,
                frequency,
                left: Some(left.node),
                right: Some(right.node),
            });
            heap.push(Reverse(QueueEntry {
                frequency,
                sequence,
                node: nodes.len() - 1,
            }));
            sequence += 1;
        }

        let Reverse(root) = heap.pop()?;
        Some(HuffmanTree {
            nodes,
            root: root.node,
        })
    }

    pub fn root(&self) -> &HuffmanNode {
        &self.nodes[self.root]
    }

    /// Assigns each leaf its root-to-leaf path (left = 0, right = 1).
    ///
    /// Symbols absent from the tree get an empty code, as does the lone leaf of
    /// a single-symbol tree.
    pub fn code_table(&self) -> Vec<BitVec<u8, Msb0>> {
        let mut table = vec![BitVec::new(); SYMBOLS];
        let mut stack = vec![(self.root, BitVec::<u8, Msb0>::new())];
        while let Some((index, prefix)) = stack.pop() {
            let node = &self.nodes[index];
            if node.is_leaf() {
                table[node.symbol as usize] = prefix;
                continue;
            }
            if let Some(right) = node.right {
                let mut code = prefix.clone();
                code.push(true);
                stack.push((right, code));
            }
            if let Some(left) = node.left {
                let mut code = prefix;
                code.push(false);
                stack.push((left, code));
            }
        }
        table
    }
}

/// Counts byte occurrences.
///
/// # Errors
/// `InvalidInput` if a symbol occurs more than `u32::MAX` times, which the
/// 4-byte frequency fields cannot represent.
pub fn build_frequency_table(input: &[u8]) -> Result<[u32; SYMBOLS]> {
    let mut counts = [0u64; SYMBOLS];
    for &byte in input {
        counts[byte as usize] += 1;
    }
    let mut freq = [0u32; SYMBOLS];
    for (slot, &count) in freq.iter_mut().zip(counts.iter()) {
        *slot = u32::try_from(count).map_err(|_| {
            Error::InvalidInput("symbol frequency exceeds the 32-bit frequency table".into())
        })?;
    }
    Ok(freq)
}

/// The native result of Huffman compression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanCompressed {
    pub original_size: u64,
    pub freq_table: [u32; SYMBOLS],
    pub data: Vec<u8>,
}

impl HuffmanCompressed {
    fn distinct_symbols(&self) -> usize {
        self.freq_table.iter().filter(|&&f| f > 0).count()
    }
}

/// Compresses `input`.
pub fn compress(input: &[u8]) -> Result<HuffmanCompressed> {
    let freq_table = build_frequency_table(input)?;
    let original_size = input.len() as u64;

    let Some(tree) = HuffmanTree::from_frequencies(&freq_table) else {
        return Ok(HuffmanCompressed {
            original_size,
            freq_table,
            data: Vec::new(),
        });
    };

    if tree.root().is_leaf() {
        log::debug!(
            "huffman: single symbol {:#04x} repeated {} times",
            tree.root().symbol,
            original_size
        );
        return Ok(HuffmanCompressed {
            original_size,
            freq_table,
            data: vec![tree.root().symbol],
        });
    }

    let codes = tree.code_table();
    let total_bits: usize = input.iter().map(|&b| codes[b as usize].len()).sum();
    let mut stream: BitVec<u8, Msb0> = BitVec::with_capacity(total_bits);
    for &byte in input {
        stream.extend_from_bitslice(codes[byte as usize].as_bitslice());
    }
    stream.set_uninitialized(false);

    Ok(HuffmanCompressed {
        original_size,
        freq_table,
        data: stream.into_vec(),
    })
}

/// Decodes by walking the rebuilt tree one bit at a time.
///
/// # Errors
/// `Corrupt` if the walk falls off the tree, the frequencies disagree with the
/// declared size, or the bitstream runs out before the declared size.
pub fn decompress(compressed: &HuffmanCompressed) -> Result<ByteBuffer> {
    let declared = usize::try_from(compressed.original_size)
        .map_err(|_| Error::Corrupt("Huffman original size exceeds address space".into()))?;
    let total: u64 = compressed.freq_table.iter().map(|&f| f as u64).sum();
    if total != compressed.original_size {
        return Err(Error::Corrupt(format!(
            "Huffman frequency total {} does not match declared size {}",
            total, compressed.original_size
        )));
    }

    let Some(tree) = HuffmanTree::from_frequencies(&compressed.freq_table) else {
        return Ok(ByteBuffer::new());
    };

    let root = tree.root();
    if root.is_leaf() {
        if compressed.data.len() != 1 || compressed.data[0] != root.symbol {
            return Err(Error::Corrupt(
                "Huffman single-symbol payload does not match its frequency table".into(),
            ));
        }
        let mut output = ByteBuffer::with_capacity(declared)?;
        output.fill(root.symbol, declared)?;
        return Ok(output);
    }

    // Every code is at least one bit long.
    let max_symbols = compressed.data.len().saturating_mul(8);
    let mut output = ByteBuffer::with_capacity(declared.min(max_symbols))?;

    let mut current = tree.root;
    for bit in compressed.data.as_slice().view_bits::<Msb0>().iter().by_vals() {
        if output.len() >= declared {
            break;
        }
        let node = &tree.nodes[current];
        let next = if bit { node.right } else { node.left };
        current = next.ok_or_else(|| Error::Corrupt("Huffman bitstream left the tree".into()))?;
        let node = &tree.nodes[current];
        if node.is_leaf() {
            output.push(node.symbol)?;
            current = tree.root;
        }
    }

    if output.len() != declared {
        return Err(Error::Corrupt(format!(
            "Huffman decoded {} bytes, expected {}",
            output.len(),
            declared
        )));
    }
    Ok(output)
}

impl HuffmanCompressed {
    pub fn to_bytes(&self) -> Result<ByteBuffer> {
        let mut out = ByteBuffer::with_capacity(HEADER_SIZE + self.data.len())?;
        out.put_u64_le(self.original_size)?;
        out.put_u64_le(self.data.len() as u64)?;
        for &f in &self.freq_table {
            out.put_u32_le(f)?;
        }
        out.extend_from_slice(&self.data)?;
        Ok(out)
    }

    /// # Errors
    /// `Corrupt` if the container is shorter than its header or the payload
    /// length disagrees with the stored compressed size.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let short = || Error::Corrupt("Huffman container shorter than its header".into());
        let mut reader = Reader::new(bytes);
        let original_size = reader.u64_le().ok_or_else(short)?;
        let compressed_size = reader.u64_le().ok_or_else(short)?;
        let mut freq_table = [0u32; SYMBOLS];
        for slot in freq_table.iter_mut() {
            *slot = reader.u32_le().ok_or_else(short)?;
        }
        let data = reader.rest();
        if data.len() as u64 != compressed_size {
            return Err(Error::Corrupt(format!(
                "Huffman payload is {} bytes, header says {}",
                data.len(),
                compressed_size
            )));
        }
        let parsed = HuffmanCompressed {
            original_size,
            freq_table,
            data: data.to_vec(),
        };
        if parsed.distinct_symbols() == 1 && parsed.data.len() != 1 {
            return Err(Error::Corrupt(
                "Huffman single-symbol container must carry exactly one byte".into(),
            ));
        }
        Ok(parsed)
    }
}
