//! Canonical Huffman entropy stage.
//!
//! Two container layouts share one leading byte:
//!
//! ```text
//! Passthrough: [0xFF] [len: u32 BE] [raw bytes...]
//!
//! Huffman:     [n: u8, 0 = 256]
//!              n x ([symbol: u8] [frequency: u32 BE])
//!              [original_len: u32 BE] [compressed_len: u32 BE] [bit_len: u32 BE]
//!              [packed bits, MSB first, last byte zero-padded]
//! ```
//!
//! Only the frequency table crosses the wire. The decoder rebuilds the same
//! tree with the same merge rule: the two nodes with the lowest
//! `(frequency, key)` merge first, where a leaf's key is its symbol and an
//! internal node's key is `256 + merge index`.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use bytes::{Buf, BufMut};

use crate::bits::{BitReader, BitWriter};
use crate::error::{CodecError, Result};

/// Inputs at or below this many bytes are always passed through raw.
pub const PASSTHROUGH_THRESHOLD: usize = 200;

/// Leading byte of a passthrough container.
pub const PASSTHROUGH_MARKER: u8 = 0xFF;

/// Marker plus 4-byte length.
pub const PASSTHROUGH_HEADER_SIZE: usize = 5;

const TABLE_ENTRY_SIZE: usize = 5;
const LENGTH_FIELDS_SIZE: usize = 12;

/// Occurrence count per byte value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u32; 256],
}

impl FrequencyTable {
    /// Count every byte of `input`.
    pub fn from_bytes(input: &[u8]) -> Self {
        let mut counts = [0u32; 256];
        for &byte in input {
            let slot = &mut counts[usize::from(byte)];
            *slot = slot.saturating_add(1);
        }
        Self { counts }
    }

    /// Frequency of `symbol` (0 when absent).
    pub fn get(&self, symbol: u8) -> u32 {
        self.counts[usize::from(symbol)]
    }

    /// Number of symbols with a non-zero count.
    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Present symbols in ascending byte order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        (0..=u8::MAX)
            .zip(self.counts.iter().copied())
            .filter(|&(_, count)| count > 0)
    }

    fn insert(&mut self, symbol: u8, count: u32) {
        let slot = &mut self.counts[usize::from(symbol)];
        *slot = slot.saturating_add(count);
    }
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf(u8),
    Branch { left: usize, right: Option<usize> },
}

/// Index-addressed Huffman tree; dropped wholesale after use.
#[derive(Debug)]
struct HuffmanTree {
    nodes: Vec<Node>,
    root: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Code {
    bits: u64,
    len: u8,
}

impl HuffmanTree {
    fn build(table: &FrequencyTable) -> Option<Self> {
        let mut nodes = Vec::with_capacity(2 * 256);
        let mut heap = BinaryHeap::new();
        for (symbol, count) in table.iter() {
            heap.push(Reverse((u64::from(count), u32::from(symbol), nodes.len())));
            nodes.push(Node::Leaf(symbol));
        }

        match heap.len() {
            0 => return None,
            1 => {
                // A lone symbol still needs a one-bit code.
                nodes.push(Node::Branch {
                    left: 0,
                    right: None,
                });
                let root = nodes.len() - 1;
                return Some(Self { nodes, root });
            }
            _ => {}
        }

        let mut merges = 0u32;
        while heap.len() > 1 {
            let (Some(Reverse((low, _, left))), Some(Reverse((high, _, right)))) =
                (heap.pop(), heap.pop())
            else {
                break;
            };
            let index = nodes.len();
            nodes.push(Node::Branch {
                left,
                right: Some(right),
            });
            heap.push(Reverse((low + high, 256 + merges, index)));
            merges += 1;
        }

        let Reverse((_, _, root)) = heap.pop()?;
        Some(Self { nodes, root })
    }

    fn codes(&self) -> [Option<Code>; 256] {
        let mut table = [None; 256];
        let mut stack = vec![(self.root, Code { bits: 0, len: 0 })];
        while let Some((index, code)) = stack.pop() {
            match self.nodes[index] {
                Node::Leaf(symbol) => {
                    let code = if code.len == 0 {
                        Code { bits: 0, len: 1 }
                    } else {
                        code
                    };
                    table[usize::from(symbol)] = Some(code);
                }
                Node::Branch { left, right } => {
                    stack.push((
                        left,
                        Code {
                            bits: code.bits << 1,
                            len: code.len + 1,
                        },
                    ));
                    if let Some(right) = right {
                        stack.push((
                            right,
                            Code {
                                bits: (code.bits << 1) | 1,
                                len: code.len + 1,
                            },
                        ));
                    }
                }
            }
        }
        table
    }

    /// Follow one bit from `index`. `None` means the bit leads nowhere.
    fn step(&self, index: usize, bit: bool) -> Option<usize> {
        match (self.nodes[index], bit) {
            (Node::Branch { left, .. }, false) => Some(left),
            (Node::Branch { right, .. }, true) => right,
            (Node::Leaf(_), _) => None,
        }
    }
}

/// Encode `input` with the default passthrough threshold.
pub fn encode(input: &[u8]) -> Vec<u8> {
    encode_with_threshold(input, PASSTHROUGH_THRESHOLD)
}

/// Encode `input`, passing it through raw when it is at most `threshold` bytes
/// or when Huffman coding would not shrink it.
pub fn encode_with_threshold(input: &[u8], threshold: usize) -> Vec<u8> {
    let input = clamp_to_u32(input);
    if input.len() <= threshold {
        return passthrough(input);
    }

    let table = FrequencyTable::from_bytes(input);
    if table.distinct() == usize::from(PASSTHROUGH_MARKER) {
        // A 255-entry table would start with the passthrough marker.
        return passthrough(input);
    }

    match encode_huffman(input, &table) {
        Some(container) if container.len() < PASSTHROUGH_HEADER_SIZE + input.len() => container,
        _ => {
            tracing::trace!(len = input.len(), "huffman container not smaller, passing through");
            passthrough(input)
        }
    }
}

/// Decode either container layout.
///
/// Truncated or corrupt containers yield whatever prefix could be recovered,
/// possibly nothing.
pub fn decode(payload: &[u8]) -> Vec<u8> {
    match Container::parse(payload) {
        Ok(container) => container.decode(),
        Err(err) => {
            tracing::debug!(error = %err, "discarding unreadable entropy container");
            Vec::new()
        }
    }
}

/// True when `payload` holds a Huffman container rather than raw passthrough.
pub fn is_entropy_coded(payload: &[u8]) -> bool {
    payload.first().is_some_and(|&b| b != PASSTHROUGH_MARKER)
}

fn clamp_to_u32(input: &[u8]) -> &[u8] {
    let max = u32::MAX as usize;
    if input.len() > max {
        tracing::warn!(len = input.len(), "entropy input exceeds u32 length, truncating");
        &input[..max]
    } else {
        input
    }
}

fn passthrough(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(PASSTHROUGH_HEADER_SIZE + input.len());
    out.put_u8(PASSTHROUGH_MARKER);
    out.put_u32(input.len() as u32);
    out.put_slice(input);
    out
}

fn encode_huffman(input: &[u8], table: &FrequencyTable) -> Option<Vec<u8>> {
    let tree = HuffmanTree::build(table)?;
    let codes = tree.codes();

    let mut bits = BitWriter::with_capacity(input.len() / 2);
    for &byte in input {
        let code = codes[usize::from(byte)]?;
        bits.push_code(code.bits, code.len);
    }
    let (packed, bit_len) = bits.finish();

    let distinct = table.distinct();
    let mut out = Vec::with_capacity(
        1 + distinct * TABLE_ENTRY_SIZE + LENGTH_FIELDS_SIZE + packed.len(),
    );
    out.put_u8((distinct % 256) as u8);
    for (symbol, count) in table.iter() {
        out.put_u8(symbol);
        out.put_u32(count);
    }
    out.put_u32(input.len() as u32);
    out.put_u32(u32::try_from(packed.len()).ok()?);
    out.put_u32(u32::try_from(bit_len).ok()?);
    out.put_slice(&packed);
    Some(out)
}

/// A parsed entropy container borrowing its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container<'a> {
    /// Raw bytes; `data` is clamped to what the buffer actually holds.
    Passthrough { declared_len: usize, data: &'a [u8] },
    /// Huffman-coded bits; `bits` is clamped to what the buffer actually holds.
    Huffman {
        table: FrequencyTable,
        original_len: usize,
        compressed_len: usize,
        bit_len: usize,
        bits: &'a [u8],
    },
}

impl<'a> Container<'a> {
    /// Parse container headers, checking every field against the buffer.
    ///
    /// Header fields must be complete. Body bytes may be short; the body
    /// slice is clamped and decoding yields a partial result.
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let mut src = payload;
        if !src.has_remaining() {
            return Err(CodecError::Empty);
        }

        let lead = src.get_u8();
        if lead == PASSTHROUGH_MARKER {
            let declared_len = read_u32(&mut src, "passthrough length")? as usize;
            let data = &src[..declared_len.min(src.len())];
            return Ok(Container::Passthrough { declared_len, data });
        }

        let entries = if lead == 0 { 256 } else { usize::from(lead) };
        let table_len = entries * TABLE_ENTRY_SIZE;
        if src.remaining() < table_len {
            return Err(CodecError::Truncated {
                field: "symbol table",
                needed: table_len,
                available: src.remaining(),
            });
        }
        let mut table = FrequencyTable {
            counts: [0u32; 256],
        };
        for _ in 0..entries {
            let symbol = src.get_u8();
            let count = src.get_u32();
            table.insert(symbol, count);
        }

        let original_len = read_u32(&mut src, "original length")? as usize;
        let compressed_len = read_u32(&mut src, "compressed length")? as usize;
        let bit_len = read_u32(&mut src, "bit length")? as usize;
        let bits = &src[..compressed_len.min(src.len())];

        Ok(Container::Huffman {
            table,
            original_len,
            compressed_len,
            bit_len,
            bits,
        })
    }

    /// Length of the data before entropy coding, as declared by the header.
    pub fn original_len(&self) -> usize {
        match self {
            Container::Passthrough { declared_len, .. } => *declared_len,
            Container::Huffman { original_len, .. } => *original_len,
        }
    }

    /// True when the payload carries a Huffman bitstream.
    pub fn is_entropy_coded(&self) -> bool {
        matches!(self, Container::Huffman { .. })
    }

    /// Recover the original bytes, or as many as the container allows.
    pub fn decode(&self) -> Vec<u8> {
        match self {
            Container::Passthrough { data, .. } => data.to_vec(),
            Container::Huffman {
                table,
                original_len,
                bit_len,
                bits,
                ..
            } => decode_huffman(table, *original_len, *bit_len, bits),
        }
    }
}

fn read_u32(src: &mut &[u8], field: &'static str) -> Result<u32> {
    if src.remaining() < 4 {
        return Err(CodecError::Truncated {
            field,
            needed: 4,
            available: src.remaining(),
        });
    }
    Ok(src.get_u32())
}

fn decode_huffman(table: &FrequencyTable, original_len: usize, bit_len: usize, bits: &[u8]) -> Vec<u8> {
    let Some(tree) = HuffmanTree::build(table) else {
        tracing::debug!("huffman container has an empty symbol table");
        return Vec::new();
    };

    let reader = BitReader::new(bits, bit_len);
    let mut out = Vec::with_capacity(original_len.min(reader.remaining()));
    let mut node = tree.root;
    for bit in reader {
        if out.len() == original_len {
            break;
        }
        let Some(next) = tree.step(node, bit) else {
            tracing::debug!(decoded = out.len(), "bit stream leaves the code tree");
            break;
        };
        match tree.nodes[next] {
            Node::Leaf(symbol) => {
                out.push(symbol);
                node = tree.root;
            }
            Node::Branch { .. } => node = next,
        }
    }

    if out.len() < original_len {
        tracing::debug!(
            decoded = out.len(),
            expected = original_len,
            "huffman stream ended early"
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn skewed(len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| match i % 10 {
                0..=6 => b'a',
                7 | 8 => b'b',
                _ => b'c',
            })
            .collect()
    }

    #[test]
    fn short_input_passes_through() {
        let input = vec![7u8; PASSTHROUGH_THRESHOLD];
        let payload = encode(&input);

        assert_eq!(payload[0], PASSTHROUGH_MARKER);
        assert_eq!(&payload[1..5], &(PASSTHROUGH_THRESHOLD as u32).to_be_bytes());
        assert_eq!(&payload[5..], input.as_slice());
        assert!(!is_entropy_coded(&payload));
        assert_eq!(decode(&payload), input);
    }

    #[test]
    fn single_symbol_uses_one_bit_codes() {
        let input = vec![0x42u8; 500];
        let payload = encode(&input);

        assert!(is_entropy_coded(&payload));
        match Container::parse(&payload).unwrap() {
            Container::Huffman {
                table,
                original_len,
                compressed_len,
                bit_len,
                bits,
            } => {
                assert_eq!(table.distinct(), 1);
                assert_eq!(table.get(0x42), 500);
                assert_eq!(original_len, 500);
                assert_eq!(bit_len, 500);
                assert_eq!(compressed_len, 63);
                assert!(bits.iter().all(|&b| b == 0));
            }
            other => panic!("expected huffman container, got {other:?}"),
        }
        assert_eq!(decode(&payload), input);
    }

    #[test]
    fn header_layout_is_big_endian() {
        let input = skewed(1_000);
        let payload = encode(&input);

        assert_eq!(payload[0], 3);
        assert_eq!(payload[1], b'a');
        assert_eq!(&payload[2..6], &700u32.to_be_bytes());
        assert_eq!(payload[6], b'b');
        assert_eq!(&payload[7..11], &200u32.to_be_bytes());
        assert_eq!(payload[11], b'c');
        assert_eq!(&payload[12..16], &100u32.to_be_bytes());
        assert_eq!(&payload[16..20], &1_000u32.to_be_bytes());
        assert_eq!(&payload[20..24], &163u32.to_be_bytes());
        // a: 1 bit, b and c: 2 bits each
        assert_eq!(&payload[24..28], &1_300u32.to_be_bytes());
        assert_eq!(payload.len(), 28 + 163);
    }

    #[test]
    fn skewed_input_compresses() {
        let input = skewed(4_096);
        let payload = encode(&input);
        assert!(payload.len() < input.len() / 2);
        assert_eq!(decode(&payload), input);
    }

    #[test]
    fn all_256_symbols_roundtrip() {
        let input: Vec<u8> = (0..4_096u32).map(|i| (i % 256) as u8).collect();
        let payload = encode(&input);
        assert_eq!(decode(&payload), input);
    }

    #[test]
    fn all_256_symbols_with_skew_use_zero_table_size() {
        let mut input: Vec<u8> = (0..=u8::MAX).collect();
        input.extend(std::iter::repeat_n(0u8, 20_000));
        let payload = encode(&input);

        assert_eq!(payload[0], 0);
        match Container::parse(&payload).unwrap() {
            Container::Huffman { table, .. } => assert_eq!(table.distinct(), 256),
            other => panic!("expected huffman container, got {other:?}"),
        }
        assert_eq!(decode(&payload), input);
    }

    #[test]
    fn exactly_255_symbols_never_emit_marker_table() {
        let mut input: Vec<u8> = (0..255u8).collect();
        input.extend(std::iter::repeat_n(0u8, 20_000));
        let payload = encode(&input);

        assert_eq!(payload[0], PASSTHROUGH_MARKER);
        assert_eq!(decode(&payload), input);
    }

    #[test]
    fn incompressible_input_falls_back_to_passthrough() {
        let input: Vec<u8> = (0..512u32).map(|i| (i % 256) as u8).collect();
        let payload = encode(&input);
        assert_eq!(payload[0], PASSTHROUGH_MARKER);
        assert_eq!(payload.len(), PASSTHROUGH_HEADER_SIZE + input.len());
    }

    #[test]
    fn leaves_win_ties_against_merged_nodes() {
        // a+b merges to weight 2 and ties with the leaf c; c is popped first
        // and lands on the left branch.
        let mut table = FrequencyTable::from_bytes(&[]);
        table.insert(b'a', 1);
        table.insert(b'b', 1);
        table.insert(b'c', 2);
        let codes = HuffmanTree::build(&table).unwrap().codes();
        assert_eq!(codes[usize::from(b'c')], Some(Code { bits: 0b0, len: 1 }));
        assert_eq!(codes[usize::from(b'a')], Some(Code { bits: 0b10, len: 2 }));
        assert_eq!(codes[usize::from(b'b')], Some(Code { bits: 0b11, len: 2 }));
    }

    #[test]
    fn equal_frequencies_break_ties_by_symbol() {
        let mut table = FrequencyTable::from_bytes(&[]);
        table.insert(b'x', 1);
        table.insert(b'y', 1);
        let codes = HuffmanTree::build(&table).unwrap().codes();
        assert_eq!(codes[usize::from(b'x')], Some(Code { bits: 0, len: 1 }));
        assert_eq!(codes[usize::from(b'y')], Some(Code { bits: 1, len: 1 }));
    }

    #[test]
    fn empty_payload_decodes_to_nothing() {
        assert!(decode(&[]).is_empty());
        assert_eq!(Container::parse(&[]), Err(CodecError::Empty));
    }

    #[test]
    fn truncated_table_is_rejected() {
        let payload = encode(&skewed(1_000));
        let err = Container::parse(&payload[..8]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Truncated {
                field: "symbol table",
                ..
            }
        ));
        assert!(decode(&payload[..8]).is_empty());
    }

    #[test]
    fn truncated_bits_yield_prefix() {
        let input = skewed(1_000);
        let payload = encode(&input);
        let cut = payload.len() - 80;
        let decoded = decode(&payload[..cut]);

        assert!(!decoded.is_empty());
        assert!(decoded.len() < input.len());
        assert_eq!(decoded.as_slice(), &input[..decoded.len()]);
    }

    #[test]
    fn truncated_passthrough_is_clamped() {
        let payload = encode(b"hello world");
        assert_eq!(decode(&payload[..8]), b"hel".to_vec());
        assert!(decode(&payload[..3]).is_empty());
    }

    #[test]
    fn lying_original_length_does_not_overread() {
        let mut payload = encode(&vec![9u8; 300]);
        // original_len sits after the 1-entry table
        payload[6..10].copy_from_slice(&u32::MAX.to_be_bytes());
        let decoded = decode(&payload);
        assert_eq!(decoded.len(), 300);
    }

    #[test]
    fn stray_right_bit_in_single_symbol_stream_stops_decoding() {
        let mut payload = encode(&vec![1u8; 300]);
        let body = payload.len() - 38;
        payload[body] = 0b0001_0000;
        let decoded = decode(&payload);
        assert_eq!(decoded, vec![1u8; 3]);
    }

    proptest! {
        #[test]
        fn roundtrip_any_bytes(input in prop::collection::vec(any::<u8>(), 1..2_000)) {
            prop_assert_eq!(decode(&encode(&input)), input);
        }

        #[test]
        fn roundtrip_small_alphabet(input in prop::collection::vec(0u8..4, 201..3_000)) {
            let payload = encode(&input);
            prop_assert!(is_entropy_coded(&payload));
            prop_assert_eq!(decode(&payload), input);
        }

        #[test]
        fn decode_never_panics(payload in prop::collection::vec(any::<u8>(), 0..600)) {
            let _ = decode(&payload);
        }
    }
}
