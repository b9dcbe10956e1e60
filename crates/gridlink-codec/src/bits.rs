//! MSB-first bit packing.

/// Accumulates bits, most significant bit of each byte first.
///
/// The final partial byte is padded with zero bits on the right.
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    filled: u8,
    bit_len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            ..Self::default()
        }
    }

    pub fn push_bit(&mut self, bit: bool) {
        self.current = (self.current << 1) | u8::from(bit);
        self.filled += 1;
        self.bit_len += 1;
        if self.filled == 8 {
            self.bytes.push(self.current);
            self.current = 0;
            self.filled = 0;
        }
    }

    /// Push the low `len` bits of `code`, highest of those first.
    pub fn push_code(&mut self, code: u64, len: u8) {
        for shift in (0..len).rev() {
            self.push_bit((code >> shift) & 1 == 1);
        }
    }

    /// Exact number of bits pushed so far.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Finish the stream, returning the packed bytes and the exact bit count.
    pub fn finish(mut self) -> (Vec<u8>, usize) {
        if self.filled > 0 {
            self.bytes.push(self.current << (8 - self.filled));
        }
        (self.bytes, self.bit_len)
    }
}

/// Reads bits MSB-first, never past `bit_len` or the end of the buffer.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    limit: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8], bit_len: usize) -> Self {
        Self {
            data,
            pos: 0,
            limit: bit_len.min(data.len().saturating_mul(8)),
        }
    }

    /// Bits still available.
    pub fn remaining(&self) -> usize {
        self.limit - self.pos
    }
}

impl Iterator for BitReader<'_> {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        if self.pos >= self.limit {
            return None;
        }
        let byte = self.data[self.pos / 8];
        let bit = (byte >> (7 - (self.pos % 8))) & 1 == 1;
        self.pos += 1;
        Some(bit)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}
