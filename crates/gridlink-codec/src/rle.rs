//! Run-length stage.
//!
//! Cells are scanned row-major. A run ends when the value changes or the run
//! reaches the format's maximum length; longer physical runs are split.
//!
//! Wire formats:
//! ```text
//! Packed   (1 byte):  [ count:6 | value:2 ]      count 1..=63,  value 0..=3
//! Explicit (2 bytes): [ count:8 ] [ value:8 ]    count 1..=255, value 0..=1
//! ```

/// Longest run a packed byte can carry.
pub const PACKED_MAX_RUN: usize = 63;

/// Longest run an explicit pair can carry.
pub const EXPLICIT_MAX_RUN: usize = 255;

/// Run wire sub-format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunFormat {
    /// One byte per run, `(count << 2) | value`, for 4-level grids.
    #[default]
    Packed,
    /// Two bytes per run, `count` then `value`, for binary grids.
    Explicit,
}

impl RunFormat {
    /// Maximum cells a single run may cover.
    pub const fn max_run(self) -> usize {
        match self {
            RunFormat::Packed => PACKED_MAX_RUN,
            RunFormat::Explicit => EXPLICIT_MAX_RUN,
        }
    }

    /// Bytes per encoded run.
    pub const fn run_width(self) -> usize {
        match self {
            RunFormat::Packed => 1,
            RunFormat::Explicit => 2,
        }
    }

    /// Number of distinct cell values the format can carry.
    pub const fn levels(self) -> u8 {
        match self {
            RunFormat::Packed => 4,
            RunFormat::Explicit => 2,
        }
    }

    /// Map an arbitrary cell value into this format's alphabet.
    ///
    /// Packed keeps the low two bits; explicit maps any non-zero value to 1.
    pub const fn normalize(self, value: u8) -> u8 {
        match self {
            RunFormat::Packed => value & 0b11,
            RunFormat::Explicit => (value != 0) as u8,
        }
    }

    fn write_run(self, run: Run, dst: &mut [u8]) {
        match self {
            RunFormat::Packed => dst[0] = (run.length << 2) | run.value,
            RunFormat::Explicit => {
                dst[0] = run.length;
                dst[1] = run.value;
            }
        }
    }

    fn read_run(self, src: &[u8]) -> Run {
        match self {
            RunFormat::Packed => Run {
                length: src[0] >> 2,
                value: src[0] & 0b11,
            },
            RunFormat::Explicit => Run {
                length: src[0],
                value: self.normalize(src[1]),
            },
        }
    }
}

/// A `(length, value)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub length: u8,
    pub value: u8,
}

/// Iterator over the runs of a cell slice.
#[derive(Debug, Clone)]
pub struct Runs<'a> {
    cells: &'a [u8],
    pos: usize,
    format: RunFormat,
}

impl Iterator for Runs<'_> {
    type Item = Run;

    fn next(&mut self) -> Option<Run> {
        let first = *self.cells.get(self.pos)?;
        let value = self.format.normalize(first);
        let length = self.cells[self.pos..]
            .iter()
            .take(self.format.max_run())
            .take_while(|&&cell| self.format.normalize(cell) == value)
            .count();
        self.pos += length;
        Some(Run {
            length: length as u8,
            value,
        })
    }
}

/// Split `cells` into runs, in row-major order.
pub fn runs(cells: &[u8], format: RunFormat) -> Runs<'_> {
    Runs {
        cells,
        pos: 0,
        format,
    }
}

/// Encode `cells` into a freshly allocated run stream.
pub fn encode(cells: &[u8], format: RunFormat) -> Vec<u8> {
    let width = format.run_width();
    let mut out = Vec::new();
    let mut slot = [0u8; 2];
    for run in runs(cells, format) {
        format.write_run(run, &mut slot[..width]);
        out.extend_from_slice(&slot[..width]);
    }
    out
}

/// Number of bytes [`encode`] would produce.
pub fn encoded_len(cells: &[u8], format: RunFormat) -> usize {
    runs(cells, format).count() * format.run_width()
}

/// Outcome of a bounded [`encode_into`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeSummary {
    /// Bytes written into the destination.
    pub written: usize,
    /// True when at least one run did not fit.
    pub truncated: bool,
}

/// Encode `cells` directly into `dst`, writing only complete runs.
///
/// Stops at the last run that fits entirely; the remainder of `dst` is left
/// untouched.
pub fn encode_into(cells: &[u8], format: RunFormat, dst: &mut [u8]) -> EncodeSummary {
    let width = format.run_width();
    let mut written = 0usize;
    for run in runs(cells, format) {
        let Some(slot) = dst.get_mut(written..written + width) else {
            return EncodeSummary {
                written,
                truncated: true,
            };
        };
        format.write_run(run, slot);
        written += width;
    }
    EncodeSummary {
        written,
        truncated: false,
    }
}

/// Replay a run stream into `dst`, returning the number of cells filled.
///
/// Stops once `dst` is full even if run data remains. A trailing partial run
/// and zero-length runs contribute nothing. Cells past the returned count are
/// left as they were.
pub fn decode_into(data: &[u8], format: RunFormat, dst: &mut [u8]) -> usize {
    let mut filled = 0usize;
    for chunk in data.chunks_exact(format.run_width()) {
        if filled == dst.len() {
            break;
        }
        let run = format.read_run(chunk);
        let end = (filled + usize::from(run.length)).min(dst.len());
        dst[filled..end].fill(run.value);
        filled = end;
    }
    filled
}

/// Decode a run stream into exactly `target_cell_count` cells.
///
/// Cells not covered by the stream keep the default value 0.
pub fn decode(data: &[u8], format: RunFormat, target_cell_count: usize) -> Vec<u8> {
    let mut cells = vec![0u8; target_cell_count];
    decode_into(data, format, &mut cells);
    cells
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn all_zero_grid_splits_into_max_length_runs() {
        let cells = vec![0u8; 160 * 120];
        let encoded = encode(&cells, RunFormat::Packed);

        assert_eq!(encoded.len(), 305);
        assert!(encoded[..304].iter().all(|&b| b == (63 << 2)));
        assert_eq!(encoded[304], 48 << 2);

        let decoded = decode(&encoded, RunFormat::Packed, cells.len());
        assert_eq!(decoded, cells);
    }

    #[test]
    fn packed_runs_carry_value_in_low_bits() {
        let cells = [3, 3, 1, 0, 0, 0];
        let encoded = encode(&cells, RunFormat::Packed);
        assert_eq!(encoded, vec![(2 << 2) | 3, (1 << 2) | 1, 3 << 2]);
    }

    #[test]
    fn explicit_runs_split_at_255() {
        let mut cells = vec![1u8; 300];
        cells.extend_from_slice(&[0, 0]);
        let encoded = encode(&cells, RunFormat::Explicit);
        assert_eq!(encoded, vec![255, 1, 45, 1, 2, 0]);
        assert_eq!(encoded_len(&cells, RunFormat::Explicit), 6);
    }

    #[test]
    fn explicit_format_normalizes_nonzero_to_one() {
        let cells = [0, 255, 7, 0];
        let encoded = encode(&cells, RunFormat::Explicit);
        assert_eq!(encoded, vec![1, 0, 2, 1, 1, 0]);
    }

    #[test]
    fn encode_into_stops_at_last_complete_run() {
        let cells = [0, 1, 0, 1, 0];
        let mut dst = [0xAAu8; 5];
        let summary = encode_into(&cells, RunFormat::Explicit, &mut dst);

        assert_eq!(
            summary,
            EncodeSummary {
                written: 4,
                truncated: true
            }
        );
        assert_eq!(dst, [1, 0, 1, 1, 0xAA]);
    }

    #[test]
    fn encode_into_exact_fit_is_not_truncated() {
        let cells = [2, 2, 1];
        let mut dst = [0u8; 2];
        let summary = encode_into(&cells, RunFormat::Packed, &mut dst);
        assert_eq!(summary.written, 2);
        assert!(!summary.truncated);
    }

    #[test]
    fn decode_stops_at_target_even_with_extra_runs() {
        let data = [10, 1, 10, 0];
        let decoded = decode(&data, RunFormat::Explicit, 12);
        assert_eq!(decoded, [vec![1; 10], vec![0; 2]].concat());
    }

    #[test]
    fn decode_empty_input_yields_default_grid() {
        assert_eq!(decode(&[], RunFormat::Packed, 8), vec![0; 8]);
    }

    #[test]
    fn decode_ignores_trailing_partial_run_and_zero_runs() {
        let data = [0, 1, 3, 1, 7];
        let decoded = decode(&data, RunFormat::Explicit, 5);
        assert_eq!(decoded, vec![1, 1, 1, 0, 0]);
    }

    fn cells_with_long_runs(levels: u8) -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec((0..levels, 1usize..400), 0..40).prop_map(|segments| {
            segments
                .into_iter()
                .flat_map(|(value, len)| std::iter::repeat_n(value, len))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn packed_roundtrip(cells in cells_with_long_runs(4)) {
            let encoded = encode(&cells, RunFormat::Packed);
            prop_assert_eq!(decode(&encoded, RunFormat::Packed, cells.len()), cells);
        }

        #[test]
        fn explicit_roundtrip(cells in cells_with_long_runs(2)) {
            let encoded = encode(&cells, RunFormat::Explicit);
            prop_assert_eq!(decode(&encoded, RunFormat::Explicit, cells.len()), cells);
        }

        #[test]
        fn run_lengths_cover_every_cell(cells in cells_with_long_runs(4)) {
            let total: usize = runs(&cells, RunFormat::Packed)
                .map(|run| usize::from(run.length))
                .sum();
            prop_assert_eq!(total, cells.len());
        }
    }
}
