//! Two-stage compression for quantized sensor grids.
//!
//! Every grid goes through:
//! - A run-length stage ([`rle`]) that turns row-major cells into 1-byte packed
//!   or 2-byte explicit runs
//! - An optional entropy stage ([`entropy`]) that canonical-Huffman codes the run
//!   stream, or wraps it in a raw passthrough container when coding would not pay
//!   for its own frequency table
//!
//! All codec functions are pure. Decoders never panic on truncated or corrupt
//! input; they return whatever could be recovered.

pub mod bits;
pub mod entropy;
pub mod error;
pub mod grid;
pub mod rle;

pub use entropy::{Container, FrequencyTable, PASSTHROUGH_MARKER, PASSTHROUGH_THRESHOLD};
pub use error::{CodecError, Result};
pub use grid::Grid;
pub use rle::{EncodeSummary, Run, RunFormat, EXPLICIT_MAX_RUN, PACKED_MAX_RUN};
