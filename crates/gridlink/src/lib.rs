//! Compress quantized sensor grids into bandwidth-bounded packets.
//!
//! # Crate Structure
//!
//! - [`codec`]: Run-length and canonical Huffman stages
//! - [`packet`]: Fixed 300-byte packets and variable-length messages
//! - [`pipeline`]: Bounded producer/consumer pipeline with pacing and telemetry

/// Re-export codec types.
pub mod codec {
    pub use gridlink_codec::*;
}

/// Re-export packet types.
pub mod packet {
    pub use gridlink_packet::*;
}

/// Re-export pipeline types.
pub mod pipeline {
    pub use gridlink_pipeline::*;
}
