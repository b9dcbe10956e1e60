//! Bounded producer/consumer pipeline for quantized grids.
//!
//! A producer thread captures frames and applies frame-skip decimation. A
//! consumer thread quantizes, encodes, delivers and paces them. The two meet at
//! a fixed-capacity queue: a full queue blocks the producer instead of dropping
//! frames, and a single shutdown flag stops both sides.

pub mod config;
pub mod context;
pub mod coordinator;
pub mod encoder;
pub mod error;
pub mod pacing;
pub mod queue;
pub mod source;
pub mod telemetry;

pub use config::{Levels, PipelineConfig, Profile};
pub use context::{PipelineContext, ShutdownHandle};
pub use coordinator::{Pipeline, PipelineReport, StopReason};
pub use encoder::{EncodedFrame, FrameEncoder};
pub use error::{PipelineError, Result};
pub use pacing::Pacer;
pub use queue::BoundedQueue;
pub use source::{
    CollectSink, FrameSource, IterSource, PacketSink, Prequantized, QuantizedFrame, Quantizer,
    WriterSink,
};
pub use telemetry::{Telemetry, TelemetrySnapshot};
