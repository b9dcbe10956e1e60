/// Errors that can occur while configuring or running a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Packet-level error.
    #[error("packet error: {0}")]
    Packet(#[from] gridlink_packet::PacketError),

    /// I/O error from a source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The frame source failed.
    #[error("frame source failed: {0}")]
    Source(String),

    /// One frame could not be quantized; the pipeline skips it.
    #[error("quantize failed: {0}")]
    Quantize(String),

    /// The downstream sink is gone; the pipeline stops.
    #[error("sink closed")]
    SinkClosed,

    /// A pipeline worker thread panicked.
    #[error("pipeline worker panicked")]
    Worker,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
