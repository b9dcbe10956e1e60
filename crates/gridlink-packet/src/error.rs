/// Errors that can occur during packet encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    /// The grid does not fit the one-byte width/height header fields.
    #[error("grid dimensions {width}x{height} exceed header limit of 255x255")]
    DimensionsTooLarge { width: usize, height: usize },

    /// The buffer is shorter than the structure it should hold.
    #[error("packet truncated ({size} bytes, need {needed})")]
    Truncated { size: usize, needed: usize },

    /// A length-prefixed message exceeds the prefix range.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing packets.
    #[error("packet I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete packet was received.
    #[error("connection closed (incomplete packet)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, PacketError>;
