use bytes::Bytes;
use gridlink_codec::{rle, RunFormat};
use gridlink_packet::{encode_message, encode_packet, PacketConfig, PacketFlags};

use crate::config::{PipelineConfig, Profile};
use crate::error::Result;
use crate::source::QuantizedFrame;

/// One frame ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub sequence: u8,
    pub profile: Profile,
    /// A whole fixed packet, or a variable message without length prefix.
    pub bytes: Bytes,
    /// Cells in the source grid, one byte each before compression.
    pub raw_size: usize,
    /// Run bytes carried: truncated length for fixed packets, full stream
    /// length for variable messages.
    pub rle_bytes: usize,
    pub overflow: bool,
    pub entropy_coded: bool,
}

impl EncodedFrame {
    pub fn wire_size(&self) -> usize {
        self.bytes.len()
    }
}

/// Stamps sequence numbers and encodes frames in the configured profile.
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    profile: Profile,
    packet_config: PacketConfig,
    next_sequence: u8,
}

impl FrameEncoder {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            profile: config.profile,
            packet_config: config.packet_config(),
            next_sequence: 0,
        }
    }

    /// Start numbering at `sequence` instead of zero.
    pub fn with_sequence(mut self, sequence: u8) -> Self {
        self.next_sequence = sequence;
        self
    }

    pub fn format(&self) -> RunFormat {
        self.packet_config.format
    }

    /// Encode one frame. The sequence number advances only on success and
    /// wraps after 255.
    pub fn encode(&mut self, frame: &QuantizedFrame) -> Result<EncodedFrame> {
        let sequence = self.next_sequence;
        let encoded = match self.profile {
            Profile::Fixed => {
                let built =
                    encode_packet(sequence, &frame.grid, &frame.detections, &self.packet_config)?;
                EncodedFrame {
                    sequence,
                    profile: Profile::Fixed,
                    bytes: Bytes::copy_from_slice(built.packet.as_bytes()),
                    raw_size: frame.grid.cell_count(),
                    rle_bytes: built.rle_used,
                    overflow: built.is_overflow(),
                    entropy_coded: false,
                }
            }
            Profile::Variable => {
                let format = self.packet_config.format;
                let bytes = encode_message(sequence, &frame.grid, &frame.detections, format)?;
                let flags = PacketFlags::new(bytes[1]);
                EncodedFrame {
                    sequence,
                    profile: Profile::Variable,
                    raw_size: frame.grid.cell_count(),
                    rle_bytes: rle::encoded_len(frame.grid.cells(), format),
                    overflow: false,
                    entropy_coded: flags.is_entropy_coded(),
                    bytes,
                }
            }
        };
        self.next_sequence = sequence.wrapping_add(1);
        Ok(encoded)
    }
}
