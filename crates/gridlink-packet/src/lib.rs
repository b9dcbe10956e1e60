//! Wire packets for compressed sensor grids.
//!
//! Two deployment profiles share one 16-byte header layout:
//! - Fixed: every packet is exactly [`PACKET_SIZE`] bytes; the run stream is
//!   truncated to fit and the overflow flag reports it
//! - Variable: the header is followed by an entropy container holding the full
//!   run stream
//!
//! Header: sequence (1) + flags (1) + width (1) + height (1) + 4 object records (3 each).

pub mod error;
pub mod flags;
pub mod object;
pub mod packet;
pub mod reader;
pub mod variable;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::PacketCodec;
pub use error::{PacketError, Result};
pub use flags::PacketFlags;
pub use object::{Detection, Detections, ObjectRecord, MAX_OBJECTS, OBJECT_RECORD_SIZE};
pub use packet::{
    decode_packet, encode_packet, DecodedFrame, EncodedPacket, Packet, PacketConfig, HEADER_SIZE,
    OBJECTS_SIZE, PACKET_SIZE, RESERVED_SIZE, RLE_REGION_SIZE,
};
pub use reader::PacketReader;
pub use variable::{decode_message, encode_message, MESSAGE_HEADER_SIZE};
pub use writer::PacketWriter;
