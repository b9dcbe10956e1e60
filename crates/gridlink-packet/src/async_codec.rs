//! `tokio_util` codec for fixed-size packets.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{PacketError, Result};
use crate::packet::{Packet, PACKET_SIZE};
use crate::reader::take_packet;

/// Splits a byte stream into [`Packet`]s and writes them back out.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketCodec;

impl PacketCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = PacketError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        if src.len() < PACKET_SIZE {
            src.reserve(PACKET_SIZE - src.len());
            return Ok(None);
        }
        Ok(take_packet(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        match self.decode(src)? {
            Some(packet) => Ok(Some(packet)),
            None if src.is_empty() => Ok(None),
            None => Err(PacketError::ConnectionClosed),
        }
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = PacketError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<()> {
        <Self as Encoder<&Packet>>::encode(self, &item, dst)
    }
}

impl Encoder<&Packet> for PacketCodec {
    type Error = PacketError;

    fn encode(&mut self, item: &Packet, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(PACKET_SIZE);
        dst.put_slice(item.as_bytes());
        Ok(())
    }
}
