use std::io::{ErrorKind, Read};

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{PacketError, Result};
use crate::packet::{Packet, PACKET_SIZE};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Length prefix in front of each stored variable-length message.
pub(crate) const MESSAGE_PREFIX_SIZE: usize = 2;

/// Reads whole packets or length-prefixed messages from any `Read` stream.
///
/// Handles partial reads internally. Callers always get complete units.
pub struct PacketReader<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Read> PacketReader<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Read the next fixed-size packet (blocking).
    ///
    /// Returns `Err(PacketError::ConnectionClosed)` on EOF.
    pub fn read_packet(&mut self) -> Result<Packet> {
        self.next_packet()?.ok_or(PacketError::ConnectionClosed)
    }

    /// Read the next fixed-size packet, or `None` on EOF at a packet boundary.
    ///
    /// EOF in the middle of a packet is `ConnectionClosed`.
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        loop {
            if let Some(packet) = take_packet(&mut self.buf) {
                return Ok(Some(packet));
            }
            if !self.fill()? {
                return self.eof();
            }
        }
    }

    /// Read the next `u16`-BE length-prefixed message, or `None` on clean EOF.
    pub fn next_message(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(message) = take_message(&mut self.buf) {
                return Ok(Some(message));
            }
            if !self.fill()? {
                return self.eof();
            }
        }
    }

    /// Bytes received but not yet returned.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Pull one chunk from the stream. Returns `false` on EOF.
    fn fill(&mut self) -> Result<bool> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(true);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(PacketError::Io(err)),
            }
        }
    }

    fn eof<U>(&self) -> Result<Option<U>> {
        if self.buf.is_empty() {
            Ok(None)
        } else {
            tracing::debug!(buffered = self.buf.len(), "stream ended mid-unit");
            Err(PacketError::ConnectionClosed)
        }
    }
}

/// Split one packet off the front of `src` if a whole one is buffered.
pub(crate) fn take_packet(src: &mut BytesMut) -> Option<Packet> {
    if src.len() < PACKET_SIZE {
        return None;
    }
    let bytes = src.split_to(PACKET_SIZE);
    Packet::from_bytes(&bytes).ok()
}

/// Split one length-prefixed message off the front of `src`.
pub(crate) fn take_message(src: &mut BytesMut) -> Option<Bytes> {
    let prefix: [u8; MESSAGE_PREFIX_SIZE] = src.get(..MESSAGE_PREFIX_SIZE)?.try_into().ok()?;
    let len = usize::from(u16::from_be_bytes(prefix));
    if src.len() < MESSAGE_PREFIX_SIZE + len {
        return None;
    }
    src.advance(MESSAGE_PREFIX_SIZE);
    Some(src.split_to(len).freeze())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use gridlink_codec::Grid;

    use super::*;
    use crate::object::Detections;
    use crate::packet::{encode_packet, PacketConfig};
    use crate::writer::PacketWriter;

    fn wire_of(sequences: &[u8]) -> Vec<u8> {
        let mut writer = PacketWriter::new(Cursor::new(Vec::new()));
        for &seq in sequences {
            let mut grid = Grid::new(16, 16);
            grid.set(usize::from(seq % 16), 3, 1);
            let built =
                encode_packet(seq, &grid, &Detections::none(), &PacketConfig::default()).unwrap();
            writer.write_packet(&built.packet).unwrap();
        }
        writer.into_inner().into_inner()
    }

    #[test]
    fn read_multiple_packets() {
        let mut reader = PacketReader::new(Cursor::new(wire_of(&[1, 2, 3])));

        for expected in 1..=3 {
            assert_eq!(reader.read_packet().unwrap().sequence(), expected);
        }
        assert!(reader.next_packet().unwrap().is_none());
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire_of(&[9, 10]),
            pos: 0,
        };
        let mut reader = PacketReader::new(byte_reader);

        assert_eq!(reader.read_packet().unwrap().sequence(), 9);
        assert_eq!(reader.read_packet().unwrap().sequence(), 10);
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = PacketReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.next_packet().unwrap().is_none());
        let err = reader.read_packet().unwrap_err();
        assert!(matches!(err, PacketError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_packet() {
        let mut wire = wire_of(&[1, 2]);
        wire.truncate(PACKET_SIZE + 17);

        let mut reader = PacketReader::new(Cursor::new(wire));
        assert_eq!(reader.read_packet().unwrap().sequence(), 1);
        let err = reader.next_packet().unwrap_err();
        assert!(matches!(err, PacketError::ConnectionClosed));
        assert_eq!(reader.buffered(), 17);
    }

    #[test]
    fn messages_are_length_prefixed() {
        let mut writer = PacketWriter::new(Cursor::new(Vec::new()));
        writer.write_message(b"first").unwrap();
        writer.write_message(b"").unwrap();
        writer.write_message(&[7u8; 600]).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(&wire[..2], &[0, 5]);

        let mut reader = PacketReader::new(ByteByByteReader {
            bytes: wire,
            pos: 0,
        });
        assert_eq!(reader.next_message().unwrap().unwrap().as_ref(), b"first");
        assert!(reader.next_message().unwrap().unwrap().is_empty());
        assert_eq!(reader.next_message().unwrap().unwrap().len(), 600);
        assert!(reader.next_message().unwrap().is_none());
    }

    #[test]
    fn message_cut_short_is_connection_closed() {
        let mut reader = PacketReader::new(Cursor::new(vec![0x00, 0x10, 1, 2, 3]));
        let err = reader.next_message().unwrap_err();
        assert!(matches!(err, PacketError::ConnectionClosed));
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = PacketReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let reader = ErrorThenData {
            kind: ErrorKind::WouldBlock,
            fired: false,
            bytes: wire_of(&[7]),
            pos: 0,
        };
        let mut packets = PacketReader::new(reader);
        let err = packets.read_packet().unwrap_err();
        assert!(matches!(err, PacketError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = ErrorThenData {
            kind: ErrorKind::Interrupted,
            fired: false,
            bytes: wire_of(&[8]),
            pos: 0,
        };
        let mut packets = PacketReader::new(reader);
        assert_eq!(packets.read_packet().unwrap().sequence(), 8);
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = PacketWriter::new(left);
        let mut reader = PacketReader::new(right);

        let reader_thread = std::thread::spawn(move || {
            (0..32u8)
                .map(|_| reader.read_packet().unwrap().sequence())
                .collect::<Vec<_>>()
        });

        let grid = Grid::new(8, 8);
        for seq in 0..32u8 {
            let built =
                encode_packet(seq, &grid, &Detections::none(), &PacketConfig::default()).unwrap();
            writer.write_packet(&built.packet).unwrap();
        }

        let received = reader_thread.join().unwrap();
        assert_eq!(received, (0..32u8).collect::<Vec<_>>());
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct ErrorThenData {
        kind: ErrorKind,
        fired: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ErrorThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.fired {
                self.fired = true;
                return Err(std::io::Error::from(self.kind));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
