use std::io::{ErrorKind, Write};

use bytes::{BufMut, BytesMut};

use crate::error::{PacketError, Result};
use crate::packet::{Packet, PACKET_SIZE};
use crate::reader::MESSAGE_PREFIX_SIZE;

/// Writes whole packets or length-prefixed messages to any `Write` stream.
pub struct PacketWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> PacketWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(PACKET_SIZE),
        }
    }

    /// Write one fixed-size packet and flush (blocking).
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        self.buf.clear();
        self.buf.put_slice(packet.as_bytes());
        self.send_buffered()
    }

    /// Write one variable-length message behind a `u16` BE length prefix.
    pub fn write_message(&mut self, message: &[u8]) -> Result<()> {
        let len = u16::try_from(message.len()).map_err(|_| PacketError::MessageTooLarge {
            size: message.len(),
            max: usize::from(u16::MAX),
        })?;

        self.buf.clear();
        self.buf.reserve(MESSAGE_PREFIX_SIZE + message.len());
        self.buf.put_u16(len);
        self.buf.put_slice(message);
        self.send_buffered()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(PacketError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn send_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(PacketError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(PacketError::Io(err)),
            }
        }

        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    fn sample_packet(sequence: u8) -> Packet {
        let mut bytes = [0u8; PACKET_SIZE];
        bytes[0] = sequence;
        bytes[2] = 4;
        bytes[3] = 4;
        Packet::from_array(bytes)
    }

    #[test]
    fn writes_exactly_one_packet() {
        let mut writer = PacketWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_packet(&sample_packet(5)).unwrap();
        writer.write_packet(&sample_packet(6)).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire.len(), 2 * PACKET_SIZE);
        assert_eq!(wire[0], 5);
        assert_eq!(wire[PACKET_SIZE], 6);
    }

    #[test]
    fn oversized_message_rejected() {
        let mut writer = PacketWriter::new(Cursor::new(Vec::<u8>::new()));
        let err = writer.write_message(&vec![0u8; 70_000]).unwrap_err();
        assert!(matches!(
            err,
            PacketError::MessageTooLarge {
                size: 70_000,
                max: 65_535
            }
        ));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = PacketWriter::new(sink);

        writer.write_packet(&sample_packet(1)).unwrap();

        assert!(flag.load(Ordering::SeqCst));
        assert_eq!(writer.get_ref().data.len(), PACKET_SIZE);
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = PacketWriter::new(cursor);

        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _inner = writer.into_inner();
    }

    #[test]
    fn retries_interrupted_and_would_block() {
        for kind in [ErrorKind::Interrupted, ErrorKind::WouldBlock] {
            let mut writer = PacketWriter::new(FailOnceWriter {
                kind,
                write_failed: false,
                flush_failed: false,
                data: Vec::new(),
            });
            writer.write_packet(&sample_packet(2)).unwrap();

            let inner = writer.into_inner();
            assert_eq!(inner.data.len(), PACKET_SIZE);
        }
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = PacketWriter::new(ZeroWriter);
        let err = writer.write_packet(&sample_packet(1)).unwrap_err();
        assert!(matches!(err, PacketError::ConnectionClosed));
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailOnceWriter {
        kind: ErrorKind,
        write_failed: bool,
        flush_failed: bool,
        data: Vec<u8>,
    }

    impl Write for FailOnceWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.write_failed {
                self.write_failed = true;
                return Err(std::io::Error::from(self.kind));
            }
            // short writes exercise the resume offset
            let n = buf.len().min(64);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_failed {
                self.flush_failed = true;
                return Err(std::io::Error::from(self.kind));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
