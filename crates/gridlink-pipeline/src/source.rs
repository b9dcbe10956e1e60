//! Seams between the pipeline and its upstream and downstream collaborators.

use std::io::Write;

use gridlink_codec::Grid;
use gridlink_packet::{Detections, Packet, PacketWriter};

use crate::config::Profile;
use crate::encoder::EncodedFrame;
use crate::error::{PipelineError, Result};

/// Yields raw frames for the producer thread.
pub trait FrameSource {
    type Frame: Send;

    /// Next frame, or `None` once the input is exhausted.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>>;
}

/// Any iterator of frames is a source that never fails.
#[derive(Debug)]
pub struct IterSource<I> {
    inner: I,
}

impl<I> IterSource<I> {
    pub fn new(inner: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            inner: inner.into_iter(),
        }
    }
}

impl<I> FrameSource for IterSource<I>
where
    I: Iterator,
    I::Item: Send,
{
    type Frame = I::Item;

    fn next_frame(&mut self) -> Result<Option<I::Item>> {
        Ok(self.inner.next())
    }
}

/// One frame reduced to a grid and its detections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuantizedFrame {
    pub grid: Grid,
    pub detections: Detections,
}

impl QuantizedFrame {
    pub fn new(grid: Grid, detections: Detections) -> Self {
        Self { grid, detections }
    }
}

/// Turns a raw frame into a quantized grid.
///
/// `Ok(None)` means the frame holds nothing worth sending and is skipped. An
/// error is logged and counted as a failed frame; the pipeline keeps going.
pub trait Quantizer<F> {
    fn quantize(&mut self, frame: F) -> Result<Option<QuantizedFrame>>;
}

impl<F, Q> Quantizer<F> for Q
where
    Q: FnMut(F) -> Result<Option<QuantizedFrame>>,
{
    fn quantize(&mut self, frame: F) -> Result<Option<QuantizedFrame>> {
        self(frame)
    }
}

/// Quantizer for sources that already yield quantized frames.
///
/// Frames with an empty grid are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prequantized;

impl Quantizer<QuantizedFrame> for Prequantized {
    fn quantize(&mut self, frame: QuantizedFrame) -> Result<Option<QuantizedFrame>> {
        Ok((frame.grid.cell_count() > 0).then_some(frame))
    }
}

/// Receives encoded output.
///
/// Returning [`PipelineError::SinkClosed`] stops the pipeline. Any other error
/// is logged and counted, and the pipeline moves on to the next frame.
pub trait PacketSink {
    fn deliver(&mut self, frame: &EncodedFrame) -> Result<()>;
}

impl<K: PacketSink + ?Sized> PacketSink for &mut K {
    fn deliver(&mut self, frame: &EncodedFrame) -> Result<()> {
        (**self).deliver(frame)
    }
}

/// Collects every encoded frame in memory.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub frames: Vec<EncodedFrame>,
}

impl PacketSink for CollectSink {
    fn deliver(&mut self, frame: &EncodedFrame) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

/// Writes encoded output to a byte stream: fixed packets back to back,
/// variable messages behind a length prefix.
pub struct WriterSink<W> {
    writer: PacketWriter<W>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: PacketWriter::new(inner),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write> PacketSink for WriterSink<W> {
    fn deliver(&mut self, frame: &EncodedFrame) -> Result<()> {
        let written = match frame.profile {
            Profile::Fixed => {
                Packet::from_bytes(&frame.bytes).and_then(|packet| self.writer.write_packet(&packet))
            }
            Profile::Variable => self.writer.write_message(&frame.bytes),
        };
        match written {
            Ok(()) => Ok(()),
            Err(gridlink_packet::PacketError::ConnectionClosed) => Err(PipelineError::SinkClosed),
            Err(gridlink_packet::PacketError::Io(err))
                if err.kind() == std::io::ErrorKind::BrokenPipe =>
            {
                Err(PipelineError::SinkClosed)
            }
            Err(err) => Err(err.into()),
        }
    }
}
