//! Variable-length messages: the shared header followed by an entropy container
//! holding the complete run stream.

use bytes::{BufMut, Bytes, BytesMut};
use gridlink_codec::{entropy, rle, Grid, RunFormat};

use crate::error::{PacketError, Result};
use crate::flags::PacketFlags;
use crate::object::Detections;
use crate::packet::{
    header_dimensions, read_records, write_header, DecodedFrame, HEADER_SIZE, OBJECTS_SIZE,
};

/// Header bytes preceding the entropy container.
pub const MESSAGE_HEADER_SIZE: usize = HEADER_SIZE + OBJECTS_SIZE;

/// Encode a grid into a variable-length message. Never truncates.
pub fn encode_message(
    sequence: u8,
    grid: &Grid,
    detections: &Detections,
    format: RunFormat,
) -> Result<Bytes> {
    let (width, height) = header_dimensions(grid)?;
    let records = detections.to_records(grid.width(), grid.height());

    let runs = rle::encode(grid.cells(), format);
    let body = entropy::encode(&runs);

    let mut flags = PacketFlags::NONE;
    flags.set_run_format(format);
    flags.set_entropy_coded(entropy::is_entropy_coded(&body));

    let mut header = [0u8; MESSAGE_HEADER_SIZE];
    write_header(&mut header, sequence, flags, width, height, &records);

    let mut dst = BytesMut::with_capacity(MESSAGE_HEADER_SIZE + body.len());
    dst.put_slice(&header);
    dst.put_slice(&body);

    tracing::trace!(
        sequence,
        runs = runs.len(),
        body = body.len(),
        entropy_coded = flags.is_entropy_coded(),
        "encoded variable message"
    );
    Ok(dst.freeze())
}

/// Decode a variable-length message.
///
/// A corrupt body yields an all-zero grid of the declared dimensions; only a
/// message too short to hold the header is an error.
pub fn decode_message(src: &[u8]) -> Result<DecodedFrame> {
    let Some((header, body)) = src.split_at_checked(MESSAGE_HEADER_SIZE) else {
        return Err(PacketError::Truncated {
            size: src.len(),
            needed: MESSAGE_HEADER_SIZE,
        });
    };

    let flags = PacketFlags::new(header[1]);
    let width = usize::from(header[2]);
    let height = usize::from(header[3]);

    let runs = entropy::decode(body);
    let cells = rle::decode(&runs, flags.run_format(), width * height);
    let grid = Grid::from_cells(width, height, cells).unwrap_or_else(|_| Grid::new(width, height));

    Ok(DecodedFrame {
        sequence: header[0],
        flags,
        grid,
        objects: read_records(&header[HEADER_SIZE..], flags.object_count()),
    })
}
