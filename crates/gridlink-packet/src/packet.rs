use std::fmt;

use gridlink_codec::{rle, Grid, RunFormat};

use crate::error::{PacketError, Result};
use crate::flags::PacketFlags;
use crate::object::{Detections, ObjectRecord, MAX_OBJECTS, OBJECT_RECORD_SIZE};

/// Total wire size of a fixed-profile packet.
pub const PACKET_SIZE: usize = 300;

/// Sequence (1) + flags (1) + width (1) + height (1).
pub const HEADER_SIZE: usize = 4;

/// Object record region: 4 records of 3 bytes.
pub const OBJECTS_SIZE: usize = MAX_OBJECTS * OBJECT_RECORD_SIZE;

/// Maximum run-length bytes a packet can carry.
pub const RLE_REGION_SIZE: usize = 275;

/// Zero padding at the end of every packet.
pub const RESERVED_SIZE: usize = 9;

const _: () = assert!(HEADER_SIZE + OBJECTS_SIZE + RLE_REGION_SIZE + RESERVED_SIZE == PACKET_SIZE);

const OBJECTS_OFFSET: usize = HEADER_SIZE;
const RLE_OFFSET: usize = OBJECTS_OFFSET + OBJECTS_SIZE;
const RESERVED_OFFSET: usize = RLE_OFFSET + RLE_REGION_SIZE;

/// A fixed-size wire packet.
///
/// Wire format:
/// ```text
/// ┌─────┬───────┬───────┬────────┬──────────────────┬───────────────┬──────────┐
/// │ Seq │ Flags │ Width │ Height │ Objects          │ Run data      │ Reserved │
/// │ 1B  │ 1B    │ 1B    │ 1B     │ 4 × (x, y, r) 12B│ 275B          │ 9B       │
/// └─────┴───────┴───────┴────────┴──────────────────┴───────────────┴──────────┘
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    bytes: [u8; PACKET_SIZE],
}

impl Packet {
    /// Wrap exactly one packet's worth of bytes.
    pub fn from_array(bytes: [u8; PACKET_SIZE]) -> Self {
        Self { bytes }
    }

    /// Take the first [`PACKET_SIZE`] bytes of `src`.
    pub fn from_bytes(src: &[u8]) -> Result<Self> {
        let bytes: [u8; PACKET_SIZE] = src
            .get(..PACKET_SIZE)
            .and_then(|head| head.try_into().ok())
            .ok_or(PacketError::Truncated {
                size: src.len(),
                needed: PACKET_SIZE,
            })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; PACKET_SIZE] {
        &self.bytes
    }

    pub fn sequence(&self) -> u8 {
        self.bytes[0]
    }

    pub fn flags(&self) -> PacketFlags {
        PacketFlags::new(self.bytes[1])
    }

    pub fn width(&self) -> u8 {
        self.bytes[2]
    }

    pub fn height(&self) -> u8 {
        self.bytes[3]
    }

    /// Object records declared by the flag byte.
    pub fn objects(&self) -> Vec<ObjectRecord> {
        read_records(&self.bytes[OBJECTS_OFFSET..RLE_OFFSET], self.flags().object_count())
    }

    /// The whole run-length region, including unused zero bytes.
    pub fn rle_region(&self) -> &[u8] {
        &self.bytes[RLE_OFFSET..RESERVED_OFFSET]
    }

    pub fn reserved(&self) -> &[u8] {
        &self.bytes[RESERVED_OFFSET..]
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("sequence", &self.sequence())
            .field("flags", &self.flags())
            .field("width", &self.width())
            .field("height", &self.height())
            .field("objects", &self.objects())
            .finish_non_exhaustive()
    }
}

/// Configuration for the fixed-size packet profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketConfig {
    /// Run sub-format written into the packet.
    pub format: RunFormat,
    /// Run bytes allowed per packet. Clamped to [`RLE_REGION_SIZE`].
    pub rle_budget: usize,
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self {
            format: RunFormat::Explicit,
            rle_budget: RLE_REGION_SIZE,
        }
    }
}

/// A built packet plus how much of the run region it used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPacket {
    pub packet: Packet,
    /// Run bytes written before the budget was reached.
    pub rle_used: usize,
}

impl EncodedPacket {
    pub fn is_overflow(&self) -> bool {
        self.packet.flags().is_overflow()
    }
}

/// A packet or message turned back into a grid and its objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub sequence: u8,
    pub flags: PacketFlags,
    pub grid: Grid,
    pub objects: Vec<ObjectRecord>,
}

/// Encode a grid and its detections into one fixed-size packet.
///
/// Runs are written straight into the packet's run region, never more than
/// `config.rle_budget` bytes. When the full stream would not fit, writing stops
/// at the last complete run and the overflow flag is set.
pub fn encode_packet(
    sequence: u8,
    grid: &Grid,
    detections: &Detections,
    config: &PacketConfig,
) -> Result<EncodedPacket> {
    let (width, height) = header_dimensions(grid)?;
    let records = detections.to_records(grid.width(), grid.height());

    let mut bytes = [0u8; PACKET_SIZE];
    let budget = config.rle_budget.min(RLE_REGION_SIZE);
    let region = &mut bytes[RLE_OFFSET..RLE_OFFSET + budget];
    let summary = rle::encode_into(grid.cells(), config.format, region);

    let mut flags = PacketFlags::NONE;
    flags.set_run_format(config.format);
    flags.set_overflow(summary.truncated);
    write_header(&mut bytes[..RLE_OFFSET], sequence, flags, width, height, &records);

    if summary.truncated {
        tracing::debug!(
            sequence,
            written = summary.written,
            budget,
            "run stream truncated to packet budget"
        );
    }

    Ok(EncodedPacket {
        packet: Packet { bytes },
        rle_used: summary.written,
    })
}

/// Decode a fixed-size packet. Never consults the entropy stage.
pub fn decode_packet(packet: &Packet) -> DecodedFrame {
    let flags = packet.flags();
    let width = usize::from(packet.width());
    let height = usize::from(packet.height());

    let cells = rle::decode(packet.rle_region(), flags.run_format(), width * height);
    let grid = Grid::from_cells(width, height, cells).unwrap_or_else(|_| Grid::new(width, height));

    DecodedFrame {
        sequence: packet.sequence(),
        flags,
        grid,
        objects: packet.objects(),
    }
}

pub(crate) fn header_dimensions(grid: &Grid) -> Result<(u8, u8)> {
    match (u8::try_from(grid.width()), u8::try_from(grid.height())) {
        (Ok(width), Ok(height)) => Ok((width, height)),
        _ => Err(PacketError::DimensionsTooLarge {
            width: grid.width(),
            height: grid.height(),
        }),
    }
}

/// Write the shared 16-byte header; `dst` must be at least that long.
pub(crate) fn write_header(
    dst: &mut [u8],
    sequence: u8,
    mut flags: PacketFlags,
    width: u8,
    height: u8,
    records: &[ObjectRecord],
) {
    flags.set_object_count(records.len());
    dst[0] = sequence;
    dst[1] = flags.bits();
    dst[2] = width;
    dst[3] = height;

    let region = &mut dst[OBJECTS_OFFSET..OBJECTS_OFFSET + OBJECTS_SIZE];
    region.fill(0);
    for (slot, record) in region
        .chunks_exact_mut(OBJECT_RECORD_SIZE)
        .zip(records.iter().take(MAX_OBJECTS))
    {
        slot.copy_from_slice(&record.to_bytes());
    }
}

pub(crate) fn read_records(region: &[u8], count: usize) -> Vec<ObjectRecord> {
    region
        .chunks_exact(OBJECT_RECORD_SIZE)
        .take(count)
        .map(|chunk| ObjectRecord::from_bytes([chunk[0], chunk[1], chunk[2]]))
        .collect()
}
