//! Detected-object records.

/// Maximum object records per packet.
pub const MAX_OBJECTS: usize = 4;

/// Wire size of one record: x, y, radius.
pub const OBJECT_RECORD_SIZE: usize = 3;

/// A detected object in source-frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl Detection {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self { x, y, radius }
    }

    pub fn area(&self) -> f32 {
        std::f32::consts::PI * self.radius * self.radius
    }
}

/// Detections for one frame, with the geometry of the frame they came from.
///
/// A zero source dimension means coordinates are already in grid space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detections {
    pub source_width: u32,
    pub source_height: u32,
    pub objects: Vec<Detection>,
}

impl Detections {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(source_width: u32, source_height: u32, objects: Vec<Detection>) -> Self {
        Self {
            source_width,
            source_height,
            objects,
        }
    }

    /// Detections whose coordinates are already in grid cells.
    pub fn in_grid_space(objects: Vec<Detection>) -> Self {
        Self::new(0, 0, objects)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Rescale into grid space, largest area first, capped at [`MAX_OBJECTS`].
    ///
    /// The radius follows the horizontal scale. Components are rounded and
    /// clamped to one byte.
    pub fn to_records(&self, grid_width: usize, grid_height: usize) -> Vec<ObjectRecord> {
        let scale_x = scale(grid_width, self.source_width);
        let scale_y = scale(grid_height, self.source_height);

        let mut ranked: Vec<&Detection> = self.objects.iter().collect();
        ranked.sort_by(|a, b| b.area().total_cmp(&a.area()));

        ranked
            .into_iter()
            .take(MAX_OBJECTS)
            .map(|d| ObjectRecord {
                x: to_byte(d.x * scale_x),
                y: to_byte(d.y * scale_y),
                radius: to_byte(d.radius * scale_x),
            })
            .collect()
    }
}

fn scale(grid: usize, source: u32) -> f32 {
    if source == 0 {
        1.0
    } else {
        grid as f32 / source as f32
    }
}

fn to_byte(value: f32) -> u8 {
    // NaN casts to 0
    value.round().clamp(0.0, 255.0) as u8
}

/// A detected object on the wire, in grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectRecord {
    pub x: u8,
    pub y: u8,
    pub radius: u8,
}

impl ObjectRecord {
    pub fn to_bytes(self) -> [u8; OBJECT_RECORD_SIZE] {
        [self.x, self.y, self.radius]
    }

    pub fn from_bytes(bytes: [u8; OBJECT_RECORD_SIZE]) -> Self {
        Self {
            x: bytes[0],
            y: bytes[1],
            radius: bytes[2],
        }
    }
}
