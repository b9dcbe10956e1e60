//! Synthetic capture: one ball bouncing across a 640x480 frame.

use gridlink_codec::{Grid, RunFormat};
use gridlink_packet::{Detection, Detections};
use gridlink_pipeline::{FrameSource, QuantizedFrame};

pub const SOURCE_WIDTH: u32 = 640;
pub const SOURCE_HEIGHT: u32 = 480;

const BALL_RADIUS: f32 = 48.0;
const STEP_X: f32 = 9.0;
const STEP_Y: f32 = 5.0;

/// A captured frame reduced to what the detector saw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticFrame {
    pub index: u64,
    pub ball: Detection,
}

/// Yields `frames` synthetic frames, then reports exhaustion.
#[derive(Debug)]
pub struct SyntheticSource {
    frames: u64,
    index: u64,
}

impl SyntheticSource {
    pub fn new(frames: u64) -> Self {
        Self { frames, index: 0 }
    }
}

impl FrameSource for SyntheticSource {
    type Frame = SyntheticFrame;

    fn next_frame(&mut self) -> gridlink_pipeline::Result<Option<SyntheticFrame>> {
        if self.index >= self.frames {
            return Ok(None);
        }
        let index = self.index;
        self.index += 1;

        let t = index as f32;
        let x = bounce(BALL_RADIUS + t * STEP_X, SOURCE_WIDTH as f32 - BALL_RADIUS);
        let y = bounce(BALL_RADIUS + t * STEP_Y, SOURCE_HEIGHT as f32 - BALL_RADIUS);
        Ok(Some(SyntheticFrame {
            index,
            ball: Detection::new(x, y, BALL_RADIUS),
        }))
    }
}

// Reflect `pos` back and forth between BALL_RADIUS and `max`.
fn bounce(pos: f32, max: f32) -> f32 {
    let span = max - BALL_RADIUS;
    let offset = (pos - BALL_RADIUS) % (2.0 * span);
    if offset <= span {
        BALL_RADIUS + offset
    } else {
        BALL_RADIUS + 2.0 * span - offset
    }
}

/// Rasterize a frame onto a `width` x `height` grid.
///
/// Binary grids mark cells inside the ball. Quad grids step from 3 at the
/// center down to 1 at the rim.
pub fn quantize(
    frame: SyntheticFrame,
    width: usize,
    height: usize,
    format: RunFormat,
) -> QuantizedFrame {
    let mut grid = Grid::new(width, height);
    let sx = SOURCE_WIDTH as f32 / width as f32;
    let sy = SOURCE_HEIGHT as f32 / height as f32;
    let ball = frame.ball;
    tracing::trace!(index = frame.index, x = ball.x, y = ball.y, "rasterizing synthetic frame");

    for y in 0..height {
        for x in 0..width {
            let dx = (x as f32 + 0.5) * sx - ball.x;
            let dy = (y as f32 + 0.5) * sy - ball.y;
            let dist = (dx * dx + dy * dy).sqrt() / ball.radius;
            let level = match format {
                RunFormat::Explicit => u8::from(dist <= 1.0),
                RunFormat::Packed if dist <= 1.0 / 3.0 => 3,
                RunFormat::Packed if dist <= 2.0 / 3.0 => 2,
                RunFormat::Packed => u8::from(dist <= 1.0),
            };
            grid.set(x, y, level);
        }
    }

    QuantizedFrame::new(
        grid,
        Detections::new(SOURCE_WIDTH, SOURCE_HEIGHT, vec![ball]),
    )
}
