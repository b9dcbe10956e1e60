//! Raw grid files: back-to-back frames of `width * height` cells, one byte
//! per cell, row-major.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use gridlink_codec::{Grid, RunFormat};
use gridlink_packet::Detections;
use gridlink_pipeline::{FrameSource, PipelineError, QuantizedFrame};

use crate::exit::{io_error, CliError, CliResult, USAGE};

/// Streams frames out of a raw grid file.
pub struct GridFileSource<R> {
    reader: R,
    width: usize,
    height: usize,
    format: RunFormat,
}

impl GridFileSource<BufReader<File>> {
    pub fn open(
        path: &Path,
        width: usize,
        height: usize,
        format: RunFormat,
    ) -> CliResult<Self> {
        let file = File::open(path)
            .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
        Self::new(BufReader::new(file), width, height, format)
    }
}

impl<R: Read> GridFileSource<R> {
    pub fn new(reader: R, width: usize, height: usize, format: RunFormat) -> CliResult<Self> {
        if width == 0 || height == 0 {
            return Err(CliError::new(USAGE, "grid width and height must be non-zero"));
        }
        Ok(Self {
            reader,
            width,
            height,
            format,
        })
    }

    /// Read the next whole frame. Cell values are normalized to the run format.
    pub fn read_grid(&mut self) -> std::io::Result<Option<Grid>> {
        let mut cells = vec![0u8; self.width * self.height];
        let mut filled = 0;
        while filled < cells.len() {
            match self.reader.read(&mut cells[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < cells.len() {
            return Err(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("partial frame: {filled} of {} cells", cells.len()),
            ));
        }

        for cell in &mut cells {
            *cell = self.format.normalize(*cell);
        }
        Grid::from_cells(self.width, self.height, cells)
            .map(Some)
            .map_err(|err| std::io::Error::new(ErrorKind::InvalidData, err))
    }
}

impl<R: Read> FrameSource for GridFileSource<R> {
    type Frame = QuantizedFrame;

    fn next_frame(&mut self) -> gridlink_pipeline::Result<Option<QuantizedFrame>> {
        match self.read_grid() {
            Ok(grid) => Ok(grid.map(|grid| QuantizedFrame::new(grid, Detections::none()))),
            Err(err) => Err(PipelineError::Source(err.to_string())),
        }
    }
}
