use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use gridlink_packet::RLE_REGION_SIZE;
use gridlink_pipeline::{Levels, Profile};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod grids;
pub mod run;
pub mod synthetic;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode raw grid frames into packets.
    Encode(EncodeArgs),
    /// Decode a packet stream back into grids.
    Decode(DecodeArgs),
    /// Run the threaded capture/encode pipeline.
    Run(RunArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Run(args) => run::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProfileArg {
    Fixed,
    Variable,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Fixed => Profile::Fixed,
            ProfileArg::Variable => Profile::Variable,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LevelsArg {
    Binary,
    Quad,
}

impl From<LevelsArg> for Levels {
    fn from(arg: LevelsArg) -> Self {
        match arg {
            LevelsArg::Binary => Levels::Binary,
            LevelsArg::Quad => Levels::Quad,
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// File of raw grid frames, one byte per cell, row-major.
    pub grid: PathBuf,
    /// Grid width in cells.
    #[arg(long)]
    pub width: usize,
    /// Grid height in cells.
    #[arg(long)]
    pub height: usize,
    /// Quantization levels of the input cells.
    #[arg(long, value_enum, default_value = "binary")]
    pub levels: LevelsArg,
    /// Wire profile.
    #[arg(long, value_enum, default_value = "fixed")]
    pub profile: ProfileArg,
    /// Run bytes allowed per fixed packet.
    #[arg(long, default_value_t = RLE_REGION_SIZE)]
    pub budget: usize,
    /// Sequence number of the first frame.
    #[arg(long, default_value_t = 0)]
    pub sequence: u8,
    /// Write the packet stream to this file.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Packet stream produced by `encode` or `run`.
    pub packets: PathBuf,
    /// Wire profile of the stream.
    #[arg(long, value_enum, default_value = "fixed")]
    pub profile: ProfileArg,
    /// Write decoded grid cells to this file.
    #[arg(long, value_name = "FILE")]
    pub grid_out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON pipeline config. Flags below override its values.
    #[arg(long, env = "GRIDLINK_CONFIG")]
    pub config: Option<PathBuf>,
    /// File of raw grid frames to feed through the pipeline.
    #[arg(
        long,
        conflicts_with = "synthetic",
        required_unless_present = "synthetic",
        requires_all = ["width", "height"]
    )]
    pub input: Option<PathBuf>,
    /// Grid width in cells (default 120 for --synthetic).
    #[arg(long)]
    pub width: Option<usize>,
    /// Grid height in cells (default 80 for --synthetic).
    #[arg(long)]
    pub height: Option<usize>,
    /// Generate N synthetic frames instead of reading a file.
    #[arg(long, value_name = "N")]
    pub synthetic: Option<u64>,
    /// Write the packet stream to this file.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub profile: Option<ProfileArg>,
    #[arg(long, value_enum)]
    pub levels: Option<LevelsArg>,
    #[arg(long)]
    pub queue_capacity: Option<usize>,
    /// Keep every Nth frame.
    #[arg(long)]
    pub frame_skip: Option<u32>,
    /// Per-frame pacing budget in milliseconds.
    #[arg(long)]
    pub frame_budget_ms: Option<u64>,
    #[arg(long)]
    pub rle_budget: Option<usize>,
    #[arg(long)]
    pub bandwidth_ceiling_kbps: Option<f64>,
    /// Emit telemetry every N encoded frames (0 disables).
    #[arg(long)]
    pub telemetry_every: Option<u64>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
