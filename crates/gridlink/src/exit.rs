use std::fmt;
use std::io;

use gridlink_packet::PacketError;
use gridlink_pipeline::PipelineError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const NOT_FOUND: i32 = 66;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::NotFound => NOT_FOUND,
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData => DATA_INVALID,
        io::ErrorKind::BrokenPipe => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn packet_error(context: &str, err: PacketError) -> CliError {
    match err {
        PacketError::Io(source) => io_error(context, source),
        PacketError::DimensionsTooLarge { .. } | PacketError::MessageTooLarge { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        PacketError::Truncated { .. } | PacketError::ConnectionClosed => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn pipeline_error(context: &str, err: PipelineError) -> CliError {
    match err {
        PipelineError::Packet(err) => packet_error(context, err),
        PipelineError::Io(source) => io_error(context, source),
        PipelineError::Json(_) | PipelineError::InvalidConfig(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        PipelineError::SinkClosed | PipelineError::Source(_) | PipelineError::Quantize(_) => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        PipelineError::Worker => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}
