/// Errors that can occur while shaping grids or parsing entropy containers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The cell buffer does not match the declared grid dimensions.
    #[error("grid shape mismatch ({width}x{height} needs {expected} cells, got {actual})")]
    ShapeMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    /// A container header field ran past the end of the buffer.
    #[error("container truncated ({field} needs {needed} bytes, {available} available)")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    /// The container buffer holds no bytes at all.
    #[error("empty container")]
    Empty,
}

pub type Result<T> = std::result::Result<T, CodecError>;
