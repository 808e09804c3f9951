use thiserror::Error;

/// Errors produced while synthesizing or parsing a DXBC container.
#[derive(Debug, Clone, Error)]
pub enum DxbcError {
    #[error("malformed header: {0}")]
    MalformedHeader(String),
    #[error("malformed chunk table: {0}")]
    MalformedOffsets(String),
    #[error("invalid chunk: {0}")]
    InvalidChunk(String),
    #[error("out of bounds: {0}")]
    OutOfBounds(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl DxbcError {
    pub fn malformed_header(msg: impl Into<String>) -> Self {
        Self::MalformedHeader(msg.into())
    }

    pub fn malformed_offsets(msg: impl Into<String>) -> Self {
        Self::MalformedOffsets(msg.into())
    }

    pub fn invalid_chunk(msg: impl Into<String>) -> Self {
        Self::InvalidChunk(msg.into())
    }

    pub fn out_of_bounds(msg: impl Into<String>) -> Self {
        Self::OutOfBounds(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// The human-readable detail string of this error.
    pub fn context(&self) -> &str {
        match self {
            Self::MalformedHeader(s)
            | Self::MalformedOffsets(s)
            | Self::InvalidChunk(s)
            | Self::OutOfBounds(s)
            | Self::InvalidInput(s) => s,
        }
    }
}
