use thiserror::Error;

use crate::vertex::{ComponentType, VertexSemantic};

/// Failures reported by the device collaborator.
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    #[error("device out of memory")]
    OutOfMemory,
    #[error("invalid shader module: {0}")]
    InvalidShaderModule(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Failures surfaced by primitive compilation.
///
/// Every variant means the whole `compile` call failed; partially created
/// resources are released before the error is returned.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    #[error("unsupported vertex attribute format: {ty:?} x{components}")]
    UnsupportedFormat { ty: ComponentType, components: u8 },
    #[error("too many vertex attributes: {count} (limit {limit})")]
    TooManyAttributes { count: usize, limit: u32 },
    #[error("attribute {semantic:?} at offset {offset} (size {size}) exceeds vertex stride {stride}")]
    AttributeOutOfStride {
        semantic: VertexSemantic,
        offset: u32,
        size: u32,
        stride: u32,
    },
    #[error("vertex data truncated: need {expected} bytes, got {actual}")]
    VertexDataTruncated { expected: usize, actual: usize },
    #[error("index data truncated: need {expected} bytes, got {actual}")]
    IndexDataTruncated { expected: usize, actual: usize },
    #[error("shader module synthesis failed: {0}")]
    ModuleSynthesis(#[from] helio_dxbc::DxbcError),
    #[error(transparent)]
    Device(#[from] DeviceError),
}
