//! Synthesis and parsing of the DXBC shader-module container.
//!
//! The layout-creation call of the target backend requires a compiled vertex
//! shader whose declared input signature matches the vertex declaration being
//! bound. The renderer never has such a shader at hand, so this crate builds a
//! minimal placeholder module in memory:
//!
//! - [`synthesize_vertex_module`] writes a five-chunk container (`RDEF`,
//!   `ISGN`, `OSGN`, `SHDR`, `STAT`) whose input signature mirrors a caller
//!   supplied element list.
//! - [`checksum::container_checksum`] fills the header digest with the
//!   backend's non-standard MD5 variant. The variant must be reproduced
//!   bit-for-bit; the driver recomputes it and rejects mismatches.
//! - [`DxbcContainer`] is a strict structural parser for the same format,
//!   used by tests and by reference devices to validate synthesized modules.

pub mod checksum;
mod container;
mod error;
mod fourcc;
pub mod signature;
mod synth;
mod writer;

pub use container::{DxbcChunk, DxbcContainer, DxbcHeader};
pub use error::DxbcError;
pub use fourcc::FourCC;
pub use signature::{parse_signature_chunk, SignatureRecord};
pub use synth::{
    synthesize_vertex_module, InputSignatureElement, RegisterComponentClass, CHUNK_ISGN,
    CHUNK_OSGN, CHUNK_RDEF, CHUNK_SHDR, CHUNK_STAT,
};
pub use writer::ContainerWriter;
