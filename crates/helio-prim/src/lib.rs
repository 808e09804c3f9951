//! Primitive compilation for a D3D11-class rendering backend.
//!
//! Callers hand in geometry the way legacy fixed-function code describes it:
//! any of seven topologies (quads included), 8/16/32-bit index streams, and
//! vertex declarations with arbitrary offsets and packed formats. The backend
//! only rasterizes five topologies, accepts 16/32-bit indices with `0xFFFF`
//! reserved for primitive restart, and wants 4-byte-aligned attributes in a
//! limited format set. This crate closes that gap at compile time:
//!
//! - [`compile::compile_primitive`] lowers quads to triangles, normalizes
//!   index streams, repacks incompatible vertex buffers and resolves a
//!   cached vertex-layout object backed by a synthesized shader module.
//! - [`draw::draw_primitive`] converts source-element draw ranges into
//!   device elements and submits them.
//! - [`context::GraphicsResourceContext`] holds the long-lived pieces (the
//!   layout cache and the shared single-quad index buffer) and knows how to
//!   tear them down safely across device loss.
//!
//! All device interaction goes through the [`device::RenderDevice`] trait.

pub mod cache;
pub mod compile;
pub mod context;
pub mod device;
pub mod draw;
pub mod error;
pub mod index;
pub mod testing;
pub mod topology;
pub mod vertex;

pub use cache::VertexLayoutCache;
pub use compile::{compile_primitive, CompiledPrimitive, IndexSlice, PrimitiveDesc};
pub use context::GraphicsResourceContext;
pub use device::{
    BufferHandle, DrawCall, IndexFormat, LayoutHandle, LifetimeHint, NativeVertexElement,
    RenderDevice,
};
pub use draw::{destroy_primitive, draw_primitive};
pub use error::{CompileError, DeviceError};
pub use index::{IndexData, IndexWidth, RESTART_SENTINEL_U16};
pub use topology::{NativeTopology, PrimitiveTopology, SourceExpansion};
pub use vertex::{ComponentType, VertexAttribute, VertexLayoutDesc, VertexSemantic};
