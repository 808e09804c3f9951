//! The device collaborator seam.
//!
//! Everything this crate creates or draws goes through [`RenderDevice`]: an
//! already-initialized backend device plus its immediate context. Device and
//! swap-chain management live elsewhere; the one lifecycle signal consumed
//! here is the generation counter, bumped by the device-loss handler whenever
//! the underlying device is recreated. Handles stamped with an older
//! generation are defined stale and must not reach the device again.

use crate::error::DeviceError;
use crate::topology::NativeTopology;
use crate::vertex::format_map::NativeFormat;
use crate::vertex::VertexSemantic;

/// Opaque handle to a device buffer resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Opaque handle to a device vertex-layout object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutHandle(pub u64);

/// Expected lifetime of a resource, forwarded to the device so it can pick a
/// memory pool. Compilation behaves identically under either hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifetimeHint {
    /// Short-lived data, e.g. per-frame geometry.
    Transient,
    /// Long-lived data reused across many frames.
    Static,
}

/// Width of the elements in an index buffer resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

impl IndexFormat {
    pub fn byte_size(self) -> u32 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// One attribute of a device vertex-layout description: semantic tag, native
/// numeric format, byte offset within the vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeVertexElement {
    pub semantic: VertexSemantic,
    pub format: NativeFormat,
    pub offset: u32,
}

/// A fully resolved draw submitted to the device context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub topology: NativeTopology,
    pub layout: LayoutHandle,
    pub vertex_buffer: BufferHandle,
    pub vertex_stride: u32,
    /// First element to draw: an index into the index buffer when one is
    /// bound, a vertex index otherwise.
    pub first_element: u32,
    pub element_count: u32,
    pub index_buffer: Option<(BufferHandle, IndexFormat)>,
}

/// Backend device + immediate context, as consumed by this subsystem.
///
/// Single-threaded-owner model: implementations are driven from one
/// rendering thread and need no internal synchronization. Creation calls are
/// synchronous and may block for driver-determined latency.
pub trait RenderDevice {
    /// Monotonic counter bumped on device recreation; the sole staleness
    /// signal for resources created through this trait.
    fn generation(&self) -> u64;

    /// Hardware limit on vertex attributes per layout.
    fn max_vertex_attributes(&self) -> u32;

    /// Creates an immutable vertex buffer from `contents`.
    fn create_vertex_buffer(
        &self,
        contents: &[u8],
        hint: LifetimeHint,
    ) -> Result<BufferHandle, DeviceError>;

    /// Creates an immutable index buffer from `contents`.
    fn create_index_buffer(
        &self,
        contents: &[u8],
        format: IndexFormat,
        hint: LifetimeHint,
    ) -> Result<BufferHandle, DeviceError>;

    /// Creates a vertex-layout object binding `elements` to the input
    /// signature declared by `shader_module` (a complete shader container;
    /// the device validates the signature match and the container digest).
    fn create_input_layout(
        &self,
        elements: &[NativeVertexElement],
        shader_module: &[u8],
    ) -> Result<LayoutHandle, DeviceError>;

    fn destroy_buffer(&self, buffer: BufferHandle);

    fn destroy_input_layout(&self, layout: LayoutHandle);

    /// Submits one draw. `call.index_buffer` selects indexed vs. non-indexed
    /// submission.
    fn draw(&self, call: &DrawCall);
}
