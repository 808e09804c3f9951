//! Primitive compilation: caller geometry in, device-ready draw state out.
//!
//! One `compile_primitive` call resolves everything the backend cannot do at
//! draw time: quad topologies are lowered, index streams are normalized
//! around the restart sentinel, misaligned or unsupported vertex layouts are
//! repacked, and the vertex-layout object is resolved through the cache.
//! Failure anywhere unwinds every per-call resource before returning.

use tracing::debug;

use crate::context::GraphicsResourceContext;
use crate::device::{BufferHandle, IndexFormat, LayoutHandle, LifetimeHint, RenderDevice};
use crate::error::CompileError;
use crate::index::{
    expand_quad_indices, normalize_indices, synthesize_quad_indices, IndexData, IndexWidth,
};
use crate::topology::{
    expanded_element_count, translate_topology, NativeTopology, PrimitiveTopology, SourceExpansion,
};
use crate::vertex::repack::{needs_repack, repack_vertices, validate_vertex_data};
use crate::vertex::VertexLayoutDesc;

/// A caller-supplied index stream.
#[derive(Debug, Clone, Copy)]
pub struct IndexSlice<'a> {
    pub data: &'a [u8],
    pub width: IndexWidth,
    pub count: u32,
}

/// Everything needed to compile one primitive batch.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveDesc<'a> {
    pub topology: PrimitiveTopology,
    pub vertex_data: &'a [u8],
    pub vertex_stride: u32,
    pub vertex_count: u32,
    pub layout: &'a VertexLayoutDesc,
    pub indices: Option<IndexSlice<'a>>,
    pub hint: LifetimeHint,
}

/// A compiled primitive, ready for [`crate::draw::draw_primitive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPrimitive {
    /// Device generation this primitive's handles belong to.
    pub generation: u64,
    pub topology: NativeTopology,
    pub expansion: SourceExpansion,
    pub vertex_buffer: BufferHandle,
    pub vertex_stride: u32,
    pub layout: LayoutHandle,
    pub index: Option<(BufferHandle, IndexFormat)>,
    /// The index buffer is the context's shared single-quad buffer and must
    /// not be destroyed with this primitive.
    pub shared_index: bool,
    /// Total elements the device consumes when the whole primitive is drawn.
    pub render_count: u32,
    /// Element count as the caller supplied it, before any expansion.
    pub source_element_count: u32,
}

/// Index stream resolved for a primitive: nothing, the shared single-quad
/// buffer, or an owned stream to upload.
enum ResolvedIndices {
    None,
    Shared,
    Owned(IndexData),
}

pub fn compile_primitive(
    device: &dyn RenderDevice,
    ctx: &mut GraphicsResourceContext,
    desc: &PrimitiveDesc<'_>,
) -> Result<CompiledPrimitive, CompileError> {
    desc.layout.validate(device.max_vertex_attributes())?;
    validate_vertex_data(desc.layout, desc.vertex_data, desc.vertex_stride, desc.vertex_count)?;

    let translation = translate_topology(desc.topology);

    let source_indices = match desc.indices {
        Some(slice) => Some(normalize_indices(slice.data, slice.width, slice.count)?),
        None => None,
    };
    let source_element_count = match desc.indices {
        Some(slice) => slice.count,
        None => desc.vertex_count,
    };

    let resolved = resolve_indices(translation.expansion, source_indices, desc.vertex_count);

    // The shared buffer is context-owned; fetch it before any per-call
    // resource exists so a failure here has nothing to unwind.
    let shared_handle = match &resolved {
        ResolvedIndices::Shared => Some(ctx.shared_quad_index(device)?),
        _ => None,
    };

    let render_count = match &resolved {
        ResolvedIndices::None => expanded_element_count(translation.expansion, source_element_count),
        ResolvedIndices::Shared => 6,
        // A quad-list stream is already expanded; for everything else the
        // stream length still goes through expansion accounting (quad strips
        // round an odd count down).
        ResolvedIndices::Owned(data) if translation.expansion == SourceExpansion::QuadList => {
            data.len() as u32
        }
        ResolvedIndices::Owned(data) => {
            expanded_element_count(translation.expansion, data.len() as u32)
        }
    };

    // Repack rewrites the declaration too; the cache is keyed by whichever
    // declaration actually describes the uploaded buffer.
    let repacked = if needs_repack(desc.layout)? {
        Some(repack_vertices(
            desc.layout,
            desc.vertex_data,
            desc.vertex_stride,
            desc.vertex_count,
        )?)
    } else {
        None
    };
    let (upload, vertex_stride, layout_desc) = match &repacked {
        Some(r) => (r.data.as_slice(), r.stride, &r.layout),
        None => (
            &desc.vertex_data[..desc.vertex_stride as usize * desc.vertex_count as usize],
            desc.vertex_stride,
            desc.layout,
        ),
    };

    let vertex_buffer = device.create_vertex_buffer(upload, desc.hint)?;
    let (layout, index) =
        finish_layout(device, ctx, layout_desc, vertex_buffer, &resolved, desc.hint)?;

    let index = match (&resolved, shared_handle) {
        (ResolvedIndices::Shared, Some(handle)) => Some((handle, IndexFormat::Uint16)),
        _ => index,
    };

    debug!(
        topology = ?translation.native,
        render_count,
        indexed = index.is_some(),
        "primitive compiled"
    );

    Ok(CompiledPrimitive {
        generation: device.generation(),
        topology: translation.native,
        expansion: translation.expansion,
        vertex_buffer,
        vertex_stride,
        layout,
        index,
        shared_index: matches!(resolved, ResolvedIndices::Shared),
        render_count,
        source_element_count,
    })
}

fn resolve_indices(
    expansion: SourceExpansion,
    source: Option<IndexData>,
    vertex_count: u32,
) -> ResolvedIndices {
    match (expansion, source) {
        // Pass-through topologies keep the caller's (normalized) stream.
        (SourceExpansion::None, Some(data)) => ResolvedIndices::Owned(data),
        (SourceExpansion::None, None) => ResolvedIndices::None,
        // A quad strip is drawn as a triangle strip over the same elements;
        // no index rewrite, count rounding happens at draw accounting.
        (SourceExpansion::QuadStrip, Some(data)) => ResolvedIndices::Owned(data),
        (SourceExpansion::QuadStrip, None) => ResolvedIndices::None,
        (SourceExpansion::QuadList, Some(data)) => {
            let expanded = expand_quad_indices(&data);
            if expanded.is_empty() {
                ResolvedIndices::None
            } else {
                ResolvedIndices::Owned(expanded)
            }
        }
        (SourceExpansion::QuadList, None) => {
            let quads = vertex_count / 4;
            match quads {
                0 => ResolvedIndices::None,
                1 => ResolvedIndices::Shared,
                _ => ResolvedIndices::Owned(synthesize_quad_indices(quads, vertex_count)),
            }
        }
    }
}

/// Uploads the owned index stream (if any) and resolves the layout through
/// the cache, unwinding `vertex_buffer` and the index buffer on failure.
#[allow(clippy::type_complexity)]
fn finish_layout(
    device: &dyn RenderDevice,
    ctx: &mut GraphicsResourceContext,
    layout_desc: &VertexLayoutDesc,
    vertex_buffer: BufferHandle,
    resolved: &ResolvedIndices,
    hint: LifetimeHint,
) -> Result<(LayoutHandle, Option<(BufferHandle, IndexFormat)>), CompileError> {
    let index = match resolved {
        ResolvedIndices::Owned(data) => {
            let format = data.format();
            match device.create_index_buffer(data.as_bytes(), format, hint) {
                Ok(handle) => Some((handle, format)),
                Err(err) => {
                    device.destroy_buffer(vertex_buffer);
                    return Err(err.into());
                }
            }
        }
        ResolvedIndices::None | ResolvedIndices::Shared => None,
    };

    match ctx.layout(device, layout_desc) {
        Ok(layout) => Ok((layout, index)),
        Err(err) => {
            if let Some((handle, _)) = index {
                device.destroy_buffer(handle);
            }
            device.destroy_buffer(vertex_buffer);
            Err(err)
        }
    }
}
