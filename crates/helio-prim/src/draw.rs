//! Draw submission and per-primitive teardown.
//!
//! Ranges are expressed in source elements, the units the caller compiled
//! with; lowered topologies convert them to device elements here. Both entry
//! points treat a compiled primitive from an older device generation as a
//! logged no-op, never passing its handles to the device.

use tracing::{debug, warn};

use crate::compile::CompiledPrimitive;
use crate::device::{DrawCall, RenderDevice};
use crate::topology::SourceExpansion;

/// Submits `prim` over a source-element range. `first` is the starting
/// source element; `count` of `None` means the remainder of the primitive.
///
/// Ranges that don't land on a whole lowered unit (4 elements per quad for a
/// quad list, 2 per quad-strip step) are rounded down with a warning.
/// Ranges that resolve to zero device elements are skipped silently.
pub fn draw_primitive(
    device: &dyn RenderDevice,
    prim: &CompiledPrimitive,
    first: u32,
    count: Option<u32>,
) {
    if device.generation() != prim.generation {
        debug!(
            held = prim.generation,
            current = device.generation(),
            "skipping draw of stale primitive"
        );
        return;
    }

    let available = prim.source_element_count;
    let first = first.min(available);
    let count = count.unwrap_or(available - first).min(available - first);

    let (first_element, element_count) = match prim.expansion {
        SourceExpansion::None => (first, count),
        SourceExpansion::QuadList => {
            if first % 4 != 0 {
                warn!(first, "quad list draw start not on a quad boundary, rounding down");
            }
            if count % 4 != 0 {
                warn!(count, "quad list draw count not a whole number of quads, rounding down");
            }
            (first / 4 * 6, count / 4 * 6)
        }
        SourceExpansion::QuadStrip => {
            if first % 2 != 0 {
                warn!(first, "quad strip draw start not on a quad boundary, rounding down");
            }
            if count % 2 != 0 {
                warn!(count, "quad strip draw count not a whole number of quads, rounding down");
            }
            let count = count & !1;
            (first & !1, if count < 4 { 0 } else { count })
        }
    };
    if element_count == 0 {
        return;
    }

    device.draw(&DrawCall {
        topology: prim.topology,
        layout: prim.layout,
        vertex_buffer: prim.vertex_buffer,
        vertex_stride: prim.vertex_stride,
        first_element,
        element_count,
        index_buffer: prim.index,
    });
}

/// Releases the per-primitive device resources: the vertex buffer and, when
/// owned, the index buffer. The layout object stays with the cache, and the
/// shared single-quad index buffer stays with the context.
pub fn destroy_primitive(device: &dyn RenderDevice, prim: CompiledPrimitive) {
    if device.generation() != prim.generation {
        debug!(
            held = prim.generation,
            current = device.generation(),
            "dropping stale primitive without device calls"
        );
        return;
    }
    if let Some((buffer, _)) = prim.index {
        if !prim.shared_index {
            device.destroy_buffer(buffer);
        }
    }
    device.destroy_buffer(prim.vertex_buffer);
}
