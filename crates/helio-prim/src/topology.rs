//! Topology translation: source primitive topology to what the backend can
//! natively rasterize, plus the expansion step needed when it can't.

/// Primitive topologies accepted from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
    /// Independent quads, four vertices each. Lowered to a triangle list.
    QuadList,
    /// Quad strip, two new vertices per quad. Lowered to a triangle strip.
    QuadStrip,
}

/// Topologies the backend rasterizes directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

/// Index-stream rewrite applied while compiling a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceExpansion {
    /// Source indices (if any) pass through untouched.
    None,
    /// Each source quad becomes two triangles via a synthesized index list.
    QuadList,
    /// Quad strip reinterpreted as a triangle strip over the same vertices.
    QuadStrip,
}

/// Result of translating a source topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopologyTranslation {
    pub native: NativeTopology,
    pub expansion: SourceExpansion,
}

/// Translates a source topology to its native form. Total: every source
/// topology has a translation.
pub fn translate_topology(topology: PrimitiveTopology) -> TopologyTranslation {
    let (native, expansion) = match topology {
        PrimitiveTopology::PointList => (NativeTopology::PointList, SourceExpansion::None),
        PrimitiveTopology::LineList => (NativeTopology::LineList, SourceExpansion::None),
        PrimitiveTopology::LineStrip => (NativeTopology::LineStrip, SourceExpansion::None),
        PrimitiveTopology::TriangleList => (NativeTopology::TriangleList, SourceExpansion::None),
        PrimitiveTopology::TriangleStrip => (NativeTopology::TriangleStrip, SourceExpansion::None),
        PrimitiveTopology::QuadList => (NativeTopology::TriangleList, SourceExpansion::QuadList),
        PrimitiveTopology::QuadStrip => (NativeTopology::TriangleStrip, SourceExpansion::QuadStrip),
    };
    TopologyTranslation { native, expansion }
}

/// Number of elements the device will consume for `element_count` source
/// elements under `expansion`.
///
/// Counts too small to form a primitive yield 0 rather than an error; the
/// draw is simply skipped.
pub fn expanded_element_count(expansion: SourceExpansion, element_count: u32) -> u32 {
    match expansion {
        SourceExpansion::None => element_count,
        // 4 source vertices per quad, 6 indices out. Trailing partial quads
        // are dropped. Saturating: counts near u32::MAX must not wrap.
        SourceExpansion::QuadList => (element_count / 4).saturating_mul(6),
        // A quad strip of 2k+2 vertices is a triangle strip over the same
        // vertices; an odd trailing vertex is dropped.
        SourceExpansion::QuadStrip => {
            if element_count < 4 {
                0
            } else {
                element_count & !1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_topologies_pass_through() {
        for (src, native) in [
            (PrimitiveTopology::PointList, NativeTopology::PointList),
            (PrimitiveTopology::LineList, NativeTopology::LineList),
            (PrimitiveTopology::LineStrip, NativeTopology::LineStrip),
            (PrimitiveTopology::TriangleList, NativeTopology::TriangleList),
            (PrimitiveTopology::TriangleStrip, NativeTopology::TriangleStrip),
        ] {
            let t = translate_topology(src);
            assert_eq!(t.native, native);
            assert_eq!(t.expansion, SourceExpansion::None);
        }
    }

    #[test]
    fn quads_lower_to_triangles() {
        let list = translate_topology(PrimitiveTopology::QuadList);
        assert_eq!(list.native, NativeTopology::TriangleList);
        assert_eq!(list.expansion, SourceExpansion::QuadList);

        let strip = translate_topology(PrimitiveTopology::QuadStrip);
        assert_eq!(strip.native, NativeTopology::TriangleStrip);
        assert_eq!(strip.expansion, SourceExpansion::QuadStrip);
    }

    #[test]
    fn quad_list_counts() {
        assert_eq!(expanded_element_count(SourceExpansion::QuadList, 0), 0);
        assert_eq!(expanded_element_count(SourceExpansion::QuadList, 3), 0);
        assert_eq!(expanded_element_count(SourceExpansion::QuadList, 4), 6);
        assert_eq!(expanded_element_count(SourceExpansion::QuadList, 7), 6);
        assert_eq!(expanded_element_count(SourceExpansion::QuadList, 8), 12);
    }

    #[test]
    fn quad_list_count_saturates_instead_of_wrapping() {
        assert_eq!(
            expanded_element_count(SourceExpansion::QuadList, u32::MAX),
            u32::MAX
        );
    }

    #[test]
    fn quad_strip_counts() {
        assert_eq!(expanded_element_count(SourceExpansion::QuadStrip, 0), 0);
        assert_eq!(expanded_element_count(SourceExpansion::QuadStrip, 3), 0);
        assert_eq!(expanded_element_count(SourceExpansion::QuadStrip, 4), 4);
        assert_eq!(expanded_element_count(SourceExpansion::QuadStrip, 5), 4);
        assert_eq!(expanded_element_count(SourceExpansion::QuadStrip, 6), 6);
    }
}
