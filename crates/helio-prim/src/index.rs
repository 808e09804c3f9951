//! Index stream normalization and quad index synthesis.
//!
//! The backend has no 8-bit index format and treats `0xFFFF` in a 16-bit
//! stream as a primitive-restart sentinel. Both quirks are resolved at
//! compile time: 8-bit streams are widened to 16-bit, and any 16-bit stream
//! that contains the sentinel as a real vertex index is promoted wholesale to
//! 32-bit.

use crate::device::IndexFormat;
use crate::error::CompileError;

/// 16-bit index value reserved for primitive restart by the backend.
pub const RESTART_SENTINEL_U16: u16 = 0xFFFF;

/// Triangle-list indices for one quad ABCD: triangles ABD and DBC.
pub const SINGLE_QUAD_INDICES: [u16; 6] = [0, 1, 3, 3, 1, 2];

/// Largest vertex count for which synthesized quad-list indices stay 16-bit.
/// The highest index emitted is `vertex_count - 1`, which must stay below the
/// restart sentinel.
pub const QUAD_INDEX_U16_VERTEX_LIMIT: u32 = 65_534;

/// Element width of a caller-supplied index stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    U8,
    U16,
    U32,
}

impl IndexWidth {
    pub fn byte_size(self) -> u32 {
        match self {
            IndexWidth::U8 => 1,
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }
}

/// An owned index stream in one of the two widths the backend accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    pub fn format(&self) -> IndexFormat {
        match self {
            IndexData::U16(_) => IndexFormat::Uint16,
            IndexData::U32(_) => IndexFormat::Uint32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexData::U16(v) => v.len(),
            IndexData::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Little-endian byte view suitable for buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexData::U16(v) => bytemuck::cast_slice(v),
            IndexData::U32(v) => bytemuck::cast_slice(v),
        }
    }

    /// Index value at `i`, widened.
    pub fn get(&self, i: usize) -> u32 {
        match self {
            IndexData::U16(v) => u32::from(v[i]),
            IndexData::U32(v) => v[i],
        }
    }
}

/// Decodes `count` indices of `width` from `data` into a backend-compatible
/// stream.
///
/// 8-bit input always widens to 16-bit. 16-bit input is scanned for the
/// restart sentinel: if present the whole stream is promoted to 32-bit,
/// preserving every value, so the sentinel reaches the device as an ordinary
/// index. 32-bit input is taken as-is.
pub fn normalize_indices(
    data: &[u8],
    width: IndexWidth,
    count: u32,
) -> Result<IndexData, CompileError> {
    let expected = width.byte_size() as usize * count as usize;
    if data.len() < expected {
        return Err(CompileError::IndexDataTruncated {
            expected,
            actual: data.len(),
        });
    }
    let data = &data[..expected];

    let out = match width {
        IndexWidth::U8 => IndexData::U16(data.iter().map(|&b| u16::from(b)).collect()),
        IndexWidth::U16 => {
            let values: Vec<u16> = data
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            if values.contains(&RESTART_SENTINEL_U16) {
                IndexData::U32(values.into_iter().map(u32::from).collect())
            } else {
                IndexData::U16(values)
            }
        }
        IndexWidth::U32 => IndexData::U32(
            data.chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
    };
    Ok(out)
}

/// Synthesizes a triangle-list index stream for `quad_count` non-indexed
/// quads over `vertex_count` sequential vertices.
///
/// Width is 16-bit while every emitted index fits under the restart
/// sentinel, 32-bit otherwise.
pub fn synthesize_quad_indices(quad_count: u32, vertex_count: u32) -> IndexData {
    if vertex_count <= QUAD_INDEX_U16_VERTEX_LIMIT {
        let mut out = Vec::with_capacity(quad_count as usize * 6);
        for q in 0..quad_count {
            let base = (q * 4) as u16;
            out.extend(SINGLE_QUAD_INDICES.iter().map(|&i| base + i));
        }
        IndexData::U16(out)
    } else {
        let mut out = Vec::with_capacity(quad_count as usize * 6);
        for q in 0..quad_count {
            let base = q * 4;
            out.extend(SINGLE_QUAD_INDICES.iter().map(|&i| base + u32::from(i)));
        }
        IndexData::U32(out)
    }
}

/// Rewrites a caller index stream describing quads into triangle-list order,
/// 6 output indices per 4 input. Output width matches the (normalized) input
/// width. Trailing partial quads are dropped.
pub fn expand_quad_indices(source: &IndexData) -> IndexData {
    let quads = source.len() / 4;
    match source {
        IndexData::U16(v) => {
            let mut out = Vec::with_capacity(quads * 6);
            for q in v.chunks_exact(4) {
                out.extend(SINGLE_QUAD_INDICES.iter().map(|&i| q[i as usize]));
            }
            IndexData::U16(out)
        }
        IndexData::U32(v) => {
            let mut out = Vec::with_capacity(quads * 6);
            for q in v.chunks_exact(4) {
                out.extend(SINGLE_QUAD_INDICES.iter().map(|&i| q[i as usize]));
            }
            IndexData::U32(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn u8_indices_widen_to_u16() {
        let out = normalize_indices(&[0, 1, 255, 3], IndexWidth::U8, 4).unwrap();
        assert_eq!(out, IndexData::U16(vec![0, 1, 255, 3]));
    }

    #[test]
    fn u16_without_sentinel_is_untouched() {
        let values = [0u16, 1, 0xFFFE, 2];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let out = normalize_indices(&bytes, IndexWidth::U16, 4).unwrap();
        assert_eq!(out, IndexData::U16(values.to_vec()));
    }

    #[test]
    fn sentinel_promotes_whole_stream_to_u32() {
        let values = [0u16, 0xFFFF, 2, 3];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let out = normalize_indices(&bytes, IndexWidth::U16, 4).unwrap();
        assert_eq!(out, IndexData::U32(vec![0, 0xFFFF, 2, 3]));
    }

    #[test]
    fn u32_passes_through() {
        let values = [7u32, 0xFFFF, 0x1_0000];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let out = normalize_indices(&bytes, IndexWidth::U32, 3).unwrap();
        assert_eq!(out, IndexData::U32(values.to_vec()));
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let err = normalize_indices(&[0u8; 7], IndexWidth::U32, 2).unwrap_err();
        assert!(matches!(err, CompileError::IndexDataTruncated { .. }));
    }

    #[test]
    fn count_bounds_the_scan() {
        // Bytes past `count` elements are ignored, sentinel included.
        let values = [1u16, 2, 0xFFFF];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let out = normalize_indices(&bytes, IndexWidth::U16, 2).unwrap();
        assert_eq!(out, IndexData::U16(vec![1, 2]));
    }

    #[test]
    fn synthesized_quad_indices_follow_the_lowering_pattern() {
        let out = synthesize_quad_indices(2, 8);
        assert_eq!(
            out,
            IndexData::U16(vec![0, 1, 3, 3, 1, 2, 4, 5, 7, 7, 5, 6])
        );
    }

    #[test]
    fn synthesized_width_tracks_vertex_count() {
        assert_eq!(
            synthesize_quad_indices(1, QUAD_INDEX_U16_VERTEX_LIMIT).format(),
            IndexFormat::Uint16
        );
        assert_eq!(
            synthesize_quad_indices(1, QUAD_INDEX_U16_VERTEX_LIMIT + 1).format(),
            IndexFormat::Uint32
        );
    }

    #[test]
    fn synthesized_u16_indices_never_hit_the_sentinel() {
        let quads = QUAD_INDEX_U16_VERTEX_LIMIT / 4;
        let out = synthesize_quad_indices(quads, QUAD_INDEX_U16_VERTEX_LIMIT);
        match out {
            IndexData::U16(v) => assert!(v.iter().all(|&i| i < RESTART_SENTINEL_U16)),
            IndexData::U32(_) => panic!("expected 16-bit indices"),
        }
    }

    #[test]
    fn caller_quad_indices_are_reordered_not_renumbered() {
        let source = IndexData::U16(vec![10, 11, 12, 13, 20, 21, 22, 23]);
        let out = expand_quad_indices(&source);
        assert_eq!(
            out,
            IndexData::U16(vec![10, 11, 13, 13, 11, 12, 20, 21, 23, 23, 21, 22])
        );
    }

    #[test]
    fn partial_trailing_quad_is_dropped() {
        let source = IndexData::U32(vec![0, 1, 2, 3, 4, 5]);
        let out = expand_quad_indices(&source);
        assert_eq!(out, IndexData::U32(vec![0, 1, 3, 3, 1, 2]));
    }

    #[test]
    fn single_quad_pattern_matches_the_shared_buffer() {
        assert_eq!(
            synthesize_quad_indices(1, 4),
            IndexData::U16(SINGLE_QUAD_INDICES.to_vec())
        );
    }
}
