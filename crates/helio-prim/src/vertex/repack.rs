//! Whole-buffer vertex repacking.
//!
//! When any declaration entry is misaligned or uses a format the backend
//! cannot consume, the entire vertex buffer is rewritten into a tightly
//! packed, 4-byte-aligned layout. The caller's buffer is never mutated; the
//! repacked copy is what gets uploaded.

use crate::error::CompileError;
use crate::vertex::format_map::{map_element_format, ElementConversion};
use crate::vertex::{ComponentType, VertexAttribute, VertexLayoutDesc};

/// A repacked vertex stream plus the declaration describing it.
#[derive(Debug, Clone, PartialEq)]
pub struct RepackedVertices {
    pub data: Vec<u8>,
    pub stride: u32,
    /// Rewritten declaration: aligned offsets, widened types.
    pub layout: VertexLayoutDesc,
}

fn align4(v: u32) -> u32 {
    (v + 3) & !3
}

/// Whether `desc` forces a repack: any non-4-byte-aligned offset or any
/// entry that only maps to a native format through a conversion.
pub fn needs_repack(desc: &VertexLayoutDesc) -> Result<bool, CompileError> {
    for attr in &desc.attributes {
        let format = map_element_format(attr.ty, attr.components)?;
        if format.conversion != ElementConversion::None || attr.offset % 4 != 0 {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Validates that every attribute fits inside `stride` and that `data` holds
/// `count` vertices of that stride.
pub fn validate_vertex_data(
    desc: &VertexLayoutDesc,
    data: &[u8],
    stride: u32,
    count: u32,
) -> Result<(), CompileError> {
    for attr in &desc.attributes {
        let size = attr.byte_size();
        // Checked: an offset near u32::MAX must fail, not wrap.
        let fits = attr
            .offset
            .checked_add(size)
            .is_some_and(|end| end <= stride);
        if !fits {
            return Err(CompileError::AttributeOutOfStride {
                semantic: attr.semantic,
                offset: attr.offset,
                size,
                stride,
            });
        }
    }
    let expected = stride as usize * count as usize;
    if data.len() < expected {
        return Err(CompileError::VertexDataTruncated {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Rewrites `data` into an aligned layout, widening and expanding 3-wide
/// narrow attributes as dictated by the format map.
pub fn repack_vertices(
    desc: &VertexLayoutDesc,
    data: &[u8],
    stride: u32,
    count: u32,
) -> Result<RepackedVertices, CompileError> {
    // New layout: every attribute at the next 4-byte boundary, in
    // declaration order.
    let mut new_attrs = Vec::with_capacity(desc.attributes.len());
    let mut plans = Vec::with_capacity(desc.attributes.len());
    let mut cursor = 0u32;
    for attr in &desc.attributes {
        let format = map_element_format(attr.ty, attr.components)?;
        let offset = align4(cursor);
        cursor = offset + format.byte_size;

        let (ty, components) = match format.conversion {
            ElementConversion::None => (attr.ty, attr.components),
            ElementConversion::ByteToSint32x3 | ElementConversion::ShortToSint32x3 => {
                (ComponentType::Sint32, 3)
            }
            ElementConversion::UnormByteToFloat32x3
            | ElementConversion::SnormShortToFloat32x3 => (ComponentType::Float32, 3),
        };
        new_attrs.push(VertexAttribute {
            semantic: attr.semantic,
            components,
            ty,
            offset,
        });
        plans.push((*attr, offset, format));
    }
    let new_stride = align4(cursor);

    let mut out = vec![0u8; new_stride as usize * count as usize];
    for v in 0..count as usize {
        let src_vertex = &data[v * stride as usize..][..stride as usize];
        let dst_vertex = &mut out[v * new_stride as usize..][..new_stride as usize];
        for (attr, dst_offset, format) in &plans {
            let src = &src_vertex[attr.offset as usize..][..attr.byte_size() as usize];
            let dst = &mut dst_vertex[*dst_offset as usize..][..format.byte_size as usize];
            convert_element(format.conversion, src, dst);
        }
    }

    Ok(RepackedVertices {
        data: out,
        stride: new_stride,
        layout: VertexLayoutDesc::new(new_attrs),
    })
}

fn convert_element(conversion: ElementConversion, src: &[u8], dst: &mut [u8]) {
    match conversion {
        ElementConversion::None => {
            dst[..src.len()].copy_from_slice(src);
        }
        ElementConversion::ByteToSint32x3 => {
            for i in 0..3 {
                let v = src[i] as u32;
                dst[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
            }
        }
        ElementConversion::ShortToSint32x3 => {
            for i in 0..3 {
                let v = i16::from_le_bytes([src[i * 2], src[i * 2 + 1]]) as i32;
                dst[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
            }
        }
        ElementConversion::UnormByteToFloat32x3 => {
            for i in 0..3 {
                let v = f32::from(src[i]) / 255.0;
                dst[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
            }
        }
        ElementConversion::SnormShortToFloat32x3 => {
            for i in 0..3 {
                let raw = i16::from_le_bytes([src[i * 2], src[i * 2 + 1]]);
                // [-32768, 32767] maps to [-1, 1], clamped at the low end.
                let v = (f32::from(raw) / 32767.0).max(-1.0);
                dst[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::VertexSemantic;

    fn desc(attrs: Vec<VertexAttribute>) -> VertexLayoutDesc {
        VertexLayoutDesc::new(attrs)
    }

    #[test]
    fn aligned_wide_layout_needs_no_repack() {
        let d = desc(vec![
            VertexAttribute {
                semantic: VertexSemantic::Position,
                components: 3,
                ty: ComponentType::Float32,
                offset: 0,
            },
            VertexAttribute {
                semantic: VertexSemantic::Color,
                components: 4,
                ty: ComponentType::Unorm8,
                offset: 12,
            },
        ]);
        assert!(!needs_repack(&d).unwrap());
    }

    #[test]
    fn misaligned_offset_triggers_repack() {
        let d = desc(vec![VertexAttribute {
            semantic: VertexSemantic::TexCoord,
            components: 2,
            ty: ComponentType::Float32,
            offset: 6,
        }]);
        assert!(needs_repack(&d).unwrap());
    }

    #[test]
    fn widens_3_component_shorts_to_sint32() {
        let d = desc(vec![VertexAttribute {
            semantic: VertexSemantic::Position,
            components: 3,
            ty: ComponentType::Sint16,
            offset: 0,
        }]);
        let mut data = Vec::new();
        for v in [100i16, -2, 30000] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let repacked = repack_vertices(&d, &data, 6, 1).unwrap();
        assert_eq!(repacked.stride, 12);
        assert_eq!(repacked.layout.attributes[0].ty, ComponentType::Sint32);
        let values: Vec<i32> = repacked
            .data
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(values, vec![100, -2, 30000]);
    }

    #[test]
    fn expands_normalized_bytes_to_floats() {
        let d = desc(vec![VertexAttribute {
            semantic: VertexSemantic::Color,
            components: 3,
            ty: ComponentType::Unorm8,
            offset: 0,
        }]);
        let data = [0u8, 255, 128];
        let repacked = repack_vertices(&d, &data, 3, 1).unwrap();
        let values: Vec<f32> = repacked
            .data
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(values[0], 0.0);
        assert_eq!(values[1], 1.0);
        assert!((values[2] - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn snorm_short_low_end_clamps_to_minus_one() {
        let d = desc(vec![VertexAttribute {
            semantic: VertexSemantic::Position,
            components: 3,
            ty: ComponentType::Snorm16,
            offset: 0,
        }]);
        let mut data = Vec::new();
        for v in [i16::MIN, 0, i16::MAX] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let repacked = repack_vertices(&d, &data, 6, 1).unwrap();
        let values: Vec<f32> = repacked
            .data
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(values, vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn mixed_layout_realigns_every_attribute() {
        // texcoord at a misaligned offset drags the whole buffer through a
        // repack; the aligned position data must survive byte-for-byte.
        let d = desc(vec![
            VertexAttribute {
                semantic: VertexSemantic::Position,
                components: 2,
                ty: ComponentType::Float32,
                offset: 0,
            },
            VertexAttribute {
                semantic: VertexSemantic::TexCoord,
                components: 2,
                ty: ComponentType::Sint16,
                offset: 9,
            },
        ]);
        let mut data = vec![0u8; 13 * 2];
        for v in 0..2usize {
            let base = v * 13;
            data[base..base + 4].copy_from_slice(&(v as f32).to_le_bytes());
            data[base + 4..base + 8].copy_from_slice(&(v as f32 + 0.5).to_le_bytes());
            data[base + 9..base + 11].copy_from_slice(&(v as i16 + 7).to_le_bytes());
            data[base + 11..base + 13].copy_from_slice(&(v as i16 - 7).to_le_bytes());
        }
        let repacked = repack_vertices(&d, &data, 13, 2).unwrap();
        assert_eq!(repacked.stride, 12);
        assert_eq!(repacked.layout.attributes[1].offset, 8);
        for v in 0..2usize {
            let base = v * 12;
            let x = f32::from_le_bytes(repacked.data[base..base + 4].try_into().unwrap());
            let u = i16::from_le_bytes(repacked.data[base + 8..base + 10].try_into().unwrap());
            assert_eq!(x, v as f32);
            assert_eq!(u, v as i16 + 7);
        }
    }

    #[test]
    fn validate_catches_attribute_past_stride() {
        let d = desc(vec![VertexAttribute {
            semantic: VertexSemantic::Position,
            components: 4,
            ty: ComponentType::Float32,
            offset: 4,
        }]);
        let err = validate_vertex_data(&d, &[0u8; 64], 16, 4).unwrap_err();
        assert!(matches!(err, CompileError::AttributeOutOfStride { .. }));
    }

    #[test]
    fn validate_rejects_offset_near_u32_max() {
        // offset + size wraps in u32; must come back as an error, never
        // pass validation or overflow.
        let d = desc(vec![VertexAttribute {
            semantic: VertexSemantic::Position,
            components: 4,
            ty: ComponentType::Float32,
            offset: u32::MAX - 3,
        }]);
        let err = validate_vertex_data(&d, &[0u8; 64], 16, 4).unwrap_err();
        assert!(matches!(err, CompileError::AttributeOutOfStride { .. }));
    }

    #[test]
    fn validate_catches_truncated_data() {
        let d = desc(vec![VertexAttribute {
            semantic: VertexSemantic::Position,
            components: 2,
            ty: ComponentType::Float32,
            offset: 0,
        }]);
        let err = validate_vertex_data(&d, &[0u8; 15], 8, 2).unwrap_err();
        assert!(matches!(err, CompileError::VertexDataTruncated { .. }));
    }
}
