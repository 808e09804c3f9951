//! Vertex declarations: the caller-facing description of one vertex's
//! attribute layout, independent of any backend format.

pub mod format_map;
pub mod repack;

use core::hash::{Hash, Hasher};

use crate::error::CompileError;

/// Hard cap on attributes per declaration, independent of the device limit.
pub const MAX_VERTEX_ATTRIBUTES: usize = 32;

/// Semantic role of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    Position,
    TexCoord,
    Color,
    /// A user-defined input, distinguished by its index.
    Generic(u32),
}

impl VertexSemantic {
    /// Semantic name as declared in synthesized shader modules.
    pub fn name(self) -> &'static str {
        match self {
            VertexSemantic::Position => "POSITION",
            VertexSemantic::TexCoord => "TEXCOORD",
            VertexSemantic::Color => "COLOR",
            VertexSemantic::Generic(_) => "ATTR",
        }
    }

    pub fn index(self) -> u32 {
        match self {
            VertexSemantic::Generic(n) => n,
            _ => 0,
        }
    }
}

/// Scalar type of a vertex attribute's components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Uint8,
    Sint16,
    Sint32,
    /// Unsigned byte mapped to `[0, 1]` in the shader.
    Unorm8,
    /// Signed short mapped to `[-1, 1]` in the shader.
    Snorm16,
    Float32,
}

impl ComponentType {
    pub fn byte_size(self) -> u32 {
        match self {
            ComponentType::Uint8 | ComponentType::Unorm8 => 1,
            ComponentType::Sint16 | ComponentType::Snorm16 => 2,
            ComponentType::Sint32 | ComponentType::Float32 => 4,
        }
    }

    pub fn is_normalized(self) -> bool {
        matches!(self, ComponentType::Unorm8 | ComponentType::Snorm16)
    }
}

/// One entry of a vertex declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub semantic: VertexSemantic,
    /// Number of components, 1..=4.
    pub components: u8,
    pub ty: ComponentType,
    /// Byte offset of this attribute within a vertex.
    pub offset: u32,
}

impl VertexAttribute {
    /// Source byte size of this attribute.
    pub fn byte_size(&self) -> u32 {
        self.ty.byte_size() * u32::from(self.components)
    }
}

/// An ordered vertex declaration. Order matters: two declarations with the
/// same entries in a different order describe different layouts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexLayoutDesc {
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayoutDesc {
    pub fn new(attributes: Vec<VertexAttribute>) -> Self {
        Self { attributes }
    }

    /// Validates entry count and per-entry component counts against the
    /// device limit.
    pub fn validate(&self, device_attribute_limit: u32) -> Result<(), CompileError> {
        let limit = device_attribute_limit.min(MAX_VERTEX_ATTRIBUTES as u32);
        if self.attributes.len() > limit as usize {
            return Err(CompileError::TooManyAttributes {
                count: self.attributes.len(),
                limit,
            });
        }
        for attr in &self.attributes {
            if attr.components < 1 || attr.components > 4 {
                return Err(CompileError::UnsupportedFormat {
                    ty: attr.ty,
                    components: attr.components,
                });
            }
        }
        Ok(())
    }
}

/// Order-sensitive rolling hash over each entry's semantic, component type,
/// and offset.
///
/// Component counts are deliberately left out; declarations differing only
/// in component count collide on hash and are disambiguated by the full
/// equality check (which compares every field, in order).
impl Hash for VertexLayoutDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.attributes.len());
        for attr in &self.attributes {
            attr.semantic.hash(state);
            attr.ty.hash(state);
            state.write_u32(attr.offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(desc: &VertexLayoutDesc) -> u64 {
        let mut h = DefaultHasher::new();
        desc.hash(&mut h);
        h.finish()
    }

    fn position_f32(components: u8) -> VertexAttribute {
        VertexAttribute {
            semantic: VertexSemantic::Position,
            components,
            ty: ComponentType::Float32,
            offset: 0,
        }
    }

    #[test]
    fn equal_descriptors_hash_equal() {
        let a = VertexLayoutDesc::new(vec![position_f32(3)]);
        let b = VertexLayoutDesc::new(vec![position_f32(3)]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn component_count_collides_on_hash_but_not_equality() {
        let a = VertexLayoutDesc::new(vec![position_f32(3)]);
        let b = VertexLayoutDesc::new(vec![position_f32(4)]);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn entry_order_changes_hash_input() {
        let pos = position_f32(3);
        let color = VertexAttribute {
            semantic: VertexSemantic::Color,
            components: 4,
            ty: ComponentType::Unorm8,
            offset: 12,
        };
        let a = VertexLayoutDesc::new(vec![pos, color]);
        let b = VertexLayoutDesc::new(vec![color, pos]);
        assert_ne!(a, b);
    }

    #[test]
    fn validate_rejects_too_many_attributes() {
        let desc = VertexLayoutDesc::new(vec![position_f32(3); 17]);
        assert!(matches!(
            desc.validate(16),
            Err(CompileError::TooManyAttributes { count: 17, limit: 16 })
        ));
    }

    #[test]
    fn validate_rejects_bad_component_count() {
        let desc = VertexLayoutDesc::new(vec![position_f32(5)]);
        assert!(matches!(
            desc.validate(32),
            Err(CompileError::UnsupportedFormat { components: 5, .. })
        ));
    }
}
