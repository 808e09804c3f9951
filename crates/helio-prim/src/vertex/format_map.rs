//! Mapping from declaration entries to native per-attribute formats.
//!
//! The backend has no 3-component 8-bit or 16-bit vertex formats and
//! requires attribute offsets to be 4-byte aligned. Entries that hit either
//! limitation are flagged with a conversion; the compiler then repacks the
//! whole vertex buffer (see [`super::repack`]).

use crate::error::CompileError;
use crate::vertex::{ComponentType, VertexAttribute};

/// Native vertex formats understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeFormat {
    Uint8,
    Uint8x2,
    Uint8x4,
    Unorm8,
    Unorm8x2,
    Unorm8x4,
    Sint16,
    Sint16x2,
    Sint16x4,
    Snorm16,
    Snorm16x2,
    Snorm16x4,
    Sint32,
    Sint32x2,
    Sint32x3,
    Sint32x4,
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
}

/// CPU-side rewrite required to express an attribute in a native format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementConversion {
    None,
    /// Widen a 3-component unsigned byte vector to 32-bit integers.
    ByteToSint32x3,
    /// Widen a 3-component signed short vector to 32-bit integers.
    ShortToSint32x3,
    /// Expand a 3-component normalized unsigned byte vector to floats.
    UnormByteToFloat32x3,
    /// Expand a 3-component normalized signed short vector to floats.
    SnormShortToFloat32x3,
}

/// How a declaration entry is represented natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementFormat {
    pub format: NativeFormat,
    /// Byte size of the attribute *after* any conversion.
    pub byte_size: u32,
    pub conversion: ElementConversion,
}

impl ElementFormat {
    fn direct(format: NativeFormat, byte_size: u32) -> Self {
        Self {
            format,
            byte_size,
            conversion: ElementConversion::None,
        }
    }
}

/// Maps `(ty, components)` to a native format, possibly via a conversion.
///
/// Component counts outside 1..=4 are a hard compile failure.
pub fn map_element_format(ty: ComponentType, components: u8) -> Result<ElementFormat, CompileError> {
    let unsupported = || CompileError::UnsupportedFormat { ty, components };

    let out = match (ty, components) {
        (ComponentType::Uint8, 1) => ElementFormat::direct(NativeFormat::Uint8, 1),
        (ComponentType::Uint8, 2) => ElementFormat::direct(NativeFormat::Uint8x2, 2),
        (ComponentType::Uint8, 3) => ElementFormat {
            format: NativeFormat::Sint32x3,
            byte_size: 12,
            conversion: ElementConversion::ByteToSint32x3,
        },
        (ComponentType::Uint8, 4) => ElementFormat::direct(NativeFormat::Uint8x4, 4),

        (ComponentType::Unorm8, 1) => ElementFormat::direct(NativeFormat::Unorm8, 1),
        (ComponentType::Unorm8, 2) => ElementFormat::direct(NativeFormat::Unorm8x2, 2),
        (ComponentType::Unorm8, 3) => ElementFormat {
            format: NativeFormat::Float32x3,
            byte_size: 12,
            conversion: ElementConversion::UnormByteToFloat32x3,
        },
        (ComponentType::Unorm8, 4) => ElementFormat::direct(NativeFormat::Unorm8x4, 4),

        (ComponentType::Sint16, 1) => ElementFormat::direct(NativeFormat::Sint16, 2),
        (ComponentType::Sint16, 2) => ElementFormat::direct(NativeFormat::Sint16x2, 4),
        (ComponentType::Sint16, 3) => ElementFormat {
            format: NativeFormat::Sint32x3,
            byte_size: 12,
            conversion: ElementConversion::ShortToSint32x3,
        },
        (ComponentType::Sint16, 4) => ElementFormat::direct(NativeFormat::Sint16x4, 8),

        (ComponentType::Snorm16, 1) => ElementFormat::direct(NativeFormat::Snorm16, 2),
        (ComponentType::Snorm16, 2) => ElementFormat::direct(NativeFormat::Snorm16x2, 4),
        (ComponentType::Snorm16, 3) => ElementFormat {
            format: NativeFormat::Float32x3,
            byte_size: 12,
            conversion: ElementConversion::SnormShortToFloat32x3,
        },
        (ComponentType::Snorm16, 4) => ElementFormat::direct(NativeFormat::Snorm16x4, 8),

        (ComponentType::Sint32, 1) => ElementFormat::direct(NativeFormat::Sint32, 4),
        (ComponentType::Sint32, 2) => ElementFormat::direct(NativeFormat::Sint32x2, 8),
        (ComponentType::Sint32, 3) => ElementFormat::direct(NativeFormat::Sint32x3, 12),
        (ComponentType::Sint32, 4) => ElementFormat::direct(NativeFormat::Sint32x4, 16),

        (ComponentType::Float32, 1) => ElementFormat::direct(NativeFormat::Float32, 4),
        (ComponentType::Float32, 2) => ElementFormat::direct(NativeFormat::Float32x2, 8),
        (ComponentType::Float32, 3) => ElementFormat::direct(NativeFormat::Float32x3, 12),
        (ComponentType::Float32, 4) => ElementFormat::direct(NativeFormat::Float32x4, 16),

        _ => return Err(unsupported()),
    };

    Ok(out)
}

/// Register component class declared for an attribute in the synthesized
/// shader module's input signature.
pub fn register_component_class(ty: ComponentType) -> helio_dxbc::RegisterComponentClass {
    match ty {
        ComponentType::Uint8 => helio_dxbc::RegisterComponentClass::Uint32,
        ComponentType::Sint16 | ComponentType::Sint32 => {
            helio_dxbc::RegisterComponentClass::Sint32
        }
        ComponentType::Unorm8 | ComponentType::Snorm16 | ComponentType::Float32 => {
            helio_dxbc::RegisterComponentClass::Float32
        }
    }
}

/// Whether `attr` can be consumed in place, without repacking.
pub fn attribute_is_native(attr: &VertexAttribute) -> Result<bool, CompileError> {
    let format = map_element_format(attr.ty, attr.components)?;
    Ok(format.conversion == ElementConversion::None && attr.offset % 4 == 0)
}
