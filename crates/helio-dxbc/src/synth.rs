//! Placeholder vertex-shader module synthesis.
//!
//! Builds the smallest container the backend's layout-creation call accepts:
//! a five-chunk module whose `ISGN` chunk declares exactly the caller's
//! vertex inputs. No shader ever executes; the backend only cross-checks the
//! declared signature against the element descriptions it is given, then
//! verifies the header digest.

use crate::checksum::container_checksum;
use crate::error::DxbcError;
use crate::fourcc::FourCC;
use crate::writer::ContainerWriter;

pub const CHUNK_RDEF: FourCC = FourCC(*b"RDEF");
pub const CHUNK_ISGN: FourCC = FourCC(*b"ISGN");
pub const CHUNK_OSGN: FourCC = FourCC(*b"OSGN");
pub const CHUNK_SHDR: FourCC = FourCC(*b"SHDR");
pub const CHUNK_STAT: FourCC = FourCC(*b"STAT");

pub(crate) const CONTAINER_MAGIC: FourCC = FourCC(*b"DXBC");
pub(crate) const HEADER_LEN: usize = 4 + 16 + 4 + 4 + 4;

const CHUNK_COUNT: u32 = 5;
/// Value of the reserved header word. Always 1 in modules produced by the
/// reference toolchain.
const HEADER_RESERVED: u32 = 1;
/// `vs_4_0` version token: program type 1 (vertex), model 4.0.
const SHDR_VERSION_TOKEN: u32 = 0x0001_0040;
/// `ret`, instruction length 1.
const SHDR_RET_TOKEN: u32 = 0x0100_003e;
/// Dword count of the statistics chunk emitted by the reference toolchain.
const STAT_DWORDS: usize = 37;

const SIGNATURE_RECORD_LEN: usize = 24;

const CREATOR: &str = "helio layout synthesizer";

/// Register component class stored in signature records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RegisterComponentClass {
    Uint32 = 1,
    Sint32 = 2,
    Float32 = 3,
}

/// One declared vertex-shader input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSignatureElement<'a> {
    /// Semantic name, e.g. `"POSITION"` or `"TEXCOORD"`.
    pub semantic_name: &'a str,
    pub semantic_index: u32,
    /// Input register assigned to this element.
    pub register: u32,
    /// Number of vector components, 1..=4.
    pub component_count: u8,
    pub component_class: RegisterComponentClass,
}

impl InputSignatureElement<'_> {
    fn component_mask(&self) -> u8 {
        (1u8 << self.component_count) - 1
    }
}

/// Synthesizes a complete vertex-shader container declaring `inputs`.
///
/// Output is deterministic: identical input lists produce byte-identical
/// modules, including the embedded digest.
pub fn synthesize_vertex_module(inputs: &[InputSignatureElement]) -> Result<Vec<u8>, DxbcError> {
    for (i, input) in inputs.iter().enumerate() {
        if input.semantic_name.is_empty() {
            return Err(DxbcError::invalid_input(format!(
                "input {i} has an empty semantic name"
            )));
        }
        if input.component_count < 1 || input.component_count > 4 {
            return Err(DxbcError::invalid_input(format!(
                "input {i} ({}) has component count {}, expected 1..=4",
                input.semantic_name, input.component_count
            )));
        }
    }

    let mut w = ContainerWriter::new();

    w.write_fourcc(CONTAINER_MAGIC);
    let checksum_at = w.len();
    w.write_bytes(&[0u8; 16]);
    w.write_u32(HEADER_RESERVED);
    let total_size_slot = w.placeholder_u32();
    w.write_u32(CHUNK_COUNT);
    let mut offset_slots = Vec::with_capacity(CHUNK_COUNT as usize);
    for _ in 0..CHUNK_COUNT {
        offset_slots.push(w.placeholder_u32());
    }
    debug_assert_eq!(w.len(), HEADER_LEN + 4 * CHUNK_COUNT as usize);

    let mut chunk_offsets = Vec::with_capacity(CHUNK_COUNT as usize);

    // RDEF: no constant buffers, no bound resources; just the fixed header
    // and the creator string.
    {
        let (offset, chunk) = w.begin_chunk(CHUNK_RDEF);
        chunk_offsets.push(offset);
        const RDEF_HEADER_LEN: u32 = 28;
        w.write_u32(0); // constant buffer count
        w.write_u32(RDEF_HEADER_LEN); // constant buffer offset (empty table)
        w.write_u32(0); // bound resource count
        w.write_u32(RDEF_HEADER_LEN); // bound resource offset (empty table)
        w.write_u8(0); // target minor version
        w.write_u8(4); // target major version
        w.write_u16(0xfffe); // program type: vertex
        w.write_u32(0); // flags
        w.write_u32(RDEF_HEADER_LEN); // creator string offset
        w.write_cstr(CREATOR);
        w.align4();
        w.end_chunk(chunk);
    }

    // ISGN: one record per input plus the shared semantic-name table.
    {
        let (offset, chunk) = w.begin_chunk(CHUNK_ISGN);
        chunk_offsets.push(offset);
        write_signature_payload(
            &mut w,
            inputs.iter().map(|input| SignatureFields {
                semantic_name: input.semantic_name,
                semantic_index: input.semantic_index,
                system_value: 0,
                component_type: input.component_class as u32,
                register: input.register,
                mask: input.component_mask(),
                read_write_mask: input.component_mask(),
            }),
            inputs.len(),
        );
        w.end_chunk(chunk);
    }

    // OSGN: the placeholder shader nominally writes a single float4
    // position, which keeps the module a well-formed vertex shader.
    {
        let (offset, chunk) = w.begin_chunk(CHUNK_OSGN);
        chunk_offsets.push(offset);
        write_signature_payload(
            &mut w,
            core::iter::once(SignatureFields {
                semantic_name: "SV_Position",
                semantic_index: 0,
                system_value: 1, // position
                component_type: RegisterComponentClass::Float32 as u32,
                register: 0,
                mask: 0xf,
                read_write_mask: 0,
            }),
            1,
        );
        w.end_chunk(chunk);
    }

    // SHDR: version token, total dword count, `ret`.
    {
        let (offset, chunk) = w.begin_chunk(CHUNK_SHDR);
        chunk_offsets.push(offset);
        w.write_u32(SHDR_VERSION_TOKEN);
        w.write_u32(3);
        w.write_u32(SHDR_RET_TOKEN);
        w.end_chunk(chunk);
    }

    // STAT: zeroed counters except the instruction count (the lone `ret`).
    {
        let (offset, chunk) = w.begin_chunk(CHUNK_STAT);
        chunk_offsets.push(offset);
        w.write_u32(1);
        for _ in 1..STAT_DWORDS {
            w.write_u32(0);
        }
        w.end_chunk(chunk);
    }

    for (slot, offset) in offset_slots.into_iter().zip(chunk_offsets) {
        w.patch_u32(slot, offset);
    }
    let total = w.len() as u32;
    w.patch_u32(total_size_slot, total);

    let digest = container_checksum(w.bytes());
    w.patch_bytes(checksum_at, &digest);

    Ok(w.into_bytes())
}

struct SignatureFields<'a> {
    semantic_name: &'a str,
    semantic_index: u32,
    system_value: u32,
    component_type: u32,
    register: u32,
    mask: u8,
    read_write_mask: u8,
}

/// Writes a signature chunk payload: record count, table offset, the fixed
/// 24-byte records, then the NUL-terminated name table (names deduplicated
/// by first occurrence).
fn write_signature_payload<'a>(
    w: &mut ContainerWriter,
    fields: impl Iterator<Item = SignatureFields<'a>>,
    count: usize,
) {
    const TABLE_OFFSET: usize = 8;

    w.write_u32(count as u32);
    w.write_u32(TABLE_OFFSET as u32);

    // Lay out the name table up front so records can point into it.
    let fields: Vec<SignatureFields<'a>> = fields.collect();
    debug_assert_eq!(fields.len(), count);
    let name_table_start = TABLE_OFFSET + count * SIGNATURE_RECORD_LEN;
    let mut names: Vec<(&str, u32)> = Vec::new();
    let mut next_name_offset = name_table_start as u32;
    for f in &fields {
        if !names.iter().any(|(n, _)| *n == f.semantic_name) {
            names.push((f.semantic_name, next_name_offset));
            next_name_offset += f.semantic_name.len() as u32 + 1;
        }
    }
    let name_offset = |name: &str| -> u32 {
        names
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, off)| *off)
            .unwrap_or(0)
    };

    for f in &fields {
        w.write_u32(name_offset(f.semantic_name));
        w.write_u32(f.semantic_index);
        w.write_u32(f.system_value);
        w.write_u32(f.component_type);
        w.write_u32(f.register);
        w.write_u8(f.mask);
        w.write_u8(f.read_write_mask);
        w.write_u16(0); // stream / min-precision
    }
    for (name, _) in &names {
        w.write_cstr(name);
    }
    w.align4();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_inputs() -> Vec<InputSignatureElement<'static>> {
        vec![
            InputSignatureElement {
                semantic_name: "POSITION",
                semantic_index: 0,
                register: 0,
                component_count: 3,
                component_class: RegisterComponentClass::Float32,
            },
            InputSignatureElement {
                semantic_name: "COLOR",
                semantic_index: 0,
                register: 1,
                component_count: 4,
                component_class: RegisterComponentClass::Float32,
            },
        ]
    }

    #[test]
    fn deterministic_output() {
        let a = synthesize_vertex_module(&sample_inputs()).unwrap();
        let b = synthesize_vertex_module(&sample_inputs()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn declared_total_size_matches_length() {
        let module = synthesize_vertex_module(&sample_inputs()).unwrap();
        let total = u32::from_le_bytes(module[24..28].try_into().unwrap());
        assert_eq!(total as usize, module.len());
    }

    #[test]
    fn embedded_checksum_matches_recomputation() {
        let module = synthesize_vertex_module(&sample_inputs()).unwrap();
        let stored: [u8; 16] = module[4..20].try_into().unwrap();
        assert_eq!(stored, container_checksum(&module));
    }

    #[test]
    fn rejects_bad_component_counts() {
        for bad in [0u8, 5] {
            let inputs = [InputSignatureElement {
                semantic_name: "POSITION",
                semantic_index: 0,
                register: 0,
                component_count: bad,
                component_class: RegisterComponentClass::Float32,
            }];
            assert!(synthesize_vertex_module(&inputs).is_err());
        }
    }

    #[test]
    fn rejects_empty_semantic_name() {
        let inputs = [InputSignatureElement {
            semantic_name: "",
            semantic_index: 0,
            register: 0,
            component_count: 4,
            component_class: RegisterComponentClass::Uint32,
        }];
        assert!(synthesize_vertex_module(&inputs).is_err());
    }
}
