//! Parsing of signature chunks (`ISGN` / `OSGN`).
//!
//! Only the 24-byte record layout is supported; it is the only layout the
//! synthesizer emits.

use crate::error::DxbcError;

const SIGNATURE_HEADER_LEN: usize = 8;
const SIGNATURE_RECORD_LEN: usize = 24;

/// A single signature record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRecord {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub register: u32,
    pub system_value: u32,
    /// Register component class stored as a raw `u32`.
    pub component_type: u32,
    pub mask: u8,
    pub read_write_mask: u8,
}

/// Parses a signature chunk payload (the bytes following the chunk's tag and
/// size fields).
pub fn parse_signature_chunk(bytes: &[u8]) -> Result<Vec<SignatureRecord>, DxbcError> {
    if bytes.len() < SIGNATURE_HEADER_LEN {
        return Err(DxbcError::invalid_chunk(format!(
            "signature chunk is truncated: need {SIGNATURE_HEADER_LEN} bytes for header, got {}",
            bytes.len()
        )));
    }

    let record_count = read_u32_le(bytes, 0, "record_count")? as usize;
    let table_offset = read_u32_le(bytes, 4, "table_offset")? as usize;

    if record_count == 0 {
        return Ok(Vec::new());
    }
    if table_offset < SIGNATURE_HEADER_LEN {
        return Err(DxbcError::invalid_chunk(format!(
            "table_offset {table_offset} points into the signature header"
        )));
    }

    let table_len = record_count
        .checked_mul(SIGNATURE_RECORD_LEN)
        .ok_or_else(|| DxbcError::invalid_chunk("record count overflows table size"))?;
    let table_end = table_offset
        .checked_add(table_len)
        .ok_or_else(|| DxbcError::invalid_chunk("signature table end overflows"))?;
    if table_end > bytes.len() {
        return Err(DxbcError::invalid_chunk(format!(
            "signature table at {table_offset}..{table_end} is outside chunk length {}",
            bytes.len()
        )));
    }

    let mut records = Vec::new();
    records.try_reserve_exact(record_count).map_err(|_| {
        DxbcError::invalid_chunk(format!(
            "signature record count {record_count} is too large to allocate"
        ))
    })?;

    for i in 0..record_count {
        let at = table_offset + i * SIGNATURE_RECORD_LEN;
        let name_offset = read_u32_le(bytes, at, "semantic_name_offset")? as usize;
        if (table_offset..table_end).contains(&name_offset) {
            return Err(DxbcError::invalid_chunk(format!(
                "record {i} semantic_name_offset {name_offset} points into the record table"
            )));
        }
        let semantic_index = read_u32_le(bytes, at + 4, "semantic_index")?;
        let system_value = read_u32_le(bytes, at + 8, "system_value")?;
        let component_type = read_u32_le(bytes, at + 12, "component_type")?;
        let register = read_u32_le(bytes, at + 16, "register")?;
        // Final dword packs mask, read/write mask, and two unused bytes.
        let packed = read_u32_le(bytes, at + 20, "mask")?;
        let mask = (packed & 0xff) as u8;
        let read_write_mask = ((packed >> 8) & 0xff) as u8;

        let semantic_name = read_cstr(bytes, name_offset).map_err(|e| {
            DxbcError::invalid_chunk(format!("record {i} semantic_name: {}", e.context()))
        })?;

        records.push(SignatureRecord {
            semantic_name: semantic_name.to_owned(),
            semantic_index,
            register,
            system_value,
            component_type,
            mask,
            read_write_mask,
        });
    }

    Ok(records)
}

fn read_u32_le(bytes: &[u8], offset: usize, what: &str) -> Result<u32, DxbcError> {
    let end = offset
        .checked_add(4)
        .ok_or_else(|| DxbcError::invalid_chunk(format!("{what} offset overflows")))?;
    let slice = bytes.get(offset..end).ok_or_else(|| {
        DxbcError::invalid_chunk(format!(
            "need 4 bytes for {what} at {offset}..{end}, but chunk length is {}",
            bytes.len()
        ))
    })?;
    Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn read_cstr(bytes: &[u8], offset: usize) -> Result<&str, DxbcError> {
    let tail = bytes.get(offset..).ok_or_else(|| {
        DxbcError::invalid_chunk(format!(
            "name offset {offset} is outside chunk length {}",
            bytes.len()
        ))
    })?;
    let nul = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| DxbcError::invalid_chunk("name is missing a NUL terminator"))?;
    core::str::from_utf8(&tail[..nul])
        .map_err(|_| DxbcError::invalid_chunk(format!("name at offset {offset} is not UTF-8")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chunk_parses_to_no_records() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&8u32.to_le_bytes());
        assert!(parse_signature_chunk(&bytes).unwrap().is_empty());
    }

    #[test]
    fn rejects_table_past_chunk_end() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&8u32.to_le_bytes());
        let err = parse_signature_chunk(&bytes).unwrap_err();
        assert!(matches!(err, DxbcError::InvalidChunk(_)));
    }

    #[test]
    fn rejects_name_offset_inside_table() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&8u32.to_le_bytes());
        // One record whose name offset points at the record itself.
        bytes.extend_from_slice(&8u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 20]);
        let err = parse_signature_chunk(&bytes).unwrap_err();
        assert!(matches!(err, DxbcError::InvalidChunk(_)));
    }
}
