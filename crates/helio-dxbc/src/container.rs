//! Strict structural parsing of DXBC containers.
//!
//! Parsing treats the input as untrusted: every offset and size is validated
//! against the declared total size, and malformed data produces an error,
//! never a panic. Used by tests and by reference devices that validate
//! synthesized modules before accepting them.

use core::fmt;

use crate::checksum::container_checksum;
use crate::error::DxbcError;
use crate::fourcc::FourCC;
use crate::synth::{CONTAINER_MAGIC, HEADER_LEN};

/// The fixed header of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DxbcHeader {
    pub magic: FourCC,
    /// The digest stored in the header (see [`crate::checksum`]).
    pub checksum: [u8; 16],
    /// Declared total size of the container in bytes.
    pub total_size: u32,
    /// Number of chunk offsets following the header.
    pub chunk_count: u32,
}

/// A single tagged chunk.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct DxbcChunk<'a> {
    pub fourcc: FourCC,
    pub data: &'a [u8],
}

impl fmt::Debug for DxbcChunk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DxbcChunk")
            .field("fourcc", &self.fourcc)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// A parsed container.
#[derive(Debug, Clone)]
pub struct DxbcContainer<'a> {
    bytes: &'a [u8],
    header: DxbcHeader,
    chunk_offsets: &'a [u8],
}

impl<'a> DxbcContainer<'a> {
    /// Parses a container from `bytes`, validating all offsets and sizes.
    pub fn parse(bytes: &'a [u8]) -> Result<DxbcContainer<'a>, DxbcError> {
        if bytes.len() < HEADER_LEN {
            return Err(DxbcError::malformed_header(format!(
                "need at least {HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let magic = FourCC([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != CONTAINER_MAGIC {
            return Err(DxbcError::malformed_header(format!(
                "bad magic {magic:?}, expected {CONTAINER_MAGIC:?}"
            )));
        }

        let mut checksum = [0u8; 16];
        checksum.copy_from_slice(&bytes[4..20]);

        // The reserved word at offset 20 is not interpreted.
        let total_size = read_u32_le(bytes, 24, "total_size")?;
        let chunk_count = read_u32_le(bytes, 28, "chunk_count")?;

        let total_size_usize = total_size as usize;
        if total_size_usize < HEADER_LEN {
            return Err(DxbcError::malformed_header(format!(
                "total_size {total_size} is smaller than header size {HEADER_LEN}"
            )));
        }
        if total_size_usize > bytes.len() {
            return Err(DxbcError::out_of_bounds(format!(
                "total_size {total_size} exceeds buffer length {}",
                bytes.len()
            )));
        }
        let bytes = &bytes[..total_size_usize];

        let offset_table_len = (chunk_count as usize).checked_mul(4).ok_or_else(|| {
            DxbcError::malformed_offsets("chunk_count overflows offset table size")
        })?;
        let offset_table_end = HEADER_LEN.checked_add(offset_table_len).ok_or_else(|| {
            DxbcError::malformed_offsets("header size overflows when adding chunk offset table")
        })?;
        if offset_table_end > bytes.len() {
            return Err(DxbcError::malformed_offsets(format!(
                "chunk offset table ends at {offset_table_end}, but total_size is {}",
                bytes.len()
            )));
        }
        let chunk_offsets = &bytes[HEADER_LEN..offset_table_end];

        for i in 0..chunk_count as usize {
            let chunk_offset = read_u32_le(bytes, HEADER_LEN + i * 4, "chunk offset")? as usize;
            if chunk_offset < offset_table_end {
                return Err(DxbcError::malformed_offsets(format!(
                    "chunk {i} offset {chunk_offset} points into the header or offset table \
                     (need >= {offset_table_end})"
                )));
            }
            let header_end = chunk_offset.checked_add(8).ok_or_else(|| {
                DxbcError::malformed_offsets(format!(
                    "chunk {i} offset {chunk_offset} overflows when reading header"
                ))
            })?;
            if header_end > bytes.len() {
                return Err(DxbcError::out_of_bounds(format!(
                    "chunk {i} header at {chunk_offset}..{header_end} is outside total_size {}",
                    bytes.len()
                )));
            }
            let chunk_size = read_u32_le(bytes, chunk_offset + 4, "chunk size")? as usize;
            let data_end = header_end.checked_add(chunk_size).ok_or_else(|| {
                DxbcError::malformed_offsets(format!(
                    "chunk {i} size {chunk_size} overflows when computing data range"
                ))
            })?;
            if data_end > bytes.len() {
                return Err(DxbcError::out_of_bounds(format!(
                    "chunk {i} data at {header_end}..{data_end} is outside total_size {}",
                    bytes.len()
                )));
            }
        }

        Ok(DxbcContainer {
            bytes,
            header: DxbcHeader {
                magic,
                checksum,
                total_size,
                chunk_count,
            },
            chunk_offsets,
        })
    }

    pub fn header(&self) -> &DxbcHeader {
        &self.header
    }

    /// The raw bytes covered by the declared `total_size`.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Iterates over all chunks in file order.
    pub fn chunks(&self) -> impl Iterator<Item = DxbcChunk<'a>> + '_ {
        ChunksIter {
            bytes: self.bytes,
            chunk_offsets: self.chunk_offsets,
            index: 0,
        }
    }

    /// Returns the first chunk matching `fourcc`, if any.
    pub fn get_chunk(&self, fourcc: FourCC) -> Option<DxbcChunk<'a>> {
        self.chunks().find(|chunk| chunk.fourcc == fourcc)
    }

    /// Recomputes the digest over the checksummed region.
    pub fn compute_checksum(&self) -> [u8; 16] {
        container_checksum(self.bytes)
    }

    /// Whether the stored digest matches an independent recomputation.
    pub fn checksum_matches(&self) -> bool {
        self.compute_checksum() == self.header.checksum
    }
}

struct ChunksIter<'a> {
    bytes: &'a [u8],
    chunk_offsets: &'a [u8],
    index: usize,
}

impl<'a> Iterator for ChunksIter<'a> {
    type Item = DxbcChunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.index.checked_mul(4)?;
        let offset_bytes = self.chunk_offsets.get(start..start + 4)?;
        let chunk_offset = u32::from_le_bytes(offset_bytes.try_into().ok()?) as usize;

        let header = self.bytes.get(chunk_offset..chunk_offset.checked_add(8)?)?;
        let fourcc = FourCC([header[0], header[1], header[2], header[3]]);
        let chunk_size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let data_start = chunk_offset + 8;
        let data = self.bytes.get(data_start..data_start.checked_add(chunk_size)?)?;

        self.index += 1;
        Some(DxbcChunk { fourcc, data })
    }
}

fn read_u32_le(bytes: &[u8], offset: usize, what: &str) -> Result<u32, DxbcError> {
    let end = offset
        .checked_add(4)
        .ok_or_else(|| DxbcError::malformed_header(format!("{what} offset overflows")))?;
    let slice = bytes.get(offset..end).ok_or_else(|| {
        DxbcError::malformed_header(format!(
            "need 4 bytes for {what} at {offset}..{end}, but buffer length is {}",
            bytes.len()
        ))
    })?;
    Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_truncated_header() {
        let err = DxbcContainer::parse(&[0u8; 8]).unwrap_err();
        assert!(matches!(err, DxbcError::MalformedHeader(_)));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = vec![0u8; 64];
        bytes[..4].copy_from_slice(b"NOPE");
        let err = DxbcContainer::parse(&bytes).unwrap_err();
        assert!(matches!(err, DxbcError::MalformedHeader(_)));
    }

    #[test]
    fn rejects_total_size_beyond_buffer() {
        let mut bytes = vec![0u8; 64];
        bytes[..4].copy_from_slice(b"DXBC");
        bytes[24..28].copy_from_slice(&1024u32.to_le_bytes());
        let err = DxbcContainer::parse(&bytes).unwrap_err();
        assert!(matches!(err, DxbcError::OutOfBounds(_)));
    }

    #[test]
    fn rejects_chunk_offset_into_header() {
        let mut bytes = vec![0u8; 64];
        bytes[..4].copy_from_slice(b"DXBC");
        bytes[24..28].copy_from_slice(&64u32.to_le_bytes());
        bytes[28..32].copy_from_slice(&1u32.to_le_bytes());
        // Chunk offset 0 points back into the header.
        bytes[32..36].copy_from_slice(&0u32.to_le_bytes());
        let err = DxbcContainer::parse(&bytes).unwrap_err();
        assert!(matches!(err, DxbcError::MalformedOffsets(_)));
    }

    #[test]
    fn rejects_chunk_data_outside_total_size() {
        let mut bytes = vec![0u8; 64];
        bytes[..4].copy_from_slice(b"DXBC");
        bytes[24..28].copy_from_slice(&64u32.to_le_bytes());
        bytes[28..32].copy_from_slice(&1u32.to_le_bytes());
        bytes[32..36].copy_from_slice(&36u32.to_le_bytes());
        bytes[36..40].copy_from_slice(b"TEST");
        // Declared chunk size runs past the container end.
        bytes[40..44].copy_from_slice(&100u32.to_le_bytes());
        let err = DxbcContainer::parse(&bytes).unwrap_err();
        assert!(matches!(err, DxbcError::OutOfBounds(_)));
    }
}
