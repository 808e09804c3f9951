//! A little-endian container writer with explicit, patchable fields.
//!
//! Every field write is a named call, and "fill this in later" fields
//! (sizes, offsets, the checksum) are typed slots that must be patched
//! exactly once.

use crate::fourcc::FourCC;

/// A reserved dword slot returned by [`ContainerWriter::placeholder_u32`].
#[derive(Debug)]
#[must_use = "placeholder slots must be patched"]
pub struct FieldSlot(usize);

/// An open chunk started with [`ContainerWriter::begin_chunk`]; its size
/// field is patched when the chunk is closed.
#[derive(Debug)]
#[must_use = "open chunks must be finished"]
pub struct OpenChunk {
    size_slot: FieldSlot,
    payload_start: usize,
}

#[derive(Debug, Default)]
pub struct ContainerWriter {
    buf: Vec<u8>,
}

impl ContainerWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_fourcc(&mut self, fourcc: FourCC) {
        self.buf.extend_from_slice(&fourcc.0);
    }

    /// Writes a NUL-terminated string.
    pub fn write_cstr(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    /// Zero-pads the buffer up to the next 4-byte boundary.
    pub fn align4(&mut self) {
        while self.buf.len() % 4 != 0 {
            self.buf.push(0);
        }
    }

    /// Reserves a dword to be filled in later via [`Self::patch_u32`].
    pub fn placeholder_u32(&mut self) -> FieldSlot {
        let at = self.buf.len();
        self.buf.extend_from_slice(&[0; 4]);
        FieldSlot(at)
    }

    pub fn patch_u32(&mut self, slot: FieldSlot, v: u32) {
        self.buf[slot.0..slot.0 + 4].copy_from_slice(&v.to_le_bytes());
    }

    /// Overwrites `bytes.len()` bytes at `offset`. The range must already
    /// have been written.
    pub fn patch_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Starts a tagged, length-prefixed chunk. Returns the chunk's file
    /// offset (for the header offset table) and a token to close it with.
    pub fn begin_chunk(&mut self, fourcc: FourCC) -> (u32, OpenChunk) {
        let chunk_offset = self.buf.len() as u32;
        self.write_fourcc(fourcc);
        let size_slot = self.placeholder_u32();
        let payload_start = self.buf.len();
        (
            chunk_offset,
            OpenChunk {
                size_slot,
                payload_start,
            },
        )
    }

    /// Closes a chunk, patching its declared payload size.
    pub fn end_chunk(&mut self, chunk: OpenChunk) {
        let size = (self.buf.len() - chunk.payload_start) as u32;
        self.patch_u32(chunk.size_slot, size);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }
}
