//! The DXBC container digest.
//!
//! The backend validates every shader module it is handed by recomputing the
//! 16-byte digest stored in the container header. The algorithm is MD5 with a
//! deviant finalization: instead of the standard `0x80` marker followed by a
//! 64-bit bit count, the final 64-byte block carries the 32-bit bit count in
//! its first dword and `(byte_len * 2) | 1` in its last dword, with the
//! marker and zero padding squeezed between the trailing data bytes and that
//! final dword. The deviation is not ours to fix: the driver performs the
//! same computation and rejects anything else.

/// Per-round left-rotate amounts (RFC 1321 table, four rounds of four).
const S: [u32; 64] = [
    7, 12, 17, 22, 7, 12, 17, 22, 7, 12, 17, 22, 7, 12, 17, 22, //
    5, 9, 14, 20, 5, 9, 14, 20, 5, 9, 14, 20, 5, 9, 14, 20, //
    4, 11, 16, 23, 4, 11, 16, 23, 4, 11, 16, 23, 4, 11, 16, 23, //
    6, 10, 15, 21, 6, 10, 15, 21, 6, 10, 15, 21, 6, 10, 15, 21,
];

/// Round constants: `floor(abs(sin(i + 1)) * 2^32)`.
const K: [u32; 64] = [
    0xd76a_a478, 0xe8c7_b756, 0x2420_70db, 0xc1bd_ceee, //
    0xf57c_0faf, 0x4787_c62a, 0xa830_4613, 0xfd46_9501, //
    0x6980_98d8, 0x8b44_f7af, 0xffff_5bb1, 0x895c_d7be, //
    0x6b90_1122, 0xfd98_7193, 0xa679_438e, 0x49b4_0821, //
    0xf61e_2562, 0xc040_b340, 0x265e_5a51, 0xe9b6_c7aa, //
    0xd62f_105d, 0x0244_1453, 0xd8a1_e681, 0xe7d3_fbc8, //
    0x21e1_cde6, 0xc337_07d6, 0xf4d5_0d87, 0x455a_14ed, //
    0xa9e3_e905, 0xfcef_a3f8, 0x676f_02d9, 0x8d2a_4c8a, //
    0xfffa_3942, 0x8771_f681, 0x6d9d_6122, 0xfde5_380c, //
    0xa4be_ea44, 0x4bde_cfa9, 0xf6bb_4b60, 0xbebf_bc70, //
    0x289b_7ec6, 0xeaa1_27fa, 0xd4ef_3085, 0x0488_1d05, //
    0xd9d4_d039, 0xe6db_99e5, 0x1fa2_7cf8, 0xc4ac_5665, //
    0xf429_2244, 0x432a_ff97, 0xab94_23a7, 0xfc93_a039, //
    0x655b_59c3, 0x8f0c_cc92, 0xffef_f47d, 0x8584_5dd1, //
    0x6fa8_7e4f, 0xfe2c_e6e0, 0xa301_4314, 0x4e08_11a1, //
    0xf753_7e82, 0xbd3a_f235, 0x2ad7_d2bb, 0xeb86_d391,
];

const INIT_STATE: [u32; 4] = [0x6745_2301, 0xefcd_ab89, 0x98ba_dcfe, 0x1032_5476];

fn transform(state: &mut [u32; 4], block: &[u8; 64]) {
    let mut m = [0u32; 16];
    for (i, word) in block.chunks_exact(4).enumerate() {
        m[i] = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
    }

    let [mut a, mut b, mut c, mut d] = *state;
    for i in 0..64 {
        let (f, g) = match i / 16 {
            0 => ((b & c) | (!b & d), i),
            1 => ((d & b) | (!d & c), (5 * i + 1) % 16),
            2 => (b ^ c ^ d, (3 * i + 5) % 16),
            _ => (c ^ (b | !d), (7 * i) % 16),
        };
        let rotated = a
            .wrapping_add(f)
            .wrapping_add(K[i])
            .wrapping_add(m[g])
            .rotate_left(S[i]);
        a = d;
        d = c;
        c = b;
        b = b.wrapping_add(rotated);
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
}

/// Computes the DXBC digest over `data`.
///
/// Deterministic, allocation-free, and deliberately *not* standard MD5: the
/// tail block layout follows the driver's scheme (see module docs). There are
/// two tail shapes depending on whether the trailing partial block leaves
/// room for both the bit count and the final marker word.
pub fn dxbc_checksum(data: &[u8]) -> [u8; 16] {
    let mut state = INIT_STATE;

    let full_len = data.len() & !63;
    for block in data[..full_len].chunks_exact(64) {
        // chunks_exact guarantees the length.
        let block: &[u8; 64] = block.try_into().unwrap();
        transform(&mut state, block);
    }

    let tail = &data[full_len..];
    let bit_count = (data.len() as u32).wrapping_mul(8);
    let last_word = ((data.len() as u32) << 1) | 1;

    if tail.len() >= 56 {
        // The partial block cannot also hold the length words; close it out
        // with the marker, then emit one extra block carrying the counts at
        // both ends.
        let mut block = [0u8; 64];
        block[..tail.len()].copy_from_slice(tail);
        block[tail.len()] = 0x80;
        transform(&mut state, &block);

        let mut fin = [0u8; 64];
        fin[..4].copy_from_slice(&bit_count.to_le_bytes());
        fin[60..].copy_from_slice(&last_word.to_le_bytes());
        transform(&mut state, &fin);
    } else {
        let mut block = [0u8; 64];
        block[..4].copy_from_slice(&bit_count.to_le_bytes());
        block[4..4 + tail.len()].copy_from_slice(tail);
        block[4 + tail.len()] = 0x80;
        block[60..].copy_from_slice(&last_word.to_le_bytes());
        transform(&mut state, &block);
    }

    let mut out = [0u8; 16];
    for (chunk, word) in out.chunks_exact_mut(4).zip(state) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    out
}

/// Computes the digest a finished container must carry in its header.
///
/// The digest covers everything following the header checksum field, i.e.
/// `container[20..]` (magic and the checksum field itself are excluded).
pub fn container_checksum(container: &[u8]) -> [u8; 16] {
    debug_assert!(container.len() >= 20, "container smaller than its header");
    dxbc_checksum(&container[20..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let data: Vec<u8> = (0..200u16).map(|v| v as u8).collect();
        assert_eq!(dxbc_checksum(&data), dxbc_checksum(&data));
    }

    #[test]
    fn sensitive_to_every_byte() {
        let data: Vec<u8> = (0..97u8).collect();
        let base = dxbc_checksum(&data);
        for i in 0..data.len() {
            let mut flipped = data.clone();
            flipped[i] ^= 0x40;
            assert_ne!(dxbc_checksum(&flipped), base, "byte {i} did not affect digest");
        }
    }

    #[test]
    fn sensitive_to_length() {
        // Trailing zero bytes must still change the digest; the length is
        // folded into the tail block.
        let a = dxbc_checksum(&[0u8; 32]);
        let b = dxbc_checksum(&[0u8; 33]);
        assert_ne!(a, b);
    }

    #[test]
    fn tail_branches_cover_block_boundaries() {
        // Exercise residues on both sides of the 56-byte split and on exact
        // block boundaries. Digests must be stable and pairwise distinct.
        let sizes = [0usize, 1, 55, 56, 57, 63, 64, 65, 119, 120, 128];
        let mut digests = Vec::new();
        for &size in &sizes {
            let data: Vec<u8> = (0..size).map(|v| (v * 7 + 3) as u8).collect();
            let digest = dxbc_checksum(&data);
            assert_eq!(digest, dxbc_checksum(&data));
            digests.push(digest);
        }
        for i in 0..digests.len() {
            for j in (i + 1)..digests.len() {
                assert_ne!(digests[i], digests[j], "sizes {} and {}", sizes[i], sizes[j]);
            }
        }
    }

    #[test]
    fn not_plain_md5_of_padded_input() {
        // The tail block embeds `(len * 2) | 1`; a same-length input whose
        // contents happen to equal our synthetic tail must not collide.
        let data = [0xABu8; 8];
        let digest = dxbc_checksum(&data);

        let mut forged = [0u8; 8];
        forged.copy_from_slice(&data);
        assert_eq!(digest, dxbc_checksum(&forged));
        forged[0] = 0x80;
        assert_ne!(digest, dxbc_checksum(&forged));
    }
}
