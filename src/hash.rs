//! 32-bit non-cryptographic digest (component C2).
//!
//! Murmur-style multiply-and-mix, word-wise over little-endian `u32`s with
//! a byte-wise tail, matching the hash the block producer and consumer
//! must agree on bit-for-bit. The seed is always 0 at the block boundary
//! (`hash(key, 0)`), but the function accepts any seed.

const MUL: u32 = 0xbc9f_1d34;
const SHIFT: u32 = 24;

pub fn hash(data: &[u8], seed: u32) -> u32 {
    let mut h = seed ^ (data.len() as u32).wrapping_mul(MUL);

    let mut chunks = data.chunks_exact(4);
    for word in &mut chunks {
        let w = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        h = h.wrapping_add(w);
        h = h.wrapping_mul(MUL);
        h ^= h >> 16;
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        for (i, &byte) in tail.iter().enumerate().rev() {
            h = h.wrapping_add((byte as u32) << (8 * i));
        }
        h = h.wrapping_mul(MUL);
        h ^= h >> SHIFT;
    }

    h
}
