//! Bucket array + entries decoder (component C4): the closed-addressing
//! hash table over half-open `[pos, next_pos)` ranges into the entries
//! blob, and the variable-length `Entry` record it points at.

use crate::coding::{decode_fixed64, get_fixed32, get_fixed8, get_varint32, get_varint64};
use crate::compress::Compress;
use crate::error::{BlockError, BlockResult};

/// The `hash_table_length + 1` cumulative-offset array, decoded from the
/// raw little-endian `u64` bucket segment into an owned, typed vector.
pub struct BucketArray {
    offsets: Vec<u64>,
}

pub struct EntriesRange {
    pub pos: u64,
    pub next_pos: u64,
    pub empty: bool,
}

impl BucketArray {
    /// `raw` must be exactly `(hash_table_length + 1) * 8` bytes; the
    /// caller (`Block::open`) has already checked that invariant.
    pub fn decode(raw: &[u8], hash_table_length: u64) -> BlockResult<BucketArray> {
        let want = (hash_table_length + 1) as usize;
        if raw.len() != want * 8 {
            return Err(BlockError::BadMeta("bucket segment size disagrees with hash_table_length"));
        }
        let mut offsets = Vec::with_capacity(want);
        for chunk in raw.chunks_exact(8) {
            offsets.push(decode_fixed64(chunk));
        }
        Ok(BucketArray { offsets })
    }

    pub fn hash_table_length(&self) -> u64 {
        self.offsets.len() as u64 - 1
    }

    pub fn first_offset(&self) -> u64 {
        self.offsets[0]
    }

    pub fn last_offset(&self) -> u64 {
        self.offsets[self.offsets.len() - 1]
    }

    pub fn is_non_decreasing(&self) -> bool {
        self.offsets.windows(2).all(|w| w[0] <= w[1])
    }

    /// O(1) lookup: `hash & (hash_table_length - 1)` then read the
    /// half-open range out of the prefix-sum array. Power-of-two
    /// cardinality is what makes the AND-based modulus valid; `Block::open`
    /// rejects non-power-of-two tables before this is ever called.
    pub fn lookup(&self, hash: u32) -> EntriesRange {
        let size = self.hash_table_length();
        let i = (hash as u64 & (size - 1)) as usize;
        let pos = self.offsets[i];
        let next_pos = self.offsets[i + 1];
        // A corrupted bucket array can have next_pos < pos; leave that for
        // the caller to reject rather than deriving a `length` here, which
        // would need wrapping arithmetic that plain slicing downstream
        // can't undo safely.
        EntriesRange {
            pos,
            next_pos,
            empty: next_pos == pos,
        }
    }
}

/// One decoded `(hash, key, data-pointer)` record from the entries
/// segment.
pub struct Entry<'a> {
    pub hash: u32,
    pub data_offset: u64,
    pub inner_offset: u32,
    pub key: &'a [u8],
}

/// Decode shape fixed at open time from `meta.compress`, so the hot scan
/// loop never branches per entry.
#[derive(Clone, Copy)]
pub struct EntryDecoder {
    has_inner_offset: bool,
}

impl EntryDecoder {
    pub fn for_compress(compress: Compress) -> EntryDecoder {
        EntryDecoder {
            has_inner_offset: compress.is_segmented(),
        }
    }

    /// Decode one entry from the front of `input`, returning it together
    /// with the slice advanced past it.
    pub fn decode<'a>(&self, input: &'a [u8]) -> Option<(&'a [u8], Entry<'a>)> {
        let (input, hash) = get_fixed32(input)?;
        let (input, data_offset) = get_varint64(input)?;
        let (input, inner_offset) = if self.has_inner_offset {
            get_varint32(input)?
        } else {
            (input, 0)
        };
        let (input, key_length) = get_fixed8(input)?;
        if input.len() < key_length as usize {
            return None;
        }
        let (key, rest) = input.split_at(key_length as usize);
        Some((
            rest,
            Entry {
                hash,
                data_offset,
                inner_offset,
                key,
            },
        ))
    }
}

/// Walk the chain at `entries[pos..next_pos)`, returning the first
/// entry whose hash and key both match. A counter bounded by
/// `max_list_length` guards against runaway chains — exceeding it is
/// always a corruption error, never a debug-only assertion.
pub fn scan_chain<'a>(
    decoder: &EntryDecoder,
    chain: &'a [u8],
    query_hash: u32,
    query_key: &[u8],
    max_list_length: u32,
) -> BlockResult<Option<Entry<'a>>> {
    let mut remaining = chain;
    let mut count = 0u32;
    while !remaining.is_empty() {
        count += 1;
        if count > max_list_length {
            return Err(BlockError::Corruption("chain length exceeds max_list_length"));
        }
        let (rest, entry) = decoder
            .decode(remaining)
            .ok_or(BlockError::Corruption("malformed entry in chain"))?;
        if entry.hash == query_hash && entry.key == query_key {
            return Ok(Some(entry));
        }
        remaining = rest;
    }
    Ok(None)
}
