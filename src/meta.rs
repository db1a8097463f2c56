//! The trailing meta record and the magic constant both sides of the
//! block boundary agree on.

use crate::coding::{decode_fixed32, decode_fixed64};
use crate::compress::Compress;
use crate::error::BlockError;

/// Magic bytes at offset 0 of every block file ("KVB1", little-endian).
pub const MAGIC: u32 = 0x4B56_4231;

/// Serialized size of `Meta`: 4 + 8 + 8 + 8 + 4 + 8 + 4 + 1 + 4 bytes,
/// packed tightly, little-endian, in field-declaration order — no
/// implicit struct padding is relied on.
pub const META_LEN: usize = 49;

#[derive(Debug, Clone, Copy)]
pub struct Meta {
    pub magic_length: u32,
    pub data_length: u64,
    pub entries_length: u64,
    pub bucket_length: u64,
    pub meta_length: u32,
    pub hash_table_length: u64,
    pub max_list_length: u32,
    pub compress: Compress,
    pub magic: u32,
}

impl Meta {
    /// Deserialize the trailing `META_LEN`-byte record. Only size is
    /// checked here; cross-field invariants (§3, CheckMeta in the
    /// original) are verified separately by `Block::open`.
    pub fn decode(buf: &[u8]) -> Result<Meta, BlockError> {
        if buf.len() != META_LEN {
            return Err(BlockError::BadMeta("meta record has the wrong size"));
        }
        let mut off = 0;
        macro_rules! take {
            ($decode:ident, $width:expr) => {{
                let v = $decode(&buf[off..]);
                off += $width;
                v
            }};
        }
        let magic_length = take!(decode_fixed32, 4);
        let data_length = take!(decode_fixed64, 8);
        let entries_length = take!(decode_fixed64, 8);
        let bucket_length = take!(decode_fixed64, 8);
        let meta_length = take!(decode_fixed32, 4);
        let hash_table_length = take!(decode_fixed64, 8);
        let max_list_length = take!(decode_fixed32, 4);
        let compress_byte = buf[off];
        off += 1;
        let magic = decode_fixed32(&buf[off..]);

        let compress = Compress::from_u8(compress_byte)
            .ok_or(BlockError::BadMeta("unknown compress discriminant"))?;

        Ok(Meta {
            magic_length,
            data_length,
            entries_length,
            bucket_length,
            meta_length,
            hash_table_length,
            max_list_length,
            compress,
            magic,
        })
    }

    /// Total file size this meta record implies.
    pub fn expected_file_size(&self) -> u64 {
        self.magic_length as u64
            + self.data_length
            + self.entries_length
            + self.bucket_length
            + self.meta_length as u64
    }

    /// §3: `bucket_length = (hash_table_length + 1) * 8`.
    pub fn expected_bucket_length(&self) -> u64 {
        (self.hash_table_length + 1) * 8
    }
}
