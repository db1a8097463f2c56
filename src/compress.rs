//! Decompressors for the value-materialization pipeline (component C3).
//!
//! Any decompressor failure is surfaced as `BlockError::Corruption` tagged
//! with the failing stage; the underlying library's own error type is not
//! propagated.

use crate::coding;
use crate::error::{BlockError, BlockResult};

/// On-disk compression mode, stable discriminant values (wire format).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Compress {
    NoCompress = 0,
    Snappy = 1,
    SegmentSnappy = 2,
    SegmentZlib = 3,
}

impl Compress {
    pub fn from_u8(v: u8) -> Option<Compress> {
        match v {
            0 => Some(Compress::NoCompress),
            1 => Some(Compress::Snappy),
            2 => Some(Compress::SegmentSnappy),
            3 => Some(Compress::SegmentZlib),
            _ => None,
        }
    }

    /// Explicit predicate rather than a numeric `compress > Snappy`
    /// comparison, so adding a non-segmented mode above `SegmentZlib`
    /// someday wouldn't silently flip this.
    pub fn is_segmented(self) -> bool {
        matches!(self, Compress::SegmentSnappy | Compress::SegmentZlib)
    }
}

pub fn snappy_uncompressed_length(src: &[u8]) -> BlockResult<usize> {
    snap::raw::decompress_len(src).map_err(|_| BlockError::Corruption("snappy length probe"))
}

pub fn snappy_uncompress(src: &[u8]) -> BlockResult<Vec<u8>> {
    let mut decoder = snap::raw::Decoder::new();
    decoder
        .decompress_vec(src)
        .map_err(|_| BlockError::Corruption("snappy uncompress"))
}

/// `src` is the raw zlib stream (no leading length); the caller must
/// already know the inflated size.
pub fn zlib_uncompress(src: &[u8], raw_len: usize) -> BlockResult<Vec<u8>> {
    use std::io::Read;
    let mut decoder = flate2::read::ZlibDecoder::new(src);
    let mut out = Vec::with_capacity(raw_len);
    decoder
        .read_to_end(&mut out)
        .map_err(|_| BlockError::Corruption("zlib uncompress"))?;
    if out.len() != raw_len {
        return Err(BlockError::Corruption("zlib uncompress length mismatch"));
    }
    Ok(out)
}

/// Decode the `SegmentZlib` payload shape: varint-32 `raw_len` followed by
/// the zlib stream of that uncompressed size.
pub fn zlib_uncompress_prefixed(payload: &[u8]) -> BlockResult<Vec<u8>> {
    let (rest, raw_len) =
        coding::get_varint32(payload).ok_or(BlockError::Corruption("zlib raw_len varint"))?;
    zlib_uncompress(rest, raw_len as usize)
}
