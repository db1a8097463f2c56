//! The block engine (component C5): opens a block file, validates magic
//! and meta, loads the index onto the heap, maps the data segment, and
//! answers `Get` over all four compression modes.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use memmap2::{Advice, Mmap, MmapOptions};

use crate::bucket::{scan_chain, BucketArray, EntryDecoder};
use crate::coding::get_length_prefixed_slice;
use crate::compress::{self, Compress};
use crate::error::{BlockError, BlockResult};
use crate::meta::{Meta, META_LEN};

/// The one open-time choice this layer owns that isn't dictated by the
/// file itself: whether to hint the kernel that reads of the data segment
/// will be sequential or random. Neither choice changes `Get`'s result,
/// only its paging behavior.
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    pub sequential: bool,
}

impl Default for OpenOptions {
    fn default() -> OpenOptions {
        OpenOptions { sequential: false }
    }
}

/// An opened, immutable block file. `Get` may be called concurrently from
/// any number of threads: everything `Block` owns is read-only after
/// `open` returns.
pub struct Block {
    meta: Meta,
    bucket: BucketArray,
    entries: Vec<u8>,
    decoder: EntryDecoder,
    data: Mmap,
}

fn read_exact_at(file: &mut File, offset: u64, len: usize) -> BlockResult<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

impl Block {
    pub fn open<P: AsRef<Path>>(path: P) -> BlockResult<Block> {
        Block::open_with(path, OpenOptions::default())
    }

    /// Validates the file size, magic, and meta record, loads the entries
    /// and bucket segments onto the heap, and mmaps the data segment. On
    /// any step's failure, resources acquired so far are dropped via
    /// ordinary Rust scoping — there is nothing to explicitly roll back.
    pub fn open_with<P: AsRef<Path>>(path: P, options: OpenOptions) -> BlockResult<Block> {
        let path = path.as_ref();

        // Step 1: minimum size.
        let file_size = std::fs::metadata(path)?.len();
        let min_size = 4 + META_LEN as u64;
        if file_size < min_size {
            log::error!("block {:?} is {} bytes, need at least {}", path, file_size, min_size);
            return Err(BlockError::TooSmall(file_size, min_size));
        }

        let mut file = File::open(path)?;

        // Step 2: magic.
        let mut magic_bytes = [0u8; 4];
        file.read_exact(&mut magic_bytes)?;
        if u32::from_le_bytes(magic_bytes) != crate::meta::MAGIC {
            log::error!("block {:?}: bad magic {:02x?}", path, magic_bytes);
            return Err(BlockError::BadMagic(magic_bytes));
        }

        // Step 3: meta.
        let meta_bytes = read_exact_at(&mut file, file_size - META_LEN as u64, META_LEN)?;
        let meta = Meta::decode(&meta_bytes)?;
        if meta.magic != crate::meta::MAGIC {
            log::error!("block {:?}: meta.magic disagrees with file header", path);
            return Err(BlockError::BadMeta("meta.magic disagrees with file header"));
        }
        if meta.expected_file_size() != file_size {
            log::error!(
                "block {:?}: meta declares {} bytes, file is {}",
                path,
                meta.expected_file_size(),
                file_size
            );
            return Err(BlockError::BadMeta("segment sizes do not sum to file size"));
        }
        if meta.bucket_length != meta.expected_bucket_length() {
            log::error!("block {:?}: bucket_length disagrees with hash_table_length", path);
            return Err(BlockError::BadMeta("bucket_length disagrees with hash_table_length"));
        }
        if meta.hash_table_length == 0 || !meta.hash_table_length.is_power_of_two() {
            log::error!("block {:?}: hash_table_length {} is not a power of two", path, meta.hash_table_length);
            return Err(BlockError::BadMeta("hash_table_length must be a power of two"));
        }

        // Step 4: entries segment onto the heap.
        let entries_offset = meta.magic_length as u64 + meta.data_length;
        let entries = read_exact_at(&mut file, entries_offset, meta.entries_length as usize)?;

        // Step 5: bucket segment onto the heap, reinterpreted as u64s.
        let bucket_offset = entries_offset + meta.entries_length;
        let bucket_raw = read_exact_at(&mut file, bucket_offset, meta.bucket_length as usize)?;
        let bucket = BucketArray::decode(&bucket_raw, meta.hash_table_length)?;

        // Step 6: mmap the magic + data prefix; data segment view starts
        // just past the magic bytes.
        let mmap_len = meta.magic_length as usize + meta.data_length as usize;
        let data = unsafe { MmapOptions::new().len(mmap_len).map(&file)? };
        data.advise(if options.sequential {
            Advice::Sequential
        } else {
            Advice::Random
        })?;

        let decoder = EntryDecoder::for_compress(meta.compress);

        Ok(Block {
            meta,
            bucket,
            entries,
            decoder,
            data,
        })
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    fn data_segment(&self) -> &[u8] {
        &self.data[self.meta.magic_length as usize..]
    }

    /// Hash the key, find its bucket's entry chain, scan for a match, and
    /// materialize the payload: a hit is `Ok(Some(_))`, a miss is
    /// `Ok(None)`, and a malformed file is `Err(Corruption(_))`.
    pub fn get(&self, key: &[u8]) -> BlockResult<Option<Vec<u8>>> {
        let query_hash = crate::hash::hash(key, 0);

        let range = self.bucket.lookup(query_hash);
        let entries_len = self.entries.len() as u64;
        if range.pos > entries_len || range.next_pos > entries_len || range.next_pos < range.pos {
            return Err(BlockError::Corruption("bucket range overflows entries segment"));
        }
        if range.empty {
            return Ok(None);
        }

        let chain = &self.entries[range.pos as usize..range.next_pos as usize];
        let entry = match scan_chain(&self.decoder, chain, query_hash, key, self.meta.max_list_length)? {
            None => return Ok(None),
            Some(e) => e,
        };

        let data = self.data_segment();
        if entry.data_offset as usize > data.len() {
            return Err(BlockError::Corruption("data_offset past end of data segment"));
        }
        let (_, payload) = get_length_prefixed_slice(&data[entry.data_offset as usize..])
            .ok_or(BlockError::Corruption("length-prefixed payload underrun"))?;

        self.materialize(payload, entry.inner_offset)
    }

    fn materialize(&self, payload: &[u8], inner_offset: u32) -> BlockResult<Option<Vec<u8>>> {
        match self.meta.compress {
            Compress::NoCompress => Ok(Some(payload.to_vec())),
            Compress::Snappy => Ok(Some(compress::snappy_uncompress(payload)?)),
            Compress::SegmentSnappy => {
                let envelope = compress::snappy_uncompress(payload)?;
                Self::extract_segment(&envelope, inner_offset)
            }
            Compress::SegmentZlib => {
                let envelope = compress::zlib_uncompress_prefixed(payload)?;
                Self::extract_segment(&envelope, inner_offset)
            }
        }
    }

    fn extract_segment(envelope: &[u8], inner_offset: u32) -> BlockResult<Option<Vec<u8>>> {
        let at = envelope
            .get(inner_offset as usize..)
            .ok_or(BlockError::Corruption("inner_offset past end of envelope"))?;
        let (_, value) =
            get_length_prefixed_slice(at).ok_or(BlockError::Corruption("length-prefixed sub-value underrun"))?;
        Ok(Some(value.to_vec()))
    }
}
