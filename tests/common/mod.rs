//! Test-only block construction. Writing blocks is out of scope for the
//! library itself, so this byte-exact encoder lives under `tests/`, not
//! `src/`.

use blockkv::coding::{encode_fixed32, encode_fixed64, put_length_prefixed_slice, put_varint32, put_varint64};
use blockkv::compress::Compress;
use blockkv::hash::hash;
use blockkv::meta::{MAGIC, META_LEN};

fn compress_discriminant(c: Compress) -> u8 {
    match c {
        Compress::NoCompress => 0,
        Compress::Snappy => 1,
        Compress::SegmentSnappy => 2,
        Compress::SegmentZlib => 3,
    }
}

fn write_meta(
    buf: &mut Vec<u8>,
    data_length: u64,
    entries_length: u64,
    bucket_length: u64,
    hash_table_length: u64,
    max_list_length: u32,
    compress: Compress,
) {
    encode_fixed32(buf, 4); // magic_length
    encode_fixed64(buf, data_length);
    encode_fixed64(buf, entries_length);
    encode_fixed64(buf, bucket_length);
    encode_fixed32(buf, META_LEN as u32);
    encode_fixed64(buf, hash_table_length);
    encode_fixed32(buf, max_list_length);
    buf.push(compress_discriminant(compress));
    encode_fixed32(buf, MAGIC);
}

struct PlacedEntry {
    bucket: usize,
    key: Vec<u8>,
    data_offset: u64,
    inner_offset: Option<u32>,
}

fn assemble(
    data: Vec<u8>,
    mut placed: Vec<PlacedEntry>,
    hash_table_length: u64,
    compress: Compress,
    max_list_length: u32,
) -> Vec<u8> {
    placed.sort_by_key(|e| e.bucket);

    let mut entries = vec![];
    let mut bucket_offsets = vec![0u64; hash_table_length as usize + 1];
    let mut next_bucket = 0usize;

    for entry in &placed {
        while next_bucket <= entry.bucket {
            bucket_offsets[next_bucket] = entries.len() as u64;
            next_bucket += 1;
        }
        encode_fixed32(&mut entries, hash(&entry.key, 0));
        put_varint64(&mut entries, entry.data_offset);
        if let Some(io) = entry.inner_offset {
            put_varint32(&mut entries, io);
        }
        entries.push(entry.key.len() as u8);
        entries.extend_from_slice(&entry.key);
    }
    while next_bucket <= hash_table_length as usize {
        bucket_offsets[next_bucket] = entries.len() as u64;
        next_bucket += 1;
    }

    let mut bucket = vec![];
    for off in &bucket_offsets {
        encode_fixed64(&mut bucket, *off);
    }

    let mut file = vec![];
    encode_fixed32(&mut file, MAGIC);
    file.extend_from_slice(&data);
    file.extend_from_slice(&entries);
    file.extend_from_slice(&bucket);
    write_meta(
        &mut file,
        data.len() as u64,
        entries.len() as u64,
        bucket.len() as u64,
        hash_table_length,
        max_list_length,
        compress,
    );
    file
}

fn bucket_of(key: &[u8], hash_table_length: u64) -> usize {
    (hash(key, 0) as u64 & (hash_table_length - 1)) as usize
}

/// One value per key, each its own length-prefixed payload in the data
/// segment. Used for `NoCompress` and whole-block `Snappy`.
pub fn build_simple_block(
    pairs: &[(&[u8], &[u8])],
    hash_table_length: u64,
    compress: Compress,
    max_list_length: u32,
) -> Vec<u8> {
    let mut data = vec![];
    let mut placed = vec![];
    for &(key, value) in pairs {
        let data_offset = data.len() as u64;
        let payload = match compress {
            Compress::NoCompress => value.to_vec(),
            Compress::Snappy => snap::raw::Encoder::new().compress_vec(value).unwrap(),
            _ => panic!("build_simple_block only supports NoCompress/Snappy"),
        };
        put_length_prefixed_slice(&mut data, &payload);
        placed.push(PlacedEntry {
            bucket: bucket_of(key, hash_table_length),
            key: key.to_vec(),
            data_offset,
            inner_offset: None,
        });
    }
    assemble(data, placed, hash_table_length, compress, max_list_length)
}

/// Many keys addressing sub-values inside one shared, compressed envelope:
/// `(key, sub_value)` pairs are packed length-prefixed into a single
/// envelope, the whole envelope is compressed once, and every entry's
/// `inner_offset` points at its sub-value's length prefix inside the
/// decompressed envelope.
pub fn build_segmented_block(
    entries: &[(&[u8], &[u8])],
    hash_table_length: u64,
    compress: Compress,
    max_list_length: u32,
    corrupt_compressed_byte: bool,
) -> Vec<u8> {
    let mut envelope = vec![];
    let mut inner_offsets = vec![];
    for &(_, sub_value) in entries {
        inner_offsets.push(envelope.len() as u32);
        put_length_prefixed_slice(&mut envelope, sub_value);
    }

    let mut data = vec![];
    match compress {
        Compress::SegmentSnappy => {
            let compressed = snap::raw::Encoder::new().compress_vec(&envelope).unwrap();
            put_length_prefixed_slice(&mut data, &compressed);
        }
        Compress::SegmentZlib => {
            use std::io::Write;
            let mut encoder =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&envelope).unwrap();
            let mut compressed = encoder.finish().unwrap();
            if corrupt_compressed_byte {
                let last = compressed.len() - 1;
                compressed[last] ^= 0xff;
            }
            let mut payload = vec![];
            put_varint32(&mut payload, envelope.len() as u32);
            payload.extend_from_slice(&compressed);
            put_length_prefixed_slice(&mut data, &payload);
        }
        _ => panic!("build_segmented_block only supports SegmentSnappy/SegmentZlib"),
    }

    let placed = entries
        .iter()
        .zip(inner_offsets)
        .map(|(&(key, _), inner_offset)| PlacedEntry {
            bucket: bucket_of(key, hash_table_length),
            key: key.to_vec(),
            data_offset: 0,
            inner_offset: Some(inner_offset),
        })
        .collect();

    assemble(data, placed, hash_table_length, compress, max_list_length)
}
