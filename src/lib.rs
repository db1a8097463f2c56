#![allow(dead_code)]

//! A read-only, immutable, hash-indexed key-value block.
//!
//! A block is a five-segment file — magic, mmap'd data, entries, bucket,
//! meta — built once by an external writer and then opened here for
//! exact-match lookups. See [`Block`] for the entry point.

pub mod block;
pub mod bucket;
pub mod coding;
pub mod compress;
pub mod error;
pub mod hash;
pub mod meta;

pub use block::{Block, OpenOptions};
pub use compress::Compress;
pub use error::{BlockError, BlockResult};
pub use meta::Meta;
