use quick_error::quick_error;
use std::io;

quick_error! {
    /// Everything that can go wrong opening or reading a block file.
    ///
    /// `NotFound` is deliberately absent: a missing key is a routine
    /// outcome, so `Block::get` returns `Ok(None)` for it instead of an
    /// error variant.
    #[derive(Debug)]
    pub enum BlockError {
        Io(err: io::Error) {
            from()
            description("io error")
            display("I/O error: {}", err)
            cause(err)
        }
        TooSmall(size: u64, min: u64) {
            description("file too small to be a block")
            display("file is {} bytes, need at least {}", size, min)
        }
        BadMagic(found: [u8; 4]) {
            description("magic mismatch")
            display("bad magic: {:02x?}", found)
        }
        BadMeta(reason: &'static str) {
            description("meta record failed validation")
            display("bad meta: {}", reason)
        }
        Corruption(reason: &'static str) {
            description("corrupt block contents")
            display("corruption: {}", reason)
        }
    }
}

pub type BlockResult<T> = Result<T, BlockError>;
