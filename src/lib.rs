//! # rolz78
//!
//! A streaming LZ78 compressor/expander with a dual-dictionary rotation scheme.
//!
//! * `bitstream` is the bit-granular, would-block-aware I/O layer (component A).
//! * `dict` holds the compressor and decompressor dictionaries plus the
//!   main/secondary rotation manager (components B, C, D).
//! * `codec` computes the variable code width that both engines agree on
//!   (component E).
//! * `engine` drives the byte-in/code-out and code-in/byte-out state machines
//!   (components F, G).
//!
//! Argument parsing, file opening, and the would-block retry loop are left to
//! the caller (see `main.rs`); this crate's surface is a pair of byte
//! sources/sinks and a configuration record.
//!
//! ## Buffer example
//!
//! ```rs
//! use rolz78::*;
//! let test_data = b"This is the chaunt of the priests.".to_vec();
//! let compressed = compress_slice(&test_data,DICT_SIZE_DEFAULT).expect("compression failed");
//! let expanded = expand_slice(&compressed).expect("expansion failed");
//! assert_eq!(test_data,expanded);
//! ```

pub mod bitstream;
pub mod codec;
pub mod dict;
pub mod engine;
pub mod sizeparse;

use std::io::{Cursor,Read,Write};

pub use engine::{CompressEngine,DecompressEngine,Progress};
pub use sizeparse::parse_size;

/// Reserved code values that coexist with data codes on the wire.
pub const EOF_CODE: usize = 256;
pub const SIZE_CODE: usize = 257;
pub const START_CODE: usize = 258;
pub const STOP_CODE: usize = 259;

/// First code available for user-built dictionary entries.
pub const DICT_SIZE_MIN: usize = 260;
/// Default negotiated dictionary size when the caller does not override it.
pub const DICT_SIZE_DEFAULT: usize = 4096;
/// Largest dictionary size the wire format can carry (21-bit field, see `codec`).
pub const DICT_SIZE_MAX: usize = 1_048_576;
/// Default `BitStream` buffer capacity, in bits.
pub const DEFAULT_BUF_CAPACITY_BITS: usize = 8 * 1024 * 1024;

/// Clamp a requested dictionary size into `(DICT_SIZE_MIN, DICT_SIZE_MAX]`.
pub fn clamp_dict_size(requested: usize) -> usize {
    requested.clamp(DICT_SIZE_MIN + 1,DICT_SIZE_MAX)
}

/// Tree errors.
///
/// There is no process-global "last error" slot; every fallible entry point
/// returns one of these directly, or propagates it to the caller.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("engine was not initialized")]
    Initialization,
    #[error("engine invoked in the wrong mode")]
    Mode,
    #[error("read error: {0}")]
    Read(#[source] std::io::Error),
    #[error("write error: {0}")]
    Write(#[source] std::io::Error),
    #[error("operation would block, retry with the same engine")]
    Again,
    #[error("compression error: {0}")]
    Compress(String),
    #[error("decompression error: {0}")]
    Decompress(String),
    #[error("dictionary allocation failed")]
    Dictionary
}

/// Result alias used throughout the core.
pub type CoreResult<T> = Result<T,Error>;

/// Engine configuration record (see external interfaces). Everything outside
/// this struct and a pair of byte sources/sinks is an external collaborator's
/// problem (argument parsing, file opening, retry loop, ...).
#[derive(Clone,Copy,Debug)]
pub struct EngineConfig {
    /// Requested main dictionary size; clamped to `(DICT_SIZE_MIN, DICT_SIZE_MAX]`.
    /// Ignored by the decompressor, which learns the negotiated size from the stream.
    pub d_size: usize,
    /// `BitStream` buffer capacity, in bits. Must be a multiple of 8.
    pub buf_capacity_bits: usize
}

pub const STD_CONFIG: EngineConfig = EngineConfig {
    d_size: DICT_SIZE_DEFAULT,
    buf_capacity_bits: DEFAULT_BUF_CAPACITY_BITS
};

/// Convenience function: compress an in-memory buffer in one shot.
/// Not would-block aware (a `Cursor`/`Vec` never blocks); intended for tests
/// and small buffers, analogous to the teacher crate's `compress_slice` helpers.
pub fn compress_slice(data: &[u8],d_size: usize) -> CoreResult<Vec<u8>> {
    let mut src = Cursor::new(data);
    let mut dst: Vec<u8> = Vec::new();
    let cfg = EngineConfig {
        d_size: clamp_dict_size(d_size),
        ..STD_CONFIG
    };
    let mut engine = CompressEngine::new(cfg)?;
    loop {
        match engine.step(&mut src,&mut dst)? {
            Progress::Done => break,
            Progress::Again => continue
        }
    }
    engine.close(&mut dst)?;
    Ok(dst)
}

/// Convenience function: expand an in-memory buffer in one shot.
pub fn expand_slice(data: &[u8]) -> CoreResult<Vec<u8>> {
    let mut src = Cursor::new(data);
    let mut dst: Vec<u8> = Vec::new();
    let mut engine = DecompressEngine::new()?;
    loop {
        match engine.step(&mut src,&mut dst)? {
            Progress::Done => break,
            Progress::Again => continue
        }
    }
    engine.close()?;
    Ok(dst)
}

/// Blanket-implemented marker so any `Read` can serve as a core byte source;
/// `std::io::ErrorKind::WouldBlock` is the transient-suspension signal (§5,§7).
pub trait ByteSource: Read {}
impl<T: Read> ByteSource for T {}

/// Blanket-implemented marker so any `Write` can serve as a core byte sink.
pub trait ByteSink: Write {}
impl<T: Write> ByteSink for T {}
