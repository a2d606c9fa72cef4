//! Variable-width code emitter/decoder (component E).
//!
//! Both engines must compute the prevailing code width from the same
//! quantity at corresponding points in the stream: the decoder from
//! `d_next` before reading a code, the encoder from `d_next - 1` right
//! after the allocation that follows an emission. See `engine` for the
//! call sites; this module only supplies the shared arithmetic.

use crate::{DICT_SIZE_MAX,DICT_SIZE_MIN};

/// Bits needed to represent `n` distinct unsigned values, i.e. the smallest
/// `w` with `2.pow(w) >= n`. `n == 0` is treated the same as `n == 1`.
pub const fn ceil_log2(n: usize) -> usize {
    if n <= 1 {
        1
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as usize
    }
}

/// Width of the START sentinel: `ceil_log2(DICT_SIZE_MIN + 1)` = 9 bits.
pub const START_WIDTH: usize = ceil_log2(DICT_SIZE_MIN + 1);
/// Width of the d_size announcement that follows START: `ceil_log2(DICT_SIZE_MAX + 1)` = 21 bits.
pub const SIZE_WIDTH: usize = ceil_log2(DICT_SIZE_MAX + 1);
