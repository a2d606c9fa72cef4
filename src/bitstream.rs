//! Bit-granular buffered reader/writer over a raw byte stream.
//!
//! `BitReader`/`BitWriter` realize the single `BitStream` component from the
//! design: direction is carried by the type (`R: Read` vs `W: Write`) rather
//! than a runtime tag, since the teacher crate already splits its bit-level
//! helpers the same way (`lzw::LZWCoder` / `lzw::LZWDecoder`). Both keep a
//! small internal byte buffer and compact it after every flush/refill instead
//! of indexing it as a true ring buffer — the same trick the teacher's coder
//! and decoder use in their own `drop_leading_bits` methods ("keep the bit
//! vector small, we don't need the bits behind us").
//!
//! Bits are packed LSB-first within each byte, per the wire format.

use crate::{CoreResult,Error};
use std::io::{ErrorKind,Read,Write};

#[inline]
fn get_bit(buf: &[u8],pos: usize) -> bool {
    (buf[pos/8] >> (pos%8)) & 1 != 0
}

#[inline]
fn set_bit(buf: &mut [u8],pos: usize,val: bool) {
    let byte = &mut buf[pos/8];
    if val {
        *byte |= 1 << (pos%8);
    } else {
        *byte &= !(1 << (pos%8));
    }
}

/// The reusable part of a `BitReader`'s state, independent of its source.
/// Engines that are handed a fresh `&mut impl Read` on every call (rather
/// than owning it across the whole session) keep one of these between calls
/// and wrap it around the borrowed source just for the duration of a step.
#[derive(Clone)]
pub struct ReaderState {
    buf: Vec<u8>,
    w_start: usize,
    w_len: usize,
    eof: bool
}

impl ReaderState {
    pub fn new(capacity_bits: usize) -> CoreResult<Self> {
        if capacity_bits == 0 || capacity_bits % 8 != 0 {
            return Err(Error::Initialization);
        }
        Ok(Self {
            buf: vec![0u8;capacity_bits/8],
            w_start: 0,
            w_len: 0,
            eof: false
        })
    }
}

/// Buffered, would-block-aware bit source.
pub struct BitReader<R: Read> {
    src: R,
    buf: Vec<u8>,
    w_start: usize,
    w_len: usize,
    eof: bool
}

impl<R: Read> BitReader<R> {
    /// `capacity_bits` must be divisible by 8 and nonzero.
    pub fn open(src: R,capacity_bits: usize) -> CoreResult<Self> {
        if capacity_bits == 0 || capacity_bits % 8 != 0 {
            return Err(Error::Initialization);
        }
        Ok(Self {
            src,
            buf: vec![0u8;capacity_bits/8],
            w_start: 0,
            w_len: 0,
            eof: false
        })
    }

    /// Wrap a borrowed source around previously-suspended window state.
    pub fn resume(src: R,state: ReaderState) -> Self {
        Self {
            src,
            buf: state.buf,
            w_start: state.w_start,
            w_len: state.w_len,
            eof: state.eof
        }
    }

    /// Detach the source and hand back the window state for safekeeping.
    pub fn suspend(self) -> ReaderState {
        ReaderState {
            buf: self.buf,
            w_start: self.w_start,
            w_len: self.w_len,
            eof: self.eof
        }
    }

    /// Pull more bytes from the source into the window. Only ever called when
    /// the window is empty, so the refilled window always starts at bit 0.
    fn refill(&mut self) -> CoreResult<usize> {
        if self.eof {
            return Ok(0);
        }
        match self.src.read(&mut self.buf) {
            Ok(0) => {
                self.eof = true;
                Ok(0)
            },
            Ok(n) => {
                self.w_start = 0;
                self.w_len = n * 8;
                Ok(n)
            },
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(Error::Read(e))
        }
    }

    /// Copy up to `n_bits` bits into `dst`, starting at `dst_bit_offset`
    /// within `dst`'s first byte. Returns the number of bits actually copied;
    /// a short count means would-block or end of stream, not an error.
    pub fn read(&mut self,dst: &mut [u8],n_bits: usize,dst_bit_offset: usize) -> CoreResult<usize> {
        let mut copied = 0;
        while copied < n_bits {
            if self.w_len == 0 {
                if self.refill()? == 0 {
                    break;
                }
                continue;
            }
            let avail = self.w_len.min(n_bits - copied);
            let dst_pos = dst_bit_offset + copied;
            if dst_pos % 8 == 0 && self.w_start % 8 == 0 && avail >= 8 {
                let n_bytes = avail / 8;
                let src_byte = self.w_start / 8;
                let dst_byte = dst_pos / 8;
                dst[dst_byte..dst_byte + n_bytes].copy_from_slice(&self.buf[src_byte..src_byte + n_bytes]);
                self.w_start += n_bytes * 8;
                self.w_len -= n_bytes * 8;
                copied += n_bytes * 8;
            } else {
                let mut n = 0;
                while n < avail {
                    let bit = get_bit(&self.buf,self.w_start);
                    set_bit(dst,dst_pos + n,bit);
                    self.w_start += 1;
                    self.w_len -= 1;
                    n += 1;
                    copied += 1;
                    if n % 8 == 0 {
                        break; // reassess alignment on the outer loop
                    }
                }
            }
        }
        Ok(copied)
    }

    /// Reading side has nothing to flush; provided for symmetry with the writer.
    pub fn close(&mut self) -> CoreResult<()> {
        Ok(())
    }
}

/// The reusable part of a `BitWriter`'s state, independent of its sink. See
/// `ReaderState` for why this split exists.
#[derive(Clone)]
pub struct WriterState {
    buf: Vec<u8>,
    w_start: usize,
    w_len: usize,
    buf_bits: usize
}

impl WriterState {
    pub fn new(capacity_bits: usize) -> CoreResult<Self> {
        if capacity_bits == 0 || capacity_bits % 8 != 0 {
            return Err(Error::Initialization);
        }
        Ok(Self {
            buf: vec![0u8;capacity_bits/8],
            w_start: 0,
            w_len: 0,
            buf_bits: capacity_bits
        })
    }
}

/// Buffered, would-block-aware bit sink.
pub struct BitWriter<W: Write> {
    sink: W,
    buf: Vec<u8>,
    w_start: usize,
    w_len: usize,
    buf_bits: usize
}

impl<W: Write> BitWriter<W> {
    pub fn open(sink: W,capacity_bits: usize) -> CoreResult<Self> {
        if capacity_bits == 0 || capacity_bits % 8 != 0 {
            return Err(Error::Initialization);
        }
        Ok(Self {
            sink,
            buf: vec![0u8;capacity_bits/8],
            w_start: 0,
            w_len: 0,
            buf_bits: capacity_bits
        })
    }

    /// Wrap a borrowed sink around previously-suspended window state.
    pub fn resume(sink: W,state: WriterState) -> Self {
        Self {
            sink,
            buf: state.buf,
            w_start: state.w_start,
            w_len: state.w_len,
            buf_bits: state.buf_bits
        }
    }

    /// Detach the sink and hand back the window state for safekeeping.
    pub fn suspend(self) -> WriterState {
        WriterState {
            buf: self.buf,
            w_start: self.w_start,
            w_len: self.w_len,
            buf_bits: self.buf_bits
        }
    }

    /// Move the unflushed tail down to the front of the buffer, the way the
    /// teacher's bit coders call `drop_leading_bits` to keep the live region small.
    fn compact(&mut self) {
        if self.w_start == 0 {
            return;
        }
        let start_byte = self.w_start / 8;
        let nbytes = (self.w_len + 7) / 8;
        if nbytes > 0 {
            self.buf.copy_within(start_byte..start_byte + nbytes,0);
        }
        self.w_start = 0;
    }

    /// Write whole buffered bytes out; the trailing partial byte, if any, stays
    /// buffered until `close`. Returns the number of bytes actually written.
    pub fn flush(&mut self) -> CoreResult<usize> {
        let whole_bytes = self.w_len / 8;
        if whole_bytes == 0 {
            return Ok(0);
        }
        let start_byte = self.w_start / 8;
        match self.sink.write(&self.buf[start_byte..start_byte + whole_bytes]) {
            Ok(0) => Ok(0),
            Ok(n) => {
                self.w_start += n * 8;
                self.w_len -= n * 8;
                self.compact();
                Ok(n)
            },
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(Error::Write(e))
        }
    }

    /// Copy up to `n_bits` bits from `src` (starting at `src_bit_offset`) into
    /// the stream. Returns the number of bits actually accepted; a short
    /// count means the underlying sink would block.
    pub fn write(&mut self,src: &[u8],n_bits: usize,src_bit_offset: usize) -> CoreResult<usize> {
        let mut copied = 0;
        while copied < n_bits {
            if self.w_start + self.w_len == self.buf_bits {
                if self.flush()? == 0 {
                    break;
                }
                continue;
            }
            let free = self.buf_bits - (self.w_start + self.w_len);
            let avail = free.min(n_bits - copied);
            let src_pos = src_bit_offset + copied;
            let write_pos = self.w_start + self.w_len;
            if src_pos % 8 == 0 && write_pos % 8 == 0 && avail >= 8 {
                let n_bytes = avail / 8;
                let dst_byte = write_pos / 8;
                let src_byte = src_pos / 8;
                self.buf[dst_byte..dst_byte + n_bytes].copy_from_slice(&src[src_byte..src_byte + n_bytes]);
                self.w_len += n_bytes * 8;
                copied += n_bytes * 8;
            } else {
                let mut n = 0;
                while n < avail {
                    let bit = get_bit(src,src_pos + n);
                    let pos = self.w_start + self.w_len;
                    set_bit(&mut self.buf,pos,bit);
                    self.w_len += 1;
                    n += 1;
                    copied += 1;
                    if n % 8 == 0 {
                        break;
                    }
                }
            }
        }
        Ok(copied)
    }

    /// Pad the trailing partial byte with zero bits, then flush until the
    /// buffer is empty. Returns `Error::Again` if the sink would still block.
    pub fn close(&mut self) -> CoreResult<()> {
        let rem = self.w_len % 8;
        if rem != 0 {
            let pad = 8 - rem;
            let zeros = [0u8;1];
            let written = self.write(&zeros,pad,0)?;
            if written < pad {
                return Err(Error::Again);
            }
        }
        loop {
            if self.w_len == 0 {
                return self.sink.flush().map_err(Error::Write);
            }
            if self.flush()? == 0 {
                return Err(Error::Again);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_unaligned_widths() {
        let widths = [9,3,21,1,7,12,4];
        let values: Vec<usize> = vec![300,5,1_000_000,1,100,4000,9];
        let mut out: Vec<u8> = Vec::new();
        {
            let mut w = BitWriter::open(&mut out,64).unwrap();
            for (width,value) in widths.iter().zip(values.iter()) {
                let bytes = (*value as u32).to_le_bytes();
                w.write(&bytes,*width,0).unwrap();
            }
            w.close().unwrap();
        }
        let mut r = BitReader::open(Cursor::new(out),64).unwrap();
        for (width,value) in widths.iter().zip(values.iter()) {
            let mut dst = [0u8;4];
            let got = r.read(&mut dst,*width,0).unwrap();
            assert_eq!(got,*width);
            let decoded = u32::from_le_bytes(dst) as usize;
            assert_eq!(decoded,*value);
        }
    }

    #[test]
    fn partial_writes_then_close_round_trips() {
        let bits: Vec<bool> = (0..37).map(|i| i % 3 == 0).collect();
        let mut out: Vec<u8> = Vec::new();
        {
            let mut w = BitWriter::open(&mut out,16).unwrap();
            for chunk in bits.chunks(5) {
                let mut byte = 0u8;
                for (i,b) in chunk.iter().enumerate() {
                    if *b {
                        byte |= 1 << i;
                    }
                }
                w.write(&[byte],chunk.len(),0).unwrap();
            }
            w.close().unwrap();
        }
        let mut r = BitReader::open(Cursor::new(out),16).unwrap();
        for b in &bits {
            let mut dst = [0u8;1];
            let got = r.read(&mut dst,1,0).unwrap();
            assert_eq!(got,1);
            assert_eq!(dst[0] & 1 == 1,*b);
        }
    }

    #[test]
    fn read_on_empty_stream_returns_zero() {
        let mut r = BitReader::open(Cursor::new(Vec::<u8>::new()),8).unwrap();
        let mut dst = [0u8;1];
        let got = r.read(&mut dst,1,0).unwrap();
        assert_eq!(got,0);
    }

    #[test]
    fn rejects_non_byte_multiple_capacity() {
        assert!(BitReader::open(Cursor::new(Vec::<u8>::new()),5).is_err());
        assert!(BitWriter::open(Vec::<u8>::new(),5).is_err());
    }

    #[test]
    fn suspend_then_resume_preserves_partial_progress() {
        let mut out: Vec<u8> = Vec::new();
        let mut state = WriterState::new(16).unwrap();
        {
            let mut w = BitWriter::resume(&mut out,state);
            w.write(&[0b1010_1010],5,0).unwrap();
            state = w.suspend();
        }
        {
            let mut w = BitWriter::resume(&mut out,state);
            w.write(&[0b110],3,0).unwrap();
            w.close().unwrap();
        }
        let mut r = BitReader::open(Cursor::new(out),16).unwrap();
        let mut dst = [0u8;1];
        r.read(&mut dst,8,0).unwrap();
        assert_eq!(dst[0],0b110_01010);
    }
}
