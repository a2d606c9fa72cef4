//! Byte-in/code-out and code-in/byte-out state machines (components F, G).
//!
//! Both engines are explicit state machines, not coroutines: every
//! suspension point (a partial bit write, a partial bit read, a partial
//! output flush) is represented as engine-owned state so that a `step` call
//! which returns `Progress::Again` can be re-invoked and pick up exactly
//! where it left off. Neither engine loops internally on a would-block
//! signal from its underlying byte stream; that is the caller's retry loop
//! (see `main.rs`).

use crate::bitstream::{BitReader,BitWriter,ReaderState,WriterState};
use crate::codec;
use crate::dict::{CompressDual,DecompressDual,Extend};
use crate::{
    clamp_dict_size,CoreResult,Error,EngineConfig,DEFAULT_BUF_CAPACITY_BITS,EOF_CODE,SIZE_CODE,
    START_CODE,STOP_CODE
};
use std::collections::VecDeque;
use std::io::{ErrorKind,Read,Write};

/// Outcome of one `step` call.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Progress {
    /// The stream is fully produced/consumed; call `close` next.
    Done,
    /// The underlying source or sink would have blocked; state is preserved,
    /// call `step` again with the same (or an equivalent, now-ready) source/sink.
    Again
}

enum CPhase {
    Start,
    Body,
    Eof,
    Stop,
    Done
}

/// Drives bytes in, variable-width codes out.
pub struct CompressEngine {
    dict: CompressDual,
    d_size: usize,
    writer_state: Option<WriterState>,
    phase: CPhase,
    code_queue: VecDeque<(u32,usize)>,
    pending: Option<(u32,usize,usize)>
}

impl CompressEngine {
    pub fn new(cfg: EngineConfig) -> CoreResult<Self> {
        let d_size = clamp_dict_size(cfg.d_size);
        Ok(Self {
            dict: CompressDual::new(d_size),
            d_size,
            writer_state: Some(WriterState::new(cfg.buf_capacity_bits)?),
            phase: CPhase::Start,
            code_queue: VecDeque::new(),
            pending: None
        })
    }

    /// Absorb as much of `src` as the underlying `dst` will currently accept.
    /// Returns `Progress::Again` the moment either side would block, with all
    /// state preserved for an identical re-invocation.
    pub fn step<R: Read,W: Write>(&mut self,src: &mut R,dst: &mut W) -> CoreResult<Progress> {
        let state = self.writer_state.take().ok_or(Error::Mode)?;
        let mut writer = BitWriter::resume(dst,state);
        let result = self.drive(src,&mut writer);
        self.writer_state = Some(writer.suspend());
        result
    }

    fn drive<R: Read,W: Write>(&mut self,src: &mut R,writer: &mut BitWriter<&mut W>) -> CoreResult<Progress> {
        loop {
            if let Some((value,width,written)) = self.pending {
                let bytes = value.to_le_bytes();
                let n = writer.write(&bytes,width - written,written)?;
                if written + n < width {
                    self.pending = Some((value,width,written + n));
                    return Ok(Progress::Again);
                }
                self.pending = None;
                continue;
            }
            if let Some((value,width)) = self.code_queue.pop_front() {
                self.pending = Some((value,width,0));
                continue;
            }
            match self.phase {
                CPhase::Start => {
                    self.code_queue.push_back((START_CODE as u32,codec::START_WIDTH));
                    self.code_queue.push_back((self.d_size as u32,codec::SIZE_WIDTH));
                    self.phase = CPhase::Body;
                },
                CPhase::Body => {
                    let mut one = [0u8;1];
                    match src.read(&mut one) {
                        Ok(0) => {
                            // Flush whatever phrase is still being absorbed
                            // before announcing EOF; otherwise the last
                            // matched phrase is silently dropped.
                            if let Some((node,width)) = self.dict.flush() {
                                self.code_queue.push_back((node as u32,width));
                            }
                            let width = codec::ceil_log2(self.dict.d_next());
                            self.code_queue.push_back((EOF_CODE as u32,width));
                            self.phase = CPhase::Eof;
                        },
                        Ok(_) => match self.dict.extend(one[0]) {
                            Extend::Absorbed => {},
                            Extend::Emit { prev_node,child,.. } => {
                                // child is d_next - 1 at the moment of allocation; read it
                                // off the report, not the dict's current d_next, since
                                // extend() may have already swapped and rewound that.
                                let width = codec::ceil_log2(child);
                                self.code_queue.push_back((prev_node as u32,width));
                            }
                        },
                        Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(Progress::Again),
                        Err(e) => return Err(Error::Read(e))
                    }
                },
                CPhase::Eof => {
                    let width = codec::ceil_log2(self.dict.d_next());
                    self.code_queue.push_back((STOP_CODE as u32,width));
                    self.phase = CPhase::Stop;
                },
                CPhase::Stop => {
                    self.phase = CPhase::Done;
                },
                CPhase::Done => return Ok(Progress::Done)
            }
        }
    }

    /// Pad the trailing partial byte and flush. Returns `Error::Again` if the
    /// sink is still not ready; safe to call again once it is.
    pub fn close<W: Write>(&mut self,dst: &mut W) -> CoreResult<()> {
        let state = self.writer_state.take().ok_or(Error::Mode)?;
        let mut writer = BitWriter::resume(dst,state);
        let result = writer.close();
        self.writer_state = Some(writer.suspend());
        result
    }
}

enum DPhase {
    Start,
    Size,
    Body,
    Stop,
    Done
}

/// Drives variable-width codes in, bytes out.
pub struct DecompressEngine {
    dict: Option<DecompressDual>,
    d_size: usize,
    reader_state: Option<ReaderState>,
    phase: DPhase,
    pending_code: Option<([u8;4],usize,usize)>,
    pending_out: Option<(Vec<u8>,usize)>
}

impl DecompressEngine {
    pub fn new() -> CoreResult<Self> {
        Ok(Self {
            dict: None,
            d_size: 0,
            reader_state: Some(ReaderState::new(DEFAULT_BUF_CAPACITY_BITS)?),
            phase: DPhase::Start,
            pending_code: None,
            pending_out: None
        })
    }

    pub fn step<R: Read,W: Write>(&mut self,src: &mut R,dst: &mut W) -> CoreResult<Progress> {
        let state = self.reader_state.take().ok_or(Error::Mode)?;
        let mut reader = BitReader::resume(src,state);
        let result = self.drive(&mut reader,dst);
        self.reader_state = Some(reader.suspend());
        result
    }

    /// Read `width` bits, resuming a partial read from an earlier call if the
    /// width matches. Returns `Ok(None)` on a short read (would-block/EOF).
    fn read_code<R: Read>(&mut self,reader: &mut BitReader<&mut R>,width: usize) -> CoreResult<Option<usize>> {
        let (mut buf,got) = match self.pending_code.take() {
            Some((b,w,g)) if w == width => (b,g),
            _ => ([0u8;4],0)
        };
        let n = reader.read(&mut buf,width - got,got)?;
        let got = got + n;
        if got < width {
            self.pending_code = Some((buf,width,got));
            Ok(None)
        } else {
            Ok(Some(u32::from_le_bytes(buf) as usize))
        }
    }

    /// Drain previously-decoded bytes to `dst`. Returns `false` if the sink
    /// would block with bytes still pending.
    fn flush_pending_out<W: Write>(&mut self,dst: &mut W) -> CoreResult<bool> {
        if let Some((buf,offset)) = &mut self.pending_out {
            while *offset < buf.len() {
                match dst.write(&buf[*offset..]) {
                    Ok(0) => return Ok(false),
                    Ok(n) => *offset += n,
                    Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(false),
                    Err(e) => return Err(Error::Write(e))
                }
            }
            self.pending_out = None;
        }
        Ok(true)
    }

    fn drive<R: Read,W: Write>(&mut self,reader: &mut BitReader<&mut R>,dst: &mut W) -> CoreResult<Progress> {
        loop {
            if !self.flush_pending_out(dst)? {
                return Ok(Progress::Again);
            }
            match self.phase {
                DPhase::Start => match self.read_code(reader,codec::START_WIDTH)? {
                    None => return Ok(Progress::Again),
                    Some(code) => {
                        if code != START_CODE {
                            return Err(Error::Decompress(format!("expected START sentinel, got {}",code)));
                        }
                        self.phase = DPhase::Size;
                    }
                },
                DPhase::Size => match self.read_code(reader,codec::SIZE_WIDTH)? {
                    None => return Ok(Progress::Again),
                    Some(size) => {
                        let d_size = clamp_dict_size(size);
                        self.d_size = d_size;
                        self.dict = Some(DecompressDual::new(d_size));
                        self.phase = DPhase::Body;
                    }
                },
                DPhase::Body => {
                    let width = codec::ceil_log2(self.dict.as_ref().ok_or(Error::Initialization)?.d_next());
                    match self.read_code(reader,width)? {
                        None => return Ok(Progress::Again),
                        Some(code) => {
                            if code == EOF_CODE {
                                self.phase = DPhase::Stop;
                            } else if code == STOP_CODE || code == START_CODE || code == SIZE_CODE {
                                return Err(Error::Decompress(format!("unexpected sentinel {} in data stream",code)));
                            } else {
                                let dict = self.dict.as_mut().ok_or(Error::Initialization)?;
                                let r = dict.emit(code)?;
                                let bytes = dict.scratch()[r.offset..r.offset + r.n_bytes].to_vec();
                                self.pending_out = Some((bytes,0));
                            }
                        }
                    }
                },
                DPhase::Stop => {
                    let width = codec::ceil_log2(self.dict.as_ref().ok_or(Error::Initialization)?.d_next());
                    match self.read_code(reader,width)? {
                        None => return Ok(Progress::Again),
                        Some(_stop) => self.phase = DPhase::Done
                    }
                },
                DPhase::Done => return Ok(Progress::Done)
            }
        }
    }

    /// The read side never buffers anything that needs a final flush; this
    /// just confirms the engine actually reached the end of the stream.
    pub fn close(&mut self) -> CoreResult<()> {
        match self.phase {
            DPhase::Done => Ok(()),
            _ => Err(Error::Again)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compress_slice,expand_slice,DICT_SIZE_DEFAULT,DICT_SIZE_MIN};

    fn round_trip(data: &[u8],d_size: usize) {
        let compressed = compress_slice(data,d_size).expect("compress");
        let expanded = expand_slice(&compressed).expect("expand");
        assert_eq!(expanded,data);
    }

    #[test]
    fn empty_input_round_trips() {
        round_trip(b"",DICT_SIZE_DEFAULT);
    }

    #[test]
    fn run_of_one_byte_round_trips() {
        round_trip(b"AAAAAAAA",DICT_SIZE_MIN + 1);
    }

    #[test]
    fn alternating_bytes_round_trip() {
        round_trip(b"ABABABABAB",DICT_SIZE_DEFAULT);
    }

    #[test]
    fn repeating_pattern_compresses_and_round_trips() {
        let pattern: Vec<u8> = (0..37u32).map(|i| (i % 251) as u8).collect();
        let mut data = Vec::with_capacity(1 << 20);
        while data.len() < (1 << 20) {
            data.extend_from_slice(&pattern);
        }
        let compressed = compress_slice(&data,4096).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(expand_slice(&compressed).unwrap(),data);
    }

    #[test]
    fn small_dictionary_forces_a_swap_and_still_round_trips() {
        // d_size just above the minimum forces the dual dictionary through
        // several threshold-shadow/swap cycles for even a modest input.
        let d_size = DICT_SIZE_MIN + 20;
        let mut data = Vec::new();
        for i in 0u32..2000 {
            data.push((i % 17) as u8);
            data.push((i % 5) as u8);
        }
        round_trip(&data,d_size);
    }

    #[test]
    fn boundary_dict_sizes_round_trip() {
        round_trip(b"The quick brown fox jumps over the lazy dog.",DICT_SIZE_MIN + 1);
    }

    #[test]
    fn minimum_dict_size_survives_many_swap_cycles() {
        // d_size = DICT_SIZE_MIN + 1 can only ever hold a single entry before
        // a swap, forcing a swap on nearly every emission; exercises the
        // code-width-at-the-swap-boundary and reset-on-exhausted-rotation
        // paths far past what a single swap would cover.
        let mut data = Vec::new();
        for i in 0u32..3000 {
            data.push((i % 53) as u8);
            data.push((i % 19) as u8);
            data.push((i % 7) as u8);
        }
        round_trip(&data,DICT_SIZE_MIN + 1);
    }

    /// A source that would-blocks on every other call, to exercise resumable
    /// state across `Progress::Again` without ever losing or duplicating bytes.
    struct FlakySource<'a> {
        data: &'a [u8],
        pos: usize,
        block_next: bool
    }

    impl<'a> Read for FlakySource<'a> {
        fn read(&mut self,buf: &mut [u8]) -> std::io::Result<usize> {
            if self.block_next {
                self.block_next = false;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            self.block_next = true;
            if self.pos >= self.data.len() {
                return Ok(0);
            }
            let n = 1.min(buf.len());
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn eagain_from_the_source_does_not_corrupt_the_stream() {
        let data = b"mississippi river mississippi river".to_vec();
        let mut src = FlakySource { data: &data,pos: 0,block_next: false };
        let mut out = Vec::new();
        let mut engine = CompressEngine::new(EngineConfig { d_size: DICT_SIZE_DEFAULT,..crate::STD_CONFIG }).unwrap();
        loop {
            match engine.step(&mut src,&mut out).unwrap() {
                Progress::Done => break,
                Progress::Again => continue
            }
        }
        engine.close(&mut out).unwrap();
        assert_eq!(expand_slice(&out).unwrap(),data);
    }
}
