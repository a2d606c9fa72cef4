//! Main/secondary dictionary rotation (component D).
//!
//! Once the main dictionary's occupancy crosses the transfer threshold
//! (`d_thr`, 80% of `d_size`), every further insertion is mirrored into a
//! secondary dictionary growing alongside it. When main fills up, the two
//! are swapped: the secondary - which already holds every entry from
//! `d_thr` onward under the same code numbers - becomes the new main, and
//! the exhausted old main is reset into the new secondary. Codes keep
//! counting up across the swap; only the in-progress absorption cursor
//! needs to be carried over by hand.

use super::compressor::{CompressorDict,Extend};
use super::decompressor::{DecompressorDict,EmitResult};
use crate::codec;
use crate::{CoreResult,DICT_SIZE_MIN};

fn threshold(d_size: usize) -> usize {
    (d_size * 4) / 5
}

/// Compressor-side dictionary pair.
pub struct CompressDual {
    main: CompressorDict,
    secondary: CompressorDict,
    d_size: usize,
    d_thr: usize
}

impl CompressDual {
    pub fn new(d_size: usize) -> Self {
        Self {
            main: CompressorDict::new(d_size),
            secondary: CompressorDict::new(d_size),
            d_size,
            d_thr: threshold(d_size)
        }
    }

    pub fn d_next(&self) -> usize {
        self.main.d_next()
    }

    pub fn d_size(&self) -> usize {
        self.d_size
    }

    pub fn reset(&mut self) {
        self.main.reset();
        self.secondary.reset();
    }

    /// Absorb one byte, shadowing into the secondary dictionary past the
    /// threshold and swapping the pair if main just filled up.
    pub fn extend(&mut self,label: u8) -> Extend {
        let result = self.main.extend(label);
        if let Extend::Emit { parent,edge_label,child,.. } = result {
            if child >= self.d_thr {
                self.secondary.insert(parent,edge_label,child);
                self.secondary.bump_d_next();
            }
        }
        if self.main.is_full() {
            self.swap();
        }
        result
    }

    /// Flush the in-progress absorption cursor as one final code, called
    /// once at EOF before the EOF sentinel. The decompressor seeds a (here
    /// unused) entry for every code it receives, including this last one, so
    /// `d_next` is advanced here exactly as a real `extend` would have with
    /// one more byte, keeping the EOF/STOP width in agreement.
    pub fn flush(&mut self) -> Option<(usize,usize)> {
        let node = self.main.cur_node()?;
        let width = codec::ceil_log2(self.main.d_next());
        if self.main.d_next() < self.main.d_size() {
            self.main.bump_d_next();
        }
        if self.main.is_full() {
            self.swap();
        }
        Some((node,width))
    }

    fn swap(&mut self) {
        log::debug!("compressor dictionary full at {}, rotating in shadow dictionary",self.main.d_next());
        let carried = self.main.cur_node();
        std::mem::swap(&mut self.main,&mut self.secondary);
        self.secondary.reset();
        if self.main.is_full() {
            // The shadow window covered the whole table (small d_size, where
            // d_thr falls at or below DICT_SIZE_MIN): every entry main ever
            // held was mirrored, so the dictionary that just rotated in is
            // already exhausted. Fall back to a plain reset so allocation can
            // keep making forward progress instead of looping full-to-full.
            self.main.reset();
        }
        if let Some(node) = carried {
            self.main.force_cur_node(node);
        }
    }
}

/// Decompressor-side dictionary pair, mirroring `CompressDual`'s rotation.
pub struct DecompressDual {
    main: DecompressorDict,
    secondary: DecompressorDict,
    d_size: usize,
    d_thr: usize,
    /// Absolute code of an entry mirrored incomplete at the instant of a
    /// swap, still awaiting the back-patch its creating call couldn't apply
    /// (see `emit`).
    pending_patch: Option<usize>
}

impl DecompressDual {
    pub fn new(d_size: usize) -> Self {
        Self {
            main: DecompressorDict::new(d_size),
            secondary: DecompressorDict::new(d_size),
            d_size,
            d_thr: threshold(d_size),
            pending_patch: None
        }
    }

    pub fn d_next(&self) -> usize {
        self.main.d_next()
    }

    pub fn d_size(&self) -> usize {
        self.d_size
    }

    pub fn is_full(&self) -> bool {
        self.main.is_full()
    }

    pub fn reset(&mut self) {
        self.main.reset();
        self.secondary.reset();
        self.pending_patch = None;
    }

    pub fn scratch(&self) -> &[u8] {
        self.main.scratch()
    }

    /// Decode `code`, mirroring the entry that the underlying dictionary
    /// just finished back-patching into the shadow once past the threshold.
    pub fn emit(&mut self,code: usize) -> CoreResult<EmitResult> {
        let prev_d_next = self.main.d_next();
        let r = self.main.emit(code)?;
        if let Some(carried) = self.pending_patch.take() {
            // The entry a previous call seeded right as main filled up never
            // got its normal back-patch: that call's "next round" runs here,
            // against the freshly swapped-in main, whose own d_next - 1 no
            // longer points at it. Complete it directly instead, using this
            // round's first decoded byte, the same value the normal path
            // would have used had no swap intervened.
            let first_byte = self.main.scratch()[r.offset];
            self.main.complete_entry(carried,first_byte);
        } else if prev_d_next > DICT_SIZE_MIN {
            let patched = prev_d_next - 1;
            if patched >= self.d_thr {
                self.secondary.mirror_entry(patched,&self.main);
            }
        }
        if self.main.is_full() {
            // The entry just seeded by main.emit() above (at main.d_next()-1)
            // is the one that filled the table; it won't get a normal round
            // to complete it before the swap discards main, so mirror it
            // incomplete now and remember it for the patch above next call.
            let created = self.main.d_next() - 1;
            if created >= self.d_thr {
                self.secondary.mirror_entry(created,&self.main);
                self.secondary.bump_d_next();
                self.pending_patch = Some(created);
            }
            self.swap();
        }
        Ok(r)
    }

    fn swap(&mut self) {
        log::debug!("decompressor dictionary full at {}, rotating in shadow dictionary",self.main.d_next());
        std::mem::swap(&mut self.main,&mut self.secondary);
        self.secondary.reset();
        if self.main.is_full() {
            // See the matching comment in CompressDual::swap: for small
            // d_size the shadow window is the entire table, so the rotated-in
            // dictionary is already exhausted and must fall back to a reset.
            self.main.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing_preserves_codes_across_a_swap() {
        // Small dictionary so the threshold/full boundary is reachable quickly.
        let d_size = DICT_SIZE_MIN + 10;
        let mut c = CompressDual::new(d_size);
        let mut d = DecompressDual::new(d_size);
        // Feed enough distinct two-byte phrases to push past the threshold and
        // through a full swap, checking that compress/decompress agree on
        // every emitted code the whole way.
        let mut stream = Vec::new();
        for hi in 0u8..20 {
            stream.push(hi);
            stream.push(hi.wrapping_add(1));
        }
        let mut emitted_codes = Vec::new();
        for &byte in &stream {
            if let Extend::Emit { child,.. } = c.extend(byte) {
                emitted_codes.push(child);
            }
        }
        for code in emitted_codes {
            assert!(d.emit(code).is_ok());
        }
    }

    #[test]
    fn swap_boundary_entry_decodes_correctly_after_rotation() {
        // d_thr well above DICT_SIZE_MIN, a realistic (non-degenerate)
        // rotation: the entry that fills main and triggers the swap must
        // still decode correctly if its code is matched again afterward.
        let d_size = DICT_SIZE_MIN + 140;
        let mut c = CompressDual::new(d_size);
        let mut d = DecompressDual::new(d_size);
        let mut data = Vec::new();
        for i in 0u32..4000 {
            data.push((i % 23) as u8);
            data.push((i % 9) as u8);
            data.push((i % 3) as u8);
        }
        let mut decoded = Vec::new();
        for &byte in &data {
            if let Extend::Emit { prev_node,.. } = c.extend(byte) {
                let r = d.emit(prev_node).unwrap();
                decoded.extend_from_slice(&d.scratch()[r.offset..r.offset + r.n_bytes]);
            }
        }
        if let Some((node,_)) = c.flush() {
            let r = d.emit(node).unwrap();
            decoded.extend_from_slice(&d.scratch()[r.offset..r.offset + r.n_bytes]);
        }
        assert_eq!(decoded,data);
    }

    #[test]
    fn tiny_dict_size_never_allocates_past_d_size() {
        // d_thr falls below DICT_SIZE_MIN here, so every entry main ever
        // holds gets shadowed and the rotated-in secondary starts full;
        // swap() must fall back to a reset instead of handing out codes
        // >= d_size or looping swap-to-swap forever.
        let d_size = DICT_SIZE_MIN + 1;
        let mut c = CompressDual::new(d_size);
        let mut d = DecompressDual::new(d_size);
        let mut stream = Vec::new();
        for i in 0u32..500 {
            stream.push((i % 37) as u8);
            stream.push((i % 11) as u8);
        }
        for &byte in &stream {
            if let Extend::Emit { child,.. } = c.extend(byte) {
                assert!(child < d_size,"allocated code {} must stay below d_size {}",child,d_size);
                assert!(d.emit(child).is_ok());
            }
        }
    }

    #[test]
    fn swap_carries_the_in_progress_cursor() {
        let d_size = DICT_SIZE_MIN + 2;
        let mut c = CompressDual::new(d_size);
        // Fill main to capacity with strictly novel two-byte phrases so every
        // extend() after the first byte of each pair emits, forcing a swap.
        for hi in 0u8..4 {
            let _ = c.extend(hi);
            let _ = c.extend(hi.wrapping_add(100));
        }
        // Whatever happened, d_next must never exceed d_size.
        assert!(c.d_next() <= d_size);
    }
}
