//! Parent-pointer decompressor dictionary (component C).

use crate::{CoreResult,Error,DICT_SIZE_MIN};

#[derive(Clone,Copy)]
struct Node {
    parent: usize,
    label: u8,
    /// Entries at or above `DICT_SIZE_MIN` start incomplete (label unknown)
    /// until the KwK case or the following round's back-patch fills it in.
    complete: bool
}

const BLANK_NODE: Node = Node { parent: 0,label: 0,complete: true };

/// A decoded substring, living in `scratch[offset..offset+n_bytes]`.
pub struct EmitResult {
    pub offset: usize,
    pub n_bytes: usize
}

/// Maps `code -> (parent_code, label_byte)`, reconstructing byte strings by
/// walking parent links and writing into a scratch buffer from the high end
/// down, which produces the string in order without a separate reverse pass.
pub struct DecompressorDict {
    d_size: usize,
    nodes: Vec<Node>,
    scratch: Vec<u8>,
    d_next: usize
}

impl DecompressorDict {
    pub fn new(d_size: usize) -> Self {
        let mut nodes = vec![BLANK_NODE;d_size];
        for b in 0..256usize {
            nodes[b] = Node { parent: 0,label: b as u8,complete: true };
        }
        Self {
            d_size,
            nodes,
            scratch: vec![0u8;d_size],
            d_next: DICT_SIZE_MIN
        }
    }

    pub fn d_next(&self) -> usize {
        self.d_next
    }

    pub fn d_size(&self) -> usize {
        self.d_size
    }

    pub fn is_full(&self) -> bool {
        self.d_next >= self.d_size
    }

    pub fn reset(&mut self) {
        log::debug!("resetting decompressor dictionary of size {}",self.d_size);
        for n in self.nodes[DICT_SIZE_MIN..].iter_mut() {
            *n = BLANK_NODE;
        }
        self.d_next = DICT_SIZE_MIN;
    }

    fn decode_into_scratch(&mut self,code: usize) -> CoreResult<(usize,usize)> {
        let mut pos = self.d_size;
        let mut cursor = code;
        loop {
            if cursor >= self.d_size {
                log::error!("decoder walked off the table at code {}",cursor);
                return Err(Error::Decompress(format!("code {} out of range",cursor)));
            }
            pos -= 1;
            let node = self.nodes[cursor];
            self.scratch[pos] = node.label;
            if cursor < 256 {
                break;
            }
            cursor = node.parent;
        }
        Ok((pos,self.d_size - pos))
    }

    fn first_byte(&mut self,code: usize) -> CoreResult<u8> {
        let (offset,_) = self.decode_into_scratch(code)?;
        Ok(self.scratch[offset])
    }

    /// Decode `code`, seed the next in-progress entry, and back-patch the
    /// entry seeded by the previous call. See the KwK-corner-case note on
    /// `DualDictManager`/`DecompressEngine` for the symmetric encoder logic.
    pub fn emit(&mut self,code: usize) -> CoreResult<EmitResult> {
        if code >= self.d_next {
            log::error!("code {} exceeds dictionary occupancy {}",code,self.d_next);
            return Err(Error::Decompress(format!(
                "code {} exceeds dictionary occupancy {}",code,self.d_next
            )));
        }
        if code >= DICT_SIZE_MIN && code + 1 == self.d_next && !self.nodes[code].complete {
            let parent = self.nodes[code].parent;
            let first = self.first_byte(parent)?;
            self.nodes[code] = Node { parent,label: first,complete: true };
        }
        let (offset,n_bytes) = self.decode_into_scratch(code)?;
        if self.d_next > DICT_SIZE_MIN {
            let patch_idx = self.d_next - 1;
            if !self.nodes[patch_idx].complete {
                self.nodes[patch_idx].label = self.scratch[offset];
                self.nodes[patch_idx].complete = true;
            }
        }
        if self.d_next < self.d_size {
            self.nodes[self.d_next] = Node { parent: code,label: 0,complete: false };
            self.d_next += 1;
        }
        Ok(EmitResult { offset,n_bytes })
    }

    pub fn scratch(&self) -> &[u8] {
        &self.scratch
    }

    /// Copy the entry at `code` from `source` into `self`, used to shadow a
    /// just-touched main entry into secondary once past the threshold.
    pub(crate) fn mirror_entry(&mut self,code: usize,source: &DecompressorDict) {
        self.nodes[code] = source.nodes[code];
    }

    /// Back-patch `code`'s label directly, used by the dual-dictionary
    /// manager for an entry whose normal one-round-later back-patch (inside
    /// `emit`, by `d_next - 1`) would otherwise miss it because a dictionary
    /// swap intervened and moved it to an index unrelated to the new `d_next`.
    pub(crate) fn complete_entry(&mut self,code: usize,label: u8) {
        if !self.nodes[code].complete {
            self.nodes[code] = Node { parent: self.nodes[code].parent,label,complete: true };
        }
    }

    /// Advance the allocation counter by one without inserting, the
    /// decompressor-side counterpart of `CompressorDict::bump_d_next`.
    pub(crate) fn bump_d_next(&mut self) {
        self.d_next += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_bytes_decode_to_themselves() {
        let mut d = DecompressorDict::new(300);
        let r = d.emit(b'A' as usize).unwrap();
        assert_eq!(d.scratch()[r.offset..r.offset + r.n_bytes],[b'A']);
    }

    #[test]
    fn kwk_case_completes_from_parent_first_byte() {
        let mut d = DecompressorDict::new(300);
        // Encoder-equivalent stream for "ABABA" style growth:
        // code 'A' (literal), code 'B' (literal) seeds entry 260=(A,?),
        // then code 260 itself arrives before it's been completed (KwK).
        d.emit(b'A' as usize).unwrap(); // seeds 260 = (parent='A', incomplete)
        let r = d.emit(DICT_SIZE_MIN).unwrap(); // KwK: should resolve to "AA"
        assert_eq!(&d.scratch()[r.offset..r.offset + r.n_bytes],b"AA");
    }

    #[test]
    fn rejects_code_beyond_occupancy() {
        let mut d = DecompressorDict::new(300);
        assert!(d.emit(DICT_SIZE_MIN + 5).is_err());
    }
}
