//! Open-addressed compressor dictionary (component B).

use crate::DICT_SIZE_MIN;

#[derive(Clone,Copy)]
struct Slot {
    used: bool,
    parent: usize,
    label: u8,
    child: usize
}

const EMPTY_SLOT: Slot = Slot { used: false,parent: 0,label: 0,child: 0 };

/// Outcome of `CompressorDict::extend`.
pub enum Extend {
    /// `label` matched an existing edge; the caller emits nothing.
    Absorbed,
    /// No edge matched; a new entry was inserted and `prev_node` must be emitted.
    Emit {
        prev_node: usize,
        parent: usize,
        edge_label: u8,
        child: usize
    }
}

/// Maps `(parent_code, label_byte) -> child_code` with linear probing.
pub struct CompressorDict {
    d_size: usize,
    hash_shift: u32,
    slots: Vec<Slot>,
    d_next: usize,
    cur_node: Option<usize>
}

impl CompressorDict {
    pub fn new(d_size: usize) -> Self {
        Self {
            d_size,
            hash_shift: bitlen(d_size),
            slots: vec![EMPTY_SLOT;d_size],
            d_next: DICT_SIZE_MIN,
            cur_node: None
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
        log::debug!("resetting compressor dictionary of size {}",self.d_size);
        for s in self.slots.iter_mut() {
            *s = EMPTY_SLOT;
        }
        self.d_next = DICT_SIZE_MIN;
        self.cur_node = None;
    }

    /// Bernstein-style hash over `(label << bitlen(d_size)) + parent`, reduced mod `d_size`.
    fn hash(&self,parent: usize,label: u8) -> usize {
        let combined = ((label as usize) << self.hash_shift).wrapping_add(parent);
        let mut h: u64 = 5381;
        for b in combined.to_le_bytes() {
            h = h.wrapping_mul(33).wrapping_add(b as u64);
        }
        (h as usize) % self.d_size
    }

    /// Probe for `(parent,label)`. Returns `(index,true)` if an existing used
    /// slot matches, `(index,false)` for the first empty slot on the probe path.
    fn probe(&self,parent: usize,label: u8) -> (usize,bool) {
        let start = self.hash(parent,label);
        let mut idx = start;
        loop {
            let slot = &self.slots[idx];
            if !slot.used {
                return (idx,false);
            }
            if slot.parent == parent && slot.label == label {
                return (idx,true);
            }
            idx = (idx + 1) % self.d_size;
            if idx == start {
                return (idx,false); // table full; callers keep d_next < d_size so this shouldn't hit
            }
        }
    }

    /// Absorb one byte. See the dual-dictionary manager for threshold
    /// shadowing and swap-on-full, which ride on top of this.
    pub fn extend(&mut self,label: u8) -> Extend {
        let cur = match self.cur_node {
            None => {
                self.cur_node = Some(label as usize);
                return Extend::Absorbed;
            },
            Some(c) => c
        };
        let (idx,found) = self.probe(cur,label);
        if found {
            self.cur_node = Some(self.slots[idx].child);
            Extend::Absorbed
        } else {
            let child = self.d_next;
            self.slots[idx] = Slot { used: true,parent: cur,label,child };
            self.d_next += 1;
            self.cur_node = Some(label as usize);
            Extend::Emit { prev_node: cur,parent: cur,edge_label: label,child }
        }
    }

    /// Mirror an already-allocated `(parent,label,child)` triple, used only by
    /// the dual-dictionary manager to shadow a main insertion into secondary.
    pub fn insert(&mut self,parent: usize,label: u8,child: usize) {
        let (idx,found) = self.probe(parent,label);
        if !found {
            self.slots[idx] = Slot { used: true,parent,label,child };
        }
    }

    /// Force the absorption cursor, used right after a dictionary swap.
    pub fn set_cur_node(&mut self,label: u8) {
        self.cur_node = Some(label as usize);
    }

    pub(crate) fn cur_node(&self) -> Option<usize> {
        self.cur_node
    }

    /// Force the absorption cursor to an arbitrary code, used when carrying
    /// an in-progress phrase across a dictionary swap.
    pub(crate) fn force_cur_node(&mut self,node: usize) {
        self.cur_node = Some(node);
    }

    /// Advance the allocation counter by one without inserting, used only by
    /// the dual-dictionary manager to keep a shadow dictionary's own `d_next`
    /// counting the entries actually mirrored into it (which starts at
    /// `DICT_SIZE_MIN` and grows by exactly one per mirrored insertion, not
    /// in lockstep with main's much larger counter).
    pub(crate) fn bump_d_next(&mut self) {
        self.d_next += 1;
    }
}

fn bitlen(x: usize) -> u32 {
    usize::BITS - x.max(1).leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_byte_is_always_absorbed() {
        let mut d = CompressorDict::new(300);
        assert!(matches!(d.extend(b'A'),Extend::Absorbed));
    }

    #[test]
    fn repeat_of_new_phrase_is_absorbed_then_emits_on_divergence() {
        let mut d = CompressorDict::new(300);
        // "AB" then "AB" then "AC": first AB builds the dictionary one byte at a time.
        assert!(matches!(d.extend(b'A'),Extend::Absorbed));
        match d.extend(b'B') {
            Extend::Emit { prev_node,child,.. } => {
                assert_eq!(prev_node,b'A' as usize);
                assert_eq!(child,DICT_SIZE_MIN);
            },
            Extend::Absorbed => panic!("expected an emission on first divergence")
        }
        // cur_node is now 'B' (fresh single-byte phrase); "A" extends it to "BA"
        assert!(matches!(d.extend(b'A'),Extend::Emit{..}));
    }

    #[test]
    fn no_two_entries_share_parent_and_label() {
        let mut d = CompressorDict::new(300);
        d.extend(b'A');
        d.extend(b'B'); // emits A, inserts (A,B)->260, cur_node=B
        d.extend(b'A'); // emits B, inserts (B,A)->261, cur_node=A
        d.extend(b'B'); // matches (A,B) -> absorbed, cur_node=260
        let (idx,found) = d.probe(b'A' as usize,b'B');
        assert!(found);
        assert_eq!(d.slots[idx].child,DICT_SIZE_MIN);
    }
}
