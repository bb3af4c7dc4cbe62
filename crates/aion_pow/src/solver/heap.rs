//! Slab storage for the two collision heaps and the tree-tag encoding.
//!
//! A slot is a run of 32-bit residue units followed by a single tag unit.
//! Residues are right-aligned against the tag so that each round's bit
//! window begins at a fixed byte offset inside word-aligned storage;
//! residue bytes are read byte-wise and compared or xored whole words at a
//! time, both of which are byte-order neutral. Tag units are stored
//! little-endian.

use crate::params::{NBUCKETS, NSLOTS, SLOT_BITS, SLOT_MASK, hash_size, hash_words};

/// 32-bit tree node tag.
///
/// A round-0 tag stores the seed index itself; an inner tag packs
/// `(bucket << 18) | (slot0 << 9) | slot1`, locating its two children in
/// the heap written two rounds earlier.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct Tree(u32);

impl Tree {
    pub(crate) fn leaf(index: u32) -> Self {
        Tree(index)
    }

    pub(crate) fn node(bucket: u32, slot0: u32, slot1: u32) -> Self {
        Tree(((bucket << SLOT_BITS) | slot0) << SLOT_BITS | slot1)
    }

    /// The seed index of a round-0 tag.
    pub(crate) fn index(self) -> u32 {
        self.0
    }

    pub(crate) fn bucket_id(self) -> u32 {
        self.0 >> (2 * SLOT_BITS)
    }

    pub(crate) fn slot_id0(self) -> u32 {
        (self.0 >> SLOT_BITS) & SLOT_MASK
    }

    pub(crate) fn slot_id1(self) -> u32 {
        self.0 & SLOT_MASK
    }

    /// False when the two tags provably share a child: same bucket and an
    /// equal slot in the same position. Sharing across slot positions is
    /// rare enough to leave to the duplicate-index filter.
    pub(crate) fn prob_disjoint(self, other: Tree) -> bool {
        let x = Tree(self.0 ^ other.0);
        x.bucket_id() != 0 || (x.slot_id0() != 0 && x.slot_id1() != 0)
    }
}

/// One slab of `NBUCKETS * NSLOTS` fixed-width slots.
pub(crate) struct Heap {
    bytes: Box<[u8]>,
    slot_bytes: usize,
}

impl Heap {
    pub(crate) fn new(slot_words: usize) -> Self {
        let slot_bytes = slot_words * 4;
        Heap {
            bytes: vec![0u8; NBUCKETS * NSLOTS * slot_bytes].into_boxed_slice(),
            slot_bytes,
        }
    }

    pub(crate) fn slot(&self, bucket: u32, slot: u32) -> &[u8] {
        let start = (bucket as usize * NSLOTS + slot as usize) * self.slot_bytes;
        &self.bytes[start..start + self.slot_bytes]
    }

    pub(crate) fn slot_mut(&mut self, bucket: u32, slot: u32) -> &mut [u8] {
        let start = (bucket as usize * NSLOTS + slot as usize) * self.slot_bytes;
        &mut self.bytes[start..start + self.slot_bytes]
    }

    /// Tag of a stored slot, given the tag's unit position for its round.
    pub(crate) fn tag(&self, bucket: u32, slot: u32, tag_word: usize) -> Tree {
        Tree(read_word(self.slot(bucket, slot), tag_word))
    }
}

/// Little-endian 32-bit unit at position `word` of a slot.
pub(crate) fn read_word(slot: &[u8], word: usize) -> u32 {
    let o = word * 4;
    u32::from_le_bytes([slot[o], slot[o + 1], slot[o + 2], slot[o + 3]])
}

pub(crate) fn write_tag(slot: &mut [u8], word: usize, tag: Tree) {
    let o = word * 4;
    slot[o..o + 4].copy_from_slice(&tag.0.to_le_bytes());
}

/// Whether two residues agree in their final 32-bit unit. A zero xor there
/// almost always means the subtrees repeat an index.
pub(crate) fn last_word_eq(a: &[u8], b: &[u8], prev_units: usize) -> bool {
    read_word(a, prev_units - 1) == read_word(b, prev_units - 1)
}

/// Xor residue units `from..to` of two source slots into the front of `dst`.
pub(crate) fn xor_residue(dst: &mut [u8], a: &[u8], b: &[u8], from: usize, to: usize) {
    let lo = from * 4;
    let hi = to * 4;
    for i in lo..hi {
        dst[i - lo] = a[i] ^ b[i];
    }
}

/// Per-round slot geometry, derived from the residue-size table.
pub(crate) struct RoundLayout {
    /// Residue units of the source slots.
    pub prev_units: usize,
    /// Residue units written this round; the tag follows immediately.
    pub next_units: usize,
    /// Whole units the residue shrinks by this round (0 or 1).
    pub dunits: usize,
    /// Byte offset of the live residue inside its word-aligned storage.
    pub prev_bo: usize,
}

impl RoundLayout {
    pub(crate) fn new(round: u32) -> Self {
        let prev_bytes = hash_size(round - 1);
        let prev_units = hash_words(prev_bytes);
        let next_units = hash_words(hash_size(round));
        RoundLayout {
            prev_units,
            next_units,
            dunits: prev_units - next_units,
            prev_bo: prev_units * 4 - prev_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{K, SLOT1_WORDS};

    #[test]
    fn tag_round_trip() {
        let t = Tree::node(0x2a5f, 17, 300);
        assert_eq!(t.bucket_id(), 0x2a5f);
        assert_eq!(t.slot_id0(), 17);
        assert_eq!(t.slot_id1(), 300);
        assert_eq!(Tree::leaf(0x003f_ffff).index(), 0x003f_ffff);
    }

    #[test]
    fn prob_disjoint_detects_shared_children() {
        let t = Tree::node(7, 3, 9);
        assert!(!t.prob_disjoint(t));
        assert!(!t.prob_disjoint(Tree::node(7, 3, 12)));
        assert!(!t.prob_disjoint(Tree::node(7, 5, 9)));
        assert!(t.prob_disjoint(Tree::node(7, 5, 12)));
        assert!(t.prob_disjoint(Tree::node(8, 3, 9)));
    }

    #[test]
    fn slots_are_isolated() {
        let mut heap = Heap::new(SLOT1_WORDS);
        heap.slot_mut(5, 0).fill(0xab);
        write_tag(heap.slot_mut(5, 1), 2, Tree::node(1, 2, 3));
        assert!(heap.slot(5, 0).iter().all(|b| *b == 0xab));
        assert_eq!(heap.tag(5, 1, 2), Tree::node(1, 2, 3));
        assert!(heap.slot(5, 2).iter().all(|b| *b == 0));
    }

    #[test]
    fn xor_residue_drops_leading_units() {
        let a = [0x11u8; 12];
        let mut b = [0x11u8; 12];
        b[8] = 0x33;
        let mut out = [0u8; 4];
        xor_residue(&mut out, &a, &b, 2, 3);
        assert_eq!(out, [0x22, 0, 0, 0]);
    }

    #[test]
    fn round_layout_geometry() {
        let expect = [
            (7, 6, 1, 2),
            (6, 5, 1, 1),
            (5, 5, 0, 0),
            (5, 4, 1, 2),
            (4, 4, 0, 1),
            (4, 3, 1, 3),
            (3, 2, 1, 2),
            (2, 2, 0, 1),
        ];
        for (round, e) in (1..K).zip(expect) {
            let l = RoundLayout::new(round);
            assert_eq!((l.prev_units, l.next_units, l.dunits, l.prev_bo), e, "round {round}");
        }
        // the final round reads five residue bytes behind a 3-byte offset
        let last = RoundLayout::new(K);
        assert_eq!((last.prev_units, last.prev_bo), (2, 3));
    }
}
