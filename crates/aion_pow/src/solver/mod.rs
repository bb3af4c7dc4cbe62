//! Wagner-style collision solver over the bucketed hash stream.
//!
//! Subtrees live as a DAG across two heap arenas. Round 0 fills heap0 with
//! the 2^22 seed residues; each collision round reads the heap written by
//! the previous round and writes the other, so a stored tag's
//! `(bucket, slot, slot)` triple always points into the heap opposite the
//! one being filled. Residues shorten as leading digits zero out, freeing
//! whole 32-bit units whose space the shorter follow-on residues reuse:
//!
//! ```text
//!              heap0          heap1
//! round   residue   tag   residue  tag
//! 0       A A A A A A 0   . . . . . .
//! 1       A A A A A A 0   B B B B B 1
//! 2       C C C C C 2 0   B B B B B 1
//! 3       C C C C C 2 0   D D D D 3 1
//! 4       E E E E 4 2 0   D D D D 3 1
//! 5       E E E E 4 2 0   F F F 5 3 1
//! 6       G G 6 . 4 2 0   F F F 5 3 1
//! 7       G G 6 . 4 2 0   H H 7 5 3 1
//! 8       I 8 6 . 4 2 0   H H 7 5 3 1
//! ```
//!
//! Round 9 writes nothing; pairs matching on the whole remaining digit
//! become candidates, whose leaf indices are recovered by walking the tag
//! DAG back down to round 0.

mod collide;
mod heap;

use blake2b_simd::State as Blake2bState;
use tracing::debug;

use crate::params::{
    BUCK_BITS, HASH_BYTES, HASHES_PER_BLAKE, K, MAX_SOLS, NBLOCKS, NBUCKETS, NONCE_BYTES, NSLOTS,
    PROOF_SIZE, SLOT0_WORDS, SLOT1_WORDS, hash_size, hash_words,
};
use crate::stream;
use collide::{CollisionData, last_digit_eq, rest_key, xor_bucket_id};
use heap::{Heap, RoundLayout, Tree, last_word_eq, write_tag, xor_residue};

/// A proof: the 512 leaf indices of one solution.
pub type Proof = [u32; PROOF_SIZE];

/// Reusable solver state.
///
/// The two arenas (~308 MiB) and their bucket counters are allocated once;
/// a solve only resets the counters and the solution buffer, so one solver
/// can grind through many header/nonce pairs.
pub struct Solver {
    heap0: Heap,
    heap1: Heap,
    nslots0: Box<[u32]>,
    nslots1: Box<[u32]>,
    sols: Vec<Proof>,
    nsols: u32,
    /// Items dropped because their destination bucket was full.
    bfull: u32,
    /// Pairs dropped by the probable-duplicate filter.
    hfull: u32,
}

impl Solver {
    pub fn new() -> Self {
        Solver {
            heap0: Heap::new(SLOT0_WORDS),
            heap1: Heap::new(SLOT1_WORDS),
            nslots0: vec![0u32; NBUCKETS].into_boxed_slice(),
            nslots1: vec![0u32; NBUCKETS].into_boxed_slice(),
            sols: Vec::with_capacity(MAX_SOLS),
            nsols: 0,
            bfull: 0,
            hfull: 0,
        }
    }

    /// Run the full pipeline for one header/nonce and return every proof
    /// found, at most [`MAX_SOLS`].
    ///
    /// Bucket overflow occasionally drops an item, so the solver finds
    /// most solutions rather than provably all of them; every proof it
    /// does emit verifies.
    pub fn solve(&mut self, header: &[u8], nonce: &[u8; NONCE_BYTES]) -> Vec<Proof> {
        let mut header_nonce = Vec::with_capacity(header.len() + NONCE_BYTES);
        header_nonce.extend_from_slice(header);
        header_nonce.extend_from_slice(nonce);
        let base = stream::seeded_state(&header_nonce);

        self.reset();
        self.generate(&base);
        self.round_stats(0);
        for round in 1..K {
            self.collide_round(round);
            self.round_stats(round);
        }
        self.final_round();
        self.round_stats(K);
        debug!(candidates = self.nsols, kept = self.sols.len(), "solve finished");
        self.sols.clone()
    }

    fn reset(&mut self) {
        self.nslots0.fill(0);
        self.nslots1.fill(0);
        self.sols.clear();
        self.nsols = 0;
        self.bfull = 0;
        self.hfull = 0;
    }

    /// Log and reset the per-round discard counters.
    fn round_stats(&mut self, round: u32) {
        debug!(round, bfull = self.bfull, hfull = self.hfull, "round complete");
        self.bfull = 0;
        self.hfull = 0;
    }

    /// Round 0: enumerate the hash stream into heap0 buckets.
    fn generate(&mut self, base: &Blake2bState) {
        let units = hash_words(hash_size(0));
        let residue = hash_size(0);
        for block in 0..NBLOCKS {
            let out = stream::block_hash(base, block);
            for (half, hash) in out.as_bytes().chunks_exact(HASH_BYTES).enumerate() {
                // the leading BUCK_BITS of the hash select the bucket
                let bucket =
                    (hash[0] as u32) << (BUCK_BITS - 8) | (hash[1] as u32) >> (16 - BUCK_BITS);
                let slot = self.nslots0[bucket as usize];
                self.nslots0[bucket as usize] += 1;
                if slot >= NSLOTS as u32 {
                    self.bfull += 1;
                    continue;
                }
                let s = self.heap0.slot_mut(bucket, slot);
                // residue right-aligned against the tag unit
                s[units * 4 - residue..units * 4].copy_from_slice(&hash[HASH_BYTES - residue..]);
                write_tag(s, units, Tree::leaf(block * HASHES_PER_BLAKE + half as u32));
            }
        }
    }

    /// Rounds 1..=8: source and destination heaps alternate by parity.
    fn collide_round(&mut self, round: u32) {
        let (bfull, hfull) = if round & 1 == 1 {
            collide_into(
                round,
                &self.heap0,
                &mut self.nslots0,
                &mut self.heap1,
                &mut self.nslots1,
            )
        } else {
            collide_into(
                round,
                &self.heap1,
                &mut self.nslots1,
                &mut self.heap0,
                &mut self.nslots0,
            )
        };
        self.bfull += bfull;
        self.hfull += hfull;
    }

    /// Round 9: no further slots are written; pairs matching on the full
    /// remaining 21-bit digit become solution candidates. The reconstruction
    /// path weeds out index sharing, so no coarser pre-filter is applied
    /// here; it would cost a measurable fraction of the solutions found.
    fn final_round(&mut self) {
        let layout = RoundLayout::new(K);
        let mut cd = CollisionData::new();
        for bucket in 0..NBUCKETS as u32 {
            cd.clear();
            let bsize = take_count(&mut self.nslots0[bucket as usize]);
            for s1 in 0..bsize {
                cd.add_slot(s1, rest_key(self.heap0.slot(bucket, s1), layout.prev_bo, K));
                while cd.next_collision() {
                    let s0 = cd.slot();
                    if last_digit_eq(
                        self.heap0.slot(bucket, s0),
                        self.heap0.slot(bucket, s1),
                        layout.prev_bo,
                    ) {
                        self.candidate(Tree::node(bucket, s0, s1));
                    }
                }
            }
        }
    }

    /// Reconstruct a candidate's leaves; keep it if the indices check out.
    fn candidate(&mut self, root: Tree) {
        let mut proof = [0u32; PROOF_SIZE];
        if self.list_heap0(K, root, &mut proof) || has_duplicates(&proof) {
            return;
        }
        let soli = self.nsols as usize;
        self.nsols += 1;
        if soli < MAX_SOLS {
            self.sols.push(proof);
        }
    }

    /// Emit the `2^r` leaves below a tag whose children live in heap0, in
    /// order, into `out`. True means the subtree must be rejected.
    fn list_heap0(&self, r: u32, t: Tree, out: &mut [u32]) -> bool {
        let r = r - 1;
        let half = 1usize << r;
        let tag_word = hash_words(hash_size(r));
        let t0 = self.heap0.tag(t.bucket_id(), t.slot_id0(), tag_word);
        let t1 = self.heap0.tag(t.bucket_id(), t.slot_id1(), tag_word);
        if self.list_heap1(r, t0, &mut out[..half]) || self.list_heap1(r, t1, &mut out[half..]) {
            return true;
        }
        order_indices(out, half);
        out[0] == out[half]
    }

    /// Heap1 counterpart. Terminates the recursion at round-0 leaf tags
    /// and rejects child pairs that provably share a slot.
    fn list_heap1(&self, r: u32, t: Tree, out: &mut [u32]) -> bool {
        if r == 0 {
            out[0] = t.index();
            return false;
        }
        let r = r - 1;
        let half = 1usize << r;
        let tag_word = hash_words(hash_size(r));
        let t0 = self.heap1.tag(t.bucket_id(), t.slot_id0(), tag_word);
        let t1 = self.heap1.tag(t.bucket_id(), t.slot_id1(), tag_word);
        if !t0.prob_disjoint(t1) {
            return true;
        }
        if self.list_heap0(r, t0, &mut out[..half]) || self.list_heap0(r, t1, &mut out[half..]) {
            return true;
        }
        order_indices(out, half);
        out[0] == out[half]
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

/// Allocate a fresh solver and run a single header/nonce.
pub fn solve(header: &[u8], nonce: &[u8; NONCE_BYTES]) -> Vec<Proof> {
    Solver::new().solve(header, nonce)
}

/// One collision round: group each source bucket's slots by rest key and
/// route every colliding pair's xor into the destination heap. Returns the
/// (bucket overflow, probable duplicate) discard counts.
fn collide_into(
    round: u32,
    src: &Heap,
    src_counts: &mut [u32],
    dst: &mut Heap,
    dst_counts: &mut [u32],
) -> (u32, u32) {
    let layout = RoundLayout::new(round);
    let mut bfull = 0u32;
    let mut hfull = 0u32;
    let mut cd = CollisionData::new();
    for bucket in 0..NBUCKETS as u32 {
        cd.clear();
        let bsize = take_count(&mut src_counts[bucket as usize]);
        for s1 in 0..bsize {
            let slot1 = src.slot(bucket, s1);
            cd.add_slot(s1, rest_key(slot1, layout.prev_bo, round));
            while cd.next_collision() {
                let s0 = cd.slot();
                let slot0 = src.slot(bucket, s0);
                if last_word_eq(slot0, slot1, layout.prev_units) {
                    hfull += 1;
                    continue;
                }
                let xor_bucket = xor_bucket_id(slot0, slot1, layout.prev_bo, round);
                let xor_slot = dst_counts[xor_bucket as usize];
                dst_counts[xor_bucket as usize] += 1;
                if xor_slot >= NSLOTS as u32 {
                    bfull += 1;
                    continue;
                }
                let out = dst.slot_mut(xor_bucket, xor_slot);
                xor_residue(out, slot0, slot1, layout.dunits, layout.prev_units);
                write_tag(out, layout.next_units, Tree::node(bucket, s0, s1));
            }
        }
    }
    (bfull, hfull)
}

/// Consume a bucket counter: clamp to capacity and zero it for reuse as a
/// destination two rounds later.
fn take_count(count: &mut u32) -> u32 {
    let n = (*count).min(NSLOTS as u32);
    *count = 0;
    n
}

/// Wagner ordering: subtree pairs are stored unordered; swap the halves so
/// the smaller leftmost leaf comes first.
fn order_indices(indices: &mut [u32], half: usize) {
    if indices[0] > indices[half] {
        let (left, right) = indices.split_at_mut(half);
        left.swap_with_slice(right);
    }
}

/// Whether any leaf index repeats in the proof.
fn has_duplicates(proof: &Proof) -> bool {
    let mut sorted = *proof;
    sorted.sort_unstable();
    sorted.windows(2).any(|w| w[1] <= w[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_indices_swaps_whole_halves() {
        let mut v = [5, 6, 1, 2];
        order_indices(&mut v, 2);
        assert_eq!(v, [1, 2, 5, 6]);
        order_indices(&mut v, 2);
        assert_eq!(v, [1, 2, 5, 6]);
    }

    #[test]
    fn duplicate_proofs_are_rejected() {
        let mut proof = [0u32; PROOF_SIZE];
        for (i, x) in proof.iter_mut().enumerate() {
            *x = i as u32;
        }
        assert!(!has_duplicates(&proof));
        proof[PROOF_SIZE - 1] = proof[0];
        assert!(has_duplicates(&proof));
    }

    #[test]
    fn bucket_counters_clamp_and_reset() {
        let mut count = NSLOTS as u32 + 41;
        assert_eq!(take_count(&mut count), NSLOTS as u32);
        assert_eq!(count, 0);
        assert_eq!(take_count(&mut count), 0);
    }
}
