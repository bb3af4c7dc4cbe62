//! Fixed parameters of the (N=210, K=9) Equihash instance.
//!
//! Every derived quantity below follows from `N` and `K` except the residue
//! size table, which is a property of how 21-bit digits land in byte-aligned
//! slot storage for this instance.

/// Hash bit length.
pub const N: u32 = 210;
/// Number of collision rounds; a proof has `2^K` leaf indices.
pub const K: u32 = 9;

/// Bits per Wagner digit: `N / (K + 1)`.
pub(crate) const DIGIT_BITS: u32 = N / (K + 1);
/// Digit bits matched inside a bucket rather than by bucket choice.
pub(crate) const REST_BITS: u32 = 7;
/// Digit bits selecting a bucket.
pub(crate) const BUCK_BITS: u32 = DIGIT_BITS - REST_BITS;

pub(crate) const NBUCKETS: usize = 1 << BUCK_BITS;
pub(crate) const BUCK_MASK: u32 = NBUCKETS as u32 - 1;

/// log2 of the default bucket capacity.
pub(crate) const SLOT_BITS: u32 = REST_BITS + 2;
pub(crate) const SLOT_RANGE: usize = 1 << SLOT_BITS;
pub(crate) const SLOT_MASK: u32 = SLOT_RANGE as u32 - 1;
/// Slots allocated per bucket: the default capacity scaled by 9/14.
/// Bucket fills concentrate tightly enough around their mean that the
/// resulting overflow loss is a negligible fraction of solutions.
pub(crate) const NSLOTS: usize = SLOT_RANGE * 9 / 14;
/// Number of distinct rest-bit values.
pub(crate) const NRESTS: usize = 1 << REST_BITS;

/// Leaf indices per proof.
pub const PROOF_SIZE: usize = 1 << K;
/// Solutions retained per solve; more than 8 per nonce is rare.
pub const MAX_SOLS: usize = 10;
/// Nonce length in bytes.
pub const NONCE_BYTES: usize = 32;

/// Seed hashes enumerated per solve: `2^(DIGIT_BITS + 1)`.
pub(crate) const NHASHES: u32 = 2 << DIGIT_BITS;
/// Bytes per seed hash.
pub const HASH_BYTES: usize = N.div_ceil(8) as usize;
/// Seed hashes per Blake2b block.
pub(crate) const HASHES_PER_BLAKE: u32 = 512 / N;
/// Blake2b digest length: two seed hashes per block.
pub(crate) const HASH_OUT: usize = HASHES_PER_BLAKE as usize * HASH_BYTES;
/// Blake2b blocks hashed per solve.
pub(crate) const NBLOCKS: u32 = NHASHES.div_ceil(HASHES_PER_BLAKE);

/// Residue bytes remaining after round `r`.
///
/// Round 0 consumes the 14 bucket bits, leaving one whole byte of the
/// 27-byte hash fully processed; each later round strips a further 21-bit
/// digit, alternating 3- and 2-byte shrinkage as the digit boundary slides
/// through the bytes.
const RESIDUE_BYTES: [usize; 10] = [26, 23, 20, 18, 15, 13, 10, 7, 5, 0];

pub(crate) const fn hash_size(round: u32) -> usize {
    RESIDUE_BYTES[round as usize]
}

/// Residue bytes rounded up to 32-bit storage units.
pub(crate) const fn hash_words(bytes: usize) -> usize {
    bytes.div_ceil(4)
}

/// 32-bit units per heap0 slot: the longest residue class plus the tag.
pub(crate) const SLOT0_WORDS: usize = hash_words(hash_size(0)) + 1;
/// 32-bit units per heap1 slot.
pub(crate) const SLOT1_WORDS: usize = hash_words(hash_size(1)) + 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_geometry() {
        assert_eq!(DIGIT_BITS, 21);
        assert_eq!(BUCK_BITS, 14);
        assert_eq!(NBUCKETS, 16384);
        assert_eq!(NSLOTS, 329);
        assert_eq!(PROOF_SIZE, 512);
        assert_eq!(HASH_BYTES, 27);
        assert_eq!(HASH_OUT, 54);
        assert_eq!(NBLOCKS, 1 << 21);
        assert_eq!(SLOT0_WORDS, 8);
        assert_eq!(SLOT1_WORDS, 7);
    }

    #[test]
    fn residue_table_strips_one_digit_per_round() {
        // a 21-bit digit spans two or three bytes of byte-aligned storage
        for r in 1..K {
            let shrink = hash_size(r - 1) - hash_size(r);
            assert!(shrink == 2 || shrink == 3, "round {r}");
        }
        // the final round consumes the whole remaining digit
        assert_eq!(hash_size(K), 0);
        // every residue leaves room for the tag word in its heap's slot
        for r in (0..K).step_by(2) {
            assert!(hash_words(hash_size(r)) < SLOT0_WORDS);
        }
        for r in (1..K).step_by(2) {
            assert!(hash_words(hash_size(r)) < SLOT1_WORDS);
        }
    }
}
