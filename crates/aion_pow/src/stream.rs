//! Personalised Blake2b stream of seed hashes.
//!
//! The base state carries the 16-byte personalisation
//! `"AION0PoW" || LE32(210) || LE32(9)` and absorbs header‖nonce once per
//! solve. Block `b < 2^21` is produced by finalising a clone of the base
//! state over LE32(b), yielding 54 bytes, i.e. two 27-byte seed hashes:
//! hash `i` lives in block `i / 2` at offset `(i % 2) * 27`.

use blake2b_simd::{Hash as Blake2bHash, Params as Blake2bParams, State as Blake2bState};

use crate::params::{HASH_BYTES, HASH_OUT, HASHES_PER_BLAKE, K, N};

/// The 16-byte Blake2b personalisation block.
pub(crate) fn personal() -> [u8; 16] {
    let mut personal = *b"AION0PoW\x00\x00\x00\x00\x00\x00\x00\x00";
    personal[8..12].copy_from_slice(&N.to_le_bytes());
    personal[12..16].copy_from_slice(&K.to_le_bytes());
    personal
}

/// Base state over `header_nonce`, shared by every block of one solve.
pub(crate) fn seeded_state(header_nonce: &[u8]) -> Blake2bState {
    let mut state = Blake2bParams::new()
        .hash_length(HASH_OUT)
        .personal(&personal())
        .to_state();
    state.update(header_nonce);
    state
}

/// Finalise a copy of `base` over the little-endian block counter; the
/// base state itself is never consumed.
pub(crate) fn block_hash(base: &Blake2bState, block: u32) -> Blake2bHash {
    let mut state = base.clone();
    state.update(&block.to_le_bytes());
    state.finalize()
}

/// Seed hash `index` as a standalone 27-byte array.
pub(crate) fn index_hash(base: &Blake2bState, index: u32) -> [u8; HASH_BYTES] {
    let block = block_hash(base, index / HASHES_PER_BLAKE);
    let offset = (index % HASHES_PER_BLAKE) as usize * HASH_BYTES;
    let mut hash = [0u8; HASH_BYTES];
    hash.copy_from_slice(&block.as_bytes()[offset..offset + HASH_BYTES]);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn personalisation_is_byte_exact() {
        assert_eq!(hex::encode(personal()), "41494f4e30506f57d200000009000000");
    }

    #[test]
    fn two_hashes_per_block() {
        let state = seeded_state(&[0u8; 64]);
        let block = block_hash(&state, 3);
        assert_eq!(block.as_bytes().len(), HASH_OUT);
        assert_eq!(index_hash(&state, 6).as_slice(), &block.as_bytes()[..HASH_BYTES]);
        assert_eq!(index_hash(&state, 7).as_slice(), &block.as_bytes()[HASH_BYTES..]);
    }

    #[test]
    fn base_state_survives_block_hashing() {
        let state = seeded_state(b"header and nonce bytes");
        let first = block_hash(&state, 0);
        assert_eq!(block_hash(&state, 0), first);
        assert_ne!(block_hash(&state, 1), first);
    }
}
