//! Proof verification against the personalised hash stream.

use core::fmt;

use blake2b_simd::State as Blake2bState;

use crate::params::{DIGIT_BITS, HASH_BYTES, K, N, NONCE_BYTES, PROOF_SIZE};
use crate::stream;

/// Why a candidate proof was rejected.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum VerifyError {
    /// `header_nonce` is not the given header length plus the 32-byte nonce.
    HeaderLength,
    /// A leaf index occurs more than once.
    Duplicate,
    /// Some subtree's leftmost leaf is not below its sibling's.
    OutOfOrder,
    /// The xor of some subtree's leaf hashes has a nonzero digit prefix.
    NonZeroXor,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::HeaderLength => f.write_str("wrong header length"),
            VerifyError::Duplicate => f.write_str("duplicate index"),
            VerifyError::OutOfOrder => f.write_str("indices out of order"),
            VerifyError::NonZeroXor => f.write_str("nonzero xor"),
        }
    }
}

impl std::error::Error for VerifyError {}

/// Check a proof against the stream seeded with `header_nonce`.
///
/// `header_len` is the length of the header portion; `header_nonce` must
/// be exactly that header followed by the 32-byte nonce.
pub fn verify(
    indices: &[u32; PROOF_SIZE],
    header_nonce: &[u8],
    header_len: usize,
) -> Result<(), VerifyError> {
    if header_nonce.len() != header_len + NONCE_BYTES {
        return Err(VerifyError::HeaderLength);
    }
    let mut sorted = *indices;
    sorted.sort_unstable();
    if sorted.windows(2).any(|w| w[1] <= w[0]) {
        return Err(VerifyError::Duplicate);
    }
    let state = stream::seeded_state(header_nonce);
    verify_rec(&state, indices, K).map(|_| ())
}

/// Xor the subtree's leaf hashes bottom-up, checking the ordering rule
/// before descending and the zero digit prefix on the way back.
fn verify_rec(
    state: &Blake2bState,
    indices: &[u32],
    r: u32,
) -> Result<[u8; HASH_BYTES], VerifyError> {
    if r == 0 {
        return Ok(stream::index_hash(state, indices[0]));
    }
    let half = indices.len() / 2;
    if indices[0] >= indices[half] {
        return Err(VerifyError::OutOfOrder);
    }
    let hash0 = verify_rec(state, &indices[..half], r - 1)?;
    let hash1 = verify_rec(state, &indices[half..], r - 1)?;
    let mut hash = [0u8; HASH_BYTES];
    for i in 0..HASH_BYTES {
        hash[i] = hash0[i] ^ hash1[i];
    }
    let zero_bits = (if r < K { r * DIGIT_BITS } else { N }) as usize;
    for byte in &hash[..zero_bits / 8] {
        if *byte != 0 {
            return Err(VerifyError::NonZeroXor);
        }
    }
    if zero_bits % 8 != 0 && hash[zero_bits / 8] >> (8 - zero_bits % 8) != 0 {
        return Err(VerifyError::NonZeroXor);
    }
    // the last byte is only partially filled; its live bits must be zero too
    if r == K && hash[HASH_BYTES - 1] >> 6 != 0 {
        return Err(VerifyError::NonZeroXor);
    }
    Ok(hash)
}
