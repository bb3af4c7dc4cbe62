//! Equihash solver and verifier for the (N=210, K=9) instance with the
//! `"AION0PoW"` personalisation.
//!
//! The solver runs Wagner's algorithm over 2^22 27-byte seed hashes drawn
//! from a personalised Blake2b stream: nine bucket-sorted collision rounds
//! zero one 21-bit digit each, and a final full-digit match yields
//! candidate index trees, which are reconstructed and filtered into proofs
//! of 512 distinct leaf indices. The verifier recomputes the stream and
//! checks a proof's xor, ordering and distinctness invariants.
//!
//! - Solving: [`Solver`] (reusable arenas) or the one-shot [`solve`].
//! - Verification: [`verify`].

mod params;
mod solver;
mod stream;
mod verify;

pub use params::{HASH_BYTES, K, MAX_SOLS, N, NONCE_BYTES, PROOF_SIZE};
pub use solver::{Proof, Solver, solve};
pub use verify::{VerifyError, verify};
