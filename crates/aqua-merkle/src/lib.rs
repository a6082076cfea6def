//! Aqua Merkle: claim leaves, verification-hash roots and inclusion proofs
//!
//! ```text
//! claims ──sorted──► leaves ──combine──► root (verification hash)
//!                       │
//!                       └──► proof path ──► proven root
//! ```
pub mod leaf;
pub mod proof;
pub mod tree;

pub use leaf::{hash, hash_bytes, leaf, leaves_of};
pub use proof::{expected_successor, parse_proof, verify_against_root, verify_proof, ProofOutcome};
pub use tree::{combine, merkle_root, MerkleTree};

/// Verification hash of a claim set: the Merkle root over its sorted leaves
pub fn verification_hash(claims: &aqua_core::Claims) -> Option<String> {
    merkle_root(&leaves_of(claims))
}
