//! Aqua Core: revision, chain and claim data model
//!
//! Revisions and chains are read-only inputs produced by the notarization
//! side; the verification crates only ever borrow them.

pub mod context;
pub mod data_model;
pub mod error;

pub use context::VerifyContext;
pub use data_model::{claim_text, keys, Chain, Claims, MerkleProofNode, Revision, RevisionKind};
pub use error::AquaError;
