//! Aqua Verify: signature, witness, revision and chain verification
//!
//! This crate checks an Aqua revision chain end to end: claim fingerprints,
//! verification-hash roots, signatures over the predecessor hash, and witness
//! anchors held by external systems.
//!
//! # Architecture
//!
//! ```text
//! Chain ──linkage──► ChainWalker ──(oldest first, stop at first failure)──┐
//!                                                                          ↓
//!                    RevisionValidator: fields → exclusivity → leaves → file hash → links → signature → witness → root
//!                                                            │            │
//!                                                   SignatureVerifier  WitnessVerifier
//!                                                            │            │
//!                                                            └── Capabilities ──┘
//!                                                                          ↓
//!                                                   RevisionVerdict ──► ChainVerdict
//! ```
//!
//! # Example
//!
//! ```
//! use aqua_core::{Chain, Revision};
//! use aqua_merkle::{leaves_of, verification_hash};
//! use aqua_verify::{Capabilities, ChainStatus, Verifier};
//! use serde_json::json;
//!
//! let mut revision = Revision::from_value(json!({
//!     "revision_type": "file",
//!     "previous_verification_hash": "",
//!     "domain_id": "5c4b9d3a1e",
//!     "local_timestamp": "20240101120000",
//!     "content": "hello",
//! }))
//! .unwrap();
//! revision.leaves = leaves_of(&revision.claims);
//! let hash = verification_hash(&revision.claims).unwrap();
//!
//! let mut chain = Chain::new();
//! chain.push(hash, revision);
//!
//! let verifier = Verifier::new(Capabilities::offline());
//! let verdict = futures::executor::block_on(verifier.verify_chain(&chain));
//! assert_eq!(verdict.status, ChainStatus::Verified);
//! ```

pub mod attachments;
pub mod capability;
pub mod chain;
pub mod profile;
pub mod revision;
pub mod signature;
pub mod verdict;
pub mod witness;

// Capabilities
pub use capability::{
    parse_ledger_reply, AddressRecovery, Capabilities, CapabilityError, DidKeyCheck, HexEd25519Key,
    EthereumRecovery, LedgerWitnessCheck, RelayWitnessCheck, TimestampAuthorityCheck, Unavailable,
};

// Verdicts
pub use verdict::{
    AttestationStatus, ChainStatus, ChainVerdict, HashStatus, RevisionFailure, RevisionVerdict,
};

pub use attachments::Attachments;
pub use chain::{verify_chain, verify_chain_with, ChainWalker};
pub use profile::VerifyProfile;
pub use revision::RevisionValidator;
pub use signature::{ethereum_message, SignatureClaims, SignatureOutcome, SignatureScheme, SignatureVerifier};
pub use witness::{WitnessBackend, WitnessClaims, WitnessOutcome, WitnessVerifier};

use aqua_core::{AquaError, Chain, Revision, VerifyContext};

/// Verification entry point: capabilities plus the active profile
pub struct Verifier {
    validator: RevisionValidator,
    profile: VerifyProfile,
}

impl Verifier {
    /// Verifier with the default (`fast`) profile
    pub fn new(capabilities: Capabilities) -> Self {
        Self::with_profile(capabilities, VerifyProfile::default())
    }

    pub fn with_profile(capabilities: Capabilities, profile: VerifyProfile) -> Self {
        let signatures = SignatureVerifier::new(capabilities.address_recovery, capabilities.did_key)
            .accept_only(profile.accepted_signature_types.clone());
        let witnesses = WitnessVerifier::new(
            capabilities.ledger,
            capabilities.relay,
            capabilities.timestamp_authority,
        );
        Self {
            validator: RevisionValidator::new(signatures, witnesses),
            profile,
        }
    }

    pub fn profile(&self) -> &VerifyProfile {
        &self.profile
    }

    /// Fresh context for one verification run
    pub fn context(&self) -> VerifyContext {
        self.profile.context()
    }

    /// Verify a single revision stored under `verification_hash`
    pub async fn verify_revision(&self, verification_hash: &str, revision: &Revision) -> RevisionVerdict {
        self.validator
            .validate(verification_hash, revision, &self.context())
            .await
    }

    /// Verify a whole chain
    pub async fn verify_chain(&self, chain: &Chain) -> ChainVerdict {
        verify_chain(&self.validator, chain, &self.context()).await
    }

    /// Verify a chain together with its files and the chains it links to
    pub async fn verify_chain_with(&self, chain: &Chain, attachments: &Attachments) -> ChainVerdict {
        verify_chain_with(&self.validator, chain, attachments, &self.context()).await
    }

    /// Lazy walker over `chain`, for callers that consume verdicts one by one
    pub fn walker<'a>(&'a self, chain: &'a Chain, ctx: &'a VerifyContext) -> Result<ChainWalker<'a>, AquaError> {
        ChainWalker::new(&self.validator, chain, ctx)
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(Capabilities::default())
    }
}
