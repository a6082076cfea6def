//! Witness verification
//!
//! A witness revision anchors its predecessor's verification hash in an
//! external system. The backend is picked from `witness_network`; the
//! optional second phase checks that `witness_merkle_proof` leads from the
//! witnessed hash to `witness_merkle_root`.

use crate::capability::{
    parse_ledger_reply, CapabilityError, LedgerWitnessCheck, RelayWitnessCheck, TimestampAuthorityCheck,
};
use crate::verdict::AttestationStatus;
use aqua_core::{claim_text, keys, Revision};
use aqua_merkle::{parse_proof, verify_against_root};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub const NOSTR_NETWORK: &str = "nostr";
pub const TSA_NETWORK: &str = "TSA_RFC3161";

/// Which external system holds the anchor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WitnessBackend {
    Nostr,
    TimestampAuthority,
    /// Any other network name is a ledger (e.g. "sepolia", "mainnet")
    Ledger(String),
}

impl WitnessBackend {
    pub fn for_network(network: &str) -> Self {
        match network {
            NOSTR_NETWORK => WitnessBackend::Nostr,
            TSA_NETWORK => WitnessBackend::TimestampAuthority,
            other => WitnessBackend::Ledger(other.to_string()),
        }
    }
}

/// Witness claims of a revision, rendered as text
#[derive(Debug, Clone, PartialEq)]
pub struct WitnessClaims {
    pub network: String,
    pub transaction_hash: String,
    pub merkle_root: String,
    pub timestamp: String,
    pub merkle_proof: Option<Value>,
}

impl WitnessClaims {
    pub fn from_revision(revision: &Revision) -> Option<Self> {
        let text = |key: &str| revision.claim(key).map(claim_text);
        Some(Self {
            network: text(keys::WITNESS_NETWORK)?,
            transaction_hash: text(keys::WITNESS_TRANSACTION_HASH)?,
            merkle_root: text(keys::WITNESS_MERKLE_ROOT)?,
            timestamp: text(keys::WITNESS_TIMESTAMP)?,
            merkle_proof: revision.claim(keys::WITNESS_MERKLE_PROOF).cloned(),
        })
    }

    pub fn backend(&self) -> WitnessBackend {
        WitnessBackend::for_network(&self.network)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessOutcome {
    pub valid: bool,
    pub status: AttestationStatus,
    /// Verdict of the external backend alone
    pub backend_valid: bool,
    /// Set only when the proof phase ran
    pub merkle_proof: Option<AttestationStatus>,
    pub diagnostics: Vec<String>,
}

impl WitnessOutcome {
    fn rejected(diagnostic: impl Into<String>) -> Self {
        Self {
            valid: false,
            status: AttestationStatus::Invalid,
            backend_valid: false,
            merkle_proof: None,
            diagnostics: vec![diagnostic.into()],
        }
    }
}

pub struct WitnessVerifier {
    ledger: Arc<dyn LedgerWitnessCheck>,
    relay: Arc<dyn RelayWitnessCheck>,
    timestamp_authority: Arc<dyn TimestampAuthorityCheck>,
}

impl WitnessVerifier {
    pub fn new(
        ledger: Arc<dyn LedgerWitnessCheck>,
        relay: Arc<dyn RelayWitnessCheck>,
        timestamp_authority: Arc<dyn TimestampAuthorityCheck>,
    ) -> Self {
        Self {
            ledger,
            relay,
            timestamp_authority,
        }
    }

    /// Verify the witness claims of `revision` for `target_hash`
    pub async fn verify(&self, target_hash: &str, revision: &Revision, verify_merkle_proof: bool) -> WitnessOutcome {
        match WitnessClaims::from_revision(revision) {
            Some(claims) => self.verify_claims(target_hash, &claims, verify_merkle_proof).await,
            None => WitnessOutcome::rejected("witness claims incomplete"),
        }
    }

    pub async fn verify_claims(
        &self,
        target_hash: &str,
        claims: &WitnessClaims,
        verify_merkle_proof: bool,
    ) -> WitnessOutcome {
        let mut diagnostics = Vec::new();

        let backend_valid = match self.check_backend(claims).await {
            Ok(valid) => {
                debug!(network = %claims.network, valid, "witness backend replied");
                valid
            }
            Err(err) => {
                warn!(network = %claims.network, error = %err, "witness backend check failed");
                diagnostics.push(err.to_string());
                false
            }
        };

        let merkle_proof = if verify_merkle_proof {
            let status = match check_merkle_proof(target_hash, claims) {
                Ok(()) => AttestationStatus::Valid,
                Err(reason) => {
                    debug!(%reason, "witness merkle proof rejected");
                    diagnostics.push(reason);
                    AttestationStatus::Invalid
                }
            };
            Some(status)
        } else {
            None
        };

        let valid = backend_valid && merkle_proof.map_or(true, |s| s == AttestationStatus::Valid);
        WitnessOutcome {
            valid,
            status: AttestationStatus::from_valid(valid),
            backend_valid,
            merkle_proof,
            diagnostics,
        }
    }

    async fn check_backend(&self, claims: &WitnessClaims) -> Result<bool, CapabilityError> {
        let (tx, root, ts) = (
            claims.transaction_hash.as_str(),
            claims.merkle_root.as_str(),
            claims.timestamp.as_str(),
        );
        match claims.backend() {
            WitnessBackend::Nostr => self.relay.check(tx, root, ts).await,
            WitnessBackend::TimestampAuthority => self.timestamp_authority.check(tx, root, ts).await,
            WitnessBackend::Ledger(network) => {
                let reply = self.ledger.check(&network, tx, root, ts).await;
                parse_ledger_reply(&reply)
            }
        }
    }
}

/// The proof must lead from the witnessed hash to the claimed root
fn check_merkle_proof(target_hash: &str, claims: &WitnessClaims) -> Result<(), String> {
    let raw = claims
        .merkle_proof
        .as_ref()
        .ok_or_else(|| "witness_merkle_proof missing".to_string())?;
    let path = parse_proof(raw).map_err(|e| e.to_string())?;
    verify_against_root(&path, target_hash, &claims.merkle_root)
        .into_result()
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use aqua_merkle::{hash, MerkleTree};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        reply: String,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LedgerWitnessCheck for Recorder {
        async fn check(&self, network: &str, tx_hash: &str, _root: &str, _ts: &str) -> String {
            self.calls.lock().unwrap().push(format!("ledger:{}:{}", network, tx_hash));
            self.reply.clone()
        }
    }

    #[async_trait]
    impl RelayWitnessCheck for Recorder {
        async fn check(&self, tx_hash: &str, _root: &str, _ts: &str) -> Result<bool, CapabilityError> {
            self.calls.lock().unwrap().push(format!("relay:{}", tx_hash));
            parse_ledger_reply(&self.reply)
        }
    }

    #[async_trait]
    impl TimestampAuthorityCheck for Recorder {
        async fn check(&self, tx_hash: &str, _root: &str, _ts: &str) -> Result<bool, CapabilityError> {
            self.calls.lock().unwrap().push(format!("tsa:{}", tx_hash));
            parse_ledger_reply(&self.reply)
        }
    }

    fn verifier(reply: &str) -> (Arc<Recorder>, WitnessVerifier) {
        let recorder = Arc::new(Recorder {
            reply: reply.to_string(),
            ..Default::default()
        });
        let verifier = WitnessVerifier::new(recorder.clone(), recorder.clone(), recorder.clone());
        (recorder, verifier)
    }

    fn claims(network: &str, root: &str, proof: Option<Value>) -> WitnessClaims {
        WitnessClaims {
            network: network.to_string(),
            transaction_hash: "0xtx".to_string(),
            merkle_root: root.to_string(),
            timestamp: "1700000000".to_string(),
            merkle_proof: proof,
        }
    }

    #[test]
    fn test_backend_dispatch() {
        assert_eq!(WitnessBackend::for_network("nostr"), WitnessBackend::Nostr);
        assert_eq!(WitnessBackend::for_network("TSA_RFC3161"), WitnessBackend::TimestampAuthority);
        assert_eq!(
            WitnessBackend::for_network("sepolia"),
            WitnessBackend::Ledger("sepolia".to_string())
        );
    }

    #[test]
    fn test_claims_render_numbers_as_text() {
        let revision = Revision::from_value(json!({
            "revision_type": "witness",
            "witness_network": "sepolia",
            "witness_transaction_hash": "0xtx",
            "witness_merkle_root": "root",
            "witness_timestamp": 1700000000,
        }))
        .unwrap();
        let claims = WitnessClaims::from_revision(&revision).unwrap();
        assert_eq!(claims.timestamp, "1700000000");
        assert!(claims.merkle_proof.is_none());
    }

    #[tokio::test]
    async fn test_each_network_reaches_its_backend() {
        for (network, expected) in [("nostr", "relay:0xtx"), ("TSA_RFC3161", "tsa:0xtx"), ("sepolia", "ledger:sepolia:0xtx")] {
            let (recorder, verifier) = verifier("true");
            let outcome = verifier.verify_claims("target", &claims(network, "root", None), false).await;
            assert!(outcome.valid, "{} should be valid", network);
            assert_eq!(*recorder.calls.lock().unwrap(), vec![expected.to_string()]);
            assert!(outcome.merkle_proof.is_none());
        }
    }

    #[tokio::test]
    async fn test_ledger_error_text_is_a_diagnostic() {
        let (_, verifier) = verifier("rpc unreachable");
        let outcome = verifier.verify_claims("target", &claims("sepolia", "root", None), false).await;
        assert!(!outcome.valid);
        assert_eq!(outcome.status, AttestationStatus::Invalid);
        assert!(outcome.diagnostics[0].contains("rpc unreachable"));
    }

    #[tokio::test]
    async fn test_valid_proof_to_claimed_root() {
        let target = hash("previous revision");
        let leaves = vec![target.clone(), hash("another document")];
        let tree = MerkleTree::build(&leaves);
        let root = tree.root().unwrap().to_string();
        let proof = serde_json::to_value(tree.proof_for(0).unwrap()).unwrap();

        let (_, verifier) = verifier("true");
        let outcome = verifier.verify_claims(&target, &claims("sepolia", &root, Some(proof)), true).await;
        assert!(outcome.valid);
        assert_eq!(outcome.merkle_proof, Some(AttestationStatus::Valid));
    }

    #[tokio::test]
    async fn test_bad_proof_overrides_backend() {
        let target = hash("previous revision");
        let tree = MerkleTree::build(&[target.clone(), hash("another document")]);
        let proof = serde_json::to_value(tree.proof_for(0).unwrap()).unwrap();

        let (_, verifier) = verifier("true");
        let outcome = verifier
            .verify_claims(&target, &claims("sepolia", &hash("elsewhere"), Some(proof)), true)
            .await;
        assert!(outcome.backend_valid);
        assert!(!outcome.valid);
        assert_eq!(outcome.merkle_proof, Some(AttestationStatus::Invalid));
    }

    #[tokio::test]
    async fn test_missing_proof_fails_only_when_requested() {
        let (_, verifier) = verifier("true");
        let witness = claims("sepolia", "root", None);
        assert!(verifier.verify_claims("target", &witness, false).await.valid);

        let outcome = verifier.verify_claims("target", &witness, true).await;
        assert!(!outcome.valid);
        assert!(outcome.diagnostics.iter().any(|d| d.contains("witness_merkle_proof")));
    }
}
