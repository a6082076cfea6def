//! Merkle inclusion proof validation
//!
//! A proof is an ordered path of nodes from the target leaf up to a root.
//! Each node names its two children and the successor they hash to; the next
//! node must contain that successor as one of its children.

use crate::tree::combine;
use aqua_core::{AquaError, MerkleProofNode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of walking a proof path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOutcome {
    pub valid: bool,
    /// Successor of the last node, when every node passed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    /// Index of the first node that failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ProofOutcome {
    fn proven(root: String) -> Self {
        Self {
            valid: true,
            root: Some(root),
            failed_at: None,
            reason: None,
        }
    }

    fn rejected(failed_at: Option<usize>, reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            root: None,
            failed_at,
            reason: Some(reason.into()),
        }
    }

    pub fn into_result(self) -> Result<String, AquaError> {
        match (self.valid, self.root) {
            (true, Some(root)) => Ok(root),
            _ => Err(AquaError::MerkleProof(
                self.reason.unwrap_or_else(|| "proof rejected".to_string()),
            )),
        }
    }
}

/// Successor a node's children hash to; a lone child is its own successor
pub fn expected_successor(node: &MerkleProofNode) -> Option<String> {
    match (node.left(), node.right()) {
        (None, None) => None,
        (None, Some(right)) => Some(right.to_string()),
        (Some(left), None) => Some(left.to_string()),
        (Some(left), Some(right)) => Some(combine(left, right)),
    }
}

/// Check that `path` proves `target`.
pub fn verify_proof(path: &[MerkleProofNode], target: &str) -> ProofOutcome {
    if path.is_empty() {
        return ProofOutcome::rejected(None, "empty proof path");
    }

    let mut current = target.to_string();
    for (index, node) in path.iter().enumerate() {
        if !node.contains(&current) {
            return ProofOutcome::rejected(
                Some(index),
                format!("node {} does not contain {}", index, current),
            );
        }
        let successor = match expected_successor(node) {
            Some(successor) => successor,
            None => return ProofOutcome::rejected(Some(index), format!("node {} has no leaves", index)),
        };
        if successor != node.successor {
            return ProofOutcome::rejected(
                Some(index),
                format!(
                    "node {} declares successor {} but its leaves hash to {}",
                    index, node.successor, successor
                ),
            );
        }
        current = successor;
    }

    ProofOutcome::proven(current)
}

/// [`verify_proof`] plus a comparison of the proven root with `expected_root`
pub fn verify_against_root(path: &[MerkleProofNode], target: &str, expected_root: &str) -> ProofOutcome {
    let outcome = verify_proof(path, target);
    match outcome.root.as_deref() {
        Some(root) if root != expected_root => ProofOutcome::rejected(
            Some(path.len() - 1),
            format!("proof ends at {} instead of {}", root, expected_root),
        ),
        _ => outcome,
    }
}

/// Decode a `witness_merkle_proof` claim
pub fn parse_proof(value: &Value) -> Result<Vec<MerkleProofNode>, AquaError> {
    match value {
        Value::String(raw) => serde_json::from_str(raw).map_err(|e| AquaError::MerkleProof(e.to_string())),
        other => serde_json::from_value(other.clone()).map_err(|e| AquaError::MerkleProof(e.to_string())),
    }
}
