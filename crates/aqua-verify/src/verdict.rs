//! Verdict types for revision and chain verification
//!
//! A revision verdict records every check that ran, so a failing revision
//! still shows which claims, signature or witness were fine. Chain verdicts
//! fold the per-revision verdicts into NORECORD / VERIFIED / INVALID.

use aqua_core::{AquaError, RevisionKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Status of a signature, witness or witness Merkle proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttestationStatus {
    Missing,
    Valid,
    Invalid,
}

impl AttestationStatus {
    pub fn from_valid(valid: bool) -> Self {
        if valid {
            AttestationStatus::Valid
        } else {
            AttestationStatus::Invalid
        }
    }

    /// Missing attestations do not fail a revision
    pub fn is_acceptable(&self) -> bool {
        !matches!(self, AttestationStatus::Invalid)
    }
}

/// Whether the recomputed root matches the revision's verification hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HashStatus {
    Verified,
    Invalid,
}

/// Overall chain status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainStatus {
    #[serde(rename = "NORECORD")]
    NoRecord,
    #[serde(rename = "VERIFIED")]
    Verified,
    #[serde(rename = "INVALID")]
    Invalid,
}

/// Why a revision failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RevisionFailure {
    MissingMandatoryField { field: String },
    UnknownRevisionType { value: String },
    MutuallyExclusiveClaims,
    LeafMismatch { keys: Vec<String> },
    LeafCountMismatch { declared: usize, computed: usize },
    FileHashMismatch { declared: String, computed: String },
    UnresolvedLinks { hashes: Vec<String> },
    SignatureInvalid,
    WitnessInvalid,
    VerificationHashMismatch { computed: Option<String> },
    Malformed { reason: String },
}

impl From<AquaError> for RevisionFailure {
    fn from(err: AquaError) -> Self {
        match err {
            AquaError::MissingMandatoryField(field) => RevisionFailure::MissingMandatoryField { field },
            AquaError::UnknownRevisionType(value) => RevisionFailure::UnknownRevisionType { value },
            AquaError::MutuallyExclusiveClaims => RevisionFailure::MutuallyExclusiveClaims,
            other => RevisionFailure::Malformed {
                reason: other.to_string(),
            },
        }
    }
}

impl fmt::Display for RevisionFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RevisionFailure::MissingMandatoryField { field } => write!(f, "missing mandatory field {}", field),
            RevisionFailure::UnknownRevisionType { value } => write!(f, "unknown revision type {}", value),
            RevisionFailure::MutuallyExclusiveClaims => write!(f, "signature and witness in one revision"),
            RevisionFailure::LeafMismatch { keys } => write!(f, "leaf mismatch: {}", keys.join(", ")),
            RevisionFailure::LeafCountMismatch { declared, computed } => {
                write!(f, "{} leaves declared, {} claims hashed", declared, computed)
            }
            RevisionFailure::FileHashMismatch { .. } => write!(f, "file hash mismatch"),
            RevisionFailure::UnresolvedLinks { hashes } => write!(f, "unresolved links: {}", hashes.join(", ")),
            RevisionFailure::SignatureInvalid => write!(f, "signature invalid"),
            RevisionFailure::WitnessInvalid => write!(f, "witness invalid"),
            RevisionFailure::VerificationHashMismatch { .. } => write!(f, "verification hash mismatch"),
            RevisionFailure::Malformed { reason } => f.write_str(reason),
        }
    }
}

/// Verdict for one revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionVerdict {
    pub verification_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_type: Option<RevisionKind>,
    /// Per claim key: does the recomputed leaf match the declared one
    pub claims: BTreeMap<String, bool>,
    pub signature: AttestationStatus,
    pub witness: AttestationStatus,
    /// Only set when the witness Merkle-proof phase ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merkle_proof: Option<AttestationStatus>,
    /// Only set when the revision declares a `file_hash` and its content is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<HashStatus>,
    /// Per linked verification hash: was it found among the linked chains
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, bool>,
    pub hash_status: HashStatus,
    #[serde(default)]
    pub failures: Vec<RevisionFailure>,
    /// Capability error texts and other non-fatal notes
    #[serde(default)]
    pub diagnostics: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deleted_form_fields: Vec<String>,
    pub elapsed_ms: u64,
}

impl RevisionVerdict {
    /// Fresh verdict; nothing checked yet, hash not yet verified
    pub fn new(verification_hash: impl Into<String>) -> Self {
        Self {
            verification_hash: verification_hash.into(),
            revision_type: None,
            claims: BTreeMap::new(),
            signature: AttestationStatus::Missing,
            witness: AttestationStatus::Missing,
            merkle_proof: None,
            file_hash: None,
            links: BTreeMap::new(),
            hash_status: HashStatus::Invalid,
            failures: Vec::new(),
            diagnostics: Vec::new(),
            deleted_form_fields: Vec::new(),
            elapsed_ms: 0,
        }
    }

    pub fn fail(mut self, failure: RevisionFailure) -> Self {
        self.failures.push(failure);
        self
    }

    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
            && self.hash_status == HashStatus::Verified
            && self.claims.values().all(|ok| *ok)
            && self.file_hash != Some(HashStatus::Invalid)
            && self.links.values().all(|ok| *ok)
            && self.signature.is_acceptable()
            && self.witness.is_acceptable()
    }

    /// Claim keys whose leaf did not match
    pub fn mismatched_claims(&self) -> Vec<&str> {
        self.claims
            .iter()
            .filter(|(_, ok)| !**ok)
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

impl fmt::Display for RevisionVerdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = self.revision_type.map(|k| k.as_str()).unwrap_or("?");
        if self.is_valid() {
            write!(f, "VERIFIED {} ({})", self.verification_hash, kind)
        } else {
            write!(f, "INVALID {} ({})", self.verification_hash, kind)?;
            if !self.failures.is_empty() {
                let reasons: Vec<String> = self.failures.iter().map(|r| r.to_string()).collect();
                write!(f, ": {}", reasons.join("; "))?;
            }
            Ok(())
        }
    }
}

/// Verdict for a whole chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerdict {
    pub status: ChainStatus,
    /// Per-revision verdicts, newest first
    pub revisions: Vec<RevisionVerdict>,
    /// Consecutively verified revisions counted from genesis
    pub verified_count: usize,
    pub total: usize,
    /// Set when the chain was rejected before any revision was walked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub malformed: Option<String>,
}

impl ChainVerdict {
    pub fn no_record() -> Self {
        Self {
            status: ChainStatus::NoRecord,
            revisions: Vec::new(),
            verified_count: 0,
            total: 0,
            malformed: None,
        }
    }

    pub fn malformed(total: usize, err: &AquaError) -> Self {
        Self {
            status: ChainStatus::Invalid,
            revisions: Vec::new(),
            verified_count: 0,
            total,
            malformed: Some(err.to_string()),
        }
    }

    /// Build from verdicts collected oldest first
    pub fn from_walk(total: usize, verified_count: usize, mut oldest_first: Vec<RevisionVerdict>) -> Self {
        oldest_first.reverse();
        let status = if total == 0 {
            ChainStatus::NoRecord
        } else if verified_count == total {
            ChainStatus::Verified
        } else {
            ChainStatus::Invalid
        };
        Self {
            status,
            revisions: oldest_first,
            verified_count,
            total,
            malformed: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.status == ChainStatus::Verified
    }

    /// Share of revisions verified, in percent
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.verified_count as f64 / self.total as f64
        }
    }

    /// The first failing revision, if any
    pub fn first_failure(&self) -> Option<&RevisionVerdict> {
        self.revisions.iter().find(|v| !v.is_valid())
    }

    pub fn summary(&self) -> String {
        match self.status {
            ChainStatus::NoRecord => "NORECORD: chain has no revisions".to_string(),
            ChainStatus::Verified => format!(
                "VERIFIED: all {} revisions verified",
                self.total
            ),
            ChainStatus::Invalid => match (&self.malformed, self.first_failure()) {
                (Some(reason), _) => format!("INVALID: {}", reason),
                (None, Some(failed)) => format!(
                    "INVALID: {}/{} revisions verified ({:.1}%), {}",
                    self.verified_count,
                    self.total,
                    self.percentage(),
                    failed
                ),
                (None, None) => format!(
                    "INVALID: {}/{} revisions verified",
                    self.verified_count, self.total
                ),
            },
        }
    }
}

impl fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainStatus::NoRecord => write!(f, "NORECORD"),
            ChainStatus::Verified => write!(f, "VERIFIED"),
            ChainStatus::Invalid => write!(f, "INVALID"),
        }
    }
}

impl fmt::Display for ChainVerdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verified(hash: &str) -> RevisionVerdict {
        let mut verdict = RevisionVerdict::new(hash);
        verdict.hash_status = HashStatus::Verified;
        verdict.claims.insert("content".to_string(), true);
        verdict
    }

    #[test]
    fn test_missing_attestations_are_acceptable() {
        let verdict = verified("h1");
        assert_eq!(verdict.signature, AttestationStatus::Missing);
        assert!(verdict.is_valid());
    }

    #[test]
    fn test_any_invalid_part_fails_the_revision() {
        let mut verdict = verified("h1");
        verdict.signature = AttestationStatus::Invalid;
        assert!(!verdict.is_valid());

        let mut verdict = verified("h1");
        verdict.claims.insert("domain_id".to_string(), false);
        assert!(!verdict.is_valid());
        assert_eq!(verdict.mismatched_claims(), vec!["domain_id"]);

        let mut verdict = verified("h1");
        verdict.file_hash = Some(HashStatus::Invalid);
        assert!(!verdict.is_valid());

        let mut verdict = verified("h1");
        verdict.links.insert("h0".to_string(), false);
        assert!(!verdict.is_valid());

        let verdict = verified("h1").fail(RevisionFailure::MutuallyExclusiveClaims);
        assert!(!verdict.is_valid());
        assert!(verdict.to_string().contains("signature and witness"));
    }

    #[test]
    fn test_chain_verdict_orders_newest_first() {
        let verdict = ChainVerdict::from_walk(2, 2, vec![verified("h1"), verified("h2")]);
        assert_eq!(verdict.status, ChainStatus::Verified);
        assert_eq!(verdict.revisions[0].verification_hash, "h2");
        assert_eq!(verdict.percentage(), 100.0);
    }

    #[test]
    fn test_chain_verdict_partial() {
        let failed = RevisionVerdict::new("h2").fail(RevisionFailure::SignatureInvalid);
        let verdict = ChainVerdict::from_walk(3, 1, vec![verified("h1"), failed]);
        assert_eq!(verdict.status, ChainStatus::Invalid);
        assert_eq!(verdict.first_failure().unwrap().verification_hash, "h2");
        assert!(verdict.summary().contains("1/3"));
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&ChainStatus::NoRecord).unwrap(), "\"NORECORD\"");
        assert_eq!(serde_json::to_string(&AttestationStatus::Missing).unwrap(), "\"MISSING\"");
        assert_eq!(serde_json::to_string(&HashStatus::Verified).unwrap(), "\"VERIFIED\"");

        let failure = RevisionFailure::MissingMandatoryField {
            field: "domain_id".to_string(),
        };
        let json = serde_json::to_string(&failure).unwrap();
        assert!(json.contains("missing_mandatory_field"));
        let parsed: RevisionFailure = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, failure);
    }

    #[test]
    fn test_malformed_and_empty() {
        let err = AquaError::MalformedChain("detached genesis".to_string());
        let verdict = ChainVerdict::malformed(4, &err);
        assert_eq!(verdict.status, ChainStatus::Invalid);
        assert_eq!(verdict.verified_count, 0);
        assert!(verdict.summary().contains("detached genesis"));

        assert_eq!(ChainVerdict::no_record().status, ChainStatus::NoRecord);
    }
}
