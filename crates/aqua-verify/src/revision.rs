//! Revision validation
//!
//! Runs every check of a single revision and records the outcome of each in a
//! [`RevisionVerdict`]. Data problems never surface as `Err`; they become
//! failures on the verdict.

use crate::signature::SignatureVerifier;
use crate::verdict::{HashStatus, RevisionFailure, RevisionVerdict};
use crate::witness::WitnessVerifier;
use aqua_core::{claim_text, keys, Revision, RevisionKind, VerifyContext};
use aqua_merkle::{hash, hash_bytes, leaves_of, merkle_root};
use std::time::Instant;
use tracing::{debug, info};

pub struct RevisionValidator {
    signatures: SignatureVerifier,
    witnesses: WitnessVerifier,
}

impl RevisionValidator {
    pub fn new(signatures: SignatureVerifier, witnesses: WitnessVerifier) -> Self {
        Self { signatures, witnesses }
    }

    /// Validate `revision`, stored under `verification_hash`
    pub async fn validate(&self, verification_hash: &str, revision: &Revision, ctx: &VerifyContext) -> RevisionVerdict {
        let start = Instant::now();
        let mut verdict = self.run_checks(verification_hash, revision, ctx).await;
        verdict.elapsed_ms = start.elapsed().as_millis() as u64;

        if ctx.verbose {
            info!(
                trace_id = %ctx.trace_id,
                verification_hash,
                valid = verdict.is_valid(),
                latency_ms = verdict.elapsed_ms,
                "revision checked"
            );
        }
        verdict
    }

    async fn run_checks(&self, verification_hash: &str, revision: &Revision, ctx: &VerifyContext) -> RevisionVerdict {
        let mut verdict = RevisionVerdict::new(verification_hash);

        let kind = match revision.check_mandatory_fields() {
            Ok(kind) => kind,
            Err(err) => {
                debug!(verification_hash, error = %err, "mandatory field check failed");
                return verdict.fail(err.into());
            }
        };
        verdict.revision_type = Some(kind);

        if let Err(err) = revision.check_exclusive_claims() {
            return verdict.fail(err.into());
        }

        verdict.deleted_form_fields = revision.deleted_form_fields();

        let computed = leaves_of(&revision.claims);
        let mut mismatched = Vec::new();
        for (index, (key, leaf)) in revision.claims.keys().zip(&computed).enumerate() {
            let matches = revision.leaves.get(index) == Some(leaf);
            if ctx.verbose {
                debug!(trace_id = %ctx.trace_id, claim = %key, matches, "claim leaf");
            }
            if !matches {
                mismatched.push(key.clone());
            }
            verdict.claims.insert(key.clone(), matches);
        }
        if !mismatched.is_empty() {
            verdict.failures.push(RevisionFailure::LeafMismatch { keys: mismatched });
        }
        if revision.leaves.len() != computed.len() {
            verdict.failures.push(RevisionFailure::LeafCountMismatch {
                declared: revision.leaves.len(),
                computed: computed.len(),
            });
        }

        if let Some(declared) = revision.file_hash() {
            Self::check_file_hash(verification_hash, declared, revision, ctx, &mut verdict);
        }
        if kind == RevisionKind::Link {
            Self::check_links(revision, ctx, &mut verdict);
        }

        let target = revision.previous_verification_hash();

        if revision.has_signature() {
            let outcome = self.signatures.verify(target, revision);
            verdict.signature = outcome.status;
            verdict.diagnostics.extend(outcome.diagnostic);
            if !outcome.valid {
                verdict.failures.push(RevisionFailure::SignatureInvalid);
            }
        }

        if revision.has_witness() {
            let outcome = self
                .witnesses
                .verify(target, revision, ctx.verify_merkle_proof)
                .await;
            verdict.witness = outcome.status;
            verdict.merkle_proof = outcome.merkle_proof;
            verdict.diagnostics.extend(outcome.diagnostics);
            if !outcome.valid {
                verdict.failures.push(RevisionFailure::WitnessInvalid);
            }
        }

        let root = merkle_root(&computed);
        if root.as_deref() == Some(verification_hash) {
            verdict.hash_status = HashStatus::Verified;
        } else {
            verdict.hash_status = HashStatus::Invalid;
            verdict
                .failures
                .push(RevisionFailure::VerificationHashMismatch { computed: root });
        }
        verdict
    }

    /// Supplied file bytes take precedence over the `content` claim
    fn check_file_hash(
        verification_hash: &str,
        declared: &str,
        revision: &Revision,
        ctx: &VerifyContext,
        verdict: &mut RevisionVerdict,
    ) {
        let computed = match ctx.file(verification_hash) {
            Some(bytes) => Some(hash_bytes(bytes)),
            None => revision.claim(keys::CONTENT).map(|content| hash(&claim_text(content))),
        };
        match computed {
            Some(computed) if computed == declared => verdict.file_hash = Some(HashStatus::Verified),
            Some(computed) => {
                debug!(verification_hash, declared, computed = %computed, "file hash mismatch");
                verdict.file_hash = Some(HashStatus::Invalid);
                verdict.failures.push(RevisionFailure::FileHashMismatch {
                    declared: declared.to_string(),
                    computed,
                });
            }
            None => verdict
                .diagnostics
                .push(format!("file_hash not checked: no file content for {}", verification_hash)),
        }
    }

    fn check_links(revision: &Revision, ctx: &VerifyContext, verdict: &mut RevisionVerdict) {
        let linked = revision.link_hashes();
        if linked.is_empty() {
            verdict.failures.push(RevisionFailure::Malformed {
                reason: "link revision names no verification hash".to_string(),
            });
            return;
        }
        let mut unresolved = Vec::new();
        for linked_hash in linked {
            let found = ctx.linked_hashes.contains(&linked_hash);
            if !found {
                unresolved.push(linked_hash.clone());
            }
            verdict.links.insert(linked_hash, found);
        }
        if !unresolved.is_empty() {
            verdict.failures.push(RevisionFailure::UnresolvedLinks { hashes: unresolved });
        }
    }
}
