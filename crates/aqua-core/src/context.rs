//! Verification Context: per-run settings passed down the verification calls
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct VerifyContext {
    pub trace_id: String,
    pub started_at: DateTime<Utc>,
    /// Emit per-revision and per-claim log events
    pub verbose: bool,
    /// Run the witness Merkle-proof phase in addition to the backend check
    pub verify_merkle_proof: bool,
    /// Verification hashes a link revision may name
    pub linked_hashes: BTreeSet<String>,
    /// File bytes keyed by the verification hash of the revision declaring them
    pub files: BTreeMap<String, Vec<u8>>,
}

impl VerifyContext {
    pub fn new() -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            verbose: false,
            verify_merkle_proof: false,
            linked_hashes: BTreeSet::new(),
            files: BTreeMap::new(),
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_merkle_proof(mut self, enabled: bool) -> Self {
        self.verify_merkle_proof = enabled;
        self
    }

    pub fn with_linked_hashes(mut self, hashes: impl IntoIterator<Item = String>) -> Self {
        self.linked_hashes.extend(hashes);
        self
    }

    pub fn with_file(mut self, verification_hash: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(verification_hash.into(), bytes.into());
        self
    }

    pub fn file(&self, verification_hash: &str) -> Option<&[u8]> {
        self.files.get(verification_hash).map(Vec::as_slice)
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}

impl Default for VerifyContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builders() {
        let ctx = VerifyContext::new()
            .with_linked_hashes(vec!["h1".to_string()])
            .with_file("h2", b"hello".to_vec());
        assert!(ctx.linked_hashes.contains("h1"));
        assert_eq!(ctx.file("h2"), Some(&b"hello"[..]));
        assert_eq!(ctx.file("h1"), None);
        assert!(ctx.elapsed_ms() >= 0);
        assert_ne!(ctx.trace_id, VerifyContext::new().trace_id);
    }
}
