//! Files and linked chains supplied alongside the chain under verification
//!
//! File bytes are looked up by the file name recorded in a chain's
//! `file_index`. Linked chains are the other documents a `link` revision may
//! point into.

use aqua_core::{Chain, VerifyContext};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct Attachments {
    files: BTreeMap<String, Vec<u8>>,
    linked: Vec<Chain>,
}

impl Attachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(name.into(), bytes.into());
        self
    }

    pub fn with_linked(mut self, chain: Chain) -> Self {
        self.linked.push(chain);
        self
    }

    pub fn file(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    pub fn linked(&self) -> &[Chain] {
        &self.linked
    }

    /// Every verification hash held by a linked chain
    pub fn linked_hashes(&self) -> BTreeSet<String> {
        self.linked
            .iter()
            .flat_map(|chain| chain.revisions.keys().cloned())
            .collect()
    }

    /// `base` with the bytes of every file `chain` indexes and we hold
    pub fn context_for(&self, chain: &Chain, base: &VerifyContext) -> VerifyContext {
        chain
            .file_index
            .iter()
            .filter_map(|(hash, name)| self.file(name).map(|bytes| (hash, bytes)))
            .fold(base.clone(), |ctx, (hash, bytes)| ctx.with_file(hash.clone(), bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqua_core::Revision;

    #[test]
    fn test_files_follow_the_file_index() {
        let chain = Chain::new().with_file("h1", "contract.md").with_file("h2", "missing.md");
        let attachments = Attachments::new().with_file("contract.md", b"# Contract".to_vec());

        let ctx = attachments.context_for(&chain, &VerifyContext::new().verbose(true));
        assert_eq!(ctx.file("h1"), Some(&b"# Contract"[..]));
        assert_eq!(ctx.file("h2"), None);
        assert!(ctx.verbose);
    }

    #[test]
    fn test_linked_hashes_cover_every_linked_chain() {
        let mut first = Chain::new();
        first.push("a1", Revision::default()).push("a2", Revision::default());
        let mut second = Chain::new();
        second.push("b1", Revision::default());

        let attachments = Attachments::new().with_linked(first).with_linked(second);
        let hashes: Vec<String> = attachments.linked_hashes().into_iter().collect();
        assert_eq!(hashes, vec!["a1", "a2", "b1"]);
        assert_eq!(attachments.linked().len(), 2);
    }
}
