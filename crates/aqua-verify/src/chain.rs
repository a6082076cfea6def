//! Chain walking
//!
//! Revisions are validated oldest first. The walk is a lazy stream: a
//! revision is only validated once the previous one passed, so nothing
//! after the first failure is ever checked.

use crate::attachments::Attachments;
use crate::revision::RevisionValidator;
use crate::verdict::{ChainVerdict, RevisionVerdict};
use aqua_core::{AquaError, Chain, VerifyContext};
use futures::stream::{self, Stream, StreamExt};
use tracing::{info, warn};

pub struct ChainWalker<'a> {
    validator: &'a RevisionValidator,
    chain: &'a Chain,
    ctx: &'a VerifyContext,
}

impl<'a> ChainWalker<'a> {
    /// Fails with `MalformedChain` when the revisions are not a linked chain
    pub fn new(validator: &'a RevisionValidator, chain: &'a Chain, ctx: &'a VerifyContext) -> Result<Self, AquaError> {
        chain.check_linkage()?;
        Ok(Self { validator, chain, ctx })
    }

    /// Verdicts oldest first, ending with the first failing revision
    pub fn walk(self) -> impl Stream<Item = RevisionVerdict> + 'a {
        let chain: &'a Chain = self.chain;
        let revisions = chain.revisions.iter();
        stream::unfold((self, revisions, false), |(walker, mut revisions, stopped)| async move {
            if stopped {
                return None;
            }
            let (hash, revision) = revisions.next()?;
            let (validator, ctx) = (walker.validator, walker.ctx);
            let verdict = validator.validate(hash, revision, ctx).await;
            let failed = !verdict.is_valid();
            Some((verdict, (walker, revisions, failed)))
        })
    }
}

/// Walk `chain` and fold the verdicts into a [`ChainVerdict`]
pub async fn verify_chain(validator: &RevisionValidator, chain: &Chain, ctx: &VerifyContext) -> ChainVerdict {
    if chain.is_empty() {
        info!(trace_id = %ctx.trace_id, status = "NORECORD", "chain verified");
        return ChainVerdict::no_record();
    }

    let walker = match ChainWalker::new(validator, chain, ctx) {
        Ok(walker) => walker,
        Err(err) => {
            warn!(trace_id = %ctx.trace_id, error = %err, "chain rejected");
            return ChainVerdict::malformed(chain.len(), &err);
        }
    };

    let verdicts: Vec<RevisionVerdict> = walker.walk().collect().await;
    let verified_count = verdicts.iter().take_while(|v| v.is_valid()).count();
    let verdict = ChainVerdict::from_walk(chain.len(), verified_count, verdicts);

    info!(
        trace_id = %ctx.trace_id,
        status = %verdict.status,
        verified = verdict.verified_count,
        total = verdict.total,
        elapsed_ms = ctx.elapsed_ms(),
        "chain verified"
    );
    verdict
}

/// Verify `chain` against supplied files and linked chains.
///
/// Each linked chain is verified first, with every linked chain's hashes
/// resolvable. Only hashes of linked chains that come out VERIFIED resolve the
/// links of `chain`.
pub async fn verify_chain_with(
    validator: &RevisionValidator,
    chain: &Chain,
    attachments: &Attachments,
    ctx: &VerifyContext,
) -> ChainVerdict {
    let candidates = attachments.linked_hashes();
    let mut resolvable = Vec::new();
    for linked in attachments.linked() {
        let linked_ctx = attachments
            .context_for(linked, ctx)
            .with_linked_hashes(candidates.iter().cloned());
        let verdict = verify_chain(validator, linked, &linked_ctx).await;
        if verdict.is_verified() {
            resolvable.extend(linked.revisions.keys().cloned());
        } else {
            warn!(trace_id = %ctx.trace_id, status = %verdict.status, "linked chain not verified");
        }
    }

    let ctx = attachments.context_for(chain, ctx).with_linked_hashes(resolvable);
    verify_chain(validator, chain, &ctx).await
}
