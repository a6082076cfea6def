//! Signature verification
//!
//! A signature revision signs its predecessor's verification hash. Without a
//! predecessor there is nothing to sign, so an empty target always fails.

use crate::capability::{AddressRecovery, DidKeyCheck};
use crate::verdict::AttestationStatus;
use aqua_core::{claim_text, keys, Revision};
use std::sync::Arc;
use tracing::{debug, warn};

/// Supported signature schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    DidKey,
    /// Personal-message signature recoverable to a wallet address
    Ethereum,
}

impl SignatureScheme {
    pub fn parse(signature_type: &str) -> Option<Self> {
        match signature_type {
            "did:key" | "did_key" | "did" => Some(SignatureScheme::DidKey),
            "ethereum:eip-191" | "ethereum:metamask" | "ethereum:cli" | "metamask" | "cli" => {
                Some(SignatureScheme::Ethereum)
            }
            _ => None,
        }
    }
}

/// Message an Ethereum wallet signs for `target_hash`
pub fn ethereum_message(target_hash: &str) -> String {
    format!("I sign the following page verification_hash: [0x{}]", target_hash)
}

/// Signature claims of a revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureClaims {
    pub signature: String,
    pub signature_type: String,
    pub public_key: Option<String>,
    pub wallet_address: Option<String>,
}

impl SignatureClaims {
    pub fn from_revision(revision: &Revision) -> Option<Self> {
        Some(Self {
            signature: revision.claim(keys::SIGNATURE).map(claim_text)?,
            signature_type: revision.claim_str(keys::SIGNATURE_TYPE)?.to_string(),
            public_key: revision.claim_str(keys::SIGNATURE_PUBLIC_KEY).map(str::to_string),
            wallet_address: revision.claim_str(keys::SIGNATURE_WALLET_ADDRESS).map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureOutcome {
    pub valid: bool,
    pub status: AttestationStatus,
    pub diagnostic: Option<String>,
}

impl SignatureOutcome {
    fn valid() -> Self {
        Self {
            valid: true,
            status: AttestationStatus::Valid,
            diagnostic: None,
        }
    }

    fn invalid(diagnostic: impl Into<String>) -> Self {
        Self {
            valid: false,
            status: AttestationStatus::Invalid,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

pub struct SignatureVerifier {
    recovery: Arc<dyn AddressRecovery>,
    did_key: Arc<dyn DidKeyCheck>,
    accepted_types: Vec<String>,
}

impl SignatureVerifier {
    pub fn new(recovery: Arc<dyn AddressRecovery>, did_key: Arc<dyn DidKeyCheck>) -> Self {
        Self {
            recovery,
            did_key,
            accepted_types: Vec::new(),
        }
    }

    /// Restrict accepted `signature_type` values; empty accepts all
    pub fn accept_only(mut self, types: Vec<String>) -> Self {
        self.accepted_types = types;
        self
    }

    /// Whether `signature_type` passes the accepted-type filter
    pub fn accepts(&self, signature_type: &str) -> bool {
        self.accepted_types.is_empty() || self.accepted_types.iter().any(|t| t == signature_type)
    }

    /// Verify the signature claims of `revision` over `target_hash`
    pub fn verify(&self, target_hash: &str, revision: &Revision) -> SignatureOutcome {
        match SignatureClaims::from_revision(revision) {
            Some(claims) => self.verify_claims(target_hash, &claims),
            None => SignatureOutcome::invalid("signature or signature_type missing"),
        }
    }

    pub fn verify_claims(&self, target_hash: &str, claims: &SignatureClaims) -> SignatureOutcome {
        if target_hash.is_empty() {
            return SignatureOutcome::invalid("no previous verification hash to sign");
        }

        if !self.accepts(&claims.signature_type) {
            return SignatureOutcome::invalid(format!(
                "signature type {} not accepted",
                claims.signature_type
            ));
        }

        match SignatureScheme::parse(&claims.signature_type) {
            Some(SignatureScheme::DidKey) => self.verify_did_key(target_hash, claims),
            Some(SignatureScheme::Ethereum) => self.verify_ethereum(target_hash, claims),
            None => SignatureOutcome::invalid(format!(
                "unsupported signature type {}",
                claims.signature_type
            )),
        }
    }

    fn verify_did_key(&self, target_hash: &str, claims: &SignatureClaims) -> SignatureOutcome {
        let public_key = match &claims.public_key {
            Some(key) => key,
            None => return SignatureOutcome::invalid("signature_public_key missing"),
        };
        match self.did_key.verify(&claims.signature, public_key, target_hash) {
            Ok(true) => SignatureOutcome::valid(),
            Ok(false) => SignatureOutcome::invalid("DID signature does not match"),
            Err(err) => {
                warn!(error = %err, "DID key check failed");
                SignatureOutcome::invalid(err.to_string())
            }
        }
    }

    fn verify_ethereum(&self, target_hash: &str, claims: &SignatureClaims) -> SignatureOutcome {
        let wallet = match &claims.wallet_address {
            Some(wallet) => wallet,
            None => return SignatureOutcome::invalid("signature_wallet_address missing"),
        };
        let message = ethereum_message(target_hash);
        match self.recovery.recover(&message, &claims.signature) {
            Ok(recovered) if recovered.eq_ignore_ascii_case(wallet) => SignatureOutcome::valid(),
            Ok(recovered) => {
                debug!(%recovered, claimed = %wallet, "recovered signer differs");
                SignatureOutcome::invalid(format!(
                    "signer {} is not {}",
                    recovered, wallet
                ))
            }
            Err(err) => {
                warn!(error = %err, "signer recovery failed");
                SignatureOutcome::invalid(err.to_string())
            }
        }
    }
}
