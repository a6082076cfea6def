//! External verification capabilities
//!
//! Witness backends (ledger, Nostr relay, timestamp authority) sit behind the
//! network and are the only `.await` points of a verification run. Signature
//! recovery and DID key checks are local and synchronous.
//!
//! Bundled implementations: [`EthereumRecovery`] for EIP-191 personal-message
//! signatures and [`HexEd25519Key`] for hex-encoded Ed25519 keys. Witness
//! backends have no bundled transport; [`Unavailable`] reports every check as
//! a backend error so an offline verifier fails witnesses explicitly.

use async_trait::async_trait;
use ed25519_dalek::{Signature as Ed25519Signature, Verifier as _, VerifyingKey as Ed25519Key};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey as EcdsaKey};
use sha3::{Digest, Keccak256};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("BACKEND/{0}")]
    Backend(String),

    #[error("SIGNATURE/malformed: {0}")]
    MalformedSignature(String),

    #[error("KEY/malformed: {0}")]
    MalformedKey(String),

    #[error("UNSUPPORTED/{0}")]
    Unsupported(String),
}

/// Ledger transaction lookup.
///
/// Replies `"true"` or `"false"`; any other text is an error message, see
/// [`parse_ledger_reply`].
#[async_trait]
pub trait LedgerWitnessCheck: Send + Sync {
    async fn check(&self, network: &str, tx_hash: &str, merkle_root: &str, timestamp: &str) -> String;
}

/// Nostr relay event lookup
#[async_trait]
pub trait RelayWitnessCheck: Send + Sync {
    async fn check(&self, tx_hash: &str, merkle_root: &str, timestamp: &str) -> Result<bool, CapabilityError>;
}

/// RFC 3161 timestamp token check
#[async_trait]
pub trait TimestampAuthorityCheck: Send + Sync {
    async fn check(&self, tx_hash: &str, merkle_root: &str, timestamp: &str) -> Result<bool, CapabilityError>;
}

/// Recover the signer address of a personal-message signature
pub trait AddressRecovery: Send + Sync {
    fn recover(&self, message: &str, signature: &str) -> Result<String, CapabilityError>;
}

/// Check a DID key signature over a target hash
pub trait DidKeyCheck: Send + Sync {
    fn verify(&self, signature: &str, public_key: &str, target_hash: &str) -> Result<bool, CapabilityError>;
}

/// Decode a ledger reply into a verdict or an error message
pub fn parse_ledger_reply(reply: &str) -> Result<bool, CapabilityError> {
    match reply.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(CapabilityError::Backend(other.to_string())),
    }
}

/// The set of capabilities a verifier runs with
#[derive(Clone)]
pub struct Capabilities {
    pub ledger: Arc<dyn LedgerWitnessCheck>,
    pub relay: Arc<dyn RelayWitnessCheck>,
    pub timestamp_authority: Arc<dyn TimestampAuthorityCheck>,
    pub address_recovery: Arc<dyn AddressRecovery>,
    pub did_key: Arc<dyn DidKeyCheck>,
}

impl Capabilities {
    /// Local signature checks only; every witness backend is [`Unavailable`]
    pub fn offline() -> Self {
        Self {
            ledger: Arc::new(Unavailable),
            relay: Arc::new(Unavailable),
            timestamp_authority: Arc::new(Unavailable),
            address_recovery: Arc::new(EthereumRecovery),
            did_key: Arc::new(HexEd25519Key),
        }
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn LedgerWitnessCheck>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_relay(mut self, relay: Arc<dyn RelayWitnessCheck>) -> Self {
        self.relay = relay;
        self
    }

    pub fn with_timestamp_authority(mut self, tsa: Arc<dyn TimestampAuthorityCheck>) -> Self {
        self.timestamp_authority = tsa;
        self
    }

    pub fn with_address_recovery(mut self, recovery: Arc<dyn AddressRecovery>) -> Self {
        self.address_recovery = recovery;
        self
    }

    pub fn with_did_key(mut self, did_key: Arc<dyn DidKeyCheck>) -> Self {
        self.did_key = did_key;
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::offline()
    }
}

/// Witness backend with no transport configured
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

#[async_trait]
impl LedgerWitnessCheck for Unavailable {
    async fn check(&self, network: &str, _tx_hash: &str, _merkle_root: &str, _timestamp: &str) -> String {
        format!("no ledger backend configured for {}", network)
    }
}

#[async_trait]
impl RelayWitnessCheck for Unavailable {
    async fn check(&self, _tx_hash: &str, _merkle_root: &str, _timestamp: &str) -> Result<bool, CapabilityError> {
        Err(CapabilityError::Backend("no relay backend configured".to_string()))
    }
}

#[async_trait]
impl TimestampAuthorityCheck for Unavailable {
    async fn check(&self, _tx_hash: &str, _merkle_root: &str, _timestamp: &str) -> Result<bool, CapabilityError> {
        Err(CapabilityError::Backend("no timestamp authority configured".to_string()))
    }
}

/// Keccak-256 of an EIP-191 personal message
pub fn eip191_hash(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// `0x`-prefixed lowercase address of a secp256k1 public key
pub fn ethereum_address(key: &EcdsaKey) -> String {
    let point = key.to_encoded_point(false);
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&digest[12..]))
}

/// Signer recovery for 65-byte `r || s || v` hex signatures
#[derive(Debug, Clone, Copy, Default)]
pub struct EthereumRecovery;

impl AddressRecovery for EthereumRecovery {
    fn recover(&self, message: &str, signature: &str) -> Result<String, CapabilityError> {
        let bytes = decode_hex(signature).map_err(CapabilityError::MalformedSignature)?;
        if bytes.len() != 65 {
            return Err(CapabilityError::MalformedSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }

        let v = match bytes[64] {
            v @ (0 | 1) => v,
            v @ (27 | 28) => v - 27,
            v => {
                return Err(CapabilityError::MalformedSignature(format!(
                    "invalid recovery byte {}",
                    v
                )))
            }
        };
        let recovery_id = RecoveryId::from_byte(v)
            .ok_or_else(|| CapabilityError::MalformedSignature(format!("invalid recovery id {}", v)))?;
        let signature = EcdsaSignature::from_slice(&bytes[..64])
            .map_err(|e| CapabilityError::MalformedSignature(e.to_string()))?;

        let digest = eip191_hash(message);
        let key = EcdsaKey::recover_from_prehash(&digest, &signature, recovery_id)
            .map_err(|e| CapabilityError::MalformedSignature(e.to_string()))?;
        Ok(ethereum_address(&key))
    }
}

/// Ed25519 check over the target hash text.
///
/// The key is 32 hex-encoded bytes, optionally prefixed with `did:key:`; the
/// signature is 64 hex-encoded bytes. Multibase keys (`did:key:z6Mk...`) are
/// reported as unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct HexEd25519Key;

impl DidKeyCheck for HexEd25519Key {
    fn verify(&self, signature: &str, public_key: &str, target_hash: &str) -> Result<bool, CapabilityError> {
        let key_hex = public_key.strip_prefix("did:key:").unwrap_or(public_key);
        if key_hex.starts_with('z') {
            return Err(CapabilityError::Unsupported(format!(
                "multibase key {}",
                public_key
            )));
        }
        let key_bytes: [u8; 32] = decode_hex(key_hex)
            .map_err(CapabilityError::MalformedKey)?
            .try_into()
            .map_err(|_| CapabilityError::MalformedKey("expected 32 bytes".to_string()))?;
        let key = Ed25519Key::from_bytes(&key_bytes).map_err(|e| CapabilityError::MalformedKey(e.to_string()))?;

        let signature_bytes: [u8; 64] = decode_hex(signature)
            .map_err(CapabilityError::MalformedSignature)?
            .try_into()
            .map_err(|_| CapabilityError::MalformedSignature("expected 64 bytes".to_string()))?;
        let signature = Ed25519Signature::from_bytes(&signature_bytes);

        Ok(key.verify(target_hash.as_bytes(), &signature).is_ok())
    }
}

fn decode_hex(input: &str) -> Result<Vec<u8>, String> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| e.to_string())
}
