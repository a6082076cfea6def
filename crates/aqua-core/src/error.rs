//! Unified Error Model
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AquaError {
    #[error("CHAIN/{0}")]
    MalformedChain(String),

    #[error("FIELD/missing mandatory field: {0}")]
    MissingMandatoryField(String),

    #[error("FIELD/revision carries both a signature and a witness")]
    MutuallyExclusiveClaims,

    #[error("TYPE/unknown revision type: {0}")]
    UnknownRevisionType(String),

    #[error("MERKLE/{0}")]
    MerkleProof(String),

    #[error("PARSE/{0}")]
    Parse(String),
}

impl From<serde_json::Error> for AquaError {
    fn from(err: serde_json::Error) -> Self {
        AquaError::Parse(err.to_string())
    }
}
