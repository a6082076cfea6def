//! Verification Profiles
//!
//! Presets for how much work a verification run does. The Merkle-proof phase
//! of witness checks is the expensive part and is off in `fast`.

use aqua_core::VerifyContext;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyProfile {
    /// Profile name (e.g., "fast@1.0", "thorough@1.0")
    pub name: String,

    /// Operating mode
    pub mode: String,

    /// Check `witness_merkle_proof` against the witnessed hash
    pub verify_merkle_proof: bool,

    /// Log every revision and claim, not only the chain summary
    #[serde(default)]
    pub verbose: bool,

    /// Accepted `signature_type` values; empty accepts every known scheme
    #[serde(default)]
    pub accepted_signature_types: Vec<String>,
}

impl VerifyProfile {
    /// Backend witness checks only
    pub fn fast() -> Self {
        Self {
            name: "fast@1.0".to_string(),
            mode: "fast".to_string(),
            verify_merkle_proof: false,
            verbose: false,
            accepted_signature_types: Vec::new(),
        }
    }

    /// Backend witness checks plus Merkle-proof validation
    pub fn thorough() -> Self {
        Self {
            name: "thorough@1.0".to_string(),
            mode: "thorough".to_string(),
            verify_merkle_proof: true,
            verbose: false,
            accepted_signature_types: Vec::new(),
        }
    }

    /// Load profile from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        serde_yaml::from_str(yaml).map_err(|e| e.to_string())
    }

    /// Get profile by mode name
    pub fn for_mode(mode: &str) -> Self {
        match mode {
            "fast" => Self::fast(),
            "thorough" => Self::thorough(),
            _ => Self::fast(),
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Fresh per-run context carrying this profile's switches
    pub fn context(&self) -> VerifyContext {
        VerifyContext::new()
            .verbose(self.verbose)
            .with_merkle_proof(self.verify_merkle_proof)
    }
}

impl Default for VerifyProfile {
    fn default() -> Self {
        Self::fast()
    }
}
