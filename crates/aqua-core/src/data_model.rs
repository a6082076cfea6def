//! Data Model: Claims, Revision, Chain, MerkleProofNode
use crate::error::AquaError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Claim keys with protocol meaning
pub mod keys {
    pub const REVISION_TYPE: &str = "revision_type";
    pub const PREVIOUS_VERIFICATION_HASH: &str = "previous_verification_hash";
    pub const DOMAIN_ID: &str = "domain_id";
    pub const LOCAL_TIMESTAMP: &str = "local_timestamp";
    pub const CONTENT: &str = "content";
    pub const FILE_HASH: &str = "file_hash";

    pub const SIGNATURE: &str = "signature";
    pub const SIGNATURE_TYPE: &str = "signature_type";
    pub const SIGNATURE_PUBLIC_KEY: &str = "signature_public_key";
    pub const SIGNATURE_WALLET_ADDRESS: &str = "signature_wallet_address";

    pub const WITNESS_MERKLE_ROOT: &str = "witness_merkle_root";
    pub const WITNESS_NETWORK: &str = "witness_network";
    pub const WITNESS_TRANSACTION_HASH: &str = "witness_transaction_hash";
    pub const WITNESS_TIMESTAMP: &str = "witness_timestamp";
    pub const WITNESS_MERKLE_PROOF: &str = "witness_merkle_proof";

    pub const LINK_VERIFICATION_HASHES: &str = "link_verification_hashes";

    /// Prefix of form field claims
    pub const FORM_PREFIX: &str = "forms_";
    /// Suffix the form editor appends to a deleted form field
    pub const DELETED_SUFFIX: &str = ".deleted";

    /// Required on every revision regardless of its type
    pub const UNIVERSAL: &[&str] = &[PREVIOUS_VERIFICATION_HASH, DOMAIN_ID, LOCAL_TIMESTAMP];
}

/// A revision's claims, iterated in lexicographic key order
pub type Claims = BTreeMap<String, Value>;

/// Render a claim value the way it is interpolated into a `key:value` leaf.
///
/// Strings are taken verbatim, arrays are comma-joined element renderings,
/// objects fall back to compact JSON.
pub fn claim_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(claim_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Revision type declared in `revision_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionKind {
    File,
    Form,
    Signature,
    Witness,
    Link,
}

impl RevisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevisionKind::File => "file",
            RevisionKind::Form => "form",
            RevisionKind::Signature => "signature",
            RevisionKind::Witness => "witness",
            RevisionKind::Link => "link",
        }
    }

    /// Type-specific keys that must be present (on top of [`keys::UNIVERSAL`]).
    ///
    /// Form revisions have no fixed key; they need at least one `forms_*` field,
    /// which [`Revision::check_mandatory_fields`] checks separately.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            RevisionKind::File => &[keys::CONTENT],
            RevisionKind::Form => &[],
            RevisionKind::Signature => &[keys::SIGNATURE, keys::SIGNATURE_TYPE],
            RevisionKind::Witness => &[
                keys::WITNESS_MERKLE_ROOT,
                keys::WITNESS_NETWORK,
                keys::WITNESS_TRANSACTION_HASH,
                keys::WITNESS_TIMESTAMP,
            ],
            RevisionKind::Link => &[keys::LINK_VERIFICATION_HASHES],
        }
    }
}

impl FromStr for RevisionKind {
    type Err = AquaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(RevisionKind::File),
            "form" => Ok(RevisionKind::Form),
            "signature" => Ok(RevisionKind::Signature),
            "witness" => Ok(RevisionKind::Witness),
            "link" => Ok(RevisionKind::Link),
            other => Err(AquaError::UnknownRevisionType(other.to_string())),
        }
    }
}

impl fmt::Display for RevisionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a document's notarization history.
///
/// `leaves` is the declared fingerprint list; every other key of the stored
/// JSON object lands in `claims`, including `revision_type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    #[serde(default)]
    pub leaves: Vec<String>,
    #[serde(flatten)]
    pub claims: Claims,
}

impl Revision {
    pub fn new(claims: Claims, leaves: Vec<String>) -> Self {
        Self { leaves, claims }
    }

    /// Parse a revision from its JSON object
    pub fn from_value(value: Value) -> Result<Self, AquaError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn claim(&self, key: &str) -> Option<&Value> {
        self.claims.get(key)
    }

    /// String view of a claim; non-string values yield `None`
    pub fn claim_str(&self, key: &str) -> Option<&str> {
        self.claims.get(key).and_then(Value::as_str)
    }

    pub fn has_claim(&self, key: &str) -> bool {
        self.claims.contains_key(key)
    }

    /// Predecessor hash, empty for genesis or when absent
    pub fn previous_verification_hash(&self) -> &str {
        self.claim_str(keys::PREVIOUS_VERIFICATION_HASH).unwrap_or("")
    }

    pub fn domain_id(&self) -> Option<&str> {
        self.claim_str(keys::DOMAIN_ID)
    }

    pub fn is_genesis(&self) -> bool {
        self.previous_verification_hash().is_empty()
    }

    pub fn kind(&self) -> Result<RevisionKind, AquaError> {
        match self.claims.get(keys::REVISION_TYPE) {
            Some(Value::String(s)) => s.parse(),
            Some(other) => Err(AquaError::UnknownRevisionType(other.to_string())),
            None => Err(AquaError::MissingMandatoryField(keys::REVISION_TYPE.to_string())),
        }
    }

    pub fn has_signature(&self) -> bool {
        self.has_claim(keys::SIGNATURE)
    }

    pub fn has_witness(&self) -> bool {
        self.has_claim(keys::WITNESS_MERKLE_ROOT)
    }

    /// A revision carries a signature or a witness, never both
    pub fn check_exclusive_claims(&self) -> Result<(), AquaError> {
        if self.has_signature() && self.has_witness() {
            return Err(AquaError::MutuallyExclusiveClaims);
        }
        Ok(())
    }

    /// Declared hash of the file content, if any
    pub fn file_hash(&self) -> Option<&str> {
        self.claim_str(keys::FILE_HASH)
    }

    /// Verification hashes named by `link_verification_hashes`.
    ///
    /// Accepts an array or a comma-joined string; blank entries are skipped.
    pub fn link_hashes(&self) -> Vec<String> {
        let raw = match self.claims.get(keys::LINK_VERIFICATION_HASHES) {
            Some(Value::Array(items)) => items.iter().map(claim_text).collect::<Vec<_>>(),
            Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
            Some(other) => vec![claim_text(other)],
            None => Vec::new(),
        };
        raw.into_iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect()
    }

    /// Form field keys (`forms_*`), deleted ones included
    pub fn form_fields(&self) -> impl Iterator<Item = &str> {
        self.claims
            .keys()
            .filter(|k| k.starts_with(keys::FORM_PREFIX))
            .map(String::as_str)
    }

    /// Form fields the form editor marked as deleted, without the suffix
    pub fn deleted_form_fields(&self) -> Vec<String> {
        self.form_fields()
            .filter_map(|k| k.strip_suffix(keys::DELETED_SUFFIX))
            .map(str::to_string)
            .collect()
    }

    /// Check the required-field set of the declared revision type.
    ///
    /// Returns the parsed kind, or the first missing field. Universal keys are
    /// checked before type-specific ones.
    pub fn check_mandatory_fields(&self) -> Result<RevisionKind, AquaError> {
        let kind = self.kind()?;

        let missing = keys::UNIVERSAL
            .iter()
            .chain(kind.required_fields())
            .find(|field| !self.has_claim(field));
        if let Some(field) = missing {
            return Err(AquaError::MissingMandatoryField(field.to_string()));
        }

        if kind == RevisionKind::Form && self.form_fields().next().is_none() {
            return Err(AquaError::MissingMandatoryField(format!(
                "{}*",
                keys::FORM_PREFIX
            )));
        }

        Ok(kind)
    }
}

/// One element of a Merkle inclusion proof path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProofNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_leaf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_leaf: Option<String>,
    pub successor: String,
}

impl MerkleProofNode {
    pub fn new(
        left_leaf: Option<String>,
        right_leaf: Option<String>,
        successor: impl Into<String>,
    ) -> Self {
        Self {
            left_leaf,
            right_leaf,
            successor: successor.into(),
        }
    }

    /// Left leaf, treating an empty string as absent
    pub fn left(&self) -> Option<&str> {
        self.left_leaf.as_deref().filter(|s| !s.is_empty())
    }

    /// Right leaf, treating an empty string as absent
    pub fn right(&self) -> Option<&str> {
        self.right_leaf.as_deref().filter(|s| !s.is_empty())
    }

    pub fn contains(&self, digest: &str) -> bool {
        self.left() == Some(digest) || self.right() == Some(digest)
    }
}

/// Ordered revision history, oldest first, keyed by verification hash
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub revisions: IndexMap<String, Revision>,
    /// Verification hash → file name, as written by the notarization tool
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub file_index: IndexMap<String, String>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `{"revisions": {...}, "file_index": {...}}` document.
    /// Revision order follows the document order.
    pub fn from_json(json: &str) -> Result<Self, AquaError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Append a revision as the newest entry
    pub fn push(&mut self, verification_hash: impl Into<String>, revision: Revision) -> &mut Self {
        self.revisions.insert(verification_hash.into(), revision);
        self
    }

    pub fn with_file(mut self, verification_hash: impl Into<String>, name: impl Into<String>) -> Self {
        self.file_index.insert(verification_hash.into(), name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn genesis(&self) -> Option<(&String, &Revision)> {
        self.revisions.first()
    }

    pub fn latest(&self) -> Option<(&String, &Revision)> {
        self.revisions.last()
    }

    pub fn get(&self, verification_hash: &str) -> Option<&Revision> {
        self.revisions.get(verification_hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Revision)> {
        self.revisions.iter()
    }

    pub fn file_name(&self, verification_hash: &str) -> Option<&str> {
        self.file_index.get(verification_hash).map(String::as_str)
    }

    /// Check that the oldest revision is a genesis and that every other
    /// revision points at the revision inserted right before it.
    pub fn check_linkage(&self) -> Result<(), AquaError> {
        let mut expected_previous = "";
        for (index, (hash, revision)) in self.revisions.iter().enumerate() {
            let previous = revision.previous_verification_hash();
            if previous != expected_previous {
                return Err(if index == 0 {
                    AquaError::MalformedChain(format!(
                        "oldest revision {} is detached: previous_verification_hash is {}",
                        hash, previous
                    ))
                } else {
                    AquaError::MalformedChain(format!(
                        "revision {} points at {} instead of {}",
                        hash, previous, expected_previous
                    ))
                });
            }
            expected_previous = hash.as_str();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file_revision(previous: &str) -> Revision {
        Revision::from_value(json!({
            "revision_type": "file",
            "previous_verification_hash": previous,
            "domain_id": "5c4b9d3a1e",
            "local_timestamp": "20240101120000",
            "content": "hello",
            "leaves": ["aa", "bb"]
        }))
        .unwrap()
    }

    #[test]
    fn test_claim_text_rendering() {
        assert_eq!(claim_text(&json!("abc")), "abc");
        assert_eq!(claim_text(&json!(42)), "42");
        assert_eq!(claim_text(&json!(true)), "true");
        assert_eq!(claim_text(&json!(null)), "null");
        assert_eq!(claim_text(&json!(["a", "b", 3])), "a,b,3");
        assert_eq!(claim_text(&json!({"k": "v"})), r#"{"k":"v"}"#);
    }

    #[test]
    fn test_revision_splits_leaves_from_claims() {
        let revision = file_revision("");
        assert_eq!(revision.leaves, vec!["aa", "bb"]);
        assert!(!revision.has_claim("leaves"));
        assert_eq!(revision.claims.len(), 5);
        assert!(revision.is_genesis());
        assert_eq!(revision.kind().unwrap(), RevisionKind::File);
    }

    #[test]
    fn test_mandatory_fields_per_kind() {
        assert_eq!(
            file_revision("").check_mandatory_fields().unwrap(),
            RevisionKind::File
        );

        let mut revision = file_revision("");
        revision.claims.remove(keys::CONTENT);
        assert_eq!(
            revision.check_mandatory_fields(),
            Err(AquaError::MissingMandatoryField("content".to_string()))
        );

        let mut revision = file_revision("");
        revision.claims.remove(keys::DOMAIN_ID);
        assert_eq!(
            revision.check_mandatory_fields(),
            Err(AquaError::MissingMandatoryField("domain_id".to_string()))
        );

        let mut revision = file_revision("");
        revision.claims.remove(keys::REVISION_TYPE);
        assert_eq!(
            revision.check_mandatory_fields(),
            Err(AquaError::MissingMandatoryField("revision_type".to_string()))
        );
    }

    #[test]
    fn test_unknown_revision_type() {
        let mut revision = file_revision("");
        revision
            .claims
            .insert(keys::REVISION_TYPE.to_string(), json!("scalar"));
        assert_eq!(
            revision.kind(),
            Err(AquaError::UnknownRevisionType("scalar".to_string()))
        );
    }

    #[test]
    fn test_form_requires_a_form_field() {
        let revision = Revision::from_value(json!({
            "revision_type": "form",
            "previous_verification_hash": "",
            "domain_id": "d",
            "local_timestamp": "t",
        }))
        .unwrap();
        assert!(matches!(
            revision.check_mandatory_fields(),
            Err(AquaError::MissingMandatoryField(_))
        ));

        let revision = Revision::from_value(json!({
            "revision_type": "form",
            "previous_verification_hash": "",
            "domain_id": "d",
            "local_timestamp": "t",
            "forms_name": "Alice",
            "forms_email.deleted": null,
        }))
        .unwrap();
        assert_eq!(revision.check_mandatory_fields().unwrap(), RevisionKind::Form);
        assert_eq!(revision.deleted_form_fields(), vec!["forms_email"]);
    }

    #[test]
    fn test_signature_and_witness_are_exclusive() {
        let mut revision = file_revision("");
        assert!(revision.check_exclusive_claims().is_ok());
        revision.claims.insert(keys::SIGNATURE.to_string(), json!("0x00"));
        assert!(revision.check_exclusive_claims().is_ok());
        revision
            .claims
            .insert(keys::WITNESS_MERKLE_ROOT.to_string(), json!("root"));
        assert_eq!(
            revision.check_exclusive_claims(),
            Err(AquaError::MutuallyExclusiveClaims)
        );
    }

    #[test]
    fn test_link_hashes_from_array_or_string() {
        let mut revision = file_revision("h0");
        assert!(revision.link_hashes().is_empty());

        revision
            .claims
            .insert(keys::LINK_VERIFICATION_HASHES.to_string(), json!(["ab12", " cd34"]));
        assert_eq!(revision.link_hashes(), vec!["ab12", "cd34"]);

        revision
            .claims
            .insert(keys::LINK_VERIFICATION_HASHES.to_string(), json!("ab12,,cd34"));
        assert_eq!(revision.link_hashes(), vec!["ab12", "cd34"]);

        revision.claims.insert(keys::FILE_HASH.to_string(), json!("ff"));
        assert_eq!(revision.file_hash(), Some("ff"));
    }

    #[test]
    fn test_proof_node_treats_empty_leaf_as_absent() {
        let node = MerkleProofNode::new(Some(String::new()), Some("ab".into()), "ab");
        assert_eq!(node.left(), None);
        assert_eq!(node.right(), Some("ab"));
        assert!(node.contains("ab"));
        assert!(!node.contains(""));
    }

    #[test]
    fn test_chain_preserves_document_order() {
        let json = r#"{
            "revisions": {
                "zz": {"revision_type": "file", "previous_verification_hash": "", "leaves": []},
                "aa": {"revision_type": "file", "previous_verification_hash": "zz", "leaves": []}
            },
            "file_index": {"zz": "README.md"}
        }"#;
        let chain = Chain::from_json(json).unwrap();
        let hashes: Vec<&String> = chain.iter().map(|(h, _)| h).collect();
        assert_eq!(hashes, vec!["zz", "aa"]);
        assert_eq!(chain.file_name("zz"), Some("README.md"));
        assert!(chain.check_linkage().is_ok());

        let chain = chain.with_file("aa", "notes.md");
        assert_eq!(chain.file_name("aa"), Some("notes.md"));
        assert!(chain.get("aa").unwrap().leaves.is_empty());
    }

    #[test]
    fn test_chain_linkage_detects_detached_genesis() {
        let mut chain = Chain::new();
        chain.push("h1", file_revision("h0"));
        assert!(matches!(
            chain.check_linkage(),
            Err(AquaError::MalformedChain(_))
        ));
    }

    #[test]
    fn test_chain_linkage_detects_broken_link() {
        let mut chain = Chain::new();
        chain
            .push("h1", file_revision(""))
            .push("h2", file_revision("h1"))
            .push("h3", file_revision("h1"));
        let err = chain.check_linkage().unwrap_err();
        assert!(err.to_string().contains("h3"));
    }

    #[test]
    fn test_invalid_chain_json() {
        assert!(matches!(Chain::from_json("{"), Err(AquaError::Parse(_))));
    }
}
