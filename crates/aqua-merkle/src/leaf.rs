//! Claim leaf hashing
use aqua_core::{claim_text, Claims};
use serde_json::Value;
use sha3::{Digest, Sha3_512};

/// Lowercase hex SHA3-512 of `input`.
///
/// The empty string maps to the empty string: an empty digest marks an absent
/// field, it is never the hash of zero bytes.
pub fn hash(input: &str) -> String {
    hash_bytes(input.as_bytes())
}

/// [`hash`] over raw bytes, for file content
pub fn hash_bytes(input: &[u8]) -> String {
    if input.is_empty() {
        return String::new();
    }
    hex::encode(Sha3_512::digest(input))
}

/// Leaf of a single `key:value` claim
pub fn leaf(key: &str, value: &Value) -> String {
    hash(&format!("{}:{}", key, claim_text(value)))
}

/// Leaves of a claim set in ascending key order
pub fn leaves_of(claims: &Claims) -> Vec<String> {
    claims.iter().map(|(key, value)| leaf(key, value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_input_is_sentinel() {
        assert_eq!(hash(""), "");
    }

    #[test]
    fn test_sha3_512_vector() {
        assert_eq!(
            hash("abc"),
            "b751850b1a57168a5693cd924b6b096e08f621827444f70d884f5d0240d2712e\
             10e116e9192af3c91a7ec57647e3934057340b4cf408d5a56592f8274eec53f0"
        );
    }

    #[test]
    fn test_bytes_and_text_agree() {
        assert_eq!(hash_bytes(b"abc"), hash("abc"));
        assert_eq!(hash_bytes(&[]), "");
    }

    #[test]
    fn test_leaf_of_content_claim() {
        assert_eq!(
            leaf("content", &json!("hello")),
            "a36ff0fa0fa24c28da9a29ea3391bfd2673fc67fa371f379d59fbbca57776be3\
             5217c18076a0b2bbf235404bb1595620906e7696becc386a58b80cc9697c218c"
        );
    }

    #[test]
    fn test_leaves_are_sorted_and_order_independent() {
        let mut forward = Claims::new();
        forward.insert("zeta".to_string(), json!("1"));
        forward.insert("alpha".to_string(), json!("2"));
        forward.insert("mid".to_string(), json!(3));

        let mut backward = Claims::new();
        backward.insert("mid".to_string(), json!(3));
        backward.insert("alpha".to_string(), json!("2"));
        backward.insert("zeta".to_string(), json!("1"));

        let leaves = leaves_of(&forward);
        assert_eq!(leaves, leaves_of(&backward));
        assert_eq!(
            leaves,
            vec![hash("alpha:2"), hash("mid:3"), hash("zeta:1")]
        );
    }

    #[test]
    fn test_empty_claim_value_still_hashes_the_key() {
        assert_eq!(leaf("previous_verification_hash", &json!("")), hash("previous_verification_hash:"));
        assert!(!leaf("previous_verification_hash", &json!("")).is_empty());
    }
}
