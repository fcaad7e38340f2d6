// taskgraph-core/src/core/hashing.rs
// ============================================================================
// Module: Taskgraph Canonical Hashing
// Description: RFC 8785 JSON canonicalization and checksum utilities.
// Purpose: Provide deterministic checksums for task specs, used to detect
//          spec and resource drift.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Taskgraph hashes canonical JSON using RFC 8785 (JCS) so that the same
//! semantic content always produces the same checksum regardless of the
//! source mapping's insertion order. This resolves the open question in the
//! drift model: checksums are stable across re-serialization, not merely
//! across identical insertion order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Hash Algorithm
// ============================================================================

/// Supported checksum algorithms for task state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 over RFC 8785 canonical JSON.
    Sha256,
}

/// Default hash algorithm for Taskgraph task state.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

/// Persisted scheme identifier recorded alongside checksums, so a future
/// canonicalization change is distinguishable from older persisted state.
pub const CHECKSUM_SCHEME: &str = "jcs-sha256";

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// Deterministic content checksum, rendered as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Hash algorithm identifier.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex-encoded digest bytes.
    pub value: String,
}

impl HashDigest {
    /// Creates a new digest from raw bytes.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            value: hex_encode(bytes),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical checksums.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes canonical JSON using the provided algorithm.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

/// Hashes raw bytes using the provided algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            let digest = hasher.finalize();
            HashDigest::new(HashAlgorithm::Sha256, &digest)
        }
    }
}

/// Computes the drift checksum of a task spec: SHA-256 over the canonical
/// JSON encoding of `{"spec": spec, "metadata": metadata}`, with `metadata`
/// defaulting to an empty mapping when absent.
///
/// This is the `checksum(x)` operation referenced by the drift predicates:
/// two specs with equal semantic content, even under different key
/// insertion order, hash identically.
#[must_use]
pub fn checksum_spec(spec: &Value, metadata: Option<&Value>) -> HashDigest {
    let metadata = metadata.cloned().unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    let envelope = serde_json::json!({ "spec": spec, "metadata": metadata });
    // `serde_json::Value` always serializes; canonicalization over an
    // already-parsed value cannot fail.
    let bytes = canonical_json_bytes(&envelope).unwrap_or_default();
    hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes)
}

/// Computes the fallback task id hash: SHA-256 over the canonical JSON
/// encoding of `spec` alone, with no metadata envelope.
///
/// This is a separate operation from [`checksum_spec`], which is the drift
/// checksum `checksum(x)` formula and always envelopes `{spec, metadata}`.
/// Task id derivation hashes the spec directly, matching the literal "16-hex
/// SHA-256 of spec" fallback rule.
#[must_use]
pub fn hash_spec_for_task_id(spec: &Value) -> HashDigest {
    // A `serde_json::Value` always serializes; canonicalization over an
    // already-parsed value cannot fail.
    let bytes = canonical_json_bytes(spec).unwrap_or_default();
    hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes)
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::checksum_spec;
    use super::hash_spec_for_task_id;

    #[test]
    fn checksum_is_stable_across_key_order() {
        let a = json!({ "field": 1, "other": 2 });
        let b = json!({ "other": 2, "field": 1 });
        assert_eq!(checksum_spec(&a, None).value, checksum_spec(&b, None).value);
    }

    #[test]
    fn checksum_changes_with_content() {
        let a = json!({ "field": 1 });
        let b = json!({ "field": 2 });
        assert_ne!(checksum_spec(&a, None).value, checksum_spec(&b, None).value);
    }

    #[test]
    fn missing_metadata_defaults_to_empty_mapping() {
        let spec = json!({ "field": 1 });
        let empty = json!({});
        assert_eq!(
            checksum_spec(&spec, None).value,
            checksum_spec(&spec, Some(&empty)).value
        );
    }

    #[test]
    fn task_id_hash_differs_from_enveloped_checksum() {
        let spec = json!({ "field": 1 });
        assert_ne!(hash_spec_for_task_id(&spec).value, checksum_spec(&spec, None).value);
    }

    #[test]
    fn task_id_hash_is_stable_across_key_order() {
        let a = json!({ "field": 1, "other": 2 });
        let b = json!({ "other": 2, "field": 1 });
        assert_eq!(hash_spec_for_task_id(&a).value, hash_spec_for_task_id(&b).value);
    }
}
