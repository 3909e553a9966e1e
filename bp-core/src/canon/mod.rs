//! Canonicalization Engine
//!
//! Deterministic serialization for computing allocation digests. Objects are
//! serialized to JSON, keys sorted, strings and numbers normalized, then
//! hashed with a domain-separation prefix.
//!
//! The digest detects drift between preview and commit. It is not an
//! authentication mechanism: anyone holding the plan can recompute it.

mod rules;

pub use rules::*;

use crate::error::BpResult;
use crate::types::Digest;
use serde::Serialize;
use serde_json::Value;

/// Canonicalization specification
#[derive(Clone, Debug)]
pub struct CanonSpec {
    /// String normalization
    pub string_norm: StringNormRule,
    /// Numeric encoding
    pub numeric_encoding: NumericEncodingRule,
    /// Hash algorithm
    pub hash_algorithm: HashAlgorithm,
    /// Domain separation tags
    pub domain_tags: DomainTags,
}

impl CanonSpec {
    /// Create v1 spec
    pub fn v1() -> Self {
        Self {
            string_norm: StringNormRule::default(),
            numeric_encoding: NumericEncodingRule::default(),
            hash_algorithm: HashAlgorithm::Sha256,
            domain_tags: DomainTags::default(),
        }
    }
}

impl Default for CanonSpec {
    fn default() -> Self {
        Self::v1()
    }
}

/// Canonicalizer
#[derive(Clone, Debug, Default)]
pub struct Canonicalizer {
    spec: CanonSpec,
}

impl Canonicalizer {
    pub fn new(spec: CanonSpec) -> Self {
        Self { spec }
    }

    pub fn v1() -> Self {
        Self::new(CanonSpec::v1())
    }

    /// Canonicalize and compute digest under the default tag
    pub fn canonicalize_and_hash<T: Serialize>(&self, value: &T) -> BpResult<Digest> {
        let canonical = self.canonicalize(value)?;
        Ok(self.hash_with_domain(&canonical, &self.spec.domain_tags.default_tag))
    }

    /// Digest of an allocation plan, as compared by preview/commit
    pub fn allocation_hash<T: Serialize>(&self, allocation: &T) -> BpResult<Digest> {
        let canonical = self.canonicalize(allocation)?;
        Ok(self.hash_with_domain(&canonical, &self.spec.domain_tags.allocation_tag))
    }

    /// Canonicalize to bytes
    pub fn canonicalize<T: Serialize>(&self, value: &T) -> BpResult<Vec<u8>> {
        let json = serde_json::to_value(value)?;
        let normalized = self.normalize(&json);
        Ok(serde_json::to_vec(&normalized)?)
    }

    /// Sort object keys, normalize strings and numbers (recursive)
    fn normalize(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut sorted_map = serde_json::Map::new();
                let mut keys: Vec<_> = map.keys().collect();
                keys.sort();
                for key in keys {
                    if let Some(v) = map.get(key) {
                        sorted_map.insert(key.clone(), self.normalize(v));
                    }
                }
                Value::Object(sorted_map)
            }
            Value::Array(arr) => Value::Array(arr.iter().map(|v| self.normalize(v)).collect()),
            Value::String(s) => Value::String(self.spec.string_norm.apply(s)),
            Value::Number(n) => self.normalize_number(n),
            _ => value.clone(),
        }
    }

    fn normalize_number(&self, n: &serde_json::Number) -> Value {
        if self.spec.numeric_encoding.integral_floats_as_integers && !n.is_i64() && !n.is_u64() {
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < 9.0e15 {
                    return Value::from(f as i64);
                }
            }
        }
        Value::Number(n.clone())
    }

    /// Hash with domain separation
    fn hash_with_domain(&self, data: &[u8], domain: &str) -> Digest {
        let mut tagged = Vec::with_capacity(domain.len() + 1 + data.len());
        tagged.extend_from_slice(domain.as_bytes());
        tagged.push(0x00);
        tagged.extend_from_slice(data);

        match self.spec.hash_algorithm {
            HashAlgorithm::Sha256 => Digest::sha256(&tagged),
            HashAlgorithm::Blake3 => Digest::blake3(&tagged),
        }
    }
}
