//! Canonicalization Rules
//!
//! String normalization, numeric encoding, hash algorithm and domain tags.

use serde::{Deserialize, Serialize};

/// String normalization rule
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringNormRule {
    /// Case handling
    pub case: CaseHandling,
    /// Whitespace handling
    pub whitespace: WhitespaceHandling,
}

impl Default for StringNormRule {
    fn default() -> Self {
        Self {
            case: CaseHandling::Preserve,
            whitespace: WhitespaceHandling::Trim,
        }
    }
}

impl StringNormRule {
    pub fn apply(&self, s: &str) -> String {
        let spaced = match self.whitespace {
            WhitespaceHandling::Preserve => s.to_string(),
            WhitespaceHandling::Trim => s.trim().to_string(),
            WhitespaceHandling::Collapse => s.split_whitespace().collect::<Vec<_>>().join(" "),
        };
        match self.case {
            CaseHandling::Preserve => spaced,
            CaseHandling::Lower => spaced.to_lowercase(),
            CaseHandling::Upper => spaced.to_uppercase(),
        }
    }
}

/// Case handling
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseHandling {
    Preserve,
    Lower,
    Upper,
}

/// Whitespace handling
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhitespaceHandling {
    Preserve,
    Trim,
    Collapse,
}

/// Numeric encoding rule
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericEncodingRule {
    /// Encode floats with no fractional part as integers (`3.0` -> `3`)
    pub integral_floats_as_integers: bool,
}

impl Default for NumericEncodingRule {
    fn default() -> Self {
        Self {
            integral_floats_as_integers: true,
        }
    }
}

/// Hash algorithm
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    Sha256,
    Blake3,
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        Self::Sha256
    }
}

/// Domain separation tags
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainTags {
    /// Default domain tag
    pub default_tag: String,
    /// Allocation plan domain tag
    pub allocation_tag: String,
}

impl Default for DomainTags {
    fn default() -> Self {
        Self {
            default_tag: "bp:default".to_string(),
            allocation_tag: "bp:allocation".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        assert_eq!(HashAlgorithm::default(), HashAlgorithm::Sha256);
        assert_eq!(StringNormRule::default().whitespace, WhitespaceHandling::Trim);
        assert!(NumericEncodingRule::default().integral_floats_as_integers);
    }

    #[test]
    fn test_string_norm() {
        let collapse = StringNormRule {
            case: CaseHandling::Lower,
            whitespace: WhitespaceHandling::Collapse,
        };
        assert_eq!(collapse.apply("  Foil   PACK "), "foil pack");
        assert_eq!(StringNormRule::default().apply("  Foil   PACK "), "Foil   PACK");
    }
}
