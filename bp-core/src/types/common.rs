//! Basic Types
//!
//! Naming conventions:
//! - `_id` suffix: Primary key identifiers
//! - `_hash` / `checksum_` prefix: Content digests

use crate::error::{BpError, BpResult};
use serde::{Deserialize, Serialize};

// ============================================================
// Digest
// ============================================================

/// 32-byte content digest
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Create from hex string
    pub fn from_hex(s: &str) -> BpResult<Self> {
        let bytes = hex::decode(s.trim()).map_err(|_| BpError::InvalidDigest)?;
        if bytes.len() != 32 {
            return Err(BpError::InvalidDigest);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// SHA-256 hash
    pub fn sha256(data: &[u8]) -> Self {
        use sha2::{Digest as _, Sha256};
        let result = Sha256::digest(data);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }

    /// BLAKE3 hash
    pub fn blake3(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest({}...)", &self.to_hex()[..16])
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Default for Digest {
    fn default() -> Self {
        Self::zero()
    }
}

// ============================================================
// ID Types
// ============================================================

/// Canonical player id, as returned by the identity resolver
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event id (one event sheet)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Batch id grouping the spend entries of one commit.
///
/// Lexicographic order follows creation order (see [`crate::spend::BatchIdGenerator`]).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchId(pub String);

impl BatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Preview artifact id
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewId(pub String);

impl PreviewId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PreviewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================
// Enums
// ============================================================

/// Award source. Each source owns one ledger row per player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardSource {
    Attendance,
    FlagMission,
    DiceRoll,
}

impl AwardSource {
    pub fn all() -> [AwardSource; 3] {
        [Self::Attendance, Self::FlagMission, Self::DiceRoll]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attendance => "attendance",
            Self::FlagMission => "flag_mission",
            Self::DiceRoll => "dice_roll",
        }
    }

    /// Parse from user input; accepts a few spellings per source
    pub fn parse(s: &str) -> BpResult<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "attendance" => Ok(Self::Attendance),
            "flag_mission" | "flag" | "flag_missions" => Ok(Self::FlagMission),
            "dice_roll" | "dice" | "dice_rolls" => Ok(Self::DiceRoll),
            other => Err(BpError::invalid_input(format!("unknown award source '{}'", other))),
        }
    }
}

impl std::fmt::Display for AwardSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Qualitative risk/usage classification attached to audit entries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Green,
    Amber,
    Red,
}

impl Band {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Amber => "amber",
            Self::Red => "red",
        }
    }
}

impl Default for Band {
    fn default() -> Self {
        Self::Green
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_hex_roundtrip() {
        let d = Digest::sha256(b"allocation");
        assert_eq!(Digest::from_hex(&d.to_hex()).unwrap(), d);
    }

    #[test]
    fn test_digest_rejects_short_hex() {
        assert_eq!(Digest::from_hex("abcd"), Err(BpError::InvalidDigest));
        assert_eq!(Digest::from_hex("zz"), Err(BpError::InvalidDigest));
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            Digest::sha256(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_award_source_parse() {
        assert_eq!(AwardSource::parse("Dice").unwrap(), AwardSource::DiceRoll);
        assert_eq!(AwardSource::parse("flag-mission").unwrap(), AwardSource::FlagMission);
        assert_eq!(AwardSource::parse(" attendance ").unwrap(), AwardSource::Attendance);
        assert!(matches!(
            AwardSource::parse("karaoke"),
            Err(BpError::InvalidInput { .. })
        ));
    }
}
