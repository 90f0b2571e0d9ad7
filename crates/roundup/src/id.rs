//! ContentId: a BLAKE3 content hash truncated to 128 bits (32 hex chars).
//!
//! Recording and session identity is derived purely from track start
//! timestamps and connection ids, never from wall-clock processing time or
//! a counter. Re-running the same event stream therefore produces identical
//! ids, which is what makes re-runs idempotent and sessions correlatable
//! across runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A content-derived identifier - 128 bits (32 hex chars) of BLAKE3.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

/// Errors that can occur when parsing content ids.
#[derive(Debug, Error)]
pub enum IdError {
    #[error("invalid id length: expected 32 hex chars, got {0}")]
    InvalidLength(usize),

    #[error("invalid hex character in id")]
    InvalidHex,
}

impl ContentId {
    /// Hash a sequence of parts into an id.
    ///
    /// Parts are joined with `:` before hashing so that the boundary between
    /// them is unambiguous.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = parts
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(":");
        let hash_bytes = blake3::hash(joined.as_bytes());
        // Truncate to 16 bytes (128 bits)
        Self(hex::encode(&hash_bytes.as_bytes()[..16]))
    }

    /// Create from an existing id string (validates format).
    pub fn from_str_checked(s: &str) -> Result<Self, IdError> {
        if s.len() != 32 {
            return Err(IdError::InvalidLength(s.len()));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IdError::InvalidHex);
        }
        Ok(Self(s.to_lowercase()))
    }

    /// Get the full id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_checked(s)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_parts_produces_32_hex_chars() {
        let id = ContentId::from_parts(["1700000000000000", "conn-1", "audio"]);
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn from_parts_is_deterministic() {
        let a = ContentId::from_parts(["123", "conn", "video"]);
        let b = ContentId::from_parts(["123", "conn", "video"]);
        assert_eq!(a, b);
    }

    #[test]
    fn part_boundaries_are_unambiguous() {
        let a = ContentId::from_parts(["ab", "c"]);
        let b = ContentId::from_parts(["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn from_str_valid() {
        let s = "abcdef01234567890123456789abcdef";
        let id: ContentId = s.parse().unwrap();
        assert_eq!(id.as_str(), s);
    }

    #[test]
    fn from_str_invalid_length() {
        let result: Result<ContentId, _> = "short".parse();
        assert!(matches!(result, Err(IdError::InvalidLength(5))));
    }

    #[test]
    fn from_str_invalid_hex() {
        let result: Result<ContentId, _> = "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz".parse();
        assert!(matches!(result, Err(IdError::InvalidHex)));
    }

    #[test]
    fn serde_roundtrip_is_transparent() {
        let id = ContentId::from_parts(["serde", "test"]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_str()));
        let restored: ContentId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }
}
