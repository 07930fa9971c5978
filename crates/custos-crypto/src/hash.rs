//! SHA-256 event hashes.
//!
//! [`EventHash`] is the digest type that links events into a per-tenant
//! chain. The all-zero hash is reserved as the "no predecessor" sentinel
//! for the first event in a chain.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CryptoError, CryptoResult};

/// A 32-byte SHA-256 digest over an event's canonical encoding.
///
/// Serializes as a lowercase hex string so hashes survive JSON and KV
/// round-trips without binary handling.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHash([u8; 32]);

impl EventHash {
    /// The all-zero hash, used as the `previous_hash` of a chain's first
    /// event.
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Whether this is the zero sentinel.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Digest a single byte slice.
    #[must_use]
    pub fn digest(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Digest several byte slices as one stream.
    ///
    /// Equivalent to hashing the concatenation of `parts`. Callers must
    /// ensure the parts are unambiguous (fixed-length or self-delimiting);
    /// the chain seal uses a constant domain tag, a self-delimiting JSON
    /// payload, and a fixed 32-byte predecessor hash.
    #[must_use]
    pub fn digest_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        Self(hasher.finalize().into())
    }

    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding (64 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode from a 64-character hex string.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidHex`] if the string is not valid hex
    /// or does not decode to exactly 32 bytes.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidHex)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidHex)?;
        Ok(Self(arr))
    }

    /// Short prefix for log lines (first 8 hex characters).
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl Default for EventHash {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Debug for EventHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventHash({}…)", self.short())
    }
}

impl std::fmt::Display for EventHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for EventHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EventHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<[u8]> for EventHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let a = EventHash::digest(b"payload");
        let b = EventHash::digest(b"payload");
        assert_eq!(a, b);

        let c = EventHash::digest(b"other");
        assert_ne!(a, c);
    }

    #[test]
    fn digest_parts_matches_concatenation() {
        let joined = EventHash::digest(b"abcdef");
        let parts = EventHash::digest_parts(&[b"abc", b"def"]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn zero_sentinel() {
        let zero = EventHash::zero();
        assert!(zero.is_zero());
        assert!(!EventHash::digest(b"x").is_zero());
        assert_eq!(EventHash::default(), zero);
    }

    #[test]
    fn hex_round_trip() {
        let hash = EventHash::digest(b"round trip");
        let decoded = EventHash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, decoded);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(EventHash::from_hex("not hex").is_err());
        assert!(EventHash::from_hex("abcd").is_err());
    }

    #[test]
    fn serde_uses_hex_strings() {
        let hash = EventHash::digest(b"serde");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));

        let back: EventHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn debug_is_truncated() {
        let hash = EventHash::digest(b"debug");
        let dbg = format!("{hash:?}");
        assert!(dbg.starts_with("EventHash("));
        assert!(dbg.len() < 24);
    }
}
